//! Ordered handler list for broadcasting matched-set changes.

use super::types::{ChangeHandler, HandlerFailurePolicy};
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};

/// Subscribers in subscription order, deduplicated by identity.
pub struct HandlerList {
    handlers: RwLock<Vec<ChangeHandler>>,
}

impl HandlerList {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Append a handler. Returns false if it was already subscribed.
    pub fn add(&self, handler: ChangeHandler) -> bool {
        let mut handlers = self.handlers.write();
        if handlers.contains(&handler) {
            return false;
        }
        handlers.push(handler);
        true
    }

    /// Remove one occurrence of a handler. Returns false if absent.
    pub fn remove(&self, handler: &ChangeHandler) -> bool {
        let mut handlers = self.handlers.write();
        match handlers.iter().position(|h| h == handler) {
            Some(pos) => {
                handlers.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, handler: &ChangeHandler) -> bool {
        self.handlers.read().contains(handler)
    }

    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Call every handler with `matches`, in subscription order.
    ///
    /// The list is copied before delivery so handlers may subscribe or
    /// unsubscribe while it runs; such changes apply from the next delivery.
    /// Delivery stops as soon as `still_current` returns false, which happens
    /// when a handler triggered a newer broadcast that already reached
    /// everyone.
    pub fn broadcast<F>(&self, matches: &[String], policy: HandlerFailurePolicy, still_current: F)
    where
        F: Fn() -> bool,
    {
        let handlers = self.handlers.read().clone();

        for handler in &handlers {
            if !still_current() {
                tracing::trace!("superseded by a newer change; stopping delivery");
                return;
            }
            match policy {
                HandlerFailurePolicy::Propagate => handler.call(matches),
                HandlerFailurePolicy::Isolate => {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| handler.call(matches)));
                    if result.is_err() {
                        tracing::warn!(?handler, "change handler panicked; continuing delivery");
                    }
                }
            }
        }
    }
}

impl Default for HandlerList {
    fn default() -> Self {
        Self::new()
    }
}
