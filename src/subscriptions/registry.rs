//! Maps foreign callbacks onto [`ChangeHandler`]s.
//!
//! Host callbacks (JS functions, FFI pointers) are compared with the host's
//! own equality, not by Rust pointer. The registry hands back the same
//! handler every time an equal callback is seen, so subscribing it twice
//! stays idempotent and unsubscribing finds the right handler.

use super::types::ChangeHandler;
use parking_lot::Mutex;

pub struct CallbackRegistry<K> {
    entries: Mutex<Vec<(K, ChangeHandler)>>,
}

impl<K: PartialEq> CallbackRegistry<K> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// The handler standing in for `callback`, created with `make` on first use.
    pub fn handler_for<F>(&self, callback: K, make: F) -> ChangeHandler
    where
        F: FnOnce(&K) -> ChangeHandler,
    {
        let mut entries = self.entries.lock();
        if let Some((_, handler)) = entries.iter().find(|(k, _)| *k == callback) {
            return handler.clone();
        }

        let handler = make(&callback);
        entries.push((callback, handler.clone()));
        handler
    }

    /// Forget `callback`, returning its handler if it was known.
    pub fn take(&self, callback: &K) -> Option<ChangeHandler> {
        let mut entries = self.entries.lock();
        let pos = entries.iter().position(|(k, _)| k == callback)?;
        Some(entries.remove(pos).1)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K: PartialEq> Default for CallbackRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}
