//! Subscriber types for matched-set notifications.

use super::manager::HandlerList;
use crossbeam_channel::Receiver;
use std::fmt;
use std::sync::{Arc, Weak};

type HandlerFn = dyn Fn(&[String]) + Send + Sync;

/// A `change` subscriber.
///
/// Handlers are compared by identity: clones of one handler are equal,
/// two handlers built from identical closures are not.
#[derive(Clone)]
pub struct ChangeHandler(Arc<HandlerFn>);

impl ChangeHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the handler with the current matched keys.
    pub fn call(&self, matches: &[String]) {
        (self.0)(matches)
    }

    pub fn downgrade(&self) -> WeakChangeHandler {
        WeakChangeHandler(Arc::downgrade(&self.0))
    }
}

impl PartialEq for ChangeHandler {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl Eq for ChangeHandler {}

impl fmt::Debug for ChangeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeHandler({:p})", Arc::as_ptr(&self.0))
    }
}

/// Non-owning reference to a [`ChangeHandler`].
#[derive(Clone)]
pub struct WeakChangeHandler(Weak<HandlerFn>);

impl WeakChangeHandler {
    pub fn upgrade(&self) -> Option<ChangeHandler> {
        self.0.upgrade().map(ChangeHandler)
    }
}

/// What to do when a handler panics during delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandlerFailurePolicy {
    /// Let the panic unwind into the caller; later handlers are skipped.
    #[default]
    Propagate,
    /// Log the panic and keep delivering to the remaining handlers.
    Isolate,
}

/// Channel-backed subscription returned by `Matcher::subscribe`.
///
/// Each delivered matched-key list is queued on a bounded channel. Updates
/// that arrive while the buffer is full are dropped. The channel disconnects
/// once the matcher drops its subscribers (on `destroy` or when the matcher
/// itself is dropped). Dropping the stream unsubscribes it.
pub struct ChangeStream {
    pub(crate) handler: WeakChangeHandler,
    pub(crate) handlers: Weak<HandlerList>,
    pub receiver: Receiver<Vec<String>>,
}

impl ChangeStream {
    /// Receive the next matched set (blocking).
    pub fn recv(&self) -> Result<Vec<String>, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a matched set (non-blocking).
    pub fn try_recv(&self) -> Result<Vec<String>, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Vec<String>, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain every queued update, returning only the most recent.
    pub fn latest(&self) -> Option<Vec<String>> {
        self.receiver.try_iter().last()
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        if let (Some(handlers), Some(handler)) = (self.handlers.upgrade(), self.handler.upgrade())
        {
            handlers.remove(&handler);
        }
    }
}

impl fmt::Debug for ChangeStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeStream")
            .field("pending", &self.receiver.len())
            .finish()
    }
}
