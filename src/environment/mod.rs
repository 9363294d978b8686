//! The media query capability a [`Matcher`](crate::Matcher) observes.
//!
//! The host supplies a [`MediaEnvironment`] that turns a query string into a
//! live [`MediaQueryList`]. The matcher never evaluates queries itself; a list
//! reports whether it currently matches and calls back when that changes.
//!
//! Lists may offer either of two subscription styles:
//! - [`ChangeEventTarget`]: named `"change"` events (preferred)
//! - [`LegacyChangeListeners`]: direct listener registration
//!
//! [`binding`] picks one when the list is first obtained.

pub mod binding;
pub mod fake;

use crate::error::Result;
use std::sync::Arc;

pub use binding::{ListenerStyle, QueryBinding};
pub use fake::FakeMediaEnvironment;

/// Callback invoked by a query list when its match state changes.
///
/// Listeners are identified by pointer, so the same `Arc` must be passed to
/// remove one that was added.
pub type QueryListener = Arc<dyn Fn() + Send + Sync>;

/// Name of the event query lists emit on a match state change.
pub const CHANGE_EVENT: &str = "change";

/// Source of live media query lists.
pub trait MediaEnvironment: Send + Sync {
    /// Obtain an observation handle for `query`.
    fn match_media(&self, query: &str) -> Result<Arc<dyn MediaQueryList>>;
}

/// A live, observable media query.
pub trait MediaQueryList: Send + Sync {
    /// Whether the query matches right now.
    fn matches(&self) -> bool;

    /// The query as normalized by the environment.
    fn media(&self) -> String;

    /// Named-event subscription, if supported.
    fn event_target(&self) -> Option<&dyn ChangeEventTarget> {
        None
    }

    /// Direct listener subscription, if supported.
    fn legacy_listeners(&self) -> Option<&dyn LegacyChangeListeners> {
        None
    }
}

/// Newer subscription style: `addEventListener("change", ..)`.
pub trait ChangeEventTarget {
    fn add_event_listener(&self, event: &str, listener: &QueryListener);
    fn remove_event_listener(&self, event: &str, listener: &QueryListener);
}

/// Older subscription style: `addListener(..)`.
pub trait LegacyChangeListeners {
    fn add_listener(&self, listener: &QueryListener);
    fn remove_listener(&self, listener: &QueryListener);
}

/// Compare two listeners by identity.
pub(crate) fn same_listener(a: &QueryListener, b: &QueryListener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
