//! Subscription style detection for query lists.

use super::{MediaQueryList, QueryListener, CHANGE_EVENT};
use crate::error::{MatchError, Result};
use std::fmt;
use std::sync::Arc;

/// How a listener is attached to a query list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerStyle {
    /// `addEventListener("change", ..)` / `removeEventListener`.
    EventTarget,
    /// `addListener(..)` / `removeListener`.
    Legacy,
}

impl ListenerStyle {
    /// Pick the style a list supports, preferring named events.
    pub fn detect(list: &dyn MediaQueryList) -> Option<Self> {
        if list.event_target().is_some() {
            Some(ListenerStyle::EventTarget)
        } else if list.legacy_listeners().is_some() {
            Some(ListenerStyle::Legacy)
        } else {
            None
        }
    }
}

/// A query list with one listener attached through its detected style.
///
/// Detaching uses the same style and listener that attaching did.
pub struct QueryBinding {
    list: Arc<dyn MediaQueryList>,
    style: ListenerStyle,
    listener: QueryListener,
}

impl QueryBinding {
    /// Attach `listener` to `list`.
    ///
    /// Fails if the list supports neither subscription style.
    pub fn attach(list: Arc<dyn MediaQueryList>, listener: QueryListener) -> Result<Self> {
        let style = ListenerStyle::detect(list.as_ref())
            .ok_or_else(|| MatchError::NoChangeSubscription(list.media()))?;

        match style {
            ListenerStyle::EventTarget => {
                if let Some(target) = list.event_target() {
                    target.add_event_listener(CHANGE_EVENT, &listener);
                }
            }
            ListenerStyle::Legacy => {
                if let Some(legacy) = list.legacy_listeners() {
                    legacy.add_listener(&listener);
                }
            }
        }

        Ok(Self {
            list,
            style,
            listener,
        })
    }

    /// Remove the listener from the list.
    pub fn detach(&self) {
        match self.style {
            ListenerStyle::EventTarget => {
                if let Some(target) = self.list.event_target() {
                    target.remove_event_listener(CHANGE_EVENT, &self.listener);
                }
            }
            ListenerStyle::Legacy => {
                if let Some(legacy) = self.list.legacy_listeners() {
                    legacy.remove_listener(&self.listener);
                }
            }
        }
    }

    pub fn style(&self) -> ListenerStyle {
        self.style
    }

    pub fn matches(&self) -> bool {
        self.list.matches()
    }

    pub fn media(&self) -> String {
        self.list.media()
    }
}

impl fmt::Debug for QueryBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBinding")
            .field("media", &self.list.media())
            .field("style", &self.style)
            .finish()
    }
}
