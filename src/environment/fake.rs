//! In-memory media environment for tests and headless hosts.
//!
//! A [`FakeMediaEnvironment`] decides matches from an explicit set of
//! matching query strings. [`FakeMediaEnvironment::alter`] replaces that set
//! and fires `change` on every list whose state flipped, after all lists
//! have been updated.

use super::{
    same_listener, ChangeEventTarget, LegacyChangeListeners, MediaEnvironment, MediaQueryList,
    QueryListener,
};
use crate::error::{MatchError, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Subscription styles the fake lists expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FakeStyle {
    /// Both named events and direct listeners.
    Modern,
    /// Direct listeners only.
    Legacy,
    /// No change subscription at all.
    Unobservable,
}

struct FakeList {
    media: String,
    style: FakeStyle,
    matches: AtomicBool,
    listeners: Mutex<Vec<QueryListener>>,
}

impl FakeList {
    fn add(&self, listener: &QueryListener) {
        self.listeners.lock().push(Arc::clone(listener));
    }

    fn remove(&self, listener: &QueryListener) {
        let mut listeners = self.listeners.lock();
        if let Some(pos) = listeners.iter().position(|l| same_listener(l, listener)) {
            listeners.remove(pos);
        }
    }

    fn fire(&self) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener();
        }
    }
}

impl MediaQueryList for FakeList {
    fn matches(&self) -> bool {
        self.matches.load(Ordering::SeqCst)
    }

    fn media(&self) -> String {
        self.media.clone()
    }

    fn event_target(&self) -> Option<&dyn ChangeEventTarget> {
        match self.style {
            FakeStyle::Modern => Some(self as &dyn ChangeEventTarget),
            _ => None,
        }
    }

    fn legacy_listeners(&self) -> Option<&dyn LegacyChangeListeners> {
        match self.style {
            FakeStyle::Modern | FakeStyle::Legacy => Some(self as &dyn LegacyChangeListeners),
            FakeStyle::Unobservable => None,
        }
    }
}

impl ChangeEventTarget for FakeList {
    fn add_event_listener(&self, event: &str, listener: &QueryListener) {
        if event == super::CHANGE_EVENT {
            self.add(listener);
        }
    }

    fn remove_event_listener(&self, event: &str, listener: &QueryListener) {
        if event == super::CHANGE_EVENT {
            self.remove(listener);
        }
    }
}

impl LegacyChangeListeners for FakeList {
    fn add_listener(&self, listener: &QueryListener) {
        self.add(listener);
    }

    fn remove_listener(&self, listener: &QueryListener) {
        self.remove(listener);
    }
}

#[derive(Default)]
struct FakeState {
    matching: HashSet<String>,
    rejected: HashSet<String>,
    lists: Vec<Arc<FakeList>>,
}

/// Deterministic [`MediaEnvironment`] driven by [`alter`](Self::alter).
///
/// Clones share state, so a test can keep one handle while the matcher owns
/// another.
#[derive(Clone)]
pub struct FakeMediaEnvironment {
    style: FakeStyle,
    state: Arc<Mutex<FakeState>>,
}

impl FakeMediaEnvironment {
    /// Lists support both subscription styles.
    pub fn new() -> Self {
        Self::with_style(FakeStyle::Modern)
    }

    /// Lists support only direct listeners.
    pub fn legacy() -> Self {
        Self::with_style(FakeStyle::Legacy)
    }

    /// Lists support no change subscription.
    pub fn unobservable() -> Self {
        Self::with_style(FakeStyle::Unobservable)
    }

    fn with_style(style: FakeStyle) -> Self {
        Self {
            style,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Start with `queries` matching.
    pub fn with_matching(self, queries: &[&str]) -> Self {
        self.state.lock().matching = queries.iter().map(|q| q.to_string()).collect();
        self
    }

    /// Make `match_media` fail for `query`.
    pub fn reject(&self, query: &str) {
        self.state.lock().rejected.insert(query.to_string());
    }

    /// Replace the set of matching queries, then fire `change` on every list
    /// whose state flipped.
    pub fn alter(&self, queries: &[&str]) {
        let to_fire: Vec<Arc<FakeList>> = {
            let mut state = self.state.lock();
            state.matching = queries.iter().map(|q| q.to_string()).collect();

            let mut changed = Vec::new();
            for list in &state.lists {
                let matches = state.matching.contains(&list.media);
                if list.matches.swap(matches, Ordering::SeqCst) != matches {
                    changed.push(Arc::clone(list));
                }
            }
            changed
        };

        for list in to_fire {
            list.fire();
        }
    }

    /// Total listeners attached across every list handed out.
    pub fn listener_count(&self) -> usize {
        self.state
            .lock()
            .lists
            .iter()
            .map(|l| l.listeners.lock().len())
            .sum()
    }

    /// Number of lists handed out by `match_media` that are still alive.
    pub fn list_count(&self) -> usize {
        self.state.lock().lists.len()
    }
}

impl Default for FakeMediaEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEnvironment for FakeMediaEnvironment {
    fn match_media(&self, query: &str) -> Result<Arc<dyn MediaQueryList>> {
        let mut state = self.state.lock();
        if state.rejected.contains(query) {
            return Err(MatchError::QueryRejected {
                query: query.to_string(),
                message: "rejected by environment".to_string(),
            });
        }

        // Forget lists nobody else holds any more.
        state.lists.retain(|l| Arc::strong_count(l) > 1);

        let list = Arc::new(FakeList {
            media: query.to_string(),
            style: self.style,
            matches: AtomicBool::new(state.matching.contains(query)),
            listeners: Mutex::new(Vec::new()),
        });
        state.lists.push(Arc::clone(&list));
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_initial_matches() {
        let env = FakeMediaEnvironment::new().with_matching(&["print"]);
        let print = env.match_media("print").unwrap();
        let screen = env.match_media("screen").unwrap();
        assert!(print.matches());
        assert!(!screen.matches());
        assert_eq!(env.list_count(), 2);

        drop(screen);
        let _tv = env.match_media("tv").unwrap();
        assert_eq!(env.list_count(), 2);
    }

    #[test]
    fn test_alter_fires_only_changed_lists() {
        let env = FakeMediaEnvironment::new();
        let a = env.match_media("a").unwrap();
        let b = env.match_media("b").unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let listener: QueryListener = Arc::new(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        a.event_target().unwrap().add_event_listener("change", &listener);
        b.event_target().unwrap().add_event_listener("change", &listener);

        env.alter(&["a"]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(a.matches());
        assert!(!b.matches());

        env.alter(&["a"]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        env.alter(&["b"]);
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_other_event_names_ignored() {
        let env = FakeMediaEnvironment::new();
        let list = env.match_media("a").unwrap();
        let listener: QueryListener = Arc::new(|| {});
        list.event_target().unwrap().add_event_listener("resize", &listener);
        assert_eq!(env.listener_count(), 0);
    }

    #[test]
    fn test_reject() {
        let env = FakeMediaEnvironment::new();
        env.reject("((");
        assert!(matches!(
            env.match_media("(("),
            Err(MatchError::QueryRejected { .. })
        ));
        assert_eq!(env.list_count(), 0);
    }
}
