//! The matcher: registered queries, their live lists, and change fan-out.

use crate::environment::{MediaEnvironment, QueryBinding, QueryListener};
use crate::error::Result;
use crate::subscriptions::{ChangeHandler, ChangeStream, HandlerFailurePolicy, HandlerList};
use crate::types::{MatchOrder, MatcherEvent, QueryState};
use crossbeam_channel::{bounded, TrySendError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Matcher configuration.
#[derive(Clone, Debug)]
pub struct MatcherConfig {
    /// Order of keys returned by `current_matches` and delivered to handlers.
    /// Default: lexicographic
    pub order: MatchOrder,

    /// Skip delivery when the matched set equals the last one delivered.
    /// Default: true
    pub deduplicate: bool,

    /// Behaviour when a handler panics.
    /// Default: propagate
    pub handler_failure: HandlerFailurePolicy,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            order: MatchOrder::Lexicographic,
            deduplicate: true,
            handler_failure: HandlerFailurePolicy::Propagate,
        }
    }
}

struct Registration {
    raw: String,
    binding: QueryBinding,
    /// Registration order.
    seq: u64,
}

#[derive(Default)]
struct MatcherState {
    registrations: HashMap<String, Registration>,
    next_seq: u64,
    /// Sorted keys of the last delivered matched set.
    last_notified: Option<Vec<String>>,
    /// Bumped each time a change pass commits to delivering.
    generation: u64,
}

impl MatcherState {
    fn current_matches(&self, order: MatchOrder) -> Vec<String> {
        let mut matched: Vec<(&String, u64)> = self
            .registrations
            .iter()
            .filter(|(_, reg)| reg.binding.matches())
            .map(|(key, reg)| (key, reg.seq))
            .collect();

        match order {
            MatchOrder::Lexicographic => matched.sort_unstable_by(|a, b| a.0.cmp(b.0)),
            MatchOrder::Registration => matched.sort_unstable_by_key(|&(_, seq)| seq),
        }

        matched.into_iter().map(|(key, _)| key.clone()).collect()
    }
}

struct Inner {
    env: Arc<dyn MediaEnvironment>,
    config: MatcherConfig,
    state: Mutex<MatcherState>,
    handlers: Arc<HandlerList>,
}

impl Inner {
    /// Recompute the matched set and deliver it unless it is a repeat.
    ///
    /// A handler that changes registrations starts a nested pass; once that
    /// pass commits, this one stops so no handler is left holding the older set.
    fn handle_change(&self) {
        let (current, generation) = {
            let mut state = self.state.lock();
            let current = state.current_matches(self.config.order);

            if self.config.deduplicate {
                let mut token = current.clone();
                if self.config.order != MatchOrder::Lexicographic {
                    token.sort_unstable();
                }
                if state.last_notified.as_ref() == Some(&token) {
                    tracing::trace!(matches = ?current, "matched set unchanged");
                    return;
                }
                state.last_notified = Some(token);
            }

            state.generation += 1;
            (current, state.generation)
        };

        tracing::debug!(
            matches = ?current,
            generation,
            handlers = self.handlers.len(),
            "matched set changed"
        );
        self.handlers
            .broadcast(&current, self.config.handler_failure, || {
                self.state.lock().generation == generation
            });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for (_, reg) in self.state.get_mut().registrations.drain() {
            reg.binding.detach();
        }
    }
}

/// Tracks a keyed set of media queries and reports the matching keys.
///
/// `Matcher` is a handle; clones share the same registrations and
/// subscribers. Query lists only hold a weak reference back, so dropping
/// every handle detaches all listeners.
///
/// No internal lock is held while handlers or environment callbacks run, so
/// handlers may call back into the matcher.
#[derive(Clone)]
pub struct Matcher {
    inner: Arc<Inner>,
}

impl Matcher {
    /// Create a matcher observing queries through `env`.
    pub fn new(env: Arc<dyn MediaEnvironment>, config: MatcherConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                env,
                config,
                state: Mutex::new(MatcherState::default()),
                handlers: Arc::new(HandlerList::new()),
            }),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.inner.config
    }

    // --- Queries ---

    /// Keys whose query currently matches, ordered per the config.
    pub fn current_matches(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .current_matches(self.inner.config.order)
    }

    /// One record per registration, in registration order.
    pub fn current_snapshot(&self) -> Vec<QueryState> {
        let state = self.inner.state.lock();
        let mut regs: Vec<(&String, &Registration)> = state.registrations.iter().collect();
        regs.sort_unstable_by_key(|(_, reg)| reg.seq);

        regs.into_iter()
            .map(|(key, reg)| QueryState {
                key: key.clone(),
                raw: reg.raw.clone(),
                parsed: reg.binding.media(),
                matches: reg.binding.matches(),
            })
            .collect()
    }

    /// Number of registered queries.
    pub fn len(&self) -> usize {
        self.inner.state.lock().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().registrations.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.state.lock().registrations.contains_key(key)
    }

    // --- Registration ---

    /// Register `query` under its own text as key.
    pub fn register(&self, query: &str) -> Result<()> {
        self.register_with_key(query, query)
    }

    /// Register with an optional key, the way script callers pass it:
    /// `(query)` keys the query by itself, `(key, query)` names it.
    pub fn register_keyed(&self, key_or_query: &str, query: Option<&str>) -> Result<()> {
        match query {
            Some(query) => self.register_with_key(key_or_query, query),
            None => self.register(key_or_query),
        }
    }

    /// Register `query` under `key`.
    ///
    /// A no-op if `key` is already registered, even with a different query.
    /// If the query matches immediately, runs a change pass.
    pub fn register_with_key(&self, key: &str, query: &str) -> Result<()> {
        if self.contains(key) {
            tracing::trace!(key, "key already registered");
            return Ok(());
        }

        let list = self.inner.env.match_media(query)?;
        let binding = QueryBinding::attach(list, self.listener())?;

        let matches = {
            let mut state = self.inner.state.lock();
            if state.registrations.contains_key(key) {
                // Lost a race with another registration of the same key.
                drop(state);
                binding.detach();
                return Ok(());
            }

            let matches = binding.matches();
            let seq = state.next_seq;
            state.next_seq += 1;

            tracing::debug!(key, query, style = ?binding.style(), matches, "registered query");
            state.registrations.insert(
                key.to_string(),
                Registration {
                    raw: query.to_string(),
                    binding,
                    seq,
                },
            );
            matches
        };

        if matches {
            self.inner.handle_change();
        }
        Ok(())
    }

    /// Remove the registration under `key`, if any.
    ///
    /// If the removed query was matching, runs a change pass.
    pub fn unregister(&self, key: &str) {
        let removed = self.inner.state.lock().registrations.remove(key);
        let Some(reg) = removed else {
            tracing::trace!(key, "unregister of unknown key");
            return;
        };

        reg.binding.detach();
        let matches = reg.binding.matches();
        tracing::debug!(key, matches, "unregistered query");

        if matches {
            self.inner.handle_change();
        }
    }

    // --- Subscribers ---

    /// Subscribe to a named event. Only `"change"` is recognized.
    pub fn on(&self, event: &str, handler: &ChangeHandler) {
        match event.parse::<MatcherEvent>() {
            Ok(MatcherEvent::Change) => self.on_change(handler),
            Err(e) => tracing::trace!(%e, "ignoring subscription"),
        }
    }

    /// Unsubscribe from a named event. Only `"change"` is recognized.
    pub fn off(&self, event: &str, handler: &ChangeHandler) {
        match event.parse::<MatcherEvent>() {
            Ok(MatcherEvent::Change) => self.off_change(handler),
            Err(e) => tracing::trace!(%e, "ignoring unsubscription"),
        }
    }

    /// Subscribe to `change`. Subscribing the same handler twice is a no-op.
    pub fn on_change(&self, handler: &ChangeHandler) {
        self.inner.handlers.add(handler.clone());
    }

    /// Unsubscribe from `change`. A no-op if the handler isn't subscribed.
    pub fn off_change(&self, handler: &ChangeHandler) {
        self.inner.handlers.remove(handler);
    }

    /// Subscribe through a bounded channel holding up to `buffer_size` updates.
    pub fn subscribe(&self, buffer_size: usize) -> ChangeStream {
        let (sender, receiver) = bounded(buffer_size.max(1));

        let handler = ChangeHandler::new(move |matches| match sender.try_send(matches.to_vec()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(matches = ?dropped, "change stream full; dropping update");
            }
            Err(TrySendError::Disconnected(_)) => {}
        });
        self.inner.handlers.add(handler.clone());

        ChangeStream {
            handler: handler.downgrade(),
            handlers: Arc::downgrade(&self.inner.handlers),
            receiver,
        }
    }

    /// Number of subscribed handlers, streams included.
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }

    // --- Lifecycle ---

    /// Drop every subscriber, then unregister every query.
    ///
    /// The matcher stays usable afterwards, starting from empty.
    pub fn destroy(&self) {
        self.inner.handlers.clear();

        let keys: Vec<String> = self
            .inner
            .state
            .lock()
            .registrations
            .keys()
            .cloned()
            .collect();

        tracing::debug!(queries = keys.len(), "destroying matcher");
        for key in keys {
            self.unregister(&key);
        }
    }

    /// Listener attached to every query list this matcher observes.
    fn listener(&self) -> QueryListener {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handle_change();
            }
        })
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("queries", &self.len())
            .field("handlers", &self.handler_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Create a matcher with the default configuration.
pub fn create_matcher(env: Arc<dyn MediaEnvironment>) -> Matcher {
    Matcher::new(env, MatcherConfig::default())
}
