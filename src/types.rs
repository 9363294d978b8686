//! Core types for the matcher.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Events a [`Matcher`](crate::Matcher) can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatcherEvent {
    /// The set of matching keys changed.
    Change,
}

impl MatcherEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatcherEvent::Change => "change",
        }
    }
}

impl fmt::Display for MatcherEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an event name is not one the matcher emits.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown matcher event: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for MatcherEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "change" => Ok(MatcherEvent::Change),
            other => Err(UnknownEvent(other.to_string())),
        }
    }
}

/// Ordering applied to the keys returned by `current_matches`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrder {
    /// Sorted by key.
    #[default]
    Lexicographic,
    /// The order queries were registered in.
    Registration,
}

/// Per-registration state, as reported by `current_snapshot`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    pub key: String,
    /// The query string as supplied at registration.
    pub raw: String,
    /// The query as normalized by the environment.
    pub parsed: String,
    pub matches: bool,
}
