//! Error types for the media query matcher.

use thiserror::Error;

/// Errors surfaced while acquiring or observing a media query.
///
/// Harmless misuse (duplicate keys, unknown event names, removing an
/// absent handler) is never an error; those calls are silent no-ops.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Media query environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("Query rejected: {query} ({message})")]
    QueryRejected { query: String, message: String },

    #[error("Query list exposes no change subscription: {0}")]
    NoChangeSubscription(String),
}

/// Result type for matcher operations.
pub type Result<T> = std::result::Result<T, MatchError>;
