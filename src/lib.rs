//! # Media Match
//!
//! Watches a keyed set of media queries and tells subscribers whenever the
//! set of matching keys changes.
//!
//! ## Core Concepts
//!
//! - **Environment**: host capability that evaluates queries and signals changes
//! - **Registration**: a key bound to a query and its live query list
//! - **Matched set**: keys whose query currently matches, sorted by key
//! - **Change**: one consolidated notification per distinct matched set
//!
//! ## Example
//!
//! ```ignore
//! use media_match::{create_matcher, ChangeHandler, FakeMediaEnvironment};
//! use std::sync::Arc;
//!
//! let env = FakeMediaEnvironment::new();
//! let matcher = create_matcher(Arc::new(env.clone()));
//!
//! matcher.register_with_key("tablet", "(min-width: 768px)")?;
//! matcher.register_with_key("desktop", "(min-width: 1024px)")?;
//!
//! let handler = ChangeHandler::new(|matches| println!("matching: {:?}", matches));
//! matcher.on("change", &handler);
//!
//! env.alter(&["(min-width: 768px)"]); // prints ["tablet"]
//! ```

pub mod environment;
pub mod error;
pub mod matcher;
pub mod subscriptions;
pub mod types;
#[cfg(feature = "wasm-bindings")]
pub mod web;

// Re-exports
pub use environment::{
    ChangeEventTarget, FakeMediaEnvironment, LegacyChangeListeners, ListenerStyle,
    MediaEnvironment, MediaQueryList, QueryBinding, QueryListener,
};
pub use error::{MatchError, Result};
pub use matcher::{create_matcher, Matcher, MatcherConfig};
pub use subscriptions::{ChangeHandler, ChangeStream, HandlerFailurePolicy};
pub use types::*;
