//! Subscribers to matched-set changes.
//!
//! Two ways to listen:
//! - [`ChangeHandler`] callbacks, run synchronously during the change pass
//! - [`ChangeStream`] bounded channels, drained by the caller
//!
//! # Example
//!
//! ```ignore
//! let handler = ChangeHandler::new(|matches| println!("now matching: {:?}", matches));
//! matcher.on("change", &handler);
//!
//! let stream = matcher.subscribe(16);
//! while let Ok(matches) = stream.try_recv() {
//!     println!("{:?}", matches);
//! }
//! ```

mod manager;
mod registry;
mod types;

pub use manager::HandlerList;
pub use registry::CallbackRegistry;
pub use types::{ChangeHandler, ChangeStream, HandlerFailurePolicy, WeakChangeHandler};
