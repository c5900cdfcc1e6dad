//! Coordinator for background sort runs
//!
//! The coordinator bridges two contexts:
//! - **Worker:** a thread spawned per run, where the injected algorithm sorts
//! - **Observer:** the context that owns the coordinator and drains events
//!
//! Only the cancellation flag is shared between them; the array moves into
//! the worker for the run and comes back with the completion message.

mod cancel;
mod config;
mod core;
mod error;
pub(crate) mod messages;

pub use cancel::CancelFlag;
pub use config::CoordinatorConfig;
pub use self::core::{CoordinatorState, TaskCoordinator};
pub use error::CoordinatorError;
