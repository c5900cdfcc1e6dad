//! bgsort - background sort coordinator
//!
//! Runs an in-place sort on a worker thread and reports each exchange, and
//! finally the outcome, back to a single observer context without blocking
//! either side.
//!
//! # Core Concepts
//!
//! - **Injected algorithms**: sorts implement [`SortAlgorithm`] and report
//!   exchanges through a [`SortView`]
//! - **One run at a time**: starting or reconfiguring while running is
//!   rejected with [`CoordinatorError::AlreadyRunning`]
//! - **Ordered delivery**: exchanges arrive in report order; the completion
//!   event is always last
//! - **Cooperative cancellation**: [`TaskCoordinator::request_cancel`] sets a
//!   flag the algorithm polls
//!
//! # Example
//!
//! ```rust,ignore
//! use bgsort::{CoordinatorConfig, SortOutcome, TaskCoordinator, algorithm_fn};
//!
//! let bubble = algorithm_fn("bubble", |view| {
//!     for pass in 0..view.len() {
//!         for i in 0..view.len() - 1 - pass {
//!             if view.is_cancellation_requested() {
//!                 return Ok(SortOutcome::Canceled);
//!             }
//!             if view[i] > view[i + 1] {
//!                 view.exchange(i, i + 1);
//!             }
//!         }
//!     }
//!     Ok(SortOutcome::Completed)
//! });
//!
//! let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![5, 3, 4, 1], bubble);
//! coordinator.subscribe_exchange(|e| {
//!     println!("{} <-> {}", e.first_index, e.second_index);
//!     Ok(())
//! });
//! coordinator.start()?;
//! let done = coordinator.run_until_idle().await;
//! ```
//!
//! # Modules
//!
//! - [`algorithm`] - Algorithm contract and the view handed to it
//! - [`coordinator`] - Run lifecycle and event dispatch
//! - [`events`] - Event payloads and the subscription registry
//! - [`progress`] - Progress payloads and the packed index codec
//! - [`config`] - Application configuration and loading
//! - [`cli`] - Command-line interface

pub mod algorithm;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod progress;

// Re-export commonly used types
pub use algorithm::{FnAlgorithm, SortAlgorithm, SortOutcome, SortView, algorithm_fn};
pub use config::{Config, DemoConfig};
pub use coordinator::{CancelFlag, CoordinatorConfig, CoordinatorError, CoordinatorState, TaskCoordinator};
pub use events::{CompletionEvent, EventKind, ExchangeEvent, RunId, SortEvent, SubscriptionId};
pub use progress::{ProgressTransport, decode, encode};
