//! Events published by the coordinator
//!
//! Two event kinds reach subscribers, always on the observer context:
//!
//! ```text
//!   worker thread                        observer context
//!   ─────────────                        ────────────────
//!   report(i, j) ──┐
//!   report(i, j) ──┼──▶ unbounded ──▶ dispatch ──▶ ExchangeEvent handlers
//!   return / Err ──┘     channel                └▶ CompletionEvent handlers
//! ```
//!
//! Exchanges arrive in the order the algorithm reported them and the
//! completion event is always last for its run.

mod registry;
mod types;

pub use registry::{DispatchReport, SubscriptionId, SubscriptionRegistry};
pub use types::{CompletionEvent, EventKind, ExchangeEvent, RunId, SortEvent};
