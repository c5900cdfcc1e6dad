//! Event payloads delivered to subscribers on the observer context

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a single sort run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a fresh, time-ordered run id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Two positions of the array were exchanged
///
/// Values are read after the swap, so `first_value` is what now sits at
/// `first_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeEvent {
    pub first_value: i32,
    pub second_value: i32,
    pub first_index: usize,
    pub second_index: usize,
}

/// A run has finished, one way or another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub run_id: RunId,
    /// Cancellation was requested and the algorithm stopped because of it
    pub canceled: bool,
    /// Set only when the algorithm failed instead of returning
    pub fault: Option<String>,
    /// Number of exchanges reported during the run
    pub exchanges: usize,
    pub elapsed_ms: u64,
}

impl CompletionEvent {
    /// Ran to the end without cancellation or fault
    pub fn is_success(&self) -> bool {
        !self.canceled && self.fault.is_none()
    }
}

/// Kinds of events a handler can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Exchange,
    Completion,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exchange => write!(f, "exchange"),
            Self::Completion => write!(f, "completion"),
        }
    }
}

/// Either event, as returned by the coordinator's dispatch helpers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SortEvent {
    Exchange(ExchangeEvent),
    Completed(CompletionEvent),
}

impl SortEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Exchange(_) => "Exchange",
            Self::Completed(_) => "Completed",
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Exchange(_) => EventKind::Exchange,
            Self::Completed(_) => EventKind::Completion,
        }
    }

    pub fn as_exchange(&self) -> Option<&ExchangeEvent> {
        match self {
            Self::Exchange(event) => Some(event),
            Self::Completed(_) => None,
        }
    }

    pub fn as_completion(&self) -> Option<&CompletionEvent> {
        match self {
            Self::Completed(event) => Some(event),
            Self::Exchange(_) => None,
        }
    }
}
