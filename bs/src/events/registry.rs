//! Subscription registry - event kind to ordered handlers
//!
//! Handlers run on the observer context only, so they are plain `FnMut`
//! closures with no `Send` bound. A handler that returns an error or panics
//! is logged and skipped; delivery continues with the next handler.

use std::panic::{self, AssertUnwindSafe};

use eyre::Result;
use tracing::{debug, warn};

use super::types::{CompletionEvent, EventKind, ExchangeEvent};

/// Handle returned by `subscribe_*`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Outcome of delivering one event to every handler of its kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

type Handler<E> = Box<dyn FnMut(&E) -> Result<()>>;

struct Slot<E> {
    id: SubscriptionId,
    handler: Handler<E>,
}

/// Registered handlers for exchange and completion events
#[derive(Default)]
pub struct SubscriptionRegistry {
    next_id: u64,
    exchange: Vec<Slot<ExchangeEvent>>,
    completion: Vec<Slot<CompletionEvent>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for exchange events
    pub fn subscribe_exchange<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&ExchangeEvent) -> Result<()> + 'static,
    {
        let id = self.allocate_id();
        debug!(?id, "SubscriptionRegistry::subscribe_exchange: called");
        self.exchange.push(Slot {
            id,
            handler: Box::new(handler),
        });
        id
    }

    /// Register a handler for completion events
    pub fn subscribe_completion<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&CompletionEvent) -> Result<()> + 'static,
    {
        let id = self.allocate_id();
        debug!(?id, "SubscriptionRegistry::subscribe_completion: called");
        self.completion.push(Slot {
            id,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove a handler. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        debug!(?id, "SubscriptionRegistry::unsubscribe: called");
        let before = self.exchange.len() + self.completion.len();
        self.exchange.retain(|slot| slot.id != id);
        self.completion.retain(|slot| slot.id != id);
        before != self.exchange.len() + self.completion.len()
    }

    /// Number of handlers registered for `kind`
    pub fn handler_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Exchange => self.exchange.len(),
            EventKind::Completion => self.completion.len(),
        }
    }

    /// Deliver an exchange event to its handlers in registration order
    pub fn publish_exchange(&mut self, event: &ExchangeEvent) -> DispatchReport {
        deliver(&mut self.exchange, EventKind::Exchange, event)
    }

    /// Deliver a completion event to its handlers in registration order
    pub fn publish_completion(&mut self, event: &CompletionEvent) -> DispatchReport {
        deliver(&mut self.completion, EventKind::Completion, event)
    }

    fn allocate_id(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }
}

fn deliver<E>(slots: &mut [Slot<E>], kind: EventKind, event: &E) -> DispatchReport {
    let mut report = DispatchReport::default();
    for slot in slots.iter_mut() {
        match panic::catch_unwind(AssertUnwindSafe(|| (slot.handler)(event))) {
            Ok(Ok(())) => report.delivered += 1,
            Ok(Err(err)) => {
                let error = format!("{err:#}");
                warn!(id = ?slot.id, %kind, %error, "handler failed");
                report.failed += 1;
            }
            Err(_) => {
                warn!(id = ?slot.id, %kind, "handler panicked");
                report.failed += 1;
            }
        }
    }
    report
}
