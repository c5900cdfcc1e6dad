//! TaskCoordinator - runs one sort at a time on a worker thread
//!
//! The coordinator lives on the observer context. `start` moves the array
//! into a freshly spawned worker thread; the worker sends exchange reports
//! and a final `Finished` message (carrying the array back) over an
//! unbounded channel, so it never waits on the observer. The observer
//! drains that channel with [`TaskCoordinator::dispatch_pending`],
//! [`TaskCoordinator::next_event`] or [`TaskCoordinator::run_until_idle`],
//! which is where subscribers get called.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Instant;

use eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

use super::cancel::CancelFlag;
use super::config::CoordinatorConfig;
use super::error::CoordinatorError;
use super::messages::{RunResult, WorkerMessage};
use crate::algorithm::{SortAlgorithm, SortOutcome, SortView};
use crate::events::{
    CompletionEvent, DispatchReport, EventKind, ExchangeEvent, RunId, SortEvent, SubscriptionId, SubscriptionRegistry,
};
use crate::progress::ProgressTransport;

/// Lifecycle state of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinatorState {
    Idle,
    Running,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Bookkeeping for the run in flight
struct ActiveRun {
    run_id: RunId,
    cancel: CancelFlag,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
    worker: Option<thread::JoinHandle<()>>,
    started: Instant,
}

/// Coordinates a background sort and republishes its progress
pub struct TaskCoordinator {
    config: CoordinatorConfig,
    array: Option<Vec<i32>>,
    algorithm: Option<Arc<dyn SortAlgorithm>>,
    registry: SubscriptionRegistry,
    active: Option<ActiveRun>,
}

impl TaskCoordinator {
    /// Create an idle coordinator with nothing configured
    pub fn new(config: CoordinatorConfig) -> Self {
        debug!(?config, "TaskCoordinator::new: called");
        Self {
            config,
            array: None,
            algorithm: None,
            registry: SubscriptionRegistry::new(),
            active: None,
        }
    }

    /// Create a coordinator for an algorithm; the array is supplied later
    pub fn with_algorithm(config: CoordinatorConfig, algorithm: Arc<dyn SortAlgorithm>) -> Self {
        let mut coordinator = Self::new(config);
        coordinator.algorithm = Some(algorithm);
        coordinator
    }

    /// Create a coordinator ready to start
    pub fn with_task(config: CoordinatorConfig, array: Vec<i32>, algorithm: Arc<dyn SortAlgorithm>) -> Self {
        let mut coordinator = Self::with_algorithm(config, algorithm);
        coordinator.array = Some(array);
        coordinator
    }

    /// Replace both the array and the algorithm for the next run
    pub fn configure(&mut self, array: Vec<i32>, algorithm: Arc<dyn SortAlgorithm>) -> Result<(), CoordinatorError> {
        debug!(len = array.len(), algorithm = algorithm.name(), "TaskCoordinator::configure: called");
        self.ensure_idle("configure")?;
        self.array = Some(array);
        self.algorithm = Some(algorithm);
        Ok(())
    }

    /// Replace the array for the next run
    pub fn set_array(&mut self, array: Vec<i32>) -> Result<(), CoordinatorError> {
        debug!(len = array.len(), "TaskCoordinator::set_array: called");
        self.ensure_idle("set the array")?;
        self.array = Some(array);
        Ok(())
    }

    /// Replace the algorithm for the next run
    pub fn set_algorithm(&mut self, algorithm: Arc<dyn SortAlgorithm>) -> Result<(), CoordinatorError> {
        debug!(algorithm = algorithm.name(), "TaskCoordinator::set_algorithm: called");
        self.ensure_idle("set the algorithm")?;
        self.algorithm = Some(algorithm);
        Ok(())
    }

    /// Launch the configured algorithm on a new worker thread
    ///
    /// Fails without spawning anything if a run is already in flight or the
    /// array or algorithm is missing.
    pub fn start(&mut self) -> Result<RunId, CoordinatorError> {
        debug!("TaskCoordinator::start: called");
        self.ensure_idle("start")?;

        let len = self.array.as_ref().map(Vec::len).ok_or(CoordinatorError::MissingArray)?;
        let algorithm = self.algorithm.clone().ok_or(CoordinatorError::MissingAlgorithm)?;

        let transport = self.config.progress_transport;
        if let Some(limit) = transport.max_len()
            && len > limit
        {
            debug!(len, limit, "TaskCoordinator::start: array too long for transport");
            return Err(CoordinatorError::ArrayTooLong { len, limit });
        }

        let run_id = RunId::new();
        let cancel = CancelFlag::new();
        let (tx, rx) = mpsc::unbounded_channel();
        // The array is handed over only once the thread exists, so a failed
        // spawn leaves it with the coordinator.
        let (array_tx, array_rx) = std_mpsc::sync_channel::<Vec<i32>>(1);

        let worker_cancel = cancel.clone();
        let worker_algorithm = algorithm.clone();
        let worker = thread::Builder::new()
            .name(self.config.worker_name.clone())
            .spawn(move || run_worker(run_id, array_rx, worker_algorithm, worker_cancel, tx, transport))
            .map_err(CoordinatorError::Spawn)?;

        if let Some(array) = self.array.take() {
            // The worker is blocked on this receiver; it cannot be gone yet
            let _ = array_tx.send(array);
        }

        info!(%run_id, algorithm = algorithm.name(), len, %transport, "Sort started");
        self.active = Some(ActiveRun {
            run_id,
            cancel,
            rx,
            worker: Some(worker),
            started: Instant::now(),
        });
        Ok(run_id)
    }

    /// Ask the running algorithm to stop
    ///
    /// Returns immediately. Does nothing when idle; repeated calls have the
    /// same effect as one.
    pub fn request_cancel(&self) {
        debug!("TaskCoordinator::request_cancel: called");
        match &self.active {
            Some(run) => {
                if run.cancel.cancel() {
                    info!(run_id = %run.run_id, "Cancellation requested");
                }
            }
            None => debug!("TaskCoordinator::request_cancel: idle, nothing to cancel"),
        }
    }

    /// Cancellation flag of the current run, for use from other threads
    pub fn cancel_flag(&self) -> Option<CancelFlag> {
        self.active.as_ref().map(|run| run.cancel.clone())
    }

    /// Dispatch every message already queued by the worker
    ///
    /// Never blocks. Returns the number of events delivered.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut dispatched = 0;
        while let Some(run) = self.active.as_mut() {
            let event = match run.rx.try_recv() {
                Ok(message) => self.handle(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.worker_lost(),
            };
            if event.is_some() {
                dispatched += 1;
            }
        }
        if dispatched > 0 {
            debug!(dispatched, "TaskCoordinator::dispatch_pending: dispatched events");
        }
        dispatched
    }

    /// Wait for the next event, dispatch it to subscribers and return it
    ///
    /// Returns None when idle.
    pub async fn next_event(&mut self) -> Option<SortEvent> {
        let run = self.active.as_mut()?;
        let message = run.rx.recv().await;
        match message {
            Some(message) => self.handle(message),
            None => self.worker_lost(),
        }
    }

    /// Dispatch events until the current run completes
    ///
    /// Returns the completion event, or None if nothing was running.
    pub async fn run_until_idle(&mut self) -> Option<CompletionEvent> {
        debug!("TaskCoordinator::run_until_idle: called");
        while let Some(event) = self.next_event().await {
            if let SortEvent::Completed(completion) = event {
                return Some(completion);
            }
        }
        None
    }

    /// Register a handler for exchange events
    pub fn subscribe_exchange<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&ExchangeEvent) -> Result<()> + 'static,
    {
        self.registry.subscribe_exchange(handler)
    }

    /// Register a handler for completion events
    pub fn subscribe_completion<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&CompletionEvent) -> Result<()> + 'static,
    {
        self.registry.subscribe_completion(handler)
    }

    /// Remove a previously registered handler
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.registry.handler_count(kind)
    }

    pub fn state(&self) -> CoordinatorState {
        if self.active.is_some() {
            CoordinatorState::Running
        } else {
            CoordinatorState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the run in flight
    pub fn run_id(&self) -> Option<RunId> {
        self.active.as_ref().map(|run| run.run_id)
    }

    /// The configured array; None while a run owns it
    pub fn array(&self) -> Option<&[i32]> {
        self.array.as_deref()
    }

    /// Remove the configured array, e.g. to keep the sorted result
    pub fn take_array(&mut self) -> Option<Vec<i32>> {
        self.array.take()
    }

    pub fn algorithm_name(&self) -> Option<&str> {
        self.algorithm.as_deref().map(|algorithm| algorithm.name())
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn ensure_idle(&self, operation: &'static str) -> Result<(), CoordinatorError> {
        match &self.active {
            Some(run) => {
                warn!(run_id = %run.run_id, operation, "Rejected while running");
                Err(CoordinatorError::AlreadyRunning { operation })
            }
            None => Ok(()),
        }
    }

    fn handle(&mut self, message: WorkerMessage) -> Option<SortEvent> {
        match message {
            WorkerMessage::Exchange {
                progress,
                first_value,
                second_value,
            } => {
                let (first_index, second_index) = progress.indices();
                let event = ExchangeEvent {
                    first_value,
                    second_value,
                    first_index,
                    second_index,
                };
                self.publish_exchange(&event);
                Some(SortEvent::Exchange(event))
            }
            WorkerMessage::Finished {
                array,
                result,
                exchanges,
            } => {
                self.array = Some(array);
                let run = self.active.take()?;
                Some(SortEvent::Completed(self.complete(run, result, exchanges)))
            }
        }
    }

    /// The channel closed without a `Finished` message
    fn worker_lost(&mut self) -> Option<SortEvent> {
        let run = self.active.take()?;
        warn!(run_id = %run.run_id, "Worker exited without reporting completion");
        let result = RunResult::Faulted("worker exited without reporting completion".to_string());
        Some(SortEvent::Completed(self.complete(run, result, 0)))
    }

    /// Close out the active run: back to Idle, then notify subscribers
    fn complete(&mut self, mut run: ActiveRun, result: RunResult, exchanges: usize) -> CompletionEvent {
        if let Some(worker) = run.worker.take()
            && worker.join().is_err()
        {
            warn!(run_id = %run.run_id, "Worker thread panicked after reporting");
        }

        let canceled = run.cancel.is_canceled() && result == RunResult::Returned(SortOutcome::Canceled);
        let fault = match result {
            RunResult::Faulted(message) => Some(message),
            RunResult::Returned(_) => None,
        };
        let event = CompletionEvent {
            run_id: run.run_id,
            canceled,
            fault,
            exchanges,
            elapsed_ms: run.started.elapsed().as_millis() as u64,
        };

        match &event.fault {
            Some(fault) => warn!(run_id = %event.run_id, %fault, exchanges, "Sort faulted"),
            None => info!(
                run_id = %event.run_id,
                canceled,
                exchanges,
                elapsed_ms = event.elapsed_ms,
                "Sort finished"
            ),
        }

        let report = self.registry.publish_completion(&event);
        log_failures(EventKind::Completion, report);
        event
    }

    fn publish_exchange(&mut self, event: &ExchangeEvent) {
        let report = self.registry.publish_exchange(event);
        log_failures(EventKind::Exchange, report);
    }
}

impl Drop for TaskCoordinator {
    fn drop(&mut self) {
        if let Some(run) = &self.active {
            warn!(run_id = %run.run_id, "Coordinator dropped while running, canceling worker");
            run.cancel.cancel();
        }
    }
}

impl fmt::Debug for TaskCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCoordinator")
            .field("state", &self.state())
            .field("run_id", &self.run_id())
            .field("algorithm", &self.algorithm_name())
            .field("array_len", &self.array.as_ref().map(Vec::len))
            .finish()
    }
}

fn log_failures(kind: EventKind, report: DispatchReport) {
    if report.failed > 0 {
        debug!(%kind, failed = report.failed, delivered = report.delivered, "handlers failed during dispatch");
    }
}

/// Worker thread body: run the algorithm, then always send `Finished`
///
/// Panics are caught here, but the process panic hook still sees them first.
fn run_worker(
    run_id: RunId,
    array_rx: std_mpsc::Receiver<Vec<i32>>,
    algorithm: Arc<dyn SortAlgorithm>,
    cancel: CancelFlag,
    tx: mpsc::UnboundedSender<WorkerMessage>,
    transport: ProgressTransport,
) {
    let Ok(mut array) = array_rx.recv() else {
        debug!(%run_id, "run_worker: no array handed over, exiting");
        return;
    };
    debug!(%run_id, len = array.len(), "run_worker: started");

    let (result, exchanges) = {
        let mut view = SortView::channel(&mut array, cancel, tx.clone(), transport);
        let result = match panic::catch_unwind(AssertUnwindSafe(|| algorithm.sort(&mut view))) {
            Ok(Ok(outcome)) => RunResult::Returned(outcome),
            Ok(Err(err)) => RunResult::Faulted(format!("{err:#}")),
            Err(payload) => RunResult::Faulted(panic_message(payload.as_ref())),
        };
        (result, view.exchanges())
    };

    debug!(%run_id, ?result, exchanges, "run_worker: algorithm returned");
    let _ = tx.send(WorkerMessage::Finished {
        array,
        result,
        exchanges,
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("algorithm panicked: {detail}")
}
