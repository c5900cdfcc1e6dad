//! Algorithm contract for sorts driven by the coordinator
//!
//! An algorithm gets a [`SortView`] for the duration of a run. The view
//! derefs to the array, answers cancellation queries, and takes progress
//! reports. The contract:
//!
//! - sort in place
//! - poll [`SortView::is_cancellation_requested`] at least once per step and
//!   return [`SortOutcome::Canceled`] promptly when it is set
//! - call [`SortView::report`] after every real exchange, never otherwise
//!   (or use [`SortView::exchange`], which swaps and reports)
//! - return `Err` for a fault; the coordinator turns it into the completion
//!   event's `fault`

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::coordinator::CancelFlag;
use crate::coordinator::messages::WorkerMessage;
use crate::progress::{Progress, ProgressTransport};

/// How an algorithm returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOutcome {
    /// Ran to the end
    Completed,
    /// Stopped early because cancellation was requested
    Canceled,
}

/// A sorting routine injected into the coordinator
pub trait SortAlgorithm: Send + Sync {
    /// Short name used in logs and listings
    fn name(&self) -> &str;

    /// Sort `view` in place, honoring the contract in the module docs
    fn sort(&self, view: &mut SortView<'_>) -> Result<SortOutcome>;
}

/// Adapter turning a closure into a [`SortAlgorithm`]
pub struct FnAlgorithm<F> {
    name: String,
    f: F,
}

impl<F> SortAlgorithm for FnAlgorithm<F>
where
    F: Fn(&mut SortView<'_>) -> Result<SortOutcome> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn sort(&self, view: &mut SortView<'_>) -> Result<SortOutcome> {
        (self.f)(view)
    }
}

/// Wrap a closure as a shareable algorithm
pub fn algorithm_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn SortAlgorithm>
where
    F: Fn(&mut SortView<'_>) -> Result<SortOutcome> + Send + Sync + 'static,
{
    Arc::new(FnAlgorithm { name: name.into(), f })
}

enum Sink {
    Channel {
        tx: mpsc::UnboundedSender<WorkerMessage>,
        transport: ProgressTransport,
    },
    Recorder(Vec<(usize, usize)>),
}

/// The algorithm's window onto a run
pub struct SortView<'a> {
    data: &'a mut [i32],
    cancel: CancelFlag,
    sink: Sink,
    exchanges: usize,
}

impl<'a> SortView<'a> {
    pub(crate) fn channel(
        data: &'a mut [i32],
        cancel: CancelFlag,
        tx: mpsc::UnboundedSender<WorkerMessage>,
        transport: ProgressTransport,
    ) -> Self {
        Self {
            data,
            cancel,
            sink: Sink::Channel { tx, transport },
            exchanges: 0,
        }
    }

    /// A view that records reports locally instead of sending them anywhere
    ///
    /// Useful for checking an algorithm against the contract without a
    /// coordinator; see [`SortView::recorded`].
    pub fn recording(data: &'a mut [i32], cancel: CancelFlag) -> Self {
        Self {
            data,
            cancel,
            sink: Sink::Recorder(Vec::new()),
            exchanges: 0,
        }
    }

    /// Has the coordinator asked this run to stop?
    pub fn is_cancellation_requested(&self) -> bool {
        self.cancel.is_canceled()
    }

    /// Report that positions `first` and `second` were just exchanged
    ///
    /// The current (post-swap) values are captured here. Reports with equal
    /// or out-of-range indices are not exchanges and are dropped.
    pub fn report(&mut self, first: usize, second: usize) {
        let len = self.data.len();
        if first == second || first >= len || second >= len {
            warn!(first, second, len, "SortView::report: not a valid exchange, dropping");
            return;
        }

        let first_value = self.data[first];
        let second_value = self.data[second];
        match &mut self.sink {
            Sink::Channel { tx, transport } => {
                let progress = match Progress::new(*transport, first, second) {
                    Ok(progress) => progress,
                    Err(err) => {
                        warn!(%err, "SortView::report: cannot encode exchange, dropping");
                        return;
                    }
                };
                trace!(first, second, "SortView::report: sending exchange");
                // Fire-and-continue: a closed channel means nobody is observing anymore
                let _ = tx.send(WorkerMessage::Exchange {
                    progress,
                    first_value,
                    second_value,
                });
            }
            Sink::Recorder(reports) => reports.push((first, second)),
        }
        self.exchanges += 1;
    }

    /// Swap two positions and report the exchange
    ///
    /// Swapping a position with itself is a no-op and is not reported.
    pub fn exchange(&mut self, first: usize, second: usize) {
        if first == second {
            return;
        }
        self.data.swap(first, second);
        self.report(first, second);
    }

    /// Exchanges reported so far
    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    /// Index pairs captured by a recording view, in report order
    pub fn recorded(&self) -> &[(usize, usize)] {
        match &self.sink {
            Sink::Recorder(reports) => reports.as_slice(),
            Sink::Channel { .. } => &[],
        }
    }
}

impl Deref for SortView<'_> {
    type Target = [i32];

    fn deref(&self) -> &[i32] {
        &*self.data
    }
}

impl DerefMut for SortView<'_> {
    fn deref_mut(&mut self) -> &mut [i32] {
        &mut *self.data
    }
}

impl fmt::Debug for SortView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortView")
            .field("len", &self.data.len())
            .field("exchanges", &self.exchanges)
            .field("canceled", &self.cancel.is_canceled())
            .finish()
    }
}
