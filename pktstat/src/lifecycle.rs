//! # Lifecycle Controller
//!
//! Coordinates one capture session:
//!
//! ```text
//!             ┌────────── SIGINT / SIGTERM ──────────┐
//!             │            hard timeout              │
//!             ▼                                      │
//!        Shutdown token ◄── capture ended ────┐      │
//!             │                               │      │
//!   capture thread stops reading ──► sender dropped ─┘
//!             │
//!   aggregators drain the queue and exit
//!             │
//!   single final snapshot ──► Report
//! ```
//!
//! Every stop condition goes through [`Shutdown::trigger`]. Only the first
//! trigger records a reason; later ones are no-ops, so exactly one shutdown
//! sequence runs. Periodic ticks read the table without clearing it.

use std::fmt;
use std::future::pending;
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Notify;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};

use crate::aggregation::{
    event_channel, run_capture, spawn_aggregators, CaptureSummary, FlowTable, RunTotals,
    QUEUE_CAPACITY,
};
use crate::analysis::Report;
use crate::capture::FrameSource;
use crate::domain::{CaptureError, RunSettings};

/// Why the session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownReason {
    Interrupted = 1,
    Terminated = 2,
    Timeout = 3,
    CaptureEnded = 4,
}

impl ShutdownReason {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Interrupted),
            2 => Some(Self::Terminated),
            3 => Some(Self::Timeout),
            4 => Some(Self::CaptureEnded),
            _ => None,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interrupted => "interrupt signal",
            Self::Terminated => "termination signal",
            Self::Timeout => "capture timeout",
            Self::CaptureEnded => "end of capture",
        })
    }
}

#[derive(Debug, Default)]
struct ShutdownState {
    reason: AtomicU8,
    notify: Notify,
}

/// Cooperative cancellation token, cheap to clone.
///
/// Checked synchronously by the capture thread once per iteration and awaited
/// by the session task.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    state: Arc<ShutdownState>,
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns `true` only for the call that won.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let won = self
            .state
            .reason
            .compare_exchange(0, reason as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.state.notify.notify_waiters();
        }
        won
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.state.reason.load(Ordering::Acquire) != 0
    }

    /// The winning reason, once triggered
    #[must_use]
    pub fn reason(&self) -> Option<ShutdownReason> {
        ShutdownReason::from_u8(self.state.reason.load(Ordering::Acquire))
    }

    /// Resolve once the token has been triggered
    pub async fn triggered(&self) {
        let notified = self.state.notify.notified();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

/// Wait for SIGINT or SIGTERM.
///
/// If a handler cannot be installed the corresponding signal is never
/// reported (a warning is logged).
pub async fn wait_for_signal() -> ShutdownReason {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for SIGINT: {e}");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {e}");
                pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        () = interrupt => ShutdownReason::Interrupted,
        () = terminate => ShutdownReason::Terminated,
    }
}

/// Spawn a task that triggers `shutdown` on the first SIGINT/SIGTERM
pub fn spawn_signal_watcher(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let reason = wait_for_signal().await;
        if shutdown.trigger(reason) {
            info!("Received {reason}, shutting down");
        } else {
            debug!("Received {reason} while already shutting down");
        }
    })
}

/// Result of a finished session
#[derive(Debug)]
pub struct SessionOutcome {
    /// The single final report
    pub report: Report,
    pub capture: CaptureSummary,
    pub reason: ShutdownReason,
}

/// Run capture, aggregation and periodic reporting until shutdown, then
/// drain and produce the final report.
///
/// `on_tick` receives a snapshot every `settings.report_interval`, if set.
///
/// # Errors
/// Fails only if worker threads cannot be started or a worker panics. Read
/// errors end the capture and are reported in the outcome instead.
pub async fn run_session<S, F>(
    source: S,
    settings: &RunSettings,
    shutdown: Shutdown,
    mut on_tick: F,
) -> Result<SessionOutcome, CaptureError>
where
    S: FrameSource + Send + 'static,
    F: FnMut(&Report),
{
    let table = Arc::new(FlowTable::new());
    let totals = Arc::new(RunTotals::default());
    let (tx, rx) = event_channel(QUEUE_CAPACITY);

    let aggregators = spawn_aggregators(settings.consumers, &rx, &table)?;
    drop(rx);

    let start = Instant::now();
    let mut capture = {
        let totals = Arc::clone(&totals);
        let shutdown = shutdown.clone();
        tokio::task::spawn_blocking(move || {
            let mut source = source;
            // `tx` is dropped when this closure returns, closing the queue
            run_capture(&mut source, &tx, &totals, &shutdown)
        })
    };

    let deadline = async {
        match settings.timeout {
            Some(limit) => sleep(limit).await,
            None => pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut ticker = settings.report_interval.filter(|p| !p.is_zero()).map(|period| {
        let mut ticker = interval_at(start + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    let summary = loop {
        tokio::select! {
            result = &mut capture => {
                shutdown.trigger(ShutdownReason::CaptureEnded);
                break result.map_err(worker_failed)?;
            }
            () = shutdown.triggered() => {
                break (&mut capture).await.map_err(worker_failed)?;
            }
            () = &mut deadline => {
                shutdown.trigger(ShutdownReason::Timeout);
                break (&mut capture).await.map_err(worker_failed)?;
            }
            () = next_tick(&mut ticker) => {
                let report = Report::capture(&table, &totals, start.elapsed());
                debug!("Periodic report: {} flows", report.flows.len());
                on_tick(&report);
            }
        }
    };

    let reason = shutdown.reason().unwrap_or(ShutdownReason::CaptureEnded);
    info!("Capture stopped ({reason}), draining queue");

    let applied = tokio::task::spawn_blocking(move || {
        aggregators
            .into_iter()
            .map(|handle| handle.join().map_err(|_| io::Error::other("aggregator thread panicked")))
            .sum::<io::Result<u64>>()
    })
    .await
    .map_err(worker_failed)??;

    let report = Report::capture(&table, &totals, start.elapsed());
    debug!("Aggregators applied {applied} events into {} flows", report.flows.len());

    if let Some(drops) = summary.drops {
        info!("Kernel counters: {} received, {} dropped", drops.received, drops.dropped);
    }

    Ok(SessionOutcome { report, capture: summary, reason })
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending().await,
    }
}

fn worker_failed(err: tokio::task::JoinError) -> CaptureError {
    CaptureError::Io(io::Error::other(err))
}
