//! Periodic poll loop
//!
//! Each cycle opens a session, fetches the `VAR` list, closes the session
//! and applies the result to the registry. There is no backoff: a failed
//! cycle is logged and the next one runs after the regular interval.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::error::NutError;
use crate::metrics::{MetricSynchronizer, SeriesTransition, SyncReport};
use crate::parser::VariableMap;
use crate::protocol::NutSession;
use crate::tracing::span_names;

/// Default interval between cycles
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(10);

/// Shortest interval a scheduler will run with
pub const MIN_REFRESH: Duration = Duration::from_secs(1);

/// List kind fetched every cycle
const VARIABLE_LIST: &str = "VAR";

/// Result of one poll cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// Variables were fetched and applied
    Synchronized(SyncReport),
    /// The session could not be opened; registry untouched
    ConnectFailed(NutError),
    /// The list could not be read; registry untouched
    FetchFailed(NutError),
}

impl CycleOutcome {
    /// Whether the registry was updated this cycle
    #[must_use]
    pub const fn is_synchronized(&self) -> bool {
        matches!(self, Self::Synchronized(_))
    }

    /// The cycle-level error, if any
    #[must_use]
    pub const fn error(&self) -> Option<&NutError> {
        match self {
            Self::Synchronized(_) => None,
            Self::ConnectFailed(err) | Self::FetchFailed(err) => Some(err),
        }
    }
}

/// Handle to control a running poller
#[derive(Debug)]
pub struct PollerHandle {
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signals the poller to stop after the current cycle
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(()).await;
    }

    /// Stops the poller and waits for its task to finish
    pub async fn shutdown(self) {
        self.stop().await;
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Poller task ended abnormally");
        }
    }
}

/// Runs poll cycles for one device
#[derive(Debug)]
pub struct PollScheduler {
    session: NutSession,
    synchronizer: MetricSynchronizer,
    interval: Duration,
}

impl PollScheduler {
    /// Creates a scheduler polling every `interval`, raised to
    /// [`MIN_REFRESH`] if shorter
    #[must_use]
    pub fn new(session: NutSession, synchronizer: MetricSynchronizer, interval: Duration) -> Self {
        if interval < MIN_REFRESH {
            tracing::warn!(
                requested_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
                min_secs = MIN_REFRESH.as_secs(),
                "Poll interval too short, using minimum"
            );
        }
        Self {
            session,
            synchronizer,
            interval: interval.max(MIN_REFRESH),
        }
    }

    /// Interval between cycles
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Synchronizer fed by this scheduler
    #[must_use]
    pub const fn synchronizer(&self) -> &MetricSynchronizer {
        &self.synchronizer
    }

    /// Runs a single cycle
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if let Err(err) = self.session.open().await {
            tracing::error!(
                host = %self.session.host(),
                port = self.session.port(),
                device = %self.session.device(),
                error = %err,
                "Poll cycle skipped, could not open session"
            );
            return CycleOutcome::ConnectFailed(err);
        }

        let fetched = self.session.fetch_list(VARIABLE_LIST).await;
        self.session.close().await;

        let response = match fetched {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    host = %self.session.host(),
                    device = %self.session.device(),
                    error = %err,
                    "Poll cycle skipped, could not read variables"
                );
                return CycleOutcome::FetchFailed(err);
            }
        };

        let variables = VariableMap::from_blob(&response.blob);
        let mut report = self
            .synchronizer
            .apply_partial(&variables, &response.unreadable);
        report.record_errors(response.malformed);

        tracing::debug!(
            device = %self.session.device(),
            variables = variables.len(),
            registered = report.count(SeriesTransition::Registered),
            removed = report.count(SeriesTransition::Removed),
            errors = report.errors().len(),
            "Poll cycle complete"
        );
        CycleOutcome::Synchronized(report)
    }

    /// Runs cycles on a tokio task until the handle is stopped or dropped.
    ///
    /// The first cycle starts immediately. A cycle that overruns the
    /// interval delays the next one instead of bunching them up.
    #[must_use]
    pub fn spawn(mut self) -> PollerHandle {
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                host = %self.session.host(),
                port = self.session.port(),
                device = %self.session.device(),
                interval_secs = self.interval.as_secs(),
                "Poller started"
            );

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => break,
                    _ = ticker.tick() => {
                        let span = tracing::debug_span!(span_names::POLL_CYCLE);
                        let _ = self.run_cycle().instrument(span).await;
                    }
                }
            }

            self.session.close().await;
            tracing::info!(device = %self.session.device(), "Poller stopped");
        });

        PollerHandle { stop_tx, task }
    }
}
