//! Dispatcher: the two-phase control loop.
//!
//! The optional preconnect phase probes every host at once, regardless of
//! the parallelism limit, and collects one terminal event per host. The run
//! phase keeps at most `par` sessions in flight, walking the host list in
//! order and refilling each vacated slot with the next unlaunched host.
//!
//! The dispatcher is the only reader of the event channel and the only
//! writer of the cursor and outstanding-worker count. Workers share nothing
//! with it except the channel and their host's error slot, which is read
//! only after that host's terminal event has been received. Worker tasks
//! are tracked in a `JoinSet` so one that dies early is noticed.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use super::printer::Printer;
use super::worker::{self, SessionMode};
use crate::models::event::{Event, EventKind};
use crate::models::host::Host;
use crate::transport::Transport;
use crate::{AppError, Result};

/// Capacity of the worker event channel.
///
/// A single slot keeps producers in near lock-step with the dispatcher;
/// a worker's send waits until the previous event has been taken.
pub const EVENT_CHANNEL_CAPACITY: usize = 1;

/// Run configuration and state for one dispatch.
pub struct Dispatcher<W: Write> {
    par: usize,
    command: Arc<str>,
    transport: Arc<dyn Transport>,
    preconnect: bool,
    ignore_failures: bool,
    hosts: Vec<Arc<Host>>,
    printer: Printer<W>,
}

impl<W: Write> std::fmt::Debug for Dispatcher<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("par", &self.par)
            .field("command", &self.command)
            .field("preconnect", &self.preconnect)
            .field("ignore_failures", &self.ignore_failures)
            .field("hosts", &self.hosts.len())
            .finish_non_exhaustive()
    }
}

impl<W: Write> Dispatcher<W> {
    /// Create a dispatcher with parallelism 1 and both flags unset.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        hosts: Vec<Host>,
        command: impl Into<String>,
        printer: Printer<W>,
    ) -> Self {
        Self {
            par: 1,
            command: Arc::from(command.into()),
            transport,
            preconnect: false,
            ignore_failures: false,
            hosts: hosts.into_iter().map(Arc::new).collect(),
            printer,
        }
    }

    /// Set the parallelism limit.
    #[must_use]
    pub fn with_par(mut self, par: usize) -> Self {
        self.par = par;
        self
    }

    /// Enable or disable the preconnect phase.
    #[must_use]
    pub fn with_preconnect(mut self, preconnect: bool) -> Self {
        self.preconnect = preconnect;
        self
    }

    /// Continue after preconnect failures instead of aborting.
    #[must_use]
    pub fn with_ignore_failures(mut self, ignore_failures: bool) -> Self {
        self.ignore_failures = ignore_failures;
        self
    }

    /// Host list in launch order.
    #[must_use]
    pub fn hosts(&self) -> &[Arc<Host>] {
        &self.hosts
    }

    /// The printer events are routed to.
    #[must_use]
    pub fn printer(&self) -> &Printer<W> {
        &self.printer
    }

    /// Consume the dispatcher, returning its printer.
    #[must_use]
    pub fn into_printer(self) -> Printer<W> {
        self.printer
    }

    /// Check the run configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` listing every violated condition.
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();
        if self.par < 1 {
            violations.push("parallelism should be > 0".to_owned());
        }
        if self.command.is_empty() {
            violations.push("no command is specified".to_owned());
        }
        if self.hosts.is_empty() {
            violations.push("host list is empty".to_owned());
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(violations))
        }
    }

    /// Validate, then run the preconnect phase (if enabled) and the run phase.
    ///
    /// Individual host failures during the run phase are printed, not
    /// returned.
    ///
    /// # Errors
    ///
    /// - `AppError::Validation` if the configuration is invalid.
    /// - `AppError::PreconnectFailed` if any probe failed and failures are
    ///   not ignored; no command is run on any host.
    /// - `AppError::Transport` if a worker task ends, or the event channel
    ///   closes, while terminal events are still outstanding.
    pub async fn run(&mut self) -> Result<()> {
        self.validate()?;
        info!(
            hosts = self.hosts.len(),
            par = self.par,
            preconnect = self.preconnect,
            "dispatch starting"
        );

        if self.preconnect {
            let failures = self.preconnect_phase().await?;
            if failures > 0 {
                if !self.ignore_failures {
                    return Err(AppError::PreconnectFailed(failures));
                }
                for host in self.hosts.iter().filter(|host| host.has_error()) {
                    warn!(
                        host = host.address(),
                        error = host.error().unwrap_or_default(),
                        "ignoring preconnect failure"
                    );
                }
            }
        }

        self.run_phase().await
    }

    /// Probe every host at once; returns how many failed.
    async fn preconnect_phase(&mut self) -> Result<usize> {
        let expected = self.hosts.len();
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut workers = JoinSet::new();
        for host in &self.hosts {
            self.launch(&mut workers, host, &SessionMode::Probe, &tx);
        }
        // Only workers hold senders now; if they all vanish early the
        // channel closes instead of hanging.
        drop(tx);

        let mut terminated = 0;
        let mut failures = 0;
        while terminated < expected {
            let event = tokio::select! {
                event = rx.recv() => event,
                Some(joined) = workers.join_next() => {
                    if let Err(err) = joined {
                        return Err(lost_worker(
                            &err,
                            &format!("{terminated} of {expected} preconnect results"),
                        ));
                    }
                    continue;
                }
            };
            let Some(event) = event else {
                return Err(AppError::Transport(format!(
                    "event channel closed after {terminated} of {expected} preconnect results"
                )));
            };
            self.printer.print(&event);
            if !event.is_terminal() {
                continue;
            }
            if event.kind == EventKind::Error {
                failures += 1;
            }
            terminated += 1;
        }

        info!(reachable = expected - failures, failures, "preconnect finished");
        Ok(failures)
    }

    /// Keep up to `par` sessions running until every host has been launched
    /// and every launched session has terminated.
    async fn run_phase(&mut self) -> Result<()> {
        let total = self.hosts.len();
        let mode = SessionMode::Run(Arc::clone(&self.command));
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut workers = JoinSet::new();

        let mut cursor = 0;
        let mut running = 0;
        while cursor < total && running < self.par {
            let host = &self.hosts[cursor];
            cursor += 1;
            if host.has_error() {
                debug!(host = host.address(), "skipping host that failed preconnect");
                continue;
            }
            self.launch(&mut workers, host, &mode, &tx);
            running += 1;
        }

        // The dispatcher keeps a sender only while refills remain.
        let mut refill_tx = (cursor < total).then_some(tx);
        let mut failed = 0;

        while running > 0 {
            let event = tokio::select! {
                event = rx.recv() => event,
                Some(joined) = workers.join_next() => {
                    if let Err(err) = joined {
                        return Err(lost_worker(
                            &err,
                            &format!("{running} sessions outstanding"),
                        ));
                    }
                    continue;
                }
            };
            let Some(event) = event else {
                return Err(AppError::Transport(format!(
                    "event channel closed with {running} sessions outstanding"
                )));
            };
            self.printer.print(&event);
            if !event.is_terminal() {
                continue;
            }
            if event.kind == EventKind::Error {
                failed += 1;
            }
            running -= 1;

            // Refill takes the next host by position; its error slot is
            // deliberately not consulted here, unlike the initial fill.
            if let Some(tx) = refill_tx.take() {
                let host = &self.hosts[cursor];
                debug!(host = host.address(), cursor, "refilling vacated slot");
                self.launch(&mut workers, host, &mode, &tx);
                cursor += 1;
                running += 1;
                if cursor < total {
                    refill_tx = Some(tx);
                }
            }
        }

        info!(hosts = total, failed, "run finished");
        Ok(())
    }

    fn launch(
        &self,
        workers: &mut JoinSet<()>,
        host: &Arc<Host>,
        mode: &SessionMode,
        tx: &mpsc::Sender<Event>,
    ) {
        debug!(host = host.address(), mode = mode.name(), "launching session");
        workers.spawn(worker::run_session(
            Arc::clone(&self.transport),
            Arc::clone(host),
            mode.clone(),
            tx.clone(),
        ));
    }
}

/// A worker task ended without delivering its terminal event.
fn lost_worker(err: &JoinError, progress: &str) -> AppError {
    AppError::Transport(format!("session worker lost with {progress}: {err}"))
}
