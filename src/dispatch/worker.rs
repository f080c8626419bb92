//! Session worker: one unit of work bound to one host.
//!
//! A worker connects within the host's connect timeout and, in run mode,
//! executes the command within the run timeout. It streams output through
//! its [`SessionSink`] and always finishes with exactly one terminal event:
//! `Close` on a clean session end, `Error` otherwise. A non-zero remote exit
//! status is not an error; it is reported as a verbose diagnostic.
//!
//! The host's error slot is written before the `Error` event is sent, so
//! the receiver observes the write once it holds the event.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::error::Elapsed;
use tracing::{debug, info_span, Instrument};

use crate::models::event::{Event, EventKind};
use crate::models::host::Host;
use crate::transport::{SessionSink, Transport};
use crate::{AppError, Result};

/// What a worker does once connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// Connectivity check only.
    Probe,
    /// Connect, then run the command.
    Run(Arc<str>),
}

impl SessionMode {
    /// Short name used in log spans.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::Run(_) => "run",
        }
    }
}

/// Run one session for `host`, reporting into `tx`.
///
/// Never fails: every outcome is delivered as events. If the receiver is
/// gone the worker stops quietly.
pub async fn run_session(
    transport: Arc<dyn Transport>,
    host: Arc<Host>,
    mode: SessionMode,
    tx: mpsc::Sender<Event>,
) {
    let span = info_span!("session", host = host.address(), mode = mode.name());

    async move {
        let sink = SessionSink::new(Arc::clone(&host), tx);

        let terminal = match drive(transport.as_ref(), &host, &mode, &sink).await {
            Ok(()) => EventKind::Close,
            Err(err) => {
                debug!(%err, "session failed");
                if !host.record_error(err.to_string()) {
                    debug!(%err, "host already carries an error, keeping the first one");
                }
                EventKind::Error
            }
        };

        if !sink.finish(terminal).await {
            debug!("event receiver closed before terminal event");
        }
    }
    .instrument(span)
    .await;
}

async fn drive(
    transport: &dyn Transport,
    host: &Host,
    mode: &SessionMode,
    sink: &SessionSink,
) -> Result<()> {
    sink.verbose(format!("connecting to {}:{}", host.address(), host.port()))
        .await;

    let connection = bounded(host.connect_timeout(), transport.connect(host))
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "connect to {}:{} timed out after {}s",
                host.address(),
                host.port(),
                host.connect_timeout().as_secs()
            ))
        })??;

    let SessionMode::Run(command) = mode else {
        debug!("probe succeeded");
        return Ok(());
    };

    sink.verbose("connected, running command").await;

    let exit_code = bounded(host.run_timeout(), connection.exec(command, sink))
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "command timed out after {}s",
                host.run_timeout().as_secs()
            ))
        })??;

    match exit_code {
        Some(0) => {}
        Some(code) => {
            sink.verbose(format!("remote command exited with status {code}"))
                .await;
        }
        None => {
            sink.verbose("remote command terminated by signal").await;
        }
    }
    Ok(())
}

/// Apply `limit` to `fut`; a zero limit means no deadline.
async fn bounded<F>(limit: Duration, fut: F) -> std::result::Result<F::Output, Elapsed>
where
    F: Future,
{
    if limit.is_zero() {
        Ok(fut.await)
    } else {
        tokio::time::timeout(limit, fut).await
    }
}
