//! Remote-shell transport abstraction.
//!
//! The [`Transport`] trait decouples the dispatcher and its session workers
//! from how a remote shell is actually reached. [`ssh::SshTransport`] drives
//! the system OpenSSH client; tests substitute scripted doubles.
//!
//! A transport never emits terminal events. It reports output through the
//! borrowed [`SessionSink`] and returns a `Result`; the session worker turns
//! that result into exactly one `Error` or `Close`.

pub mod codec;
pub mod ssh;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::models::event::{Event, EventKind};
use crate::models::host::Host;
use crate::Result;

/// Boxed, sendable future used at the transport seam.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Establishes connections to hosts.
///
/// Implementations hold the opaque client configuration (credentials,
/// client binary, options) and are shared by every worker of a run.
pub trait Transport: Send + Sync {
    /// Connect to `host`.
    ///
    /// The caller bounds the call by the host's connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Connect`](crate::AppError::Connect) when the host
    /// cannot be reached or authentication fails.
    fn connect<'a>(&'a self, host: &'a Host) -> BoxFuture<'a, Result<Box<dyn Connection>>>;
}

/// An established connection able to run one command.
pub trait Connection: Send {
    /// Run `command`, streaming each output line through `sink`.
    ///
    /// Returns the remote command's exit code, or `None` if it was ended by
    /// a signal. A non-zero exit code is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Session`](crate::AppError::Session) if the remote
    /// session itself fails to establish or execute.
    fn exec<'a>(
        self: Box<Self>,
        command: &'a str,
        sink: &'a SessionSink,
    ) -> BoxFuture<'a, Result<Option<i32>>>;
}

/// Per-host handle onto the shared event channel.
///
/// Only the session worker may send terminal events; transports get a
/// borrowed sink and can emit output and diagnostics only.
#[derive(Debug)]
pub struct SessionSink {
    host: Arc<Host>,
    tx: mpsc::Sender<Event>,
}

impl SessionSink {
    /// Bind a sink to `host`.
    #[must_use]
    pub fn new(host: Arc<Host>, tx: mpsc::Sender<Event>) -> Self {
        Self { host, tx }
    }

    /// Emit one line of remote standard output.
    ///
    /// Returns `false` if the dispatcher is gone.
    pub async fn stdout(&self, line: String) -> bool {
        self.send(EventKind::Stdout(line)).await
    }

    /// Emit one line of remote standard error.
    ///
    /// Returns `false` if the dispatcher is gone.
    pub async fn stderr(&self, line: String) -> bool {
        self.send(EventKind::Stderr(line)).await
    }

    /// Emit an internal diagnostic.
    ///
    /// Returns `false` if the dispatcher is gone.
    pub async fn verbose(&self, text: impl Into<String>) -> bool {
        self.send(EventKind::Verbose(text.into())).await
    }

    /// Emit the terminal event, consuming the sink so nothing follows it.
    pub(crate) async fn finish(self, kind: EventKind) -> bool {
        debug_assert!(kind.is_terminal());
        self.send(kind).await
    }

    async fn send(&self, kind: EventKind) -> bool {
        self.tx
            .send(Event::new(Arc::clone(&self.host), kind))
            .await
            .is_ok()
    }
}
