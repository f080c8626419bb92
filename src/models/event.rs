//! Events streamed from session workers to the dispatcher.

use std::sync::Arc;

use super::host::Host;

/// What a session worker is reporting.
///
/// `Error` and `Close` are terminal: a worker emits any number of the
/// other kinds followed by exactly one terminal kind, then nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// One line of remote standard output.
    Stdout(String),
    /// One line of remote standard error.
    Stderr(String),
    /// Internal diagnostic, printed only in verbose mode.
    Verbose(String),
    /// The session failed; the text lives in the host's error slot.
    Error,
    /// The session ended cleanly.
    Close,
}

impl EventKind {
    /// Whether this kind ends the worker's lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error | Self::Close)
    }
}

/// An event tagged with the host it originated from.
#[derive(Debug, Clone)]
pub struct Event {
    /// Originating host.
    pub host: Arc<Host>,
    /// Event payload.
    pub kind: EventKind,
}

impl Event {
    /// Construct a new event for `host`.
    #[must_use]
    pub fn new(host: Arc<Host>, kind: EventKind) -> Self {
        Self { host, kind }
    }

    /// Whether this event ends the worker's lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}
