//! Host descriptor: one remote target and its per-host settings.

use std::sync::OnceLock;
use std::time::Duration;

/// Default ssh port used when a host string carries no `:port` suffix.
pub const DEFAULT_PORT: u16 = 22;

/// A single remote target.
///
/// Every field is fixed at construction except the error slot, which is
/// written at most once by the session worker assigned to this host. The
/// dispatcher and printer read it only after receiving that worker's
/// terminal event.
#[derive(Debug)]
pub struct Host {
    /// Network address (hostname or IP) handed to the transport.
    address: String,
    /// Destination port.
    port: u16,
    /// Display label, padded to the widest label in the host list.
    label: String,
    /// Upper bound on establishing the connection; zero means unbounded.
    connect_timeout: Duration,
    /// Upper bound on running the command; zero means unbounded.
    run_timeout: Duration,
    /// Whether output for this host is rendered with ANSI colour codes.
    use_color: bool,
    /// Error recorded by this host's worker, if any.
    error: OnceLock<String>,
}

impl Host {
    /// Construct a host with no timeouts, no colour, and an unset error slot.
    ///
    /// An empty `label` falls back to the address.
    #[must_use]
    pub fn new(address: impl Into<String>, port: u16, label: impl Into<String>) -> Self {
        let address = address.into();
        let mut label = label.into();
        if label.is_empty() {
            label.clone_from(&address);
        }
        Self {
            address,
            port,
            label,
            connect_timeout: Duration::ZERO,
            run_timeout: Duration::ZERO,
            use_color: false,
            error: OnceLock::new(),
        }
    }

    /// Set the connect and run timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout: Duration, run_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.run_timeout = run_timeout;
        self
    }

    /// Enable or disable colour rendering for this host.
    #[must_use]
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    /// Right-pad the label with spaces to `width` characters.
    #[must_use]
    pub fn with_label_width(mut self, width: usize) -> Self {
        let current = self.label.chars().count();
        if current < width {
            self.label.push_str(&" ".repeat(width - current));
        }
        self
    }

    /// Network address of the host.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Destination port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Padded display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Connect timeout; zero means unbounded.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Run timeout; zero means unbounded.
    #[must_use]
    pub fn run_timeout(&self) -> Duration {
        self.run_timeout
    }

    /// Whether output is coloured.
    #[must_use]
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Record the error that ended this host's session.
    ///
    /// Returns `false` if an error was already recorded; the first write
    /// wins and later ones are discarded.
    #[must_use = "false means an earlier error was kept"]
    pub fn record_error(&self, message: impl Into<String>) -> bool {
        self.error.set(message.into()).is_ok()
    }

    /// The recorded error text, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.get().map(String::as_str)
    }

    /// Whether an error has been recorded.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.get().is_some()
    }
}
