//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or settings failure.
    Config(String),
    /// Dispatcher run configuration failed validation; one entry per violation.
    Validation(Vec<String>),
    /// Preconnect pass finished with this many unreachable hosts.
    PreconnectFailed(usize),
    /// Event channel ended before all expected terminal events arrived.
    Transport(String),
    /// Connection to a host could not be established.
    Connect(String),
    /// Remote session failed to establish or execute.
    Session(String),
    /// Connect or run timeout exceeded.
    Timeout(String),
    /// Inventory program failed.
    Inventory(String),
    /// File-system or process I/O failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Validation(violations) => write!(f, "{}", violations.join("\n")),
            Self::PreconnectFailed(count) => {
                write!(f, "failed to connect to {count} hosts, exiting")
            }
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Connect(msg) => write!(f, "connect: {msg}"),
            Self::Session(msg) => write!(f, "session: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Inventory(msg) => write!(f, "inventory: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
