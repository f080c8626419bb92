//! Configuration: optional TOML defaults file and fully resolved settings.
//!
//! Precedence, lowest first: built-in defaults, the `--config` file,
//! command-line flags. Resolution itself lives in [`crate::cli`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::hosts::HostSource;
use crate::transport::ssh::ClientConfig;
use crate::{AppError, Result};

/// Default number of hosts run simultaneously.
pub const DEFAULT_PAR: usize = 512;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 60;

/// Default run timeout in seconds; zero means none.
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 0;

/// Default inventory program looked up on `PATH`.
pub const DEFAULT_INVENTORY_PROGRAM: &str = "ossh-inventory";

/// Defaults loaded from a TOML file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    /// Remote login name.
    pub user: Option<String>,
    /// Private key file.
    pub key: Option<PathBuf>,
    /// Default port for hosts without an explicit `:port`.
    pub port: Option<u16>,
    /// Parallelism limit.
    pub par: Option<usize>,
    /// Connect timeout in seconds.
    pub connect_timeout: Option<u64>,
    /// Run timeout in seconds; zero means none.
    pub timeout: Option<u64>,
    /// Probe all hosts before running the command.
    pub preconnect: Option<bool>,
    /// Proceed past preconnect failures.
    pub ignore_failures: Option<bool>,
    /// Print verbose diagnostics.
    pub verbose: Option<bool>,
    /// ssh client binary.
    pub ssh_binary: Option<String>,
    /// Extra `-o` options passed to every ssh invocation.
    pub ssh_options: Vec<String>,
    /// Inventory program used by `--inventory`.
    pub inventory_program: Option<String>,
}

impl FileConfig {
    /// Load defaults from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or is not
    /// valid TOML for this schema.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            AppError::Config(format!("failed to read config {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse defaults from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

/// Everything needed to build and run a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Parallelism limit for the run phase.
    pub par: usize,
    /// Probe all hosts before running the command.
    pub preconnect: bool,
    /// Proceed past preconnect failures.
    pub ignore_failures: bool,
    /// Print verbose diagnostics.
    pub verbose: bool,
    /// ssh client configuration.
    pub client: ClientConfig,
    /// Where the host list comes from.
    pub hosts: HostSource,
    /// Inline command strings, in order.
    pub command_strings: Vec<String>,
    /// Files whose lines form the start of the command.
    pub command_files: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            par: DEFAULT_PAR,
            preconnect: false,
            ignore_failures: false,
            verbose: false,
            client: ClientConfig::default(),
            hosts: HostSource::default(),
            command_strings: Vec::new(),
            command_files: Vec::new(),
        }
    }
}
