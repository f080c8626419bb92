//! Command-line surface.
//!
//! `-h` selects a host file, as in the classic tool, so clap's short help
//! flag is disabled and only `--help` is offered.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::{
    FileConfig, Settings, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_INVENTORY_PROGRAM, DEFAULT_PAR,
    DEFAULT_RUN_TIMEOUT_SECS,
};
use crate::hosts::HostSource;
use crate::models::host::DEFAULT_PORT;
use crate::transport::ssh::ClientConfig;

/// Format of the diagnostic log stream on stderr.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Run a command on many hosts over ssh.
#[derive(Debug, Parser)]
#[command(name = "ossh", version, disable_help_flag = true, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Username for connections [default: $LOGNAME].
    #[arg(short = 'u', long = "user", value_name = "USER")]
    pub user: Option<String>,

    /// Use this private key.
    #[arg(short = 'k', long = "key", value_name = "PRIVATE_KEY")]
    pub key: Option<PathBuf>,

    /// Add the given HOST_STRING to the list of hosts.
    #[arg(short = 'H', long = "host", value_name = "HOST_STRING")]
    pub host: Vec<String>,

    /// Read hosts from file.
    #[arg(short = 'h', long = "hosts", value_name = "HOST_FILE")]
    pub hosts: Vec<PathBuf>,

    /// Command to run.
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    pub command: Vec<String>,

    /// File with commands to run.
    #[arg(short = 'C', long = "command-file", value_name = "COMMAND_FILE")]
    pub command_file: Vec<PathBuf>,

    /// How many hosts to run simultaneously [default: 512].
    #[arg(short = 'p', long = "par", value_name = "PARALLELISM")]
    pub par: Option<usize>,

    /// Connect to all hosts before running command.
    #[arg(short = 'P', long = "preconnect")]
    pub preconnect: bool,

    /// Ignore connection failures in the preconnect mode.
    #[arg(short = 'i', long = "ignore-failures")]
    pub ignore_failures: bool,

    /// Verbose output.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Port to connect to [default: 22].
    #[arg(short = 'o', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Connect timeout in seconds [default: 60].
    #[arg(short = 'T', long = "connect-timeout", value_name = "TIMEOUT")]
    pub connect_timeout: Option<u64>,

    /// Run timeout in seconds, 0 for none [default: 0].
    #[arg(short = 't', long = "timeout", value_name = "TIMEOUT")]
    pub timeout: Option<u64>,

    /// In the output show ips instead of names.
    #[arg(short = 'n', long = "showip")]
    pub show_ip: bool,

    /// Use FILTER expression to select hosts from inventory.
    #[arg(short = 'I', long = "inventory", value_name = "FILTER")]
    pub inventory: Vec<String>,

    /// TOML file with default settings.
    #[arg(long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Show help.
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl Cli {
    /// Merge flags over file defaults and built-in defaults.
    ///
    /// `login` is the fallback user name (normally `$LOGNAME`). Colour is
    /// left disabled; the caller decides it from the terminal.
    #[must_use]
    pub fn into_settings(self, file: FileConfig, login: Option<String>) -> Settings {
        let client = ClientConfig {
            user: self.user.or(file.user).or(login).unwrap_or_default(),
            identity_file: self.key.or(file.key),
            ssh_binary: file.ssh_binary.unwrap_or_else(|| "ssh".into()),
            ssh_options: file.ssh_options,
        };

        let hosts = HostSource {
            host_strings: self.host,
            host_files: self.hosts,
            inventory_filters: self.inventory,
            inventory_program: file
                .inventory_program
                .unwrap_or_else(|| DEFAULT_INVENTORY_PROGRAM.into()),
            default_port: self.port.or(file.port).unwrap_or(DEFAULT_PORT),
            connect_timeout: Duration::from_secs(
                self.connect_timeout
                    .or(file.connect_timeout)
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            run_timeout: Duration::from_secs(
                self.timeout
                    .or(file.timeout)
                    .unwrap_or(DEFAULT_RUN_TIMEOUT_SECS),
            ),
            show_ip: self.show_ip,
            use_color: false,
        };

        Settings {
            par: self.par.or(file.par).unwrap_or(DEFAULT_PAR),
            preconnect: self.preconnect || file.preconnect.unwrap_or(false),
            ignore_failures: self.ignore_failures || file.ignore_failures.unwrap_or(false),
            verbose: self.verbose || file.verbose.unwrap_or(false),
            client,
            hosts,
            command_strings: self.command,
            command_files: self.command_file,
        }
    }
}
