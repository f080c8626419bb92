//! Host list construction.
//!
//! Hosts come from three places, in this order: the inventory program
//! (`--inventory` filters), host files, and inline host strings. Every
//! host string is split on whitespace and brace-expanded. Once the list is
//! complete, labels are padded to a common width so output lines align.

pub mod brace;

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_INVENTORY_PROGRAM, DEFAULT_RUN_TIMEOUT_SECS,
};
use crate::models::host::{Host, DEFAULT_PORT};
use crate::{AppError, Result};

/// Inputs for building the host list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSource {
    /// Inline host strings (`-H`).
    pub host_strings: Vec<String>,
    /// Files listing one host string per line (`-h`).
    pub host_files: Vec<PathBuf>,
    /// Filters handed to the inventory program (`-I`).
    pub inventory_filters: Vec<String>,
    /// Inventory program name or path.
    pub inventory_program: String,
    /// Port for hosts without an explicit `:port`.
    pub default_port: u16,
    /// Connect timeout applied to every host.
    pub connect_timeout: Duration,
    /// Run timeout applied to every host.
    pub run_timeout: Duration,
    /// Label hosts with their resolved IP instead of their name.
    pub show_ip: bool,
    /// Render output with ANSI colours.
    pub use_color: bool,
}

impl Default for HostSource {
    fn default() -> Self {
        Self {
            host_strings: Vec::new(),
            host_files: Vec::new(),
            inventory_filters: Vec::new(),
            inventory_program: DEFAULT_INVENTORY_PROGRAM.into(),
            default_port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            run_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            show_ip: false,
            use_color: false,
        }
    }
}

/// A parsed host before labels are padded.
#[derive(Debug)]
struct Entry {
    address: String,
    port: u16,
    label: String,
}

impl HostSource {
    /// Build the ordered host list.
    ///
    /// # Errors
    ///
    /// - `AppError::Inventory` if the inventory program fails.
    /// - `AppError::Io` if a host file cannot be read.
    /// - `AppError::Config` for a malformed port or, with `show_ip`, a name
    ///   that does not resolve.
    pub async fn load(&self) -> Result<Vec<Host>> {
        let mut entries = Vec::new();

        if !self.inventory_filters.is_empty() {
            for (label, address) in self.run_inventory().await? {
                entries.push(self.entry(&address, label).await?);
            }
        }

        let mut strings = Vec::new();
        for path in &self.host_files {
            strings.extend(read_host_file(path).await?);
        }
        strings.extend(self.host_strings.iter().cloned());

        for hs in &strings {
            for word in hs.split_whitespace() {
                for expanded in brace::expand(word) {
                    entries.push(self.entry(&expanded, String::new()).await?);
                }
            }
        }

        let width = entries
            .iter()
            .map(|entry| entry.label.chars().count())
            .max()
            .unwrap_or(0);

        info!(count = entries.len(), "host list built");
        Ok(entries
            .into_iter()
            .map(|entry| {
                Host::new(entry.address, entry.port, entry.label)
                    .with_timeouts(self.connect_timeout, self.run_timeout)
                    .with_label_width(width)
                    .with_color(self.use_color)
            })
            .collect())
    }

    async fn entry(&self, host_string: &str, label: String) -> Result<Entry> {
        let (address, port) = split_port(host_string, self.default_port)?;
        let label = match (label.is_empty(), self.show_ip) {
            (false, _) => label,
            (true, true) => resolve_ip(&address, port).await?.to_string(),
            (true, false) => address.clone(),
        };
        Ok(Entry {
            address,
            port,
            label,
        })
    }

    /// Run the inventory program; returns `(label, address)` pairs.
    async fn run_inventory(&self) -> Result<Vec<(String, String)>> {
        let mut cmd = Command::new(&self.inventory_program);
        cmd.args(&self.inventory_filters)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = cmd.output().await.map_err(|err| {
            AppError::Inventory(format!("failed to run {}: {err}", self.inventory_program))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or_default().trim().to_owned();
            return Err(AppError::Inventory(format!(
                "{} exited with {}: {detail}",
                self.inventory_program, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let pairs = parse_inventory(&stdout);
        debug!(count = pairs.len(), "inventory returned hosts");
        Ok(pairs)
    }
}

/// Parse inventory output: one `<label> <address>` pair per line.
///
/// Lines with fewer than two fields are skipped.
#[must_use]
pub fn parse_inventory(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let label = fields.next()?;
            let address = fields.next()?;
            Some((label.to_owned(), address.to_owned()))
        })
        .collect()
}

/// Split `address[:port]`, falling back to `default_port`.
///
/// `[v6addr]:port` is accepted; a bare address with several colons is
/// taken as an IPv6 literal without a port.
///
/// # Errors
///
/// Returns `AppError::Config` if the port is not a valid number.
pub fn split_port(host_string: &str, default_port: u16) -> Result<(String, u16)> {
    let parse = |port: &str| {
        port.parse::<u16>()
            .map_err(|err| AppError::Config(format!("invalid port in {host_string:?}: {err}")))
    };

    if let Some(rest) = host_string.strip_prefix('[') {
        if let Some((address, tail)) = rest.split_once(']') {
            let port = match tail.strip_prefix(':') {
                Some(port) => parse(port)?,
                None => default_port,
            };
            return Ok((address.to_owned(), port));
        }
    }

    match host_string.split_once(':') {
        Some((address, port)) if !port.contains(':') => Ok((address.to_owned(), parse(port)?)),
        _ => Ok((host_string.to_owned(), default_port)),
    }
}

/// Host strings from a file; blank lines and `#` comments are skipped.
async fn read_host_file(path: &Path) -> Result<Vec<String>> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
        AppError::Io(format!("cannot read host file {}: {err}", path.display()))
    })?;
    Ok(raw
        .lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .map(str::to_owned)
        .collect())
}

async fn resolve_ip(address: &str, port: u16) -> Result<IpAddr> {
    let mut addrs = tokio::net::lookup_host((address, port))
        .await
        .map_err(|err| AppError::Config(format!("cannot resolve {address}: {err}")))?;
    addrs
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| AppError::Config(format!("no address found for {address}")))
}
