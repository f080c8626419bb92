//! Remote-shell transport over the system OpenSSH client.
//!
//! Each connect probe and each command run is a separate `ssh` child
//! process with `kill_on_drop(true)`, so a worker that abandons the future
//! on timeout also reaps the process. Host keys are not verified and the
//! client never prompts (`BatchMode=yes`).

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::process::Command;
use tokio_util::codec::FramedRead;
use tracing::{debug, info_span, Instrument};

use super::codec::{LineCodec, RemoteLine};
use super::{BoxFuture, Connection, SessionSink, Transport};
use crate::models::host::Host;
use crate::{AppError, Result};

/// Exit status OpenSSH uses for its own (non-remote) failures.
pub const SSH_FAILURE_STATUS: i32 = 255;

/// Remote command run by the connect probe.
const PROBE_COMMAND: &str = "exit 0";

/// Options always passed to the client.
const FIXED_OPTIONS: &[&str] = &[
    "BatchMode=yes",
    "StrictHostKeyChecking=no",
    "UserKnownHostsFile=/dev/null",
    "LogLevel=ERROR",
];

/// Client configuration shared by every session of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Remote login name; empty leaves the choice to the ssh client.
    pub user: String,
    /// Private key passed with `-i`.
    pub identity_file: Option<PathBuf>,
    /// Client binary to execute.
    pub ssh_binary: String,
    /// Extra `-o` options, e.g. `ControlMaster=auto`.
    pub ssh_options: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            identity_file: None,
            ssh_binary: "ssh".into(),
            ssh_options: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Client arguments for `host`, up to and including the destination.
    #[must_use]
    pub fn args_for(&self, host: &Host) -> Vec<String> {
        let mut args = vec!["-T".to_owned(), "-p".to_owned(), host.port().to_string()];
        if !self.user.is_empty() {
            args.push("-l".into());
            args.push(self.user.clone());
        }
        if let Some(ref key) = self.identity_file {
            args.push("-i".into());
            args.push(key.to_string_lossy().into_owned());
        }
        for option in FIXED_OPTIONS {
            args.push("-o".into());
            args.push((*option).to_owned());
        }
        if host.connect_timeout() > Duration::ZERO {
            let secs = host.connect_timeout().as_secs().max(1);
            args.push("-o".into());
            args.push(format!("ConnectTimeout={secs}"));
        }
        for option in &self.ssh_options {
            args.push("-o".into());
            args.push(option.clone());
        }
        args.push("--".into());
        args.push(host.address().to_owned());
        args
    }
}

/// [`Transport`] backed by the system `ssh` binary.
#[derive(Debug, Clone)]
pub struct SshTransport {
    config: ClientConfig,
}

impl SshTransport {
    /// Create a transport using `config` for every host.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// The client configuration in use.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn probe(&self, host: &Host) -> Result<Box<dyn Connection>> {
        let args = self.config.args_for(host);
        let mut cmd = Command::new(&self.config.ssh_binary);
        cmd.args(&args)
            .arg(PROBE_COMMAND)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = cmd.output().await.map_err(|err| {
            AppError::Connect(format!("failed to spawn {}: {err}", self.config.ssh_binary))
        })?;

        if output.status.success() {
            debug!("connect probe succeeded");
            Ok(Box::new(SshConnection {
                ssh_binary: self.config.ssh_binary.clone(),
                args,
            }))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(AppError::Connect(describe_failure(
                last_line(&stderr),
                output.status,
            )))
        }
    }
}

impl Transport for SshTransport {
    fn connect<'a>(&'a self, host: &'a Host) -> BoxFuture<'a, Result<Box<dyn Connection>>> {
        let span = info_span!("ssh_connect", host = host.address(), port = host.port());
        Box::pin(self.probe(host).instrument(span))
    }
}

/// A host that answered the connect probe.
#[derive(Debug)]
struct SshConnection {
    ssh_binary: String,
    args: Vec<String>,
}

impl SshConnection {
    async fn run(self, command: &str, sink: &SessionSink) -> Result<Option<i32>> {
        let mut cmd = Command::new(&self.ssh_binary);
        cmd.args(&self.args)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|err| {
            AppError::Session(format!("failed to spawn {}: {err}", self.ssh_binary))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Session("failed to capture ssh stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Session("failed to capture ssh stderr".into()))?;

        let mut out = FramedRead::new(stdout, LineCodec::new());
        let mut err = FramedRead::new(stderr, LineCodec::new());
        let mut out_open = true;
        let mut err_open = true;
        let mut last_stderr: Option<String> = None;

        while out_open || err_open {
            let delivered = tokio::select! {
                item = out.next(), if out_open => match item {
                    Some(Ok(RemoteLine::Text(line))) => sink.stdout(line).await,
                    Some(Ok(RemoteLine::TooLong)) => sink.verbose("stdout line too long, skipped").await,
                    Some(Err(e)) => {
                        out_open = false;
                        sink.verbose(format!("stdout read failed: {e}")).await
                    }
                    None => {
                        out_open = false;
                        true
                    }
                },
                item = err.next(), if err_open => match item {
                    Some(Ok(RemoteLine::Text(line))) => {
                        if !line.trim().is_empty() {
                            last_stderr = Some(line.clone());
                        }
                        sink.stderr(line).await
                    }
                    Some(Ok(RemoteLine::TooLong)) => sink.verbose("stderr line too long, skipped").await,
                    Some(Err(e)) => {
                        err_open = false;
                        sink.verbose(format!("stderr read failed: {e}")).await
                    }
                    None => {
                        err_open = false;
                        true
                    }
                },
            };
            if !delivered {
                return Err(AppError::Session("event receiver closed".into()));
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|err| AppError::Session(format!("failed to wait for ssh: {err}")))?;

        if status.code() == Some(SSH_FAILURE_STATUS) {
            return Err(AppError::Session(describe_failure(
                last_stderr.as_deref(),
                status,
            )));
        }
        Ok(status.code())
    }
}

impl Connection for SshConnection {
    fn exec<'a>(
        self: Box<Self>,
        command: &'a str,
        sink: &'a SessionSink,
    ) -> BoxFuture<'a, Result<Option<i32>>> {
        Box::pin(self.run(command, sink))
    }
}

/// Last non-empty line of `text`.
fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|line| !line.is_empty())
}

fn describe_failure(stderr_line: Option<&str>, status: ExitStatus) -> String {
    match stderr_line {
        Some(line) => line.to_owned(),
        None => status.code().map_or_else(
            || "ssh terminated by signal".to_owned(),
            |code| format!("ssh exited with status {code}"),
        ),
    }
}
