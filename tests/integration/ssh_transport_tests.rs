//! Integration tests for the OpenSSH-backed transport.
//!
//! A shell script stands in for the `ssh` binary. It records its arguments
//! and evaluates the final argument (the remote command) locally, which is
//! enough to exercise process handling, output streaming, and exit status
//! mapping without a network.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use one_ssh::dispatch::{Dispatcher, Printer};
use one_ssh::models::event::{Event, EventKind};
use one_ssh::models::host::Host;
use one_ssh::transport::ssh::{ClientConfig, SshTransport};
use one_ssh::transport::{SessionSink, Transport};
use one_ssh::AppError;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Fake client that runs the remote command locally.
const EVAL_CLIENT: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$(dirname "$0")/args"
for last; do :; done
eval "$last"
"#;

/// Fake client that fails the way OpenSSH does on an unreachable host.
const REFUSING_CLIENT: &str = r#"#!/bin/sh
echo "ssh: connect to host a port 22: Connection refused" >&2
exit 255
"#;

fn install(dir: &TempDir, script: &str) -> PathBuf {
    let path = dir.path().join("fake-ssh");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn transport(binary: &Path) -> SshTransport {
    SshTransport::new(ClientConfig {
        user: "deploy".into(),
        ssh_binary: binary.to_string_lossy().into_owned(),
        ..ClientConfig::default()
    })
}

fn host() -> Arc<Host> {
    Arc::new(Host::new("a", 22, "a").with_timeouts(Duration::from_secs(5), Duration::ZERO))
}

/// Connect, run `command`, and return the result with every emitted event.
async fn exec(
    transport: &SshTransport,
    command: &str,
) -> (one_ssh::Result<Option<i32>>, Vec<EventKind>) {
    let host = host();
    let connection = transport.connect(&host).await.unwrap();
    let (tx, mut rx) = mpsc::channel::<Event>(64);
    let sink = SessionSink::new(Arc::clone(&host), tx);

    let result = connection.exec(command, &sink).await;
    drop(sink);

    let mut kinds = Vec::new();
    while let Some(event) = rx.recv().await {
        kinds.push(event.kind);
    }
    (result, kinds)
}

// ── Connect probe ────────────────────────────────────────────

#[tokio::test]
#[serial_test::serial]
async fn probe_passes_client_arguments() {
    let dir = TempDir::new().unwrap();
    let binary = install(&dir, EVAL_CLIENT);

    transport(&binary).connect(&host()).await.unwrap();

    let args = fs::read_to_string(dir.path().join("args")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(&args[..5], ["-T", "-p", "22", "-l", "deploy"]);
    assert!(args.contains(&"BatchMode=yes"));
    assert!(args.contains(&"ConnectTimeout=5"));
    assert_eq!(&args[args.len() - 3..], ["--", "a", "exit 0"]);
}

#[tokio::test]
#[serial_test::serial]
async fn probe_failure_reports_last_stderr_line() {
    let dir = TempDir::new().unwrap();
    let binary = install(&dir, REFUSING_CLIENT);

    let err = transport(&binary)
        .connect(&host())
        .await
        .err()
        .expect("probe must fail");

    assert!(matches!(err, AppError::Connect(_)), "got {err:?}");
    assert_eq!(
        err.to_string(),
        "connect: ssh: connect to host a port 22: Connection refused"
    );
}

#[tokio::test]
#[serial_test::serial]
async fn missing_client_binary_is_a_connect_error() {
    let dir = TempDir::new().unwrap();
    let binary = dir.path().join("no-such-ssh");

    let err = transport(&binary)
        .connect(&host())
        .await
        .err()
        .expect("spawn must fail");

    assert!(matches!(err, AppError::Connect(_)), "got {err:?}");
    assert!(err.to_string().contains("failed to spawn"), "got {err}");
}

// ── Command execution ────────────────────────────────────────

#[tokio::test]
#[serial_test::serial]
async fn command_output_is_streamed_per_line() {
    let dir = TempDir::new().unwrap();
    let transport = transport(&install(&dir, EVAL_CLIENT));

    let (result, kinds) = exec(&transport, "echo one; echo two; echo warn >&2").await;

    assert_eq!(result.unwrap(), Some(0));
    let stdout: Vec<&EventKind> = kinds
        .iter()
        .filter(|kind| matches!(kind, EventKind::Stdout(_)))
        .collect();
    assert_eq!(
        stdout,
        [
            &EventKind::Stdout("one".into()),
            &EventKind::Stdout("two".into())
        ]
    );
    assert!(kinds.contains(&EventKind::Stderr("warn".into())));
    assert!(kinds.iter().all(|kind| !kind.is_terminal()));
}

#[tokio::test]
#[serial_test::serial]
async fn unterminated_last_line_is_delivered() {
    let dir = TempDir::new().unwrap();
    let transport = transport(&install(&dir, EVAL_CLIENT));

    let (result, kinds) = exec(&transport, "printf 'no newline'").await;

    assert_eq!(result.unwrap(), Some(0));
    assert_eq!(kinds, vec![EventKind::Stdout("no newline".into())]);
}

#[tokio::test]
#[serial_test::serial]
async fn remote_exit_status_is_returned() {
    let dir = TempDir::new().unwrap();
    let transport = transport(&install(&dir, EVAL_CLIENT));

    let (result, _) = exec(&transport, "exit 3").await;

    assert_eq!(result.unwrap(), Some(3));
}

#[tokio::test]
#[serial_test::serial]
async fn client_failure_status_is_a_session_error() {
    let dir = TempDir::new().unwrap();
    let transport = transport(&install(&dir, EVAL_CLIENT));

    let (result, _) = exec(&transport, "echo 'Permission denied (publickey).' >&2; exit 255").await;

    let err = result.unwrap_err();
    assert!(matches!(err, AppError::Session(_)), "got {err:?}");
    assert_eq!(err.to_string(), "session: Permission denied (publickey).");
}

// ── End to end through the dispatcher ────────────────────────

#[tokio::test]
#[serial_test::serial]
async fn dispatcher_prints_output_from_every_host() {
    let dir = TempDir::new().unwrap();
    let transport = transport(&install(&dir, EVAL_CLIENT));
    let hosts = vec![Host::new("a", 22, "web1"), Host::new("b", 22, "web2")];

    let mut dispatcher = Dispatcher::new(
        Arc::new(transport),
        hosts,
        "echo hello",
        Printer::new(Vec::new(), false),
    )
    .with_par(2)
    .with_preconnect(true);
    dispatcher.run().await.unwrap();

    let out = String::from_utf8(dispatcher.into_printer().into_inner()).unwrap();
    let mut lines: Vec<&str> = out.lines().collect();
    lines.sort_unstable();
    assert_eq!(lines, ["web1 [1] hello", "web2 [1] hello"]);
}
