//! Unit tests for host list construction: port parsing, host files,
//! inventory output, and label alignment.

use std::fs;
use std::time::Duration;

use one_ssh::hosts::{parse_inventory, split_port, HostSource};
use one_ssh::models::host::Host;
use one_ssh::AppError;
use tempfile::TempDir;

fn source(host_strings: &[&str]) -> HostSource {
    HostSource {
        host_strings: host_strings.iter().map(|s| (*s).to_owned()).collect(),
        ..HostSource::default()
    }
}

// ── split_port ───────────────────────────────────────────────

#[test]
fn address_without_port_uses_default() {
    assert_eq!(split_port("web1", 22).unwrap(), ("web1".into(), 22));
}

#[test]
fn explicit_port_overrides_default() {
    assert_eq!(split_port("web1:2222", 22).unwrap(), ("web1".into(), 2222));
}

#[test]
fn bracketed_ipv6_with_port() {
    assert_eq!(split_port("[::1]:2200", 22).unwrap(), ("::1".into(), 2200));
    assert_eq!(split_port("[fe80::1]", 22).unwrap(), ("fe80::1".into(), 22));
}

#[test]
fn bare_ipv6_is_taken_as_address() {
    assert_eq!(split_port("fe80::1", 22).unwrap(), ("fe80::1".into(), 22));
}

#[test]
fn non_numeric_port_is_config_error() {
    let err = split_port("web1:ssh", 22).unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn out_of_range_port_is_config_error() {
    assert!(split_port("web1:70000", 22).is_err());
}

// ── parse_inventory ──────────────────────────────────────────

#[test]
fn inventory_lines_are_label_then_address() {
    let pairs = parse_inventory("web1 10.0.0.1\ndb1   10.0.0.9:2200\n");
    assert_eq!(
        pairs,
        vec![
            ("web1".to_owned(), "10.0.0.1".to_owned()),
            ("db1".to_owned(), "10.0.0.9:2200".to_owned()),
        ]
    );
}

#[test]
fn inventory_lines_without_address_are_skipped() {
    let pairs = parse_inventory("\nlonely\nweb1 10.0.0.1 extra\n");
    assert_eq!(pairs, vec![("web1".to_owned(), "10.0.0.1".to_owned())]);
}

// ── load ─────────────────────────────────────────────────────

#[tokio::test]
async fn host_strings_are_split_and_expanded() {
    let hosts = source(&["web{1..2} db1:2200", "cache"])
        .load()
        .await
        .unwrap();

    let addresses: Vec<(&str, u16)> = hosts.iter().map(|h| (h.address(), h.port())).collect();
    assert_eq!(
        addresses,
        vec![("web1", 22), ("web2", 22), ("db1", 2200), ("cache", 22)]
    );
}

#[tokio::test]
async fn labels_are_padded_to_the_widest() {
    let hosts = source(&["a", "bbbb", "cc"]).load().await.unwrap();

    let labels: Vec<&str> = hosts.iter().map(Host::label).collect();
    assert_eq!(labels, vec!["a   ", "bbbb", "cc  "]);
}

#[tokio::test]
async fn settings_are_applied_to_every_host() {
    let mut src = source(&["a", "b"]);
    src.default_port = 2022;
    src.connect_timeout = Duration::from_secs(7);
    src.run_timeout = Duration::from_secs(30);
    src.use_color = true;

    let hosts = src.load().await.unwrap();

    for host in &hosts {
        assert_eq!(host.port(), 2022);
        assert_eq!(host.connect_timeout(), Duration::from_secs(7));
        assert_eq!(host.run_timeout(), Duration::from_secs(30));
        assert!(host.use_color());
    }
}

#[tokio::test]
async fn host_files_skip_comments_and_blank_lines_and_come_first() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hosts");
    fs::write(&path, "# fleet\nweb1\n\nweb{2,3}  db1\n").unwrap();
    let mut src = source(&["extra"]);
    src.host_files = vec![path];

    let hosts = src.load().await.unwrap();

    let addresses: Vec<&str> = hosts.iter().map(Host::address).collect();
    assert_eq!(addresses, vec!["web1", "web2", "web3", "db1", "extra"]);
}

#[tokio::test]
async fn missing_host_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let mut src = source(&[]);
    src.host_files = vec![dir.path().join("nope")];

    let err = src.load().await.unwrap_err();

    assert!(matches!(err, AppError::Io(_)), "got {err:?}");
}

#[tokio::test]
async fn show_ip_labels_with_resolved_address() {
    let mut src = source(&["127.0.0.1:2200"]);
    src.show_ip = true;

    let hosts = src.load().await.unwrap();

    assert_eq!(hosts[0].label(), "127.0.0.1");
    assert_eq!(hosts[0].port(), 2200);
}

#[tokio::test]
async fn empty_source_yields_no_hosts() {
    assert!(source(&[]).load().await.unwrap().is_empty());
}

#[cfg(unix)]
mod inventory {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use one_ssh::hosts::HostSource;
    use one_ssh::AppError;
    use tempfile::TempDir;

    fn script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("inventory");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn inventory_hosts_come_before_host_strings() {
        let dir = TempDir::new().unwrap();
        let program = script(
            &dir,
            r#"[ "$1" = "role=web" ] || exit 1
echo "frontend-1 10.0.0.1"
echo "frontend-2 10.0.0.2:2200""#,
        );
        let src = HostSource {
            host_strings: vec!["bastion".into()],
            inventory_filters: vec!["role=web".into()],
            inventory_program: program.to_string_lossy().into_owned(),
            ..HostSource::default()
        };

        let hosts = src.load().await.unwrap();

        let view: Vec<(&str, u16, &str)> = hosts
            .iter()
            .map(|h| (h.address(), h.port(), h.label()))
            .collect();
        assert_eq!(
            view,
            vec![
                ("10.0.0.1", 22, "frontend-1"),
                ("10.0.0.2", 2200, "frontend-2"),
                ("bastion", 22, "bastion   "),
            ]
        );
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn failing_inventory_is_inventory_error() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "echo 'unknown filter' >&2; exit 2");
        let src = HostSource {
            inventory_filters: vec!["role=nope".into()],
            inventory_program: program.to_string_lossy().into_owned(),
            ..HostSource::default()
        };

        let err = src.load().await.unwrap_err();

        assert!(matches!(err, AppError::Inventory(_)), "got {err:?}");
        assert!(err.to_string().ends_with("unknown filter"), "got {err}");
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn missing_inventory_program_is_inventory_error() {
        let src = HostSource {
            inventory_filters: vec!["x".into()],
            inventory_program: "/nonexistent/ossh-inventory".into(),
            ..HostSource::default()
        };

        let err = src.load().await.unwrap_err();

        assert!(matches!(err, AppError::Inventory(_)), "got {err:?}");
    }
}
