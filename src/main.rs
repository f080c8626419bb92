#![forbid(unsafe_code)]

//! `ossh`: run one shell command on many hosts over ssh.
//!
//! Resolves settings from flags and an optional TOML file, builds the host
//! list and command text, then hands everything to the dispatcher. Host
//! output goes to stdout; diagnostics go to stderr through `tracing`.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use one_ssh::cli::{Cli, LogFormat};
use one_ssh::config::FileConfig;
use one_ssh::dispatch::{Dispatcher, Printer};
use one_ssh::transport::ssh::SshTransport;
use one_ssh::{command, AppError, Result};

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(args)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    // ── Resolve settings ────────────────────────────────
    let file = match args.config {
        Some(ref path) => FileConfig::load_from_path(path)?,
        None => FileConfig::default(),
    };
    let login = std::env::var("LOGNAME")
        .or_else(|_| std::env::var("USER"))
        .ok();
    let mut settings = args.into_settings(file, login);
    settings.hosts.use_color = io::stdout().is_terminal();
    debug!(?settings, "settings resolved");

    // ── Collaborators: command, hosts, transport ────────
    let command = command::assemble(&settings.command_strings, &settings.command_files)?;
    let hosts = settings.hosts.load().await?;
    let transport = Arc::new(SshTransport::new(settings.client));
    info!(hosts = hosts.len(), "inputs ready");

    // ── Dispatch ────────────────────────────────────────
    let printer = Printer::stdout(settings.verbose);
    let mut dispatcher = Dispatcher::new(transport, hosts, command, printer)
        .with_par(settings.par)
        .with_preconnect(settings.preconnect)
        .with_ignore_failures(settings.ignore_failures);
    dispatcher.validate()?;
    dispatcher.run().await
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
