#![forbid(unsafe_code)]

//! `one_ssh`: run one shell command concurrently across many hosts.

pub mod cli;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod hosts;
pub mod models;
pub mod transport;

pub use config::Settings;
pub use dispatch::Dispatcher;
pub use errors::{AppError, Result};
