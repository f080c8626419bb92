//! Command text assembly.
//!
//! The command sent to every host is the lines of each command file, in
//! order, followed by the inline command strings joined with newlines.

use std::path::PathBuf;

use crate::{AppError, Result};

/// Build the command text from files and inline strings.
///
/// Returns an empty string when neither is given; the dispatcher's
/// validation reports that case.
///
/// # Errors
///
/// Returns `AppError::Io` if a command file cannot be read.
pub fn assemble(command_strings: &[String], command_files: &[PathBuf]) -> Result<String> {
    let mut lines = Vec::new();
    for path in command_files {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AppError::Io(format!("cannot read command file {}: {err}", path.display()))
        })?;
        lines.extend(raw.lines().map(str::to_owned));
    }
    if !command_strings.is_empty() {
        lines.push(command_strings.join("\n"));
    }
    Ok(lines.join("\n"))
}
