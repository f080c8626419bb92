//! Event printer.
//!
//! Renders events as `<label> <tag> <text>` lines. Hosts with colour enabled
//! get the label wrapped in an ANSI colour instead of a bracketed tag.
//! `Close` events are never printed and `Verbose` events only when the
//! printer was built with verbose output enabled.

use std::io::{self, Stdout, Write};

use tracing::warn;

use crate::models::event::{Event, EventKind};

/// Text printed for an `Error` event whose host has no recorded error.
const UNKNOWN_ERROR: &str = "unknown error";

/// Writes formatted events to an output stream.
#[derive(Debug)]
pub struct Printer<W: Write> {
    out: W,
    verbose: bool,
}

impl Printer<Stdout> {
    /// Printer writing to the process's standard output.
    #[must_use]
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> Printer<W> {
    /// Printer writing to `out`.
    #[must_use]
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    /// Whether verbose diagnostics are printed.
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Print `event` if the policy allows it.
    ///
    /// Output failures are logged and otherwise ignored.
    pub fn print(&mut self, event: &Event) {
        let Some(line) = render(event, self.verbose) else {
            return;
        };
        if let Err(err) = writeln!(self.out, "{line}") {
            warn!(%err, "failed to write host output");
        }
    }

    /// Borrow the underlying writer.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Consume the printer, returning the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Format `event` as a single output line, or `None` if it is not printed.
#[must_use]
pub fn render(event: &Event, verbose: bool) -> Option<String> {
    let (color, tag, text) = match &event.kind {
        EventKind::Stdout(text) => (36, "[1]", text.as_str()),
        EventKind::Stderr(text) => (33, "[2]", text.as_str()),
        EventKind::Verbose(text) if verbose => (32, "[v]", text.as_str()),
        EventKind::Error => (31, "[!]", event.host.error().unwrap_or(UNKNOWN_ERROR)),
        EventKind::Verbose(_) | EventKind::Close => return None,
    };

    let label = event.host.label();
    if event.host.use_color() {
        Some(format!("\x1b[{color}m{label}\x1b[0m {text}"))
    } else {
        Some(format!("{label} {tag} {text}"))
    }
}
