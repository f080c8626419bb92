//! Line codec for remote stdout/stderr streams.
//!
//! Splits a byte stream on `\n` into [`RemoteLine`] items. Remote output is
//! not guaranteed to be UTF-8, so each line is decoded lossily and a
//! trailing `\r` is stripped. A line longer than [`MAX_LINE_BYTES`] is
//! dropped and reported as [`RemoteLine::TooLong`] instead of growing the
//! buffer without bound; decoding resumes after the next newline.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use one_ssh::transport::codec::LineCodec;
//!
//! let lines = FramedRead::new(child_stdout, LineCodec::new());
//! ```

use std::cmp;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::{AppError, Result};

/// Maximum accepted line length: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// One decoded item from a remote stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLine {
    /// A complete line without its terminator.
    Text(String),
    /// A line exceeded the length limit and was discarded.
    TooLong,
}

/// Newline-delimited decoder with a maximum line length.
#[derive(Debug)]
pub struct LineCodec {
    max_length: usize,
    /// Offset into the buffer already scanned for a newline.
    next_index: usize,
    /// Set while skipping the remainder of an over-long line.
    discarding: bool,
}

impl LineCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec with a custom line limit.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = RemoteLine;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let read_to = cmp::min(self.max_length.saturating_add(1), src.len());
            let newline = src[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    src.advance(self.next_index + offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    src.advance(read_to);
                    self.next_index = 0;
                    if src.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let line = src.split_to(end + 1);
                    return Ok(Some(RemoteLine::Text(to_text(&line[..end]))));
                }
                (false, None) if src.len() > self.max_length => {
                    self.discarding = true;
                    self.next_index = 0;
                    return Ok(Some(RemoteLine::TooLong));
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if src.is_empty() || self.discarding {
            src.clear();
            return Ok(None);
        }
        self.next_index = 0;
        let rest = src.split_to(src.len());
        Ok(Some(RemoteLine::Text(to_text(&rest))))
    }
}

fn to_text(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
