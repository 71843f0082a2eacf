//! Incremental line framing over a TCP byte stream.
//!
//! TCP delivers a stream of bytes, not messages.  A single `read()` may
//! return half a line, exactly one line, or several lines plus the start of
//! the next one.  The [`LineFramer`] accumulates bytes and hands back only the
//! lines that are complete:
//!
//! ```text
//! read #1: "DATA speed=52.3 bat"        -> (nothing, 19 bytes pending)
//! read #2: "tery=89\r\nROLE ADMIN\r\nOK"  -> "DATA speed=52.3 battery=89", "ROLE ADMIN"
//! read #3: " users\n"                    -> "OK users"
//! ```
//!
//! Splitting happens on raw bytes (`b'\n'`), so a multi-byte UTF-8 character
//! cut in half by a read boundary is reassembled before it is decoded.

use tracing::warn;

/// The input line delimiter.  A `\r` immediately before it is removed by the
/// whitespace trim applied to every line.
pub const LINE_DELIMITER: u8 = b'\n';

/// Accumulates raw bytes and yields complete protocol lines.
#[derive(Debug, Default)]
pub struct LineFramer {
    /// Bytes received after the last delimiter.
    pending: Vec<u8>,
    /// Optional clamp on the size of a single line.
    max_line_len: Option<usize>,
    /// Set while skipping the remainder of an over-long line.
    discarding: bool,
    discarded_lines: u64,
}

impl LineFramer {
    /// Creates a framer with no line length limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a framer that drops any line longer than `max_line_len` bytes.
    ///
    /// An over-long line is discarded as a whole (up to and including its
    /// delimiter); it is never emitted truncated.
    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            max_line_len: Some(max_line_len),
            ..Self::default()
        }
    }

    /// Appends `bytes` and returns an iterator over the lines they complete.
    ///
    /// The iterator is lazy: lines are cut out of the pending buffer one at a
    /// time as `next()` is called.  Lines not consumed before the iterator is
    /// dropped stay buffered and are yielded by the next call to `feed`.
    pub fn feed(&mut self, bytes: &[u8]) -> Lines<'_> {
        self.pending.extend_from_slice(bytes);
        Lines { framer: self }
    }

    /// Number of bytes buffered that do not yet form a complete line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Count of lines dropped for exceeding the configured maximum length.
    pub fn discarded_lines(&self) -> u64 {
        self.discarded_lines
    }

    /// Drops any buffered partial line.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(pos) = self.pending.iter().position(|&b| b == LINE_DELIMITER) else {
                self.enforce_limit_on_partial();
                return None;
            };

            let raw: Vec<u8> = self.pending.drain(..=pos).collect();

            if self.discarding {
                // Tail of a line that already blew the limit.
                self.discarding = false;
                continue;
            }

            if let Some(max) = self.max_line_len {
                if pos > max {
                    self.note_discard(pos);
                    continue;
                }
            }

            let text = String::from_utf8_lossy(&raw[..pos]);
            let line = text.trim();
            if line.is_empty() {
                continue;
            }
            return Some(line.to_string());
        }
    }

    fn enforce_limit_on_partial(&mut self) {
        let Some(max) = self.max_line_len else {
            return;
        };
        if self.pending.len() > max {
            if !self.discarding {
                self.note_discard(self.pending.len());
            }
            self.pending.clear();
            self.discarding = true;
        }
    }

    fn note_discard(&mut self, len: usize) {
        self.discarded_lines += 1;
        warn!(len, "discarding over-long protocol line");
    }
}

/// Lazy iterator over the complete lines produced by one [`LineFramer::feed`].
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_line()
    }
}
