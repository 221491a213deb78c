// src/supervisor/lines.rs

//! Incremental line reassembly for child output streams.
//!
//! Child stdout/stderr arrive as arbitrarily chunked byte reads; a line can
//! span any number of chunks and a chunk can hold any number of lines. The
//! accumulator turns that stream back into discrete, ordered lines, and its
//! only state is the unterminated tail of the most recent chunk.

/// Incremental splitter: feed byte chunks in, get completed lines out.
///
/// The pending fragment is kept as raw bytes so that a multi-byte UTF-8
/// sequence split across two reads is reassembled before conversion.
/// Each stream of each process gets its own accumulator; the two streams
/// are reassembled independently.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    fragment: Vec<u8>,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes, in order.
    ///
    /// A line is the bytes up to (not including) a `\n`. Whatever follows
    /// the last terminator stays buffered as the new pending fragment.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.fragment.extend_from_slice(&rest[..pos]);
            lines.push(String::from_utf8_lossy(&self.fragment).into_owned());
            self.fragment.clear();
            rest = &rest[pos + 1..];
        }

        self.fragment.extend_from_slice(rest);
        lines
    }

    /// Emit a non-empty pending fragment as one final unterminated line.
    ///
    /// Called once per stream at EOF so trailing output without a newline
    /// is not lost.
    pub fn flush(&mut self) -> Option<String> {
        if self.fragment.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.fragment).into_owned();
        self.fragment.clear();
        Some(line)
    }

    /// True if no unterminated bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }
}
