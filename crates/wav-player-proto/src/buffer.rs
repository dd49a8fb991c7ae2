//! Growable receive buffer.
//!
//! Bytes are read into the tail and handed to the parser from the front.
//! A cursor tracks what the parser already consumed; the consumed prefix is
//! compacted away before the next read so leftover tail bytes stay at the
//! front and are never lost or duplicated.

use std::io::{self, Read};

use crate::{ParseResult, TERMINATOR, parse_unit};

/// Default growth step and minimum free space offered to each read.
pub const DEFAULT_READ_QUANTUM: usize = 4096;

#[derive(Debug)]
pub struct MessageBuffer {
    data: Vec<u8>,
    start: usize,
    end: usize,
    quantum: usize,
    /// Pending bytes already known to hold no terminator.
    scanned: usize,
}

impl MessageBuffer {
    pub fn new(quantum: usize) -> Self {
        Self {
            data: Vec::new(),
            start: 0,
            end: 0,
            quantum: quantum.max(1),
            scanned: 0,
        }
    }

    /// Allocated size in bytes. Never shrinks.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes received but not yet consumed by a parse pass.
    pub fn pending(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Mark the first `n` pending bytes as consumed.
    pub fn consume(&mut self, n: usize) {
        self.start = (self.start + n).min(self.end);
        self.scanned = self.scanned.saturating_sub(n);
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
            self.scanned = 0;
        }
    }

    /// Parse the first pending unit without consuming it.
    ///
    /// Bytes searched by an earlier `Incomplete` pass are not searched again.
    pub fn next_unit(&mut self) -> ParseResult {
        let pending = &self.data[self.start..self.end];
        let from = self.scanned.min(pending.len());
        match pending[from..].iter().position(|&b| b == TERMINATOR) {
            Some(pos) => parse_unit(&pending[..=from + pos]),
            None => {
                self.scanned = pending.len();
                ParseResult::Incomplete
            }
        }
    }

    /// Copy `bytes` behind the pending data, growing one quantum at a time.
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.compact();
        while self.data.len() - self.end < bytes.len() {
            self.grow()?;
        }
        self.data[self.end..self.end + bytes.len()].copy_from_slice(bytes);
        self.end += bytes.len();
        Ok(())
    }

    /// Perform one read from `reader` into the free tail.
    ///
    /// Returns the byte count from the reader; `0` means end of stream.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        self.compact();
        if self.data.len() - self.end <= self.quantum {
            self.grow()?;
        }
        let n = reader.read(&mut self.data[self.end..])?;
        self.end += n;
        Ok(n)
    }

    fn compact(&mut self) {
        if self.start > 0 {
            self.data.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
    }

    fn grow(&mut self) -> io::Result<()> {
        self.data.try_reserve(self.quantum).map_err(|e| {
            io::Error::new(
                io::ErrorKind::OutOfMemory,
                format!("receive buffer growth by {} bytes failed: {e}", self.quantum),
            )
        })?;
        self.data.resize(self.data.len() + self.quantum, 0);
        Ok(())
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_READ_QUANTUM)
    }
}
