//! Cursor-based scratch buffers.
//!
//! [`ScratchBuffer`] is a fixed-capacity byte area with a write cursor and
//! a read cursor. [`ByteReader`] walks a borrowed slice the same way. Every
//! cursor move is bounds-checked.

use thiserror::Error;

use super::Reset;
use crate::error::ValidationError;

/// Cursor movement outside of the buffer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Not enough capacity left to write
    #[error("write of {requested} bytes exceeds remaining capacity {remaining}")]
    Overflow {
        /// Bytes asked for
        requested: usize,
        /// Bytes still writable
        remaining: usize,
    },

    /// Not enough written bytes left to read
    #[error("read of {requested} bytes exceeds remaining data {remaining}")]
    Underflow {
        /// Bytes asked for
        requested: usize,
        /// Bytes still readable
        remaining: usize,
    },
}

impl From<BufferError> for ValidationError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Overflow { .. } => Self::BufferOverflow,
            BufferError::Underflow { .. } => Self::Malformed,
        }
    }
}

/// Fixed-capacity scratch area.
#[derive(Debug, Clone)]
pub struct ScratchBuffer {
    data: Box<[u8]>,
    read: usize,
    write: usize,
}

impl ScratchBuffer {
    /// Creates a zeroed buffer of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            read: 0,
            write: 0,
        }
    }

    /// Reserves the next `n` bytes for writing and returns them.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Overflow`] when fewer than `n` bytes are left.
    pub fn write_n(&mut self, n: usize) -> Result<&mut [u8], BufferError> {
        let remaining = self.data.len() - self.write;
        if n > remaining {
            return Err(BufferError::Overflow {
                requested: n,
                remaining,
            });
        }
        let start = self.write;
        self.write += n;
        Ok(&mut self.data[start..self.write])
    }

    /// Appends `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Overflow`] when `bytes` does not fit.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.write_n(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Consumes the next `n` written bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Underflow`] when fewer than `n` bytes are
    /// readable.
    pub fn read_n(&mut self, n: usize) -> Result<&[u8], BufferError> {
        let remaining = self.write - self.read;
        if n > remaining {
            return Err(BufferError::Underflow {
                requested: n,
                remaining,
            });
        }
        let start = self.read;
        self.read += n;
        Ok(&self.data[start..self.read])
    }

    /// Written bytes not consumed yet.
    #[must_use]
    pub fn readable(&self) -> &[u8] {
        &self.data[self.read..self.write]
    }

    /// Number of readable bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.write - self.read
    }

    /// Whether nothing is readable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Zeroes the written bytes and rewinds both cursors. Capacity is
    /// retained.
    pub fn clear(&mut self) {
        self.data[..self.write].fill(0);
        self.read = 0;
        self.write = 0;
    }
}

impl Reset for ScratchBuffer {
    fn reset(&mut self) {
        self.clear();
    }
}

impl AsRef<[u8]> for ScratchBuffer {
    fn as_ref(&self) -> &[u8] {
        self.readable()
    }
}

/// Read cursor over borrowed bytes.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Starts reading at the beginning of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Consumes the next `n` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Underflow`] when fewer than `n` bytes are left.
    pub fn read_n(&mut self, n: usize) -> Result<&'a [u8], BufferError> {
        let remaining = self.data.len() - self.pos;
        if n > remaining {
            return Err(BufferError::Underflow {
                requested: n,
                remaining,
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..self.pos])
    }

    /// Consumes one byte that must equal `separator`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Malformed`] on any other byte or at the end.
    pub fn expect_separator(&mut self, separator: u8) -> Result<(), ValidationError> {
        match self.read_n(1)? {
            [b] if *b == separator => Ok(()),
            _ => Err(ValidationError::Malformed),
        }
    }

    /// Consumes and returns everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    /// Number of unread bytes.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}
