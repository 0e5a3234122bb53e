//! Bounds-checked forward-only reader over a fuzz input buffer.
//!
//! Multi-byte fields are little-endian. The cursor never reads past the end of
//! the buffer and never rewinds; a failed read leaves the position unchanged.

use thiserror::Error;

/// Failure to satisfy a read from the remaining input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CursorError {
    /// Fewer bytes remain than were requested.
    #[error("end of input: requested {requested} bytes, {remaining} remaining")]
    EndOfInput {
        /// Bytes the caller asked for.
        requested: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },
}

/// Forward-only little-endian reader.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Wraps `data` with the read position at 0.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes left to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Reads exactly `n` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::EndOfInput`] without advancing when fewer than
    /// `n` bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(CursorError::EndOfInput {
                requested: n,
                remaining,
            });
        }
        let start = self.position;
        self.position += n;
        Ok(&self.data[start..self.position])
    }

    /// Reads up to `n` bytes, returning fewer when the input runs out.
    pub fn read_up_to(&mut self, n: usize) -> &'a [u8] {
        let take = n.min(self.remaining());
        let start = self.position;
        self.position += take;
        &self.data[start..self.position]
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::EndOfInput`] when the buffer is exhausted.
    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        self.read_array::<1>().map(|[byte]| byte)
    }

    /// Reads a little-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::EndOfInput`] when fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::EndOfInput`] when fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a little-endian unsigned field of `width` bytes (1, 2, or 4)
    /// widened to `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::EndOfInput`] when fewer than `width` bytes remain.
    pub fn read_uint(&mut self, width: usize) -> Result<u64, CursorError> {
        match width {
            1 => self.read_u8().map(u64::from),
            2 => self.read_u16().map(u64::from),
            _ => self.read_u32().map(u64::from),
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0_u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}
