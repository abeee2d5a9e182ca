//! Cursor-based buffers for the raw (uncompressed) tagged stream
//!
//! Every integer on the wire, including tags, counts and string lengths,
//! is a signed 64-bit little-endian value.

use std::fmt;
use thiserror::Error;

/// Width of every integer in the raw stream
pub const INTEGER_SIZE: usize = 8;

// ============================================================================
// Context Errors
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Not enough data in buffer to decode
    #[error("buffer underflow: need {needed} bytes, have {available}")]
    BufferUnderflow { needed: usize, available: usize },

    /// Length prefix is negative or does not fit in memory
    #[error("invalid length {0}")]
    InvalidLength(i64),

    #[error("memory not enough for {0} more bytes")]
    OutOfMemory(usize),
}

pub type CodecResult<T> = Result<T, CodecError>;

// ============================================================================
// Encode Context
// ============================================================================

/// Growable output buffer
pub struct EncodeContext {
    buffer: Vec<u8>,
}

impl EncodeContext {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Start with a copy of `header`
    pub fn with_header(header: &[u8]) -> CodecResult<Self> {
        let mut ctx = Self::new();
        ctx.write_bytes(header)?;
        Ok(ctx)
    }

    /// Bytes written so far
    #[inline]
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> CodecResult<usize> {
        self.buffer
            .try_reserve(data.len())
            .map_err(|_| CodecError::OutOfMemory(data.len()))?;
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> CodecResult<usize> {
        self.write_bytes(&[byte])
    }

    /// Write a fixed-width integer
    pub fn write_integer(&mut self, value: i64) -> CodecResult<usize> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write an integer length prefix followed by the raw bytes
    pub fn write_string(&mut self, data: &[u8]) -> CodecResult<usize> {
        let len = i64::try_from(data.len()).map_err(|_| CodecError::InvalidLength(i64::MAX))?;
        Ok(self.write_integer(len)? + self.write_bytes(data)?)
    }

    /// Consume the context, returning the written bytes
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for EncodeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EncodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeContext")
            .field("position", &self.position())
            .field("capacity", &self.buffer.capacity())
            .finish()
    }
}

// ============================================================================
// Decode Context
// ============================================================================

/// Read cursor over a borrowed buffer
///
/// Strings are returned as slices of the underlying buffer; nothing is
/// copied.
pub struct DecodeContext<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> DecodeContext<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Get current cursor position (bytes read)
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Get remaining bytes to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    /// Unread tail of the buffer
    pub fn remaining_buffer(&self) -> &'a [u8] {
        &self.buffer[self.cursor.min(self.buffer.len())..]
    }

    /// Read raw bytes from the buffer (zero-copy slice)
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::BufferUnderflow {
                needed: len,
                available: self.remaining(),
            });
        }

        let slice = &self.buffer[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    /// Read a fixed-width integer
    pub fn read_integer(&mut self) -> CodecResult<i64> {
        let bytes = self.read_bytes(INTEGER_SIZE)?;
        let mut raw = [0u8; INTEGER_SIZE];
        raw.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(raw))
    }

    /// Read a length-prefixed string
    pub fn read_string(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_integer()?;
        let len = usize::try_from(len).map_err(|_| CodecError::InvalidLength(len))?;
        self.read_bytes(len)
    }
}

impl fmt::Debug for DecodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("position", &self.cursor)
            .field("remaining", &self.remaining())
            .finish()
    }
}
