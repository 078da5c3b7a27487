//! Big-endian byte cursor.
//!
//! `ByteStream` is the only way the interpreter, the trailer locator and the
//! TFM loader touch raw bytes. Every read is bounds checked and fails with
//! [`DviError::TruncatedStream`] without moving the cursor.

use crate::error::{DviError, Result};
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

/// An immutable byte sequence with a read cursor.
#[derive(Debug, Clone)]
pub struct ByteStream {
    data: Bytes,
    pos: usize,
}

impl ByteStream {
    /// Create a stream positioned at the start of `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Total length of the underlying data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the stream has no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current cursor position.
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether the cursor sits at the end of the data.
    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Move the cursor to an absolute position in `[0, len]`.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(DviError::OutOfRange {
                pos,
                len: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Borrow the next `n` bytes and advance past them.
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if n > self.remaining() {
            return Err(DviError::TruncatedStream {
                offset: self.pos,
                wanted: n,
                remaining: self.remaining(),
                opcode: None,
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..start + n])
    }

    /// Read `n` bytes as a zero-copy slice of the underlying data.
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        let start = self.pos;
        self.take(n)?;
        Ok(self.data.slice(start..start + n))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_u24(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u24(self.take(3)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn read_i24(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i24(self.take(3)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    /// Read an unsigned big-endian integer of `n` bytes (1 to 4).
    ///
    /// # Panics
    ///
    /// Panics if `n` is outside `1..=4`; opcode tables only ever pass
    /// widths derived from the opcode itself.
    pub fn read_unsigned(&mut self, n: u8) -> Result<u32> {
        match n {
            1 => self.read_u8().map(u32::from),
            2 => self.read_u16().map(u32::from),
            3 => self.read_u24(),
            4 => self.read_u32(),
            _ => unreachable!("integer width {n} out of range"),
        }
    }

    /// Read a sign-extended big-endian integer of `n` bytes (1 to 4).
    pub fn read_signed(&mut self, n: u8) -> Result<i32> {
        match n {
            1 => self.read_i8().map(i32::from),
            2 => self.read_i16().map(i32::from),
            3 => self.read_i24(),
            4 => self.read_i32(),
            _ => unreachable!("integer width {n} out of range"),
        }
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Byte at an absolute position, ignoring the cursor.
    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        self.data.get(pos).copied()
    }
}
