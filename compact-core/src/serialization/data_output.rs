//! Data output traits and implementations for the Compact binary format.

use crate::error::{CompactError, Result};
use bytes::{BufMut, BytesMut};

/// Trait for writing primitive values sequentially.
///
/// All multi-byte values are written in big-endian byte order.
pub trait DataOutput {
    /// Writes a single byte (i8).
    fn write_byte(&mut self, v: i8) -> Result<()>;

    /// Writes a boolean as a single byte (0 for false, 1 for true).
    fn write_bool(&mut self, v: bool) -> Result<()>;

    /// Writes a 16-bit signed integer in big-endian order.
    fn write_short(&mut self, v: i16) -> Result<()>;

    /// Writes a 32-bit signed integer in big-endian order.
    fn write_int(&mut self, v: i32) -> Result<()>;

    /// Writes a 64-bit signed integer in big-endian order.
    fn write_long(&mut self, v: i64) -> Result<()>;

    /// Writes a 32-bit floating point in big-endian order.
    fn write_float(&mut self, v: f32) -> Result<()>;

    /// Writes a 64-bit floating point in big-endian order.
    fn write_double(&mut self, v: f64) -> Result<()>;

    /// Writes raw bytes without length prefix.
    fn write_bytes(&mut self, v: &[u8]) -> Result<()>;

    /// Writes a string with its length prefix.
    fn write_string(&mut self, v: &str) -> Result<()>;
}

/// A growable buffer implementing `DataOutput` with positional writes.
///
/// The Compact writer reserves the fixed-size block of an object up front
/// and fills it later with the `pwrite_*` family.
#[derive(Debug)]
pub struct ObjectDataOutput {
    buffer: BytesMut,
}

impl ObjectDataOutput {
    /// Creates a new `ObjectDataOutput` with default capacity.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256),
        }
    }

    /// Creates a new `ObjectDataOutput` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the written bytes as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the output and returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Returns the number of bytes written, which is also the write position.
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clears the buffer, removing all written data.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Appends `n` zero bytes.
    pub fn write_zero_bytes(&mut self, n: usize) {
        self.buffer.put_bytes(0, n);
    }

    fn slot(&mut self, position: usize, n: usize) -> Result<&mut [u8]> {
        let len = self.buffer.len();
        position
            .checked_add(n)
            .filter(|end| *end <= len)
            .map(move |end| &mut self.buffer[position..end])
            .ok_or_else(|| {
                CompactError::Serialization(format!(
                    "cannot write {} bytes at position {}: only {} bytes written",
                    n, position, len
                ))
            })
    }

    /// Overwrites a byte at an already written `position`.
    pub fn pwrite_byte(&mut self, position: usize, v: i8) -> Result<()> {
        self.slot(position, 1)?.copy_from_slice(&v.to_be_bytes());
        Ok(())
    }

    /// Overwrites a big-endian 16-bit integer at `position`.
    pub fn pwrite_short(&mut self, position: usize, v: i16) -> Result<()> {
        self.slot(position, 2)?.copy_from_slice(&v.to_be_bytes());
        Ok(())
    }

    /// Overwrites a big-endian 32-bit integer at `position`.
    pub fn pwrite_int(&mut self, position: usize, v: i32) -> Result<()> {
        self.slot(position, 4)?.copy_from_slice(&v.to_be_bytes());
        Ok(())
    }

    /// Overwrites a big-endian 64-bit integer at `position`.
    pub fn pwrite_long(&mut self, position: usize, v: i64) -> Result<()> {
        self.slot(position, 8)?.copy_from_slice(&v.to_be_bytes());
        Ok(())
    }

    /// Overwrites a big-endian 32-bit float at `position`.
    pub fn pwrite_float(&mut self, position: usize, v: f32) -> Result<()> {
        self.slot(position, 4)?.copy_from_slice(&v.to_be_bytes());
        Ok(())
    }

    /// Overwrites a big-endian 64-bit float at `position`.
    pub fn pwrite_double(&mut self, position: usize, v: f64) -> Result<()> {
        self.slot(position, 8)?.copy_from_slice(&v.to_be_bytes());
        Ok(())
    }

    /// Sets or clears bit `bit` (0 = least significant) of the byte at `position`.
    pub fn pwrite_boolean_bit(&mut self, position: usize, bit: u8, v: bool) -> Result<()> {
        let byte = &mut self.slot(position, 1)?[0];
        if v {
            *byte |= 1 << bit;
        } else {
            *byte &= !(1 << bit);
        }
        Ok(())
    }
}

impl Default for ObjectDataOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl DataOutput for ObjectDataOutput {
    fn write_byte(&mut self, v: i8) -> Result<()> {
        self.buffer.put_i8(v);
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.buffer.put_u8(u8::from(v));
        Ok(())
    }

    fn write_short(&mut self, v: i16) -> Result<()> {
        self.buffer.put_i16(v);
        Ok(())
    }

    fn write_int(&mut self, v: i32) -> Result<()> {
        self.buffer.put_i32(v);
        Ok(())
    }

    fn write_long(&mut self, v: i64) -> Result<()> {
        self.buffer.put_i64(v);
        Ok(())
    }

    fn write_float(&mut self, v: f32) -> Result<()> {
        self.buffer.put_f32(v);
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.buffer.put_f64(v);
        Ok(())
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.buffer.put_slice(v);
        Ok(())
    }

    fn write_string(&mut self, v: &str) -> Result<()> {
        let bytes = v.as_bytes();
        let len = i32::try_from(bytes.len()).map_err(|_| {
            CompactError::Serialization(format!(
                "string of {} bytes exceeds the maximum length",
                bytes.len()
            ))
        })?;
        self.write_int(len)?;
        self.write_bytes(bytes)
    }
}
