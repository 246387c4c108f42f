//! Data input traits and implementations for the Compact binary format.

use crate::error::{CompactError, Result};
use bytes::Buf;
use std::io::Cursor;

/// Trait for reading primitive values sequentially.
///
/// All multi-byte values are read in big-endian byte order.
pub trait DataInput {
    /// Reads a single byte (i8).
    fn read_byte(&mut self) -> Result<i8>;

    /// Reads a boolean from a single byte.
    fn read_bool(&mut self) -> Result<bool>;

    /// Reads a 16-bit signed integer in big-endian order.
    fn read_short(&mut self) -> Result<i16>;

    /// Reads a 32-bit signed integer in big-endian order.
    fn read_int(&mut self) -> Result<i32>;

    /// Reads a 64-bit signed integer in big-endian order.
    fn read_long(&mut self) -> Result<i64>;

    /// Reads a 32-bit floating point in big-endian order.
    fn read_float(&mut self) -> Result<f32>;

    /// Reads a 64-bit floating point in big-endian order.
    fn read_double(&mut self) -> Result<f64>;

    /// Reads the specified number of raw bytes.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Reads a length-prefixed UTF-8 string.
    fn read_string(&mut self) -> Result<String>;
}

/// A buffer-based implementation of `DataInput` with random access.
///
/// Besides sequential reads, the Compact reader moves the cursor to field
/// offsets and reads single values at absolute positions without moving it.
#[derive(Debug)]
pub struct ObjectDataInput<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ObjectDataInput<'a> {
    /// Creates a new `ObjectDataInput` from the given byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Returns the number of bytes remaining to be read.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Returns the current position in the buffer.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Moves the cursor to an absolute position.
    ///
    /// Positions past the end are accepted; the next read fails instead.
    pub fn set_position(&mut self, position: usize) {
        self.cursor.set_position(position as u64);
    }

    /// Returns the whole underlying buffer, independent of the cursor.
    pub fn as_slice(&self) -> &'a [u8] {
        *self.cursor.get_ref()
    }

    /// Returns the total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    /// Returns true if the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    fn ensure_remaining(&self, n: usize) -> Result<()> {
        if self.cursor.remaining() < n {
            Err(CompactError::Serialization(format!(
                "insufficient data: need {} bytes, have {}",
                n,
                self.cursor.remaining()
            )))
        } else {
            Ok(())
        }
    }

    /// Returns `n` bytes at `position` without moving the cursor.
    pub fn slice_at(&self, position: usize, n: usize) -> Result<&'a [u8]> {
        let data: &'a [u8] = *self.cursor.get_ref();
        position
            .checked_add(n)
            .and_then(|end| data.get(position..end))
            .ok_or_else(|| {
                CompactError::Serialization(format!(
                    "position {} with length {} is outside of the buffer of {} bytes",
                    position,
                    n,
                    data.len()
                ))
            })
    }

    /// Reads a byte at `position` without moving the cursor.
    pub fn read_byte_at(&self, position: usize) -> Result<i8> {
        Ok(self.slice_at(position, 1)?[0] as i8)
    }

    /// Reads a big-endian 16-bit integer at `position` without moving the cursor.
    pub fn read_short_at(&self, position: usize) -> Result<i16> {
        let mut bytes = self.slice_at(position, 2)?;
        Ok(bytes.get_i16())
    }

    /// Reads a big-endian 32-bit integer at `position` without moving the cursor.
    pub fn read_int_at(&self, position: usize) -> Result<i32> {
        let mut bytes = self.slice_at(position, 4)?;
        Ok(bytes.get_i32())
    }

    /// Reads a big-endian 64-bit integer at `position` without moving the cursor.
    pub fn read_long_at(&self, position: usize) -> Result<i64> {
        let mut bytes = self.slice_at(position, 8)?;
        Ok(bytes.get_i64())
    }

    /// Reads a big-endian 32-bit float at `position` without moving the cursor.
    pub fn read_float_at(&self, position: usize) -> Result<f32> {
        let mut bytes = self.slice_at(position, 4)?;
        Ok(bytes.get_f32())
    }

    /// Reads a big-endian 64-bit float at `position` without moving the cursor.
    pub fn read_double_at(&self, position: usize) -> Result<f64> {
        let mut bytes = self.slice_at(position, 8)?;
        Ok(bytes.get_f64())
    }

    /// Reads bit `bit` (0 = least significant) of the byte at `position`.
    pub fn read_boolean_bit_at(&self, position: usize, bit: u8) -> Result<bool> {
        let byte = self.slice_at(position, 1)?[0];
        Ok((byte >> bit) & 1 != 0)
    }
}

impl DataInput for ObjectDataInput<'_> {
    fn read_byte(&mut self) -> Result<i8> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_i8())
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_u8() != 0)
    }

    fn read_short(&mut self) -> Result<i16> {
        self.ensure_remaining(2)?;
        Ok(self.cursor.get_i16())
    }

    fn read_int(&mut self) -> Result<i32> {
        self.ensure_remaining(4)?;
        Ok(self.cursor.get_i32())
    }

    fn read_long(&mut self) -> Result<i64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_i64())
    }

    fn read_float(&mut self) -> Result<f32> {
        self.ensure_remaining(4)?;
        Ok(self.cursor.get_f32())
    }

    fn read_double(&mut self) -> Result<f64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_f64())
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure_remaining(len)?;
        let mut buf = vec![0u8; len];
        self.cursor.copy_to_slice(&mut buf);
        Ok(buf)
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_int()?;
        if len < 0 {
            return Err(CompactError::Serialization(format!(
                "invalid string length: {}",
                len
            )));
        }
        let bytes = self.read_bytes(len as usize)?;
        String::from_utf8(bytes)
            .map_err(|e| CompactError::Serialization(format!("invalid UTF-8 string: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_input() {
        let data = [1, 2, 3, 4];
        let input = ObjectDataInput::new(&data);
        assert_eq!(input.remaining(), 4);
        assert_eq!(input.position(), 0);
        assert_eq!(input.len(), 4);
    }

    #[test]
    fn test_sequential_reads_are_big_endian() {
        let data = [
            0xFF, 42, 0, 0x01, 0x02, 0x03, 0x04, 0x3F, 0x80, 0x00, 0x00, 0x3F, 0xF0, 0, 0, 0, 0, 0, 0,
        ];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_byte().unwrap(), -1);
        assert!(input.read_bool().unwrap());
        assert!(!input.read_bool().unwrap());
        assert_eq!(input.read_int().unwrap(), 0x0102_0304);
        assert_eq!(input.read_float().unwrap(), 1.0);
        assert_eq!(input.read_double().unwrap(), 1.0);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_string_length_prefix() {
        let mut input = ObjectDataInput::new(&[0, 0, 0, 3, b'a', b'g', b'e']);
        assert_eq!(input.read_string().unwrap(), "age");

        let mut bad_utf8 = ObjectDataInput::new(&[0, 0, 0, 2, 0xC3, 0x28]);
        assert!(bad_utf8.read_string().is_err());

        let mut negative = ObjectDataInput::new(&[0x80, 0, 0, 0]);
        assert!(negative.read_string().is_err());
    }

    #[test]
    fn test_insufficient_data() {
        let data = [0x01, 0x02, 0x03];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_int().is_err());
        assert!(input.read_bytes(5).is_err());
    }

    #[test]
    fn test_positional_reads_do_not_move_cursor() {
        let data = [0, 0, 0, 7, 0, 9, 0xFF];
        let input = ObjectDataInput::new(&data);
        assert_eq!(input.read_int_at(0).unwrap(), 7);
        assert_eq!(input.read_short_at(4).unwrap(), 9);
        assert_eq!(input.read_byte_at(6).unwrap(), -1);
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn test_positional_read_out_of_bounds() {
        let data = [0, 0, 0];
        let input = ObjectDataInput::new(&data);
        assert!(input.read_int_at(0).is_err());
        assert!(input.read_byte_at(3).is_err());
        assert!(input.read_long_at(usize::MAX).is_err());
    }

    #[test]
    fn test_read_boolean_bit_at() {
        let data = [0b0000_0101];
        let input = ObjectDataInput::new(&data);
        assert!(input.read_boolean_bit_at(0, 0).unwrap());
        assert!(!input.read_boolean_bit_at(0, 1).unwrap());
        assert!(input.read_boolean_bit_at(0, 2).unwrap());
    }

    #[test]
    fn test_set_position_past_end_fails_next_read() {
        let data = [0, 0, 0, 1];
        let mut input = ObjectDataInput::new(&data);
        input.set_position(10);
        assert_eq!(input.remaining(), 0);
        assert!(input.read_byte().is_err());
        input.set_position(0);
        assert_eq!(input.read_int().unwrap(), 1);
    }
}
