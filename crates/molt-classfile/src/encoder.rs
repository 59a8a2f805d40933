//! Binary encoding and decoding utilities
//!
//! The writer/reader pair below carries the unit format: little-endian
//! fixed-width integers and length-prefixed UTF-8 strings.

use thiserror::Error;

/// Errors that can occur while decoding a binary unit
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Unexpected end of the input buffer
    #[error("Unexpected end of unit data at offset {0}")]
    UnexpectedEnd(usize),

    /// Invalid UTF-8 in a string payload
    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),

    /// An unknown instruction tag
    #[error("Invalid instruction tag {0:#04x} at offset {1}")]
    InvalidTag(u8, usize),

    /// A descriptor operand that fails to parse
    #[error("Invalid descriptor operand at offset {0}")]
    InvalidDescriptor(usize),
}

/// Writer for the binary unit format
pub struct UnitWriter {
    /// Internal buffer containing the encoded bytes
    pub(crate) buffer: Vec<u8>,
}

impl UnitWriter {
    /// Create a new empty writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new writer with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Borrow the encoded bytes
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Current offset (number of bytes written)
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Emit a raw byte
    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Emit a 16-bit unsigned integer (little-endian)
    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 32-bit unsigned integer (little-endian)
    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 32-bit signed integer (little-endian)
    pub fn emit_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a length-prefixed UTF-8 string
    pub fn emit_string(&mut self, value: &str) {
        self.emit_u32(value.len() as u32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Emit raw bytes with a length prefix
    pub fn emit_bytes(&mut self, value: &[u8]) {
        self.emit_u32(value.len() as u32);
        self.buffer.extend_from_slice(value);
    }

    /// Patch a previously emitted u32 value at the given offset
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        let bytes = value.to_le_bytes();
        self.buffer[offset..offset + 4].copy_from_slice(&bytes);
    }

    /// Reserve space for a u32 value (returns offset for later patching)
    pub fn reserve_u32(&mut self) -> usize {
        let offset = self.offset();
        self.emit_u32(0);
        offset
    }
}

impl Default for UnitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader for the binary unit format
pub struct UnitReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> UnitReader<'a> {
    /// Create a new reader over a byte buffer
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Current position in the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Remaining bytes in the buffer
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Whether there are more bytes to read
    pub fn has_more(&self) -> bool {
        self.position < self.buffer.len()
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        if self.position >= self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let value = self.buffer[self.position];
        self.position += 1;
        Ok(value)
    }

    /// Read a 16-bit unsigned integer (little-endian)
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        if self.position + 2 > self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = [self.buffer[self.position], self.buffer[self.position + 1]];
        self.position += 2;
        Ok(u16::from_le_bytes(bytes))
    }

    /// Read a 32-bit unsigned integer (little-endian)
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        if self.position + 4 > self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = [
            self.buffer[self.position],
            self.buffer[self.position + 1],
            self.buffer[self.position + 2],
            self.buffer[self.position + 3],
        ];
        self.position += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a 32-bit signed integer (little-endian)
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        if self.position + 4 > self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = [
            self.buffer[self.position],
            self.buffer[self.position + 1],
            self.buffer[self.position + 2],
            self.buffer[self.position + 3],
        ];
        self.position += 4;
        Ok(i32::from_le_bytes(bytes))
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u32()? as usize;
        if self.position + len > self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = &self.buffer[self.position..self.position + len];
        self.position += len;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(self.position - len))
    }

    /// Read a fixed number of bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        if self.position + count > self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = self.buffer[self.position..self.position + count].to_vec();
        self.position += count;
        Ok(bytes)
    }

    /// Read length-prefixed raw bytes
    pub fn read_len_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_emission() {
        let mut writer = UnitWriter::new();
        writer.emit_u8(0x42);
        writer.emit_u16(0x1234);
        writer.emit_u32(0xABCD_EF01);

        let bytes = writer.buffer();
        assert_eq!(bytes[0], 0x42);
        assert_eq!(bytes[1], 0x34); // Little-endian
        assert_eq!(bytes[2], 0x12);
        assert_eq!(bytes[3], 0x01); // Little-endian
        assert_eq!(bytes[4], 0xEF);
        assert_eq!(bytes[5], 0xCD);
        assert_eq!(bytes[6], 0xAB);
    }

    #[test]
    fn test_string_roundtrip() {
        let mut writer = UnitWriter::new();
        writer.emit_string("access$dispatch");
        writer.emit_string("");

        let mut reader = UnitReader::new(writer.buffer());
        assert_eq!(reader.read_string().unwrap(), "access$dispatch");
        assert_eq!(reader.read_string().unwrap(), "");
        assert!(!reader.has_more());
    }

    #[test]
    fn test_reader_bounds_checking() {
        let bytes = vec![0x01, 0x02];
        let mut reader = UnitReader::new(&bytes);

        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u8().unwrap(), 0x02);
        assert!(reader.read_u8().is_err()); // Should fail - out of bounds
        assert!(matches!(
            reader.read_u32(),
            Err(DecodeError::UnexpectedEnd(2))
        ));
    }

    #[test]
    fn test_patching() {
        let mut writer = UnitWriter::new();
        writer.emit_u8(0xAA);
        let offset = writer.reserve_u32();
        writer.emit_u8(0xBB);
        writer.patch_u32(offset, 0xDEAD_BEEF);

        let mut reader = UnitReader::new(writer.buffer());
        assert_eq!(reader.read_u8().unwrap(), 0xAA);
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_u8().unwrap(), 0xBB);
    }

    #[test]
    fn test_len_bytes_roundtrip() {
        let mut writer = UnitWriter::new();
        writer.emit_bytes(&[1, 2, 3]);

        let mut reader = UnitReader::new(writer.buffer());
        assert_eq!(reader.read_len_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_position_tracking() {
        let mut writer = UnitWriter::new();
        writer.emit_u8(0x01);
        writer.emit_u16(0x0203);
        writer.emit_i32(-7);

        let bytes = writer.buffer();
        let mut reader = UnitReader::new(bytes);

        assert_eq!(reader.position(), 0);
        reader.read_u8().unwrap();
        assert_eq!(reader.position(), 1);
        reader.read_u16().unwrap();
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.read_i32().unwrap(), -7);
        assert_eq!(reader.remaining(), 0);
    }
}
