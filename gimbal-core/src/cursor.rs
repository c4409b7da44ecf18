use crate::error::{ParseResult, ProtocolError};

/// Bounds-checked little-endian reader over a report payload.
#[derive(Debug)]
pub struct PayloadCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PayloadCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, count: usize) -> ParseResult<&'a [u8]> {
        if self.remaining() < count {
            return Err(ProtocolError::InsufficientData {
                needed: count,
                available: self.remaining(),
            });
        }

        let slice = &self.bytes[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn skip(&mut self, count: usize) -> ParseResult<()> {
        self.take(count).map(|_| ())
    }

    pub fn read_u8(&mut self) -> ParseResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> ParseResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i16(&mut self) -> ParseResult<i16> {
        let bytes = self.take(2)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> ParseResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads an i16, or yields zero when the payload ends early.
    ///
    /// Trailing report words are optional on the wire, so a short read here
    /// is data absence rather than corruption.
    pub fn read_i16_or_zero(&mut self) -> i16 {
        self.read_i16().unwrap_or(0)
    }
}
