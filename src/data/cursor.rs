//! Sequential/random-access reader over an in-memory byte buffer.
//!
//! The `.perm.bin` walk is seek-heavy: chunk bodies are addressed by offsets
//! stored in earlier chunks, and vertex streams are read with a per-element
//! stride that is larger than the decoded attributes. The cursor keeps an
//! absolute position over a borrowed slice; `seek` never bounds-checks (the
//! target may be one-past-end between chunks) and every read fails with the
//! offset where the overrun was detected.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("read of {requested} bytes at 0x{offset:X} exceeds buffer (0x{available:X} bytes)")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        available: usize,
    },
}

/// Scale factor for the unsigned 2.14 fixed-point values used by packed
/// position and UV streams.
const FIXED_2_14: f32 = 1.0 / 16384.0;

pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    /// Current absolute offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the current position and the end of the buffer.
    pub fn bytes_remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reposition to an absolute offset. The target is not validated here;
    /// an out-of-range position fails on the next read instead.
    pub fn seek(&mut self, offset: usize) {
        self.pos = offset;
    }

    pub fn skip(&mut self, count: usize) {
        self.pos += count;
    }

    /// Borrow `count` bytes at the current position and advance past them.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], CursorError> {
        let end = self.pos.checked_add(count).ok_or(CursorError::OutOfBounds {
            offset: self.pos,
            requested: count,
            available: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(CursorError::OutOfBounds {
                offset: self.pos,
                requested: count,
                available: self.data.len(),
            });
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32, CursorError> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_f32(&mut self) -> Result<f32, CursorError> {
        let bytes = self.read_bytes(4)?;
        Ok(f32::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Read a u16 and scale it as unsigned 2.14 fixed point.
    pub fn read_fixed14(&mut self) -> Result<f32, CursorError> {
        Ok(self.read_u16()? as f32 * FIXED_2_14)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_reads_advance() {
        let data = [0x01u8, 0x02, 0x03, 0x04, 0x00, 0x00, 0x80, 0x3F];
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.read_u16().unwrap(), 0x0302);
        assert_eq!(cursor.position(), 3);
        cursor.seek(4);
        assert_eq!(cursor.read_f32().unwrap(), 1.0);
        assert!(cursor.at_end());
    }

    #[test]
    fn read_past_end_reports_offset() {
        let data = [0u8; 3];
        let mut cursor = Cursor::new(&data);
        cursor.seek(2);
        let err = cursor.read_u32().unwrap_err();
        assert_eq!(
            err,
            CursorError::OutOfBounds {
                offset: 2,
                requested: 4,
                available: 3,
            }
        );
    }

    #[test]
    fn seek_past_end_defers_to_read() {
        let data = [0u8; 4];
        let mut cursor = Cursor::new(&data);
        cursor.seek(100);
        assert!(cursor.read_u8().is_err());
        // seek back recovers
        cursor.seek(0);
        assert_eq!(cursor.read_u32().unwrap(), 0);
    }

    #[test]
    fn read_bytes_is_a_view() {
        let data = [1u8, 2, 3, 4];
        let mut cursor = Cursor::new(&data);
        let view = cursor.read_bytes(4).unwrap();
        assert_eq!(view.as_ptr(), data.as_ptr());
    }

    #[test]
    fn fixed14_scaling() {
        let data = 16384u16.to_le_bytes();
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_fixed14().unwrap(), 1.0);
    }
}
