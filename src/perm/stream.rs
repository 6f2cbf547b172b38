//! Data stream chunks: the raw per-vertex and index buffers.
//!
//! A stream chunk carries a 128-byte header (32 i32 fields, of which the
//! stride and element count matter) followed immediately by the packed
//! element data. Streams are referenced by resource id from mesh
//! descriptors; the same stream can back several submeshes. The element
//! interpretation depends on which descriptor slot references the stream,
//! so the typed decoders live here as methods and the record itself stays
//! untyped.

use crate::data::cursor::Cursor;
use crate::data::parser_utils::{WResult, parse_i32_array};
use crate::perm::PermError;

/// Header field count (i32s) preceding stream data.
pub const STREAM_HEADER_FIELDS: usize = 32;

/// A raw data stream borrowed from the parse buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord<'a> {
    pub id: u32,
    pub name: String,
    /// Bytes from one element to the next.
    pub stride: u32,
    pub element_count: u32,
    /// Packed element data, clamped to the chunk body. May be shorter than
    /// `element_count * stride` if the chunk was truncated; decoders report
    /// that as `MalformedVertexStream`.
    pub data: &'a [u8],
    /// Absolute file offset of `data`, for error reporting.
    pub data_offset: usize,
}

/// Per-vertex skinning attributes: four bone slots, unused ones zero-weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinVertex {
    pub bone_indices: [u8; 4],
    pub weights: [f32; 4],
}

/// Parse the 128-byte stream header. Returns `(stride, element_count)`.
pub fn parse_stream_header(input: &mut &[u8]) -> WResult<(u32, u32)> {
    let fields = parse_i32_array(input, STREAM_HEADER_FIELDS)?;
    Ok((fields[3] as u32, fields[4] as u32))
}

impl<'a> StreamRecord<'a> {
    fn check_len(&self, expected: usize) -> Result<(), PermError> {
        if self.data.len() < expected {
            return Err(PermError::MalformedVertexStream {
                stream_id: self.id,
                element_count: self.element_count,
                stride: self.stride,
                expected,
                available: self.data.len(),
                offset: self.data_offset,
            });
        }
        Ok(())
    }

    /// Decode as a position stream.
    ///
    /// Stride 12 is three f32s; stride 16 is three unsigned 2.14 fixed-point
    /// u16s with the remainder of the stride unused. Values stay in the
    /// source coordinate convention; the assembler remaps axes.
    pub fn positions(&self) -> Result<Vec<[f32; 3]>, PermError> {
        let count = self.element_count as usize;
        let stride = self.stride as usize;
        self.check_len(count * stride)?;

        let mut cursor = Cursor::new(self.data);
        let mut out = Vec::with_capacity(count);
        match self.stride {
            12 => {
                for n in 0..count {
                    cursor.seek(n * stride);
                    out.push([
                        cursor.read_f32()?,
                        cursor.read_f32()?,
                        cursor.read_f32()?,
                    ]);
                }
            }
            16 => {
                for n in 0..count {
                    cursor.seek(n * stride);
                    out.push([
                        cursor.read_fixed14()?,
                        cursor.read_fixed14()?,
                        cursor.read_fixed14()?,
                    ]);
                }
            }
            other => {
                return Err(PermError::UnsupportedVertexStride {
                    stream_id: self.id,
                    stride: other,
                });
            }
        }
        Ok(out)
    }

    /// Decode as a UV stream: two 2.14 fixed-point u16s per element, in the
    /// source top-left-origin space.
    pub fn uvs(&self) -> Result<Vec<[f32; 2]>, PermError> {
        let count = self.element_count as usize;
        let stride = self.stride as usize;
        if stride < 4 {
            return Err(PermError::UnsupportedVertexStride {
                stream_id: self.id,
                stride: self.stride,
            });
        }
        self.check_len(count * stride)?;

        let mut cursor = Cursor::new(self.data);
        let mut out = Vec::with_capacity(count);
        for n in 0..count {
            cursor.seek(n * stride);
            out.push([cursor.read_fixed14()?, cursor.read_fixed14()?]);
        }
        Ok(out)
    }

    /// Decode as a skin stream: four u8 bone indices then four u8 weights
    /// scaled to `[0, 1]`. Weight sums are passed through as stored.
    pub fn skin(&self) -> Result<Vec<SkinVertex>, PermError> {
        let count = self.element_count as usize;
        let stride = self.stride as usize;
        if stride < 8 {
            return Err(PermError::UnsupportedVertexStride {
                stream_id: self.id,
                stride: self.stride,
            });
        }
        self.check_len(count * stride)?;

        let mut cursor = Cursor::new(self.data);
        let mut out = Vec::with_capacity(count);
        for n in 0..count {
            cursor.seek(n * stride);
            let bone_indices: [u8; 4] = cursor.read_bytes(4)?.try_into().unwrap();
            let mut weights = [0f32; 4];
            for weight in &mut weights {
                *weight = cursor.read_u8()? as f32 / 255.0;
            }
            out.push(SkinVertex {
                bone_indices,
                weights,
            });
        }
        Ok(out)
    }

    /// Decode as an index stream: tightly packed u16 indices.
    pub fn indices(&self) -> Result<Vec<u32>, PermError> {
        let count = self.element_count as usize;
        self.check_len(count * 2)?;

        let mut cursor = Cursor::new(self.data);
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(cursor.read_u16()? as u32);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record<'a>(stride: u32, count: u32, data: &'a [u8]) -> StreamRecord<'a> {
        StreamRecord {
            id: 7,
            name: String::from("stream"),
            stride,
            element_count: count,
            data,
            data_offset: 0x100,
        }
    }

    #[test]
    fn f32_positions() {
        let mut data = Vec::new();
        for v in [1.0f32, 2.0, 3.0, -1.0, -2.0, -3.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let positions = record(12, 2, &data).positions().unwrap();
        assert_eq!(positions, vec![[1.0, 2.0, 3.0], [-1.0, -2.0, -3.0]]);
    }

    #[test]
    fn fixed_point_positions_skip_stride_remainder() {
        let mut data = Vec::new();
        for _ in 0..2 {
            for v in [16384u16, 8192, 4096] {
                data.extend_from_slice(&v.to_le_bytes());
            }
            // 10 bytes of padding to fill the 16-byte stride
            data.extend_from_slice(&[0xFF; 10]);
        }
        let positions = record(16, 2, &data).positions().unwrap();
        assert_eq!(positions, vec![[1.0, 0.5, 0.25]; 2]);
    }

    #[test]
    fn truncated_stream_is_malformed() {
        let data = vec![0u8; 23]; // one byte short of 2 elements at stride 12
        let err = record(12, 2, &data).positions().unwrap_err();
        assert_eq!(
            err,
            PermError::MalformedVertexStream {
                stream_id: 7,
                element_count: 2,
                stride: 12,
                expected: 24,
                available: 23,
                offset: 0x100,
            }
        );
    }

    #[test]
    fn unsupported_position_stride() {
        let data = vec![0u8; 40];
        let err = record(20, 2, &data).positions().unwrap_err();
        assert!(matches!(
            err,
            PermError::UnsupportedVertexStride { stride: 20, .. }
        ));
    }

    #[test]
    fn skin_filters_nothing_and_scales_weights() {
        let data = [1u8, 2, 3, 0, 255, 128, 0, 0];
        let skin = record(8, 1, &data).skin().unwrap();
        assert_eq!(skin[0].bone_indices, [1, 2, 3, 0]);
        assert_eq!(skin[0].weights[0], 1.0);
        assert!((skin[0].weights[1] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(skin[0].weights[3], 0.0);
    }

    #[test]
    fn indices_are_packed_u16() {
        let mut data = Vec::new();
        for v in [0u16, 1, 2, 2, 1, 3] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let indices = record(2, 6, &data).indices().unwrap();
        assert_eq!(indices, vec![0, 1, 2, 2, 1, 3]);
    }
}
