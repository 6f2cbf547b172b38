//! Texture chunks: dimensions, format, and the sidecar payload reference.
//!
//! A texture chunk does not embed its pixels. The 55-field header names the
//! compression format, a dimension code (textures are square powers of two
//! from 64 to 2048), and the offset/length of the compressed payload inside
//! the companion `.temp.bin` file. Payload resolution happens at assembly,
//! when the sidecar buffer is available.

use crate::data::parser_utils::parse_i32_array;
use crate::perm::PermError;
use crate::texture::TextureFormat;

/// Header field count (i32s) of a texture chunk payload.
pub const TEXTURE_HEADER_FIELDS: usize = 55;

/// Dimension codes map to square sizes: 0x10005 is 64, each step doubles.
const DIMENSION_CODE_BASE: i32 = 0x10005;
const DIMENSION_CODE_MAX: i32 = 0x1000A;

/// A parsed texture header. `data_offset`/`data_len` address the compressed
/// payload within the `.temp.bin` sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRecord {
    pub id: u32,
    pub name: String,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub data_offset: u32,
    pub data_len: u32,
}

fn dimension_from_code(code: i32, offset: usize) -> Result<u32, PermError> {
    if !(DIMENSION_CODE_BASE..=DIMENSION_CODE_MAX).contains(&code) {
        return Err(PermError::UnsupportedTextureDimension { code, offset });
    }
    Ok(64u32 << (code - DIMENSION_CODE_BASE))
}

/// Parse a texture chunk payload (everything after the resource descriptor).
/// `payload_offset` is the absolute file offset, used for error context.
pub fn parse_texture(
    payload: &[u8],
    payload_offset: usize,
    id: u32,
    name: String,
) -> Result<TextureRecord, PermError> {
    let mut rest: &[u8] = payload;
    let fields =
        parse_i32_array(&mut rest, TEXTURE_HEADER_FIELDS).map_err(|e| PermError::ChunkParse {
            offset: payload_offset,
            detail: format!("texture header: {e}"),
        })?;

    let format = TextureFormat::from_code(fields[1]).map_err(|_| {
        PermError::UnsupportedTextureFormat {
            code: fields[1],
            offset: payload_offset,
        }
    })?;
    let size = dimension_from_code(fields[4], payload_offset)?;

    Ok(TextureRecord {
        id,
        name,
        format,
        width: size,
        height: size,
        data_offset: fields[12] as u32,
        data_len: fields[13] as u32,
    })
}

impl TextureRecord {
    /// Slice this texture's compressed payload out of the sidecar buffer.
    pub fn payload<'a>(&self, sidecar: &'a [u8]) -> Result<&'a [u8], PermError> {
        let start = self.data_offset as usize;
        let end = start + self.data_len as usize;
        if end > sidecar.len() {
            return Err(PermError::ChunkOutOfBounds {
                offset: start,
                length: self.data_len as usize,
                file_size: sidecar.len(),
            });
        }
        Ok(&sidecar[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture_payload(format_code: i32, dim_code: i32, offset: i32, len: i32) -> Vec<u8> {
        let mut fields = [0i32; TEXTURE_HEADER_FIELDS];
        fields[1] = format_code;
        fields[4] = dim_code;
        fields[12] = offset;
        fields[13] = len;
        let mut payload = Vec::new();
        for v in fields {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        payload
    }

    #[test]
    fn dimension_codes_double_from_64() {
        let payload = texture_payload(3, 0x10005, 0, 8);
        let tex = parse_texture(&payload, 0, 1, String::new()).unwrap();
        assert_eq!((tex.width, tex.height), (64, 64));
        assert_eq!(tex.format, TextureFormat::Dxt5);

        let payload = texture_payload(1, 0x1000A, 0, 8);
        let tex = parse_texture(&payload, 0, 1, String::new()).unwrap();
        assert_eq!((tex.width, tex.height), (2048, 2048));
    }

    #[test]
    fn unknown_dimension_code_is_rejected() {
        let payload = texture_payload(1, 0x10010, 0, 8);
        let err = parse_texture(&payload, 0x40, 1, String::new()).unwrap_err();
        assert_eq!(
            err,
            PermError::UnsupportedTextureDimension {
                code: 0x10010,
                offset: 0x40,
            }
        );
    }

    #[test]
    fn unknown_format_code_is_rejected() {
        let payload = texture_payload(9, 0x10005, 0, 8);
        let err = parse_texture(&payload, 0x40, 1, String::new()).unwrap_err();
        assert_eq!(
            err,
            PermError::UnsupportedTextureFormat {
                code: 9,
                offset: 0x40,
            }
        );
    }

    #[test]
    fn sidecar_payload_bounds() {
        let payload = texture_payload(1, 0x10005, 4, 8);
        let tex = parse_texture(&payload, 0, 1, String::new()).unwrap();

        let sidecar = [0u8; 12];
        assert_eq!(tex.payload(&sidecar).unwrap().len(), 8);

        let short = [0u8; 11];
        assert!(tex.payload(&short).is_err());
    }
}
