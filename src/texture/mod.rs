//! Texture formats, decoded rasters, and the DXT/DDS codec paths.
//!
//! A `.perm.bin` texture chunk describes dimensions and a compression format;
//! the compressed payload itself lives in the `.temp.bin` sidecar. From one
//! resolved texture both outputs are available without re-parsing: a DDS
//! container wrapping the untouched payload ([`dds`]) or decoded RGBA8
//! pixels ([`dxt`]).

pub mod dds;
pub mod dxt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error(
        "payload too short for {width}x{height} {format:?}: expected {expected} bytes, have {actual}"
    )]
    PayloadTooShort {
        format: TextureFormat,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("unsupported texture format code {code}")]
    UnsupportedFormat { code: i32 },
}

/// Pixel format of a texture payload.
///
/// Codes 1-3 are the DXT block-compressed formats; code 0 is raw 32-bit
/// BGRA. Anything else in the chunk header is unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextureFormat {
    Dxt1,
    Dxt3,
    Dxt5,
    Bgra8,
}

impl TextureFormat {
    pub fn from_code(code: i32) -> Result<Self, TextureError> {
        match code {
            0 => Ok(TextureFormat::Bgra8),
            1 => Ok(TextureFormat::Dxt1),
            2 => Ok(TextureFormat::Dxt3),
            3 => Ok(TextureFormat::Dxt5),
            _ => Err(TextureError::UnsupportedFormat { code }),
        }
    }

    /// Compressed bytes per 4x4 block, or `None` for uncompressed formats.
    pub fn bytes_per_block(self) -> Option<usize> {
        match self {
            TextureFormat::Dxt1 => Some(8),
            TextureFormat::Dxt3 | TextureFormat::Dxt5 => Some(16),
            TextureFormat::Bgra8 => None,
        }
    }

    pub fn fourcc(self) -> Option<&'static [u8; 4]> {
        match self {
            TextureFormat::Dxt1 => Some(b"DXT1"),
            TextureFormat::Dxt3 => Some(b"DXT3"),
            TextureFormat::Dxt5 => Some(b"DXT5"),
            TextureFormat::Bgra8 => None,
        }
    }

    /// Expected payload size in bytes for a `width` x `height` image.
    pub fn payload_len(self, width: u32, height: u32) -> usize {
        match self.bytes_per_block() {
            Some(block_size) => {
                let blocks_x = width.div_ceil(4) as usize;
                let blocks_y = height.div_ceil(4) as usize;
                blocks_x * blocks_y * block_size
            }
            None => width as usize * height as usize * 4,
        }
    }
}

/// A decoded RGBA8 raster, `width * height * 4` bytes, row-major from the
/// top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbaImage {
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}
