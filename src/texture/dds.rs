//! DDS container synthesis.
//!
//! Extracted texture payloads are written into a `.dds` file by prepending a
//! synthesized 128-byte header to the untouched compressed payload, with no
//! recompression. DXT formats use the FourCC pixel-format path; raw BGRA
//! uses explicit RGB bit masks.

use bon::Builder;

use crate::texture::TextureFormat;

pub const DDS_MAGIC: &[u8; 4] = b"DDS ";
/// Header size field value: the 124 bytes following the magic.
pub const DDS_HEADER_SIZE: u32 = 124;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PITCH: u32 = 0x8;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x20000;
const DDSD_LINEARSIZE: u32 = 0x80000;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_FOURCC: u32 = 0x4;
const DDPF_RGB: u32 = 0x40;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x400000;

/// Parameters for a synthesized DDS header.
#[derive(Debug, Clone, Builder)]
pub struct DdsHeader {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    #[builder(default = 1)]
    pub mip_count: u32,
}

impl DdsHeader {
    /// Linear size of the top mip level for block-compressed formats, or the
    /// row pitch for uncompressed ones.
    pub fn pitch_or_linear_size(&self) -> u32 {
        match self.format.bytes_per_block() {
            Some(_) => self.format.payload_len(self.width, self.height) as u32,
            None => self.width * 4,
        }
    }

    /// Serialize the 128-byte header (magic included).
    pub fn to_bytes(&self) -> [u8; 128] {
        fn put(out: &mut [u8; 128], offset: usize, value: u32) {
            out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }

        let mut out = [0u8; 128];

        let compressed = self.format.bytes_per_block().is_some();
        let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT;
        flags |= if compressed { DDSD_LINEARSIZE } else { DDSD_PITCH };
        if self.mip_count > 1 {
            flags |= DDSD_MIPMAPCOUNT;
        }

        let mut caps = DDSCAPS_TEXTURE;
        if self.mip_count > 1 {
            caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
        }

        put(&mut out, 4, DDS_HEADER_SIZE);
        put(&mut out, 8, flags);
        put(&mut out, 12, self.height);
        put(&mut out, 16, self.width);
        put(&mut out, 20, self.pitch_or_linear_size());
        // depth (24) stays 0; reserved block (32..76) stays 0
        put(&mut out, 28, self.mip_count);

        // DDS_PIXELFORMAT at offset 76
        put(&mut out, 76, 32);
        match self.format.fourcc() {
            Some(fourcc) => {
                put(&mut out, 80, DDPF_FOURCC);
                out[84..88].copy_from_slice(fourcc);
            }
            None => {
                put(&mut out, 80, DDPF_RGB | DDPF_ALPHAPIXELS);
                put(&mut out, 88, 32);
                put(&mut out, 92, 0x00FF0000); // R
                put(&mut out, 96, 0x0000FF00); // G
                put(&mut out, 100, 0x000000FF); // B
                put(&mut out, 104, 0xFF000000); // A
            }
        }

        put(&mut out, 108, caps);

        out[0..4].copy_from_slice(DDS_MAGIC);
        out
    }
}

/// Assemble a complete DDS file: synthesized header + untouched payload.
pub fn write_dds(header: &DdsHeader, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(128 + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    out
}
