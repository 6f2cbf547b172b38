//! Chunk framing for the `.perm.bin` container.
//!
//! A container is a flat sequence of chunks. Each chunk opens with a 16-byte
//! header: a type tag, the byte length of the body that follows the header,
//! an unknown word, and the offset (within the body) of a 64-byte resource
//! descriptor carrying the resource id and a fixed-size name. The next chunk
//! starts immediately after the body, so unrecognized tags can be skipped by
//! length alone.

use variantly::Variantly;
use winnow::Parser;
use winnow::binary::le_u32;

use crate::data::parser_utils::{WResult, parse_fixed_string, parse_i32_array};

/// Bytes occupied by the (tag, body length, unknown, descriptor offset) header.
pub const CHUNK_HEADER_SIZE: usize = 16;
/// Bytes occupied by the resource descriptor: seven i32 fields + 36-byte name.
pub const RESOURCE_DESC_SIZE: usize = 64;

pub const TAG_BONE_TABLE: u32 = 0x982456DB;
pub const TAG_TEXTURE: u32 = 0xCDBFA090;
pub const TAG_MESH_TABLE: u32 = 0x6DF963B3;
pub const TAG_MATERIAL: u32 = 0xF5F8516F;
pub const TAG_STREAM: u32 = 0x7A971479;

/// Chunk type dispatch tag. Unrecognized values are preserved so the walker
/// can log and skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Variantly)]
pub enum ChunkTag {
    BoneTable,
    Texture,
    MeshTable,
    Material,
    Stream,
    Unknown(u32),
}

impl ChunkTag {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            TAG_BONE_TABLE => ChunkTag::BoneTable,
            TAG_TEXTURE => ChunkTag::Texture,
            TAG_MESH_TABLE => ChunkTag::MeshTable,
            TAG_MATERIAL => ChunkTag::Material,
            TAG_STREAM => ChunkTag::Stream,
            other => ChunkTag::Unknown(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            ChunkTag::BoneTable => TAG_BONE_TABLE,
            ChunkTag::Texture => TAG_TEXTURE,
            ChunkTag::MeshTable => TAG_MESH_TABLE,
            ChunkTag::Material => TAG_MATERIAL,
            ChunkTag::Stream => TAG_STREAM,
            ChunkTag::Unknown(raw) => raw,
        }
    }
}

/// The fixed 16-byte chunk header, tagged with its absolute file offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Absolute offset of the header itself.
    pub offset: usize,
    pub tag: ChunkTag,
    /// Length of the chunk body (everything after the 16-byte header).
    pub data_len: u32,
    /// Offset of the resource descriptor within the body.
    pub desc_offset: u32,
}

impl ChunkHeader {
    /// Absolute offset of the first body byte.
    pub fn body_start(&self) -> usize {
        self.offset + CHUNK_HEADER_SIZE
    }

    /// Absolute offset one past the last body byte; the next chunk header.
    pub fn body_end(&self) -> usize {
        self.body_start() + self.data_len as usize
    }
}

/// The per-chunk resource descriptor: id plus display name.
///
/// The id is how other chunks reference this one (mesh descriptors name
/// stream ids, materials name texture ids).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDesc {
    pub id: u32,
    pub name: String,
}

pub fn parse_chunk_header(input: &mut &[u8], offset: usize) -> WResult<ChunkHeader> {
    let tag = le_u32.parse_next(input)?;
    let data_len = le_u32.parse_next(input)?;
    let _unknown = le_u32.parse_next(input)?;
    let desc_offset = le_u32.parse_next(input)?;
    Ok(ChunkHeader {
        offset,
        tag: ChunkTag::from_raw(tag),
        data_len,
        desc_offset,
    })
}

pub fn parse_resource_desc(input: &mut &[u8]) -> WResult<ResourceDesc> {
    let fields = parse_i32_array(input, 7)?;
    let name = parse_fixed_string(input, 36)?;
    Ok(ResourceDesc {
        id: fields[3] as u32,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&TAG_STREAM.to_le_bytes());
        bytes.extend_from_slice(&0x200u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0x10u32.to_le_bytes());

        let input = &mut bytes.as_slice();
        let header = parse_chunk_header(input, 0x40).unwrap();
        assert_eq!(header.tag, ChunkTag::Stream);
        assert_eq!(header.data_len, 0x200);
        assert_eq!(header.desc_offset, 0x10);
        assert_eq!(header.body_start(), 0x50);
        assert_eq!(header.body_end(), 0x250);
    }

    #[test]
    fn unknown_tags_are_preserved() {
        assert_eq!(ChunkTag::from_raw(0xDEAD_BEEF), ChunkTag::Unknown(0xDEAD_BEEF));
        assert_eq!(ChunkTag::from_raw(0xDEAD_BEEF).raw(), 0xDEAD_BEEF);
        assert_eq!(ChunkTag::from_raw(TAG_MATERIAL), ChunkTag::Material);
    }

    #[test]
    fn resource_desc_id_and_name() {
        let mut bytes = Vec::new();
        for v in [0i32, 0, 0, 0x1234, 0, 0, 0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(b"pak_shirt_a");
        bytes.resize(7 * 4 + 36, 0);

        let input = &mut bytes.as_slice();
        let desc = parse_resource_desc(input).unwrap();
        assert_eq!(desc.id, 0x1234);
        assert_eq!(desc.name, "pak_shirt_a");
    }
}
