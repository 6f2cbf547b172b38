//! Parser for the `.perm.bin` chunk container.
//!
//! A parse session walks the chunk sequence once and sorts recognized
//! chunks into typed tables: data streams keyed by resource id, materials,
//! texture headers, submesh descriptors, and bone names. Unknown chunk tags
//! are skipped by length. Malformed data inside a recognized chunk fails
//! that chunk (or that submesh) only; the failure is recorded in the
//! session's `failures` list and the walk continues.

/// Bone-name table chunks
pub mod bones;
/// Chunk framing: headers, tags, resource descriptors
pub mod chunk;
/// Material chunks and texture-slot bindings
pub mod material;
/// Mesh table chunks and submesh descriptors
pub mod mesh;
/// Raw vertex/index data stream chunks
pub mod stream;
/// Texture header chunks
pub mod texture;

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::data::cursor::{Cursor, CursorError};
use crate::perm::chunk::{
    CHUNK_HEADER_SIZE, ChunkHeader, ChunkTag, RESOURCE_DESC_SIZE, ResourceDesc,
    parse_chunk_header, parse_resource_desc,
};
use crate::perm::material::MaterialRecord;
use crate::perm::mesh::SubmeshDesc;
use crate::perm::stream::StreamRecord;
use crate::perm::texture::TextureRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermError {
    #[error("read out of bounds: {err}")]
    Cursor {
        #[from]
        err: CursorError,
    },
    #[error(
        "chunk at 0x{offset:X} extends beyond the buffer: length 0x{length:X}, buffer size 0x{file_size:X}"
    )]
    ChunkOutOfBounds {
        offset: usize,
        length: usize,
        file_size: usize,
    },
    #[error("chunk at 0x{offset:X} is too small for its resource descriptor")]
    TruncatedChunk { offset: usize },
    #[error("unsupported texture format code {code} at 0x{offset:X}")]
    UnsupportedTextureFormat { code: i32, offset: usize },
    #[error("unsupported texture dimension code {code:#X} at 0x{offset:X}")]
    UnsupportedTextureDimension { code: i32, offset: usize },
    #[error(
        "vertex stream {stream_id} at 0x{offset:X} truncated: {element_count} elements of stride {stride} need {expected} bytes, have {available}"
    )]
    MalformedVertexStream {
        stream_id: u32,
        element_count: u32,
        stride: u32,
        expected: usize,
        available: usize,
        offset: usize,
    },
    #[error("unsupported stride {stride} for stream {stream_id}")]
    UnsupportedVertexStride { stream_id: u32, stride: u32 },
    #[error(
        "index range {first_index}..{first_index}+{index_count} exceeds stream {stream_id} ({available} indices)"
    )]
    IndexRangeOutOfBounds {
        stream_id: u32,
        first_index: u32,
        index_count: u32,
        available: usize,
    },
    #[error("submesh references missing stream {stream_id}")]
    MissingStream { stream_id: u32 },
    #[error("material references missing texture {texture_id}")]
    MissingTexture { texture_id: u32 },
    #[error("no sidecar payload available for texture {texture_id}")]
    MissingTexturePayload { texture_id: u32 },
    #[error("chunk parse error at 0x{offset:X}: {detail}")]
    ChunkParse { offset: usize, detail: String },
}

/// A recognized chunk (or submesh) that failed to parse, with enough
/// context to report "which record, at which offset, why".
#[derive(Debug, PartialEq, Eq)]
pub struct ChunkFailure {
    pub offset: usize,
    pub tag: ChunkTag,
    pub resource_id: Option<u32>,
    pub error: PermError,
}

/// Decoded body of a single chunk.
#[derive(Debug)]
pub enum ChunkPayload<'a> {
    BoneTable(Vec<String>),
    Texture(TextureRecord),
    MeshTable(Vec<Result<SubmeshDesc, PermError>>),
    Material(MaterialRecord),
    Stream(StreamRecord<'a>),
    /// Unknown tag, skipped by length.
    Skipped,
}

/// Output of one parse session over a `.perm.bin` buffer.
///
/// Records borrow the input buffer; assembly copies what it keeps. Parsing
/// the same buffer twice yields structurally equal sessions.
#[derive(Debug, Default, PartialEq)]
pub struct PermFile<'a> {
    pub streams: HashMap<u32, StreamRecord<'a>>,
    pub materials: Vec<MaterialRecord>,
    pub textures: Vec<TextureRecord>,
    pub submeshes: Vec<SubmeshDesc>,
    pub bone_names: Vec<String>,
    pub failures: Vec<ChunkFailure>,
}

impl<'a> PermFile<'a> {
    pub fn stream(&self, id: u32) -> Result<&StreamRecord<'a>, PermError> {
        self.streams
            .get(&id)
            .ok_or(PermError::MissingStream { stream_id: id })
    }
}

fn winnow_err(offset: usize, what: &str, e: impl std::fmt::Display) -> PermError {
    PermError::ChunkParse {
        offset,
        detail: format!("{what}: {e}"),
    }
}

/// Parse one chunk body, dispatching on the header tag.
///
/// `body` is the full chunk body (resource descriptor included). Returns the
/// resource descriptor (absent for skipped chunks) and the typed payload.
pub fn parse_chunk_body<'a>(
    header: &ChunkHeader,
    body: &'a [u8],
) -> Result<(Option<ResourceDesc>, ChunkPayload<'a>), PermError> {
    if header.tag.is_unknown() {
        debug!(
            offset = header.offset,
            "skipping unrecognized chunk with tag {:#010X}",
            header.tag.raw()
        );
        return Ok((None, ChunkPayload::Skipped));
    }

    let desc_offset = header.desc_offset as usize;
    let payload_start = desc_offset + RESOURCE_DESC_SIZE;
    if payload_start > body.len() {
        return Err(PermError::TruncatedChunk {
            offset: header.offset,
        });
    }

    let desc_input = &mut &body[desc_offset..];
    let desc = parse_resource_desc(desc_input)
        .map_err(|e| winnow_err(header.body_start() + desc_offset, "resource descriptor", e))?;

    let payload = &body[payload_start..];
    let payload_offset = header.body_start() + payload_start;

    let decoded = match header.tag {
        ChunkTag::BoneTable => {
            let input = &mut &payload[..];
            ChunkPayload::BoneTable(
                bones::parse_bone_table(input)
                    .map_err(|e| winnow_err(payload_offset, "bone table", e))?,
            )
        }
        ChunkTag::Texture => ChunkPayload::Texture(texture::parse_texture(
            payload,
            payload_offset,
            desc.id,
            desc.name.clone(),
        )?),
        ChunkTag::MeshTable => {
            ChunkPayload::MeshTable(mesh::parse_mesh_table(payload, payload_offset)?)
        }
        ChunkTag::Material => {
            let input = &mut &payload[..];
            ChunkPayload::Material(
                material::parse_material(input, desc.id, desc.name.clone())
                    .map_err(|e| winnow_err(payload_offset, "material", e))?,
            )
        }
        ChunkTag::Stream => {
            let input = &mut &payload[..];
            let (stride, element_count) = stream::parse_stream_header(input)
                .map_err(|e| winnow_err(payload_offset, "stream header", e))?;
            let header_len = stream::STREAM_HEADER_FIELDS * 4;
            ChunkPayload::Stream(StreamRecord {
                id: desc.id,
                name: desc.name.clone(),
                stride,
                element_count,
                data: &payload[header_len..],
                data_offset: payload_offset + header_len,
            })
        }
        ChunkTag::Unknown(_) => unreachable!(),
    };

    Ok((Some(desc), decoded))
}

/// Walk a `.perm.bin` buffer into a [`PermFile`] session.
///
/// Fatal errors are limited to conditions that make the walk itself
/// unrecoverable (a chunk header that cannot be read, or a declared body
/// length extending past the buffer). Everything else is collected into
/// `failures` and the remaining chunks still parse.
pub fn parse(data: &[u8]) -> Result<PermFile<'_>, PermError> {
    let mut cursor = Cursor::new(data);
    let mut file = PermFile::default();

    while !cursor.at_end() {
        let chunk_offset = cursor.position();
        if cursor.bytes_remaining() < CHUNK_HEADER_SIZE {
            warn!(
                offset = chunk_offset,
                remaining = cursor.bytes_remaining(),
                "trailing bytes too short for a chunk header"
            );
            break;
        }

        let header_bytes = cursor.read_bytes(CHUNK_HEADER_SIZE)?;
        let header = parse_chunk_header(&mut &header_bytes[..], chunk_offset)
            .map_err(|e| winnow_err(chunk_offset, "chunk header", e))?;

        if header.body_end() > data.len() {
            return Err(PermError::ChunkOutOfBounds {
                offset: chunk_offset,
                length: header.data_len as usize,
                file_size: data.len(),
            });
        }
        let body = &data[header.body_start()..header.body_end()];

        match parse_chunk_body(&header, body) {
            Ok((desc, payload)) => {
                let resource_id = desc.as_ref().map(|d| d.id);
                match payload {
                    ChunkPayload::BoneTable(names) => {
                        if !file.bone_names.is_empty() {
                            warn!(offset = chunk_offset, "multiple bone tables; extending");
                        }
                        file.bone_names.extend(names);
                    }
                    ChunkPayload::Texture(tex) => file.textures.push(tex),
                    ChunkPayload::Material(mat) => file.materials.push(mat),
                    ChunkPayload::Stream(stream) => {
                        if file.streams.insert(stream.id, stream).is_some() {
                            warn!(offset = chunk_offset, "duplicate stream id?");
                        }
                    }
                    ChunkPayload::MeshTable(descs) => {
                        for result in descs {
                            match result {
                                Ok(submesh) => file.submeshes.push(submesh),
                                Err(error) => file.failures.push(ChunkFailure {
                                    offset: chunk_offset,
                                    tag: header.tag,
                                    resource_id,
                                    error,
                                }),
                            }
                        }
                    }
                    ChunkPayload::Skipped => {}
                }
            }
            Err(error) => file.failures.push(ChunkFailure {
                offset: chunk_offset,
                tag: header.tag,
                resource_id: None,
                error,
            }),
        }

        cursor.seek(header.body_end());
    }

    Ok(file)
}
