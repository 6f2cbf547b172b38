//! Mesh table chunks: submesh descriptors binding streams to materials.
//!
//! The mesh table body starts with 15 unused fields, then a 17-field header
//! whose second field counts submesh descriptors. An offset table follows;
//! descriptor `m` lives at `table_base + 4*m + offsets[m]` where
//! `table_base` is the absolute position of the offset table itself. Each
//! descriptor is 36 i32 fields naming the material and the index, position,
//! skin, and UV streams by resource id, plus the index range this submesh
//! draws.

use crate::data::parser_utils::parse_i32_array;
use crate::perm::PermError;

/// Offset (in i32 fields) layout of a submesh descriptor.
pub const SUBMESH_DESC_FIELDS: usize = 36;

/// A submesh descriptor. Stream references are resource ids; the UV and
/// skin streams are optional in practice (untextured or unskinned
/// geometry references ids that no stream chunk declares).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmeshDesc {
    /// Absolute file offset of this descriptor, for error reporting.
    pub offset: usize,
    pub material_id: u32,
    pub index_stream: u32,
    pub position_stream: u32,
    pub skin_stream: u32,
    pub uv_stream: u32,
    /// First index (element, not byte) within the index stream.
    pub first_index: u32,
    pub triangle_count: u32,
}

/// Parse a mesh table payload into per-descriptor results.
///
/// `payload` is the chunk body after the resource descriptor and
/// `payload_offset` its absolute file offset. A descriptor whose offset
/// falls outside the chunk fails individually; the rest of the table still
/// parses (collect-and-continue).
pub fn parse_mesh_table(
    payload: &[u8],
    payload_offset: usize,
) -> Result<Vec<Result<SubmeshDesc, PermError>>, PermError> {
    let mut rest: &[u8] = payload;
    let input = &mut rest;

    parse_i32_array(input, 15).map_err(|e| PermError::ChunkParse {
        offset: payload_offset,
        detail: format!("mesh table preamble: {e}"),
    })?;
    let header = parse_i32_array(input, 17).map_err(|e| PermError::ChunkParse {
        offset: payload_offset,
        detail: format!("mesh table header: {e}"),
    })?;
    let count = header[1].max(0) as usize;

    // The offset table sits right after the two headers.
    let table_base = 15 * 4 + 17 * 4;
    let offsets = parse_i32_array(input, count).map_err(|e| PermError::ChunkParse {
        offset: payload_offset + table_base,
        detail: format!("mesh offset table: {e}"),
    })?;

    let mut descriptors = Vec::with_capacity(count);
    for (m, &rel) in offsets.iter().enumerate() {
        let desc_pos = table_base as i64 + 4 * m as i64 + rel as i64;
        let desc_end = desc_pos + (SUBMESH_DESC_FIELDS * 4) as i64;
        if desc_pos < 0 || desc_end as usize > payload.len() {
            descriptors.push(Err(PermError::ChunkParse {
                offset: payload_offset + table_base + 4 * m,
                detail: format!("submesh descriptor {m} offset {rel} out of chunk bounds"),
            }));
            continue;
        }

        let desc_input = &mut &payload[desc_pos as usize..];
        match parse_i32_array(desc_input, SUBMESH_DESC_FIELDS) {
            Ok(fields) => descriptors.push(Ok(SubmeshDesc {
                offset: payload_offset + desc_pos as usize,
                material_id: fields[3] as u32,
                index_stream: fields[11] as u32,
                position_stream: fields[15] as u32,
                skin_stream: fields[19] as u32,
                uv_stream: fields[23] as u32,
                first_index: fields[29].max(0) as u32,
                triangle_count: fields[30].max(0) as u32,
            })),
            Err(e) => descriptors.push(Err(PermError::ChunkParse {
                offset: payload_offset + desc_pos as usize,
                detail: format!("submesh descriptor {m}: {e}"),
            })),
        }
    }

    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_i32s(out: &mut Vec<u8>, values: &[i32]) {
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    /// Build a mesh table payload with descriptors laid out densely after
    /// the offset table.
    fn mesh_table_payload(descs: &[[i32; SUBMESH_DESC_FIELDS]]) -> Vec<u8> {
        let count = descs.len();
        let mut payload = Vec::new();
        push_i32s(&mut payload, &[0; 15]);
        let mut header = [0i32; 17];
        header[1] = count as i32;
        push_i32s(&mut payload, &header);
        for m in 0..count {
            // descriptor m at table_base + 4*m + offsets[m]
            let rel = (4 * count + m * SUBMESH_DESC_FIELDS * 4 - 4 * m) as i32;
            push_i32s(&mut payload, &[rel]);
        }
        for desc in descs {
            push_i32s(&mut payload, desc);
        }
        payload
    }

    fn desc(material: i32, position_stream: i32) -> [i32; SUBMESH_DESC_FIELDS] {
        let mut fields = [0i32; SUBMESH_DESC_FIELDS];
        fields[3] = material;
        fields[11] = 100;
        fields[15] = position_stream;
        fields[19] = 102;
        fields[23] = 103;
        fields[29] = 6;
        fields[30] = 2;
        fields
    }

    #[test]
    fn descriptors_resolve_through_offset_table() {
        let payload = mesh_table_payload(&[desc(1, 200), desc(2, 201)]);
        let parsed = parse_mesh_table(&payload, 0x1000).unwrap();
        assert_eq!(parsed.len(), 2);

        let first = parsed[0].as_ref().unwrap();
        assert_eq!(first.material_id, 1);
        assert_eq!(first.position_stream, 200);
        assert_eq!(first.index_stream, 100);
        assert_eq!(first.first_index, 6);
        assert_eq!(first.triangle_count, 2);
        assert_eq!(parsed[1].as_ref().unwrap().position_stream, 201);
    }

    #[test]
    fn bad_descriptor_offset_fails_alone() {
        let mut payload = mesh_table_payload(&[desc(1, 200), desc(2, 201)]);
        // Corrupt the first offset table entry to point far out of bounds.
        let table_base = 15 * 4 + 17 * 4;
        payload[table_base..table_base + 4].copy_from_slice(&0x7FFF_FFFFi32.to_le_bytes());

        let parsed = parse_mesh_table(&payload, 0).unwrap();
        assert!(parsed[0].is_err());
        assert_eq!(parsed[1].as_ref().unwrap().position_stream, 201);
    }
}
