//! Material chunks: named texture-slot bindings.
//!
//! A material body is an 8-field header whose fifth field counts the
//! parameter records that follow. Each parameter is 8 i32s: a slot tag and,
//! in the seventh field, the resource id of the bound texture. Only the
//! diffuse and specular slot tags are understood; other slots are retained
//! uninterpreted so callers can still see them.

use crate::data::parser_utils::{WResult, parse_i32_array};

pub const SLOT_DIFFUSE: u32 = 0xDCE06689;
pub const SLOT_SPECULAR: u32 = 0xACBC7A85;

/// An uninterpreted texture slot binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialSlot {
    pub tag: u32,
    pub texture_id: u32,
}

/// A parsed material. Texture references are resource ids, resolved to
/// texture-table indices during assembly. The diffuse slot may be absent
/// (untextured geometry such as buildings and weapons).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialRecord {
    pub id: u32,
    pub name: String,
    pub diffuse_texture: Option<u32>,
    pub specular_texture: Option<u32>,
    pub extra_slots: Vec<MaterialSlot>,
}

/// Parse a material chunk payload (everything after the resource descriptor).
pub fn parse_material(input: &mut &[u8], id: u32, name: String) -> WResult<MaterialRecord> {
    let header = parse_i32_array(input, 8)?;
    let param_count = header[4].max(0) as usize;

    let mut record = MaterialRecord {
        id,
        name,
        diffuse_texture: None,
        specular_texture: None,
        extra_slots: Vec::new(),
    };

    for _ in 0..param_count {
        let param = parse_i32_array(input, 8)?;
        let tag = param[0] as u32;
        let texture_id = param[6] as u32;
        match tag {
            SLOT_DIFFUSE => record.diffuse_texture = Some(texture_id),
            SLOT_SPECULAR => record.specular_texture = Some(texture_id),
            _ => record.extra_slots.push(MaterialSlot { tag, texture_id }),
        }
    }

    // 16-byte trailer, unused
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_i32s(out: &mut Vec<u8>, values: &[i32]) {
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn material_payload(params: &[(u32, u32)]) -> Vec<u8> {
        let mut payload = Vec::new();
        push_i32s(&mut payload, &[0, 0, 0, 0, params.len() as i32, 0, 0, 0]);
        for &(tag, texture_id) in params {
            push_i32s(
                &mut payload,
                &[tag as i32, 0, 0, 0, 0, 0, texture_id as i32, 0],
            );
        }
        push_i32s(&mut payload, &[0, 0, 0, 0]);
        payload
    }

    #[test]
    fn diffuse_and_specular_slots() {
        let payload = material_payload(&[(SLOT_DIFFUSE, 0x111), (SLOT_SPECULAR, 0x222)]);
        let input = &mut payload.as_slice();
        let material = parse_material(input, 9, String::from("mat")).unwrap();
        assert_eq!(material.diffuse_texture, Some(0x111));
        assert_eq!(material.specular_texture, Some(0x222));
        assert!(material.extra_slots.is_empty());
    }

    #[test]
    fn missing_diffuse_is_not_an_error() {
        let payload = material_payload(&[(0x1234_5678, 0x333)]);
        let input = &mut payload.as_slice();
        let material = parse_material(input, 9, String::from("plain")).unwrap();
        assert_eq!(material.diffuse_texture, None);
        assert_eq!(
            material.extra_slots,
            vec![MaterialSlot {
                tag: 0x1234_5678,
                texture_id: 0x333,
            }]
        );
    }
}
