//! Bone-name table chunks.
//!
//! Skeleton hierarchy is not imported, but the flat bone name list is: skin
//! streams store bone indices into this table, and consumers use the names
//! to label vertex groups. The body is an 8-field header (second field is
//! the bone count), 160 bytes of unused data, then one 64-byte
//! NUL-terminated name per bone. Per-bone fixed-point quads trail the names
//! and are ignored.

use winnow::Parser;
use winnow::token::take;

use crate::data::parser_utils::{WResult, parse_fixed_string, parse_i32_array};

const BONE_NAME_LEN: usize = 64;
const BONE_HEADER_SKIP: usize = 160;

/// Parse a bone-table chunk payload into the ordered name list.
pub fn parse_bone_table(input: &mut &[u8]) -> WResult<Vec<String>> {
    let header = parse_i32_array(input, 8)?;
    let count = header[1].max(0) as usize;

    let _: &[u8] = take(BONE_HEADER_SKIP).parse_next(input)?;

    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        names.push(parse_fixed_string(input, BONE_NAME_LEN)?);
    }
    Ok(names)
}
