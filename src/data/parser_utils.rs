//! Shared winnow-based parsing utilities used across the perm chunk sub-parsers.

use winnow::Parser;
use winnow::binary::le_i32;
use winnow::combinator::repeat;
use winnow::error::ContextError;
use winnow::token::take;

/// Common result type for winnow parsers.
pub type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

/// Parse `count` little-endian i32 values.
pub fn parse_i32_array(input: &mut &[u8], count: usize) -> WResult<Vec<i32>> {
    repeat(count, le_i32).parse_next(input)
}

/// Parse a fixed-size name field: `len` bytes, NUL-terminated within the
/// field, the remainder padding. The whole field is always consumed.
///
/// Both the 36-byte chunk resource names and the 64-byte bone names are
/// stored this way.
pub fn parse_fixed_string(input: &mut &[u8], len: usize) -> WResult<String> {
    let field: &[u8] = take(len).parse_next(input)?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    Ok(String::from_utf8_lossy(&field[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_string_stops_at_nul_and_consumes_field() {
        let mut data: Vec<u8> = b"mesh".to_vec();
        data.resize(36, 0);
        data.extend_from_slice(&0xAABBCCDDu32.to_le_bytes());

        let input = &mut data.as_slice();
        let name = parse_fixed_string(input, 36).unwrap();
        assert_eq!(name, "mesh");
        // The padding was consumed; next read sees the trailing u32.
        let rest = parse_i32_array(input, 1).unwrap();
        assert_eq!(rest[0] as u32, 0xAABBCCDD);
    }

    #[test]
    fn fixed_string_without_nul_uses_whole_field() {
        let data = [b'a'; 8];
        let input = &mut &data[..];
        assert_eq!(parse_fixed_string(input, 8).unwrap(), "aaaaaaaa");
    }

    #[test]
    fn i32_array_too_short_errors() {
        let data = [0u8; 7];
        let input = &mut &data[..];
        assert!(parse_i32_array(input, 2).is_err());
    }
}
