/// Sequential binary reader used by the chunk walker and stream decoders
pub mod cursor;
/// Shared winnow-based parsing utilities used across the chunk sub-parsers
pub mod parser_utils;
