/// Binary cursor and shared winnow parsing utilities
pub mod data;
/// Error definitions
pub mod error;
/// Assembled, scene-independent model output
pub mod model;
/// Parser for the `.perm.bin` chunk container
pub mod perm;
/// DXT decompression and DDS container synthesis
pub mod texture;
