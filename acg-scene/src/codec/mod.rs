//! `.acg` scene binary format, version 1.
//!
//! ```text
//! Header     magic "ACGS" | version:u32
//! Materials  count:u32, per material:
//!              name_len:u32 name | base_color f32x3 | emission f32x3
//!              metallic roughness ior opacity : f32
//!              texture indices i32x4 (-1 = absent)
//!              layer_flags:u32
//!              [TRANSMISSION] strength:f32 ior:f32
//! Textures   count:u32, per texture: path_len:u32 path
//! Meshes     count:u32, per mesh:
//!              name_len:u32 name | material_index:u32
//!              vertex_count:u32, vertices (44 bytes each)
//!              index_count:u32, indices u32
//! ```
//!
//! All integers and floats are little-endian, tightly packed.

use std::path::Path;
use acg_core::file::{load_with_memory_mapping, write_with_scoped_file};
use crate::SceneData;

mod error;
mod encoder;
mod decoder;

pub use error::FormatError;
pub use encoder::SceneEncoder;
pub use decoder::SceneDecoder;

pub const MAGIC: [u8; 4] = *b"ACGS";
pub const VERSION: u32 = 1;
pub const FILE_EXTENSION: &str = "acg";

pub fn encode(scene: &SceneData) -> Result<Vec<u8>, FormatError> {
    let mut encoder = SceneEncoder::new(Vec::new());
    encoder.encode(scene)?;
    Ok(encoder.into_inner())
}

pub fn decode(bytes: &[u8]) -> Result<SceneData, FormatError> {
    SceneDecoder::new(bytes).decode()
}

/// Encode `scene` into `path`, returning the file size.
///
/// A failed write leaves no file behind. Concurrent writers to the same path must be
/// serialized by the caller.
pub fn write_scene_file(path: impl AsRef<Path>, scene: &SceneData) -> Result<usize, FormatError> {
    write_with_scoped_file(path, |writer| SceneEncoder::new(writer).encode(scene))
}

pub fn read_scene_file(path: impl AsRef<Path>) -> Result<SceneData, FormatError> {
    let mmap = load_with_memory_mapping(path)?;
    decode(&mmap)
}
