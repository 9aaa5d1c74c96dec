use std::io::Read;
use byteorder::{LittleEndian, ReadBytesExt};
use acg_core::log::debug;
use crate::codec::error::FormatError;
use crate::codec::{MAGIC, VERSION};
use crate::layer::{LayerFlags, MaterialLayers, TransmissionLayer, PERSISTED_LAYERS};
use crate::material::TextureSlots;
use crate::mesh::VERTEX_FLOATS;
use crate::{Material, Mesh, SceneData, Texture, Vertex};

// Smallest possible encoding of each counted record, used to reject counts that
// would read past the end before anything is allocated.
const MIN_MATERIAL_SIZE: usize = 4 + 12 + 12 + 16 + 16 + 4;
const MIN_TEXTURE_SIZE: usize = 4;
const MIN_MESH_SIZE: usize = 4 + 4 + 4 + 4;

/// Parses a `.acg` byte stream back into a [`SceneData`].
///
/// Only structure is checked (magic, version, lengths). Index bounds are left to the
/// consumer.
pub struct SceneDecoder<'a> {
    reader: &'a [u8],
}

impl<'a> SceneDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { reader: bytes }
    }

    pub fn decode(mut self) -> Result<SceneData, FormatError> {
        self.read_header()?;

        let materials = self.read_materials()?;
        let textures = self.read_textures()?;
        let meshes = self.read_meshes()?;

        if !self.reader.is_empty() {
            debug!("Ignoring {} trailing bytes after the last mesh", self.reader.len());
        }

        Ok(SceneData {
            meshes,
            materials,
            textures,
        })
    }

    fn read_header(&mut self) -> Result<(), FormatError> {
        let mut magic = [0u8; 4];
        self.reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }

        let version = self.reader.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                expected: VERSION,
            });
        }

        Ok(())
    }

    fn read_materials(&mut self) -> Result<Vec<Material>, FormatError> {
        let count = self.read_count(MIN_MATERIAL_SIZE)?;
        let mut materials = Vec::with_capacity(count);
        for _ in 0..count {
            materials.push(self.read_material()?);
        }
        Ok(materials)
    }

    fn read_material(&mut self) -> Result<Material, FormatError> {
        let name = self.read_string()?;

        let base_color = self.read_vec3()?;
        let emission = self.read_vec3()?;
        let metallic = self.reader.read_f32::<LittleEndian>()?;
        let roughness = self.reader.read_f32::<LittleEndian>()?;
        let ior = self.reader.read_f32::<LittleEndian>()?;
        let opacity = self.reader.read_f32::<LittleEndian>()?;

        let mut texture_indices = [0i32; 4];
        self.reader.read_i32_into::<LittleEndian>(&mut texture_indices)?;

        let raw_flags = self.reader.read_u32::<LittleEndian>()?;
        let flags = LayerFlags::from_bits_truncate(raw_flags);
        if flags.bits() != raw_flags {
            debug!("Material '{}' has unknown layer bits {:#x}", name, raw_flags & !LayerFlags::all().bits());
        }

        let mut layers = MaterialLayers::default();

        // The transmission block must be consumed whenever its bit is set, or every
        // later read is misaligned. No other layer has a block in this version.
        if flags.contains(LayerFlags::TRANSMISSION) {
            let strength = self.reader.read_f32::<LittleEndian>()?;
            let _ior = self.reader.read_f32::<LittleEndian>()?;
            layers.transmission = Some(TransmissionLayer {
                strength,
                ..Default::default()
            });
        }

        let unpersisted = flags - PERSISTED_LAYERS;
        if !unpersisted.is_empty() {
            debug!("Material '{}' advertises {:?} without extension data", name, unpersisted);
        }

        Ok(Material {
            name,
            base_color,
            metallic,
            roughness,
            emission,
            ior,
            opacity,
            textures: TextureSlots::from_wire(texture_indices),
            layers,
        })
    }

    fn read_textures(&mut self) -> Result<Vec<Texture>, FormatError> {
        let count = self.read_count(MIN_TEXTURE_SIZE)?;
        let mut textures = Vec::with_capacity(count);
        for _ in 0..count {
            textures.push(Texture::new(self.read_string()?));
        }
        Ok(textures)
    }

    fn read_meshes(&mut self) -> Result<Vec<Mesh>, FormatError> {
        let count = self.read_count(MIN_MESH_SIZE)?;
        let mut meshes = Vec::with_capacity(count);
        for _ in 0..count {
            meshes.push(self.read_mesh()?);
        }
        Ok(meshes)
    }

    fn read_mesh(&mut self) -> Result<Mesh, FormatError> {
        let name = self.read_string()?;
        let material_index = self.reader.read_u32::<LittleEndian>()?;

        let vertex_count = self.read_count(Vertex::SIZE)?;
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            let mut floats = [0f32; VERTEX_FLOATS];
            self.reader.read_f32_into::<LittleEndian>(&mut floats)?;
            vertices.push(Vertex::from_floats(floats));
        }

        let index_count = self.read_count(size_of::<u32>())?;
        let mut indices = vec![0u32; index_count];
        self.reader.read_u32_into::<LittleEndian>(&mut indices)?;

        Ok(Mesh {
            name,
            vertices,
            indices,
            material_index,
        })
    }

    /// Read a count and make sure `count * element_size` bytes are still available.
    fn read_count(&mut self, element_size: usize) -> Result<usize, FormatError> {
        let count = self.reader.read_u32::<LittleEndian>()? as usize;
        match count.checked_mul(element_size) {
            Some(needed) if needed <= self.reader.len() => Ok(count),
            _ => Err(FormatError::Truncated),
        }
    }

    fn read_string(&mut self) -> Result<String, FormatError> {
        let len = self.read_count(1)?;
        let (bytes, rest) = self.reader.split_at(len);
        self.reader = rest;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn read_vec3(&mut self) -> Result<[f32; 3], FormatError> {
        let mut value = [0f32; 3];
        self.reader.read_f32_into::<LittleEndian>(&mut value)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use byteorder::WriteBytesExt;
    use super::*;
    use crate::codec::{decode, encode};
    use crate::codec::tests::{distinct_material, DISTINCT_MATERIAL_RECORD};
    use crate::layer::ClearcoatLayer;

    fn header(magic: &[u8; 4], version: u32) -> Vec<u8> {
        let mut bytes = magic.to_vec();
        bytes.write_u32::<LittleEndian>(version).unwrap();
        bytes
    }

    #[test]
    fn reads_material_record_from_wire_bytes() {
        let mut bytes = header(b"ACGS", VERSION);
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.extend_from_slice(DISTINCT_MATERIAL_RECORD);
        bytes.write_u32::<LittleEndian>(0).unwrap();
        bytes.write_u32::<LittleEndian>(0).unwrap();

        let scene = decode(&bytes).unwrap();

        let expected = Material {
            layers: MaterialLayers {
                transmission: Some(TransmissionLayer { strength: 0.875, ..Default::default() }),
                ..Default::default()
            },
            ..distinct_material()
        };
        assert_eq!(scene.materials, vec![expected]);
        assert!(scene.textures.is_empty());
        assert!(scene.meshes.is_empty());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = header(b"GLTF", VERSION);
        bytes.extend_from_slice(&[0; 12]);

        match decode(&bytes) {
            Err(FormatError::BadMagic(magic)) => assert_eq!(&magic, b"GLTF"),
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = header(b"ACGS", 999);
        bytes.extend_from_slice(&[0; 12]);

        assert!(matches!(
            decode(&bytes),
            Err(FormatError::UnsupportedVersion { found: 999, expected: 1 })
        ));
    }

    #[test]
    fn short_header_is_truncated() {
        assert!(matches!(decode(b""), Err(FormatError::Truncated)));
        assert!(matches!(decode(b"AC"), Err(FormatError::Truncated)));
        assert!(matches!(decode(b"ACGS\x01\x00"), Err(FormatError::Truncated)));
    }

    #[test]
    fn material_count_without_records_is_truncated() {
        let mut bytes = header(b"ACGS", VERSION);
        bytes.write_u32::<LittleEndian>(1).unwrap();

        assert!(matches!(decode(&bytes), Err(FormatError::Truncated)));
    }

    #[test]
    fn huge_counts_fail_before_allocating() {
        let mut bytes = header(b"ACGS", VERSION);
        bytes.write_u32::<LittleEndian>(0).unwrap();
        bytes.write_u32::<LittleEndian>(u32::MAX).unwrap();

        assert!(matches!(decode(&bytes), Err(FormatError::Truncated)));
    }

    #[test]
    fn string_length_past_end_is_truncated() {
        let mut bytes = header(b"ACGS", VERSION);
        bytes.write_u32::<LittleEndian>(0).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_u32::<LittleEndian>(64).unwrap();
        bytes.extend_from_slice(b"short");

        assert!(matches!(decode(&bytes), Err(FormatError::Truncated)));
    }

    #[test]
    fn every_cut_of_a_valid_stream_is_truncated() {
        let scene = crate::codec::tests::sample_scene();
        let bytes = encode(&scene).unwrap();

        for len in 8..bytes.len() {
            assert!(
                matches!(decode(&bytes[..len]), Err(FormatError::Truncated)),
                "cut at {} of {} was not reported as truncated",
                len,
                bytes.len()
            );
        }
    }

    #[test]
    fn rejects_invalid_utf8_names() {
        let mut bytes = header(b"ACGS", VERSION);
        bytes.write_u32::<LittleEndian>(0).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_u32::<LittleEndian>(2).unwrap();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.write_u32::<LittleEndian>(0).unwrap();

        assert!(matches!(decode(&bytes), Err(FormatError::InvalidUtf8(_))));
    }

    #[test]
    fn transmission_block_keeps_following_records_aligned() {
        let mut glass = Material::named("glass");
        glass.layers.transmission = Some(TransmissionLayer { strength: 0.75, ..Default::default() });
        let mut after = Material::named("after");
        after.roughness = 0.25;
        let scene = SceneData {
            materials: vec![glass, after.clone()],
            textures: vec![Texture::new("next.png")],
            ..Default::default()
        };

        let decoded = decode(&encode(&scene).unwrap()).unwrap();

        assert_eq!(decoded.materials[0].layers.transmission.as_ref().map(|t| t.strength), Some(0.75));
        assert_eq!(decoded.materials[1], after);
        assert_eq!(decoded.textures[0].path, "next.png");
    }

    #[test]
    fn non_transmission_bits_consume_nothing() {
        let mut coat = Material::named("coat");
        coat.layers.clearcoat = Some(ClearcoatLayer { strength: 1.0, ..Default::default() });
        let scene = SceneData {
            materials: vec![coat, Material::named("next")],
            ..Default::default()
        };

        let decoded = decode(&encode(&scene).unwrap()).unwrap();

        assert_eq!(decoded.materials.len(), 2);
        assert_eq!(decoded.materials[0].layers.clearcoat, None);
        assert_eq!(decoded.materials[1].name, "next");
    }

    #[test]
    fn no_semantic_checks_on_decode() {
        let scene = SceneData {
            meshes: vec![Mesh {
                name: "dangling".into(),
                vertices: vec![],
                indices: vec![7, 8, 9],
                material_index: 42,
            }],
            ..Default::default()
        };

        let decoded = decode(&encode(&scene).unwrap()).unwrap();
        assert_eq!(decoded.meshes[0].material_index, 42);
        assert_eq!(decoded.meshes[0].indices, vec![7, 8, 9]);
        assert!(decoded.materials.is_empty());
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = encode(&SceneData::default()).unwrap();
        bytes.extend_from_slice(b"junk");

        assert_eq!(decode(&bytes).unwrap(), SceneData::default());
    }
}
