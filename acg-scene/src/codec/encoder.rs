use std::io::Write;
use byteorder::{LittleEndian, WriteBytesExt};
use crate::codec::error::FormatError;
use crate::codec::{MAGIC, VERSION};
use crate::layer::{layer_flags, LayerFlags};
use crate::{Material, Mesh, SceneData, Texture};

/// Writes a scene as tightly packed little-endian records.
///
/// Every field of the model has an encoding; referential integrity is checked by
/// [`SceneData::validate`] beforehand, not here.
pub struct SceneEncoder<W> {
    writer: W,
    written: usize,
}

impl<W: Write> SceneEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Encode `scene`, returning the number of bytes written.
    pub fn encode(&mut self, scene: &SceneData) -> Result<usize, FormatError> {
        let start = self.written;

        self.write_header()?;
        self.write_materials(&scene.materials)?;
        self.write_textures(&scene.textures)?;
        self.write_meshes(&scene.meshes)?;

        Ok(self.written - start)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), FormatError> {
        self.writer.write_all(&MAGIC)?;
        self.written += MAGIC.len();
        self.put_u32(VERSION)
    }

    fn write_materials(&mut self, materials: &[Material]) -> Result<(), FormatError> {
        self.put_len(materials.len())?;
        for material in materials {
            self.write_material(material)?;
        }
        Ok(())
    }

    fn write_material(&mut self, material: &Material) -> Result<(), FormatError> {
        self.put_str(&material.name)?;

        self.put_vec3(&material.base_color)?;
        self.put_vec3(&material.emission)?;
        self.put_f32(material.metallic)?;
        self.put_f32(material.roughness)?;
        self.put_f32(material.ior)?;
        self.put_f32(material.opacity)?;

        for index in material.textures.to_wire() {
            self.put_i32(index)?;
        }

        // Flags precede the extension blocks so a reader knows what follows.
        let flags = layer_flags(material);
        self.put_u32(flags.bits())?;

        // Only transmission has an extension block in this format version.
        if flags.contains(LayerFlags::TRANSMISSION) {
            if let Some(transmission) = &material.layers.transmission {
                self.put_f32(transmission.strength)?;
                self.put_f32(material.ior)?;
            }
        }

        Ok(())
    }

    fn write_textures(&mut self, textures: &[Texture]) -> Result<(), FormatError> {
        self.put_len(textures.len())?;
        for texture in textures {
            self.put_str(&texture.path)?;
        }
        Ok(())
    }

    fn write_meshes(&mut self, meshes: &[Mesh]) -> Result<(), FormatError> {
        self.put_len(meshes.len())?;
        for mesh in meshes {
            self.write_mesh(mesh)?;
        }
        Ok(())
    }

    fn write_mesh(&mut self, mesh: &Mesh) -> Result<(), FormatError> {
        self.put_str(&mesh.name)?;
        self.put_u32(mesh.material_index)?;

        self.put_len(mesh.vertices.len())?;
        for vertex in &mesh.vertices {
            for &component in vertex.as_floats() {
                self.put_f32(component)?;
            }
        }

        self.put_len(mesh.indices.len())?;
        for &index in &mesh.indices {
            self.put_u32(index)?;
        }

        Ok(())
    }

    fn put_len(&mut self, len: usize) -> Result<(), FormatError> {
        let len = u32::try_from(len).map_err(|_| FormatError::TooLong(len))?;
        self.put_u32(len)
    }

    fn put_str(&mut self, value: &str) -> Result<(), FormatError> {
        self.put_len(value.len())?;
        self.writer.write_all(value.as_bytes())?;
        self.written += value.len();
        Ok(())
    }

    fn put_vec3(&mut self, value: &[f32; 3]) -> Result<(), FormatError> {
        for &component in value {
            self.put_f32(component)?;
        }
        Ok(())
    }

    fn put_u32(&mut self, value: u32) -> Result<(), FormatError> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.written += size_of::<u32>();
        Ok(())
    }

    fn put_i32(&mut self, value: i32) -> Result<(), FormatError> {
        self.writer.write_i32::<LittleEndian>(value)?;
        self.written += size_of::<i32>();
        Ok(())
    }

    fn put_f32(&mut self, value: f32) -> Result<(), FormatError> {
        self.writer.write_f32::<LittleEndian>(value)?;
        self.written += size_of::<f32>();
        Ok(())
    }
}
