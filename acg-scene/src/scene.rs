use std::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use acg_core::log::{info, warn};
use crate::material::{Material, DEFAULT_MATERIAL_NAME};
use crate::mesh::Mesh;
use crate::texture::Texture;

/// Flat ownership tree: meshes and materials refer to each other only by index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SceneError {
    #[error("Mesh '{mesh}' references material {index} but the scene has {count} materials")]
    MaterialIndexOutOfRange { mesh: String, index: u32, count: usize },
    #[error("Mesh '{mesh}' has {count} indices, which is not a triangle list")]
    IndexCountNotTriangles { mesh: String, count: usize },
    #[error("Mesh '{mesh}' references vertex {index} but has {vertex_count} vertices")]
    VertexIndexOutOfRange { mesh: String, index: u32, vertex_count: usize },
    #[error("Material '{material}' {slot} texture {index} is out of range ({count} textures)")]
    TextureIndexOutOfRange { material: String, slot: &'static str, index: u32, count: usize },
    #[error("Material '{material}' {slot} texture {index} does not fit a signed 32-bit slot")]
    TextureIndexNotEncodable { material: String, slot: &'static str, index: u32 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneStatistics {
    pub meshes: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub materials: usize,
    pub advanced_materials: usize,
    pub textures: usize,
}

impl fmt::Display for SceneStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Meshes:    {}", self.meshes)?;
        writeln!(f, "  Vertices:  {}", self.vertices)?;
        writeln!(f, "  Triangles: {}", self.triangles)?;
        writeln!(f, "  Materials: {} ({} advanced)", self.materials, self.advanced_materials)?;
        write!(f, "  Textures:  {}", self.textures)
    }
}

impl SceneData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check referential integrity before encoding.
    ///
    /// A scene without materials gets a default one injected; that is the only mutation.
    pub fn validate(&mut self) -> Result<(), SceneError> {
        if self.meshes.is_empty() {
            warn!("Scene has no meshes");
        }

        if self.materials.is_empty() {
            warn!("Scene has no materials, injecting '{}'", DEFAULT_MATERIAL_NAME);
            self.materials.push(Material::named(DEFAULT_MATERIAL_NAME));
        }

        for mesh in &self.meshes {
            if mesh.indices.len() % 3 != 0 {
                return Err(SceneError::IndexCountNotTriangles {
                    mesh: mesh.name.clone(),
                    count: mesh.indices.len(),
                });
            }

            if let Some(&index) = mesh.indices.iter().find(|&&index| index as usize >= mesh.vertices.len()) {
                return Err(SceneError::VertexIndexOutOfRange {
                    mesh: mesh.name.clone(),
                    index,
                    vertex_count: mesh.vertices.len(),
                });
            }

            if mesh.material_index as usize >= self.materials.len() {
                return Err(SceneError::MaterialIndexOutOfRange {
                    mesh: mesh.name.clone(),
                    index: mesh.material_index,
                    count: self.materials.len(),
                });
            }
        }

        for material in &self.materials {
            for (slot, index) in material.textures.iter() {
                match index {
                    Some(index) if i32::try_from(index).is_err() => {
                        return Err(SceneError::TextureIndexNotEncodable {
                            material: material.name.clone(),
                            slot,
                            index,
                        });
                    }
                    Some(index) if index as usize >= self.textures.len() => {
                        return Err(SceneError::TextureIndexOutOfRange {
                            material: material.name.clone(),
                            slot,
                            index,
                            count: self.textures.len(),
                        });
                    }
                    _ => {}
                }
            }

            // not encoded, but still references into the same texture list
            for (kind, index) in material.layers.texture_indices() {
                if index as usize >= self.textures.len() {
                    return Err(SceneError::TextureIndexOutOfRange {
                        material: material.name.clone(),
                        slot: kind.name(),
                        index,
                        count: self.textures.len(),
                    });
                }
            }
        }

        info!(
            "Scene validation passed: {} meshes, {} materials, {} textures",
            self.meshes.len(),
            self.materials.len(),
            self.textures.len()
        );

        Ok(())
    }

    pub fn statistics(&self) -> SceneStatistics {
        SceneStatistics {
            meshes: self.meshes.len(),
            vertices: self.meshes.iter().map(|mesh| mesh.vertices.len()).sum(),
            triangles: self.meshes.iter().map(Mesh::triangle_count).sum(),
            materials: self.materials.len(),
            advanced_materials: self.materials.iter().filter(|material| material.is_advanced()).count(),
            textures: self.textures.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};
    use super::*;
    use crate::layer::TransmissionLayer;
    use crate::mesh::{MeshBuilder, Vertex};

    fn triangle(material_index: u32) -> Mesh {
        let vertex = Vertex::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO);
        MeshBuilder::default()
            .name("tri")
            .vertices(vec![vertex; 3])
            .indices(vec![0u32, 1, 2])
            .material_index(material_index)
            .build()
            .unwrap()
    }

    #[test]
    fn empty_scene_gets_default_material() {
        let mut scene = SceneData::new();
        scene.validate().unwrap();

        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.materials[0].name, DEFAULT_MATERIAL_NAME);
        assert!(scene.meshes.is_empty());
        assert!(scene.textures.is_empty());
    }

    #[test]
    fn existing_materials_are_left_alone() {
        let mut scene = SceneData {
            meshes: vec![triangle(1)],
            materials: vec![Material::named("a"), Material::named("b")],
            textures: vec![],
        };
        let before = scene.clone();

        scene.validate().unwrap();
        assert_eq!(scene, before);
    }

    #[test]
    fn rejects_material_index_out_of_range() {
        let mut scene = SceneData {
            meshes: vec![triangle(3)],
            materials: vec![Material::named("only")],
            textures: vec![],
        };

        assert_eq!(
            scene.validate(),
            Err(SceneError::MaterialIndexOutOfRange {
                mesh: "tri".into(),
                index: 3,
                count: 1
            })
        );
    }

    #[test]
    fn rejects_dangling_vertex_index() {
        let mut mesh = triangle(0);
        mesh.indices = vec![0, 1, 5];
        let mut scene = SceneData {
            meshes: vec![mesh],
            ..Default::default()
        };

        assert!(matches!(
            scene.validate(),
            Err(SceneError::VertexIndexOutOfRange { index: 5, vertex_count: 3, .. })
        ));
    }

    #[test]
    fn rejects_partial_triangle() {
        let mut mesh = triangle(0);
        mesh.indices = vec![0, 1];
        let mut scene = SceneData {
            meshes: vec![mesh],
            ..Default::default()
        };

        assert!(matches!(scene.validate(), Err(SceneError::IndexCountNotTriangles { count: 2, .. })));
    }

    #[test]
    fn rejects_texture_slot_out_of_range() {
        let mut material = Material::named("brick");
        material.textures.normal = Some(2);
        let mut scene = SceneData {
            meshes: vec![triangle(0)],
            materials: vec![material],
            textures: vec![Texture::new("brick.png")],
        };

        assert!(matches!(
            scene.validate(),
            Err(SceneError::TextureIndexOutOfRange { slot: "normal", index: 2, count: 1, .. })
        ));
    }

    #[test]
    fn rejects_texture_slot_beyond_signed_range() {
        let mut material = Material::named("huge");
        material.textures.emission = Some(u32::MAX);
        let mut scene = SceneData {
            meshes: vec![triangle(0)],
            materials: vec![material],
            textures: vec![Texture::new("glow.png")],
        };

        assert_eq!(
            scene.validate(),
            Err(SceneError::TextureIndexNotEncodable {
                material: "huge".into(),
                slot: "emission",
                index: u32::MAX,
            })
        );
    }

    #[test]
    fn rejects_dangling_layer_texture() {
        let mut glass = Material::named("glass");
        glass.layers.transmission = Some(TransmissionLayer {
            strength: 1.0,
            texture_index: Some(1),
            ..Default::default()
        });
        let mut scene = SceneData {
            meshes: vec![triangle(0)],
            materials: vec![glass],
            textures: vec![Texture::new("thickness.png")],
        };

        assert_eq!(
            scene.validate(),
            Err(SceneError::TextureIndexOutOfRange {
                material: "glass".into(),
                slot: "transmission",
                index: 1,
                count: 1,
            })
        );
    }

    #[test]
    fn accepts_layer_texture_in_range() {
        let mut glass = Material::named("glass");
        glass.layers.transmission = Some(TransmissionLayer { texture_index: Some(0), ..Default::default() });
        let mut scene = SceneData {
            meshes: vec![triangle(0)],
            materials: vec![glass],
            textures: vec![Texture::new("thickness.png")],
        };

        assert!(scene.validate().is_ok());
    }

    #[test]
    fn statistics_count_geometry_and_advanced_materials() {
        let mut glass = Material::named("glass");
        glass.layers.transmission = Some(TransmissionLayer { strength: 1.0, ..Default::default() });
        let scene = SceneData {
            meshes: vec![triangle(0), triangle(1)],
            materials: vec![Material::named("plain"), glass],
            textures: vec![Texture::new("a.png")],
        };

        let stats = scene.statistics();
        assert_eq!(stats.meshes, 2);
        assert_eq!(stats.vertices, 6);
        assert_eq!(stats.triangles, 2);
        assert_eq!(stats.materials, 2);
        assert_eq!(stats.advanced_materials, 1);
        assert_eq!(stats.textures, 1);
        assert!(stats.to_string().contains("Triangles: 2"));
    }
}
