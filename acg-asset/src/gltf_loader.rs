use std::path::{Path, PathBuf};
use anyhow::{anyhow, Result};
use gltf::{buffer::Data as BufferData, mesh::Mode, Document, Primitive};
use acg_core::collections::hashmap::HashMap;
use acg_core::collections::hashset::HashSet;
use acg_core::file::load_with_memory_mapping;
use acg_core::log::{debug, info, warn};
use acg_scene::{
    Material, MaterialBuilder, MaterialLayers, Mesh, MeshBuilder, SceneData, Texture, TextureSlots,
    TransmissionLayer, Vertex, DEFAULT_MATERIAL_NAME,
};
use crate::SceneLoader;

const DEFAULT_IOR: f32 = 1.5;

#[derive(Debug, Clone, Default)]
pub struct GltfLoader;

impl GltfLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse the document and pull every buffer into memory. Nothing is interpreted yet.
    pub fn load_raw(path: &Path) -> Result<RawGltf> {
        let mmap = load_with_memory_mapping(path)
            .map_err(|e| anyhow!("Failed to open glTF file {:?}: {}", path, e))?;

        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(&mmap)
            .map_err(|e| anyhow!("Failed to parse glTF {:?}: {}", path, e))?;

        let mut raw = RawGltf {
            path: path.to_owned(),
            document,
            buffers: vec![],
        };
        Self::load_buffers_with_mmap(path, &mut raw, blob)?;
        Ok(raw)
    }

    fn load_buffers_with_mmap(path: &Path, raw: &mut RawGltf, mut blob: Option<Vec<u8>>) -> Result<()> {
        let base_dir = path.parent().ok_or(anyhow!("Invalid path {:?}", path))?;

        raw.buffers.clear();
        raw.buffers.reserve(raw.document.buffers().len());

        for buffer in raw.document.buffers() {
            let data = match buffer.source() {
                gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                    debug!("Decoding glTF buffer {} from data URI", buffer.index());

                    BufferData::from_source_and_blob(buffer.source(), None, &mut None)
                        .map_err(|e| anyhow!("Failed to decode data URI of buffer {}: {}", buffer.index(), e))?
                }
                gltf::buffer::Source::Uri(uri) => {
                    let buffer_path = base_dir.join(decode_relative_uri(uri)?);
                    debug!("Mapping glTF buffer {:?}", buffer_path);

                    let mmap = load_with_memory_mapping(&buffer_path)
                        .map_err(|e| anyhow!("Failed to map glTF buffer {:?}: {}", buffer_path, e))?;
                    BufferData(mmap[..].to_vec())
                }
                gltf::buffer::Source::Bin => {
                    let blob = blob.take().ok_or(anyhow!("Missing binary chunk in {:?}", path))?;
                    BufferData(blob)
                }
            };

            if data.len() < buffer.length() {
                return Err(anyhow!(
                    "Buffer {} of {:?} holds {} bytes, {} declared",
                    buffer.index(),
                    path,
                    data.len(),
                    buffer.length()
                ));
            }
            raw.buffers.push(data);
        }

        Ok(())
    }
}

/// glTF URIs are percent-encoded; files on disk are not.
fn decode_relative_uri(uri: &str) -> Result<String> {
    urlencoding::decode(uri)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| anyhow!("Invalid percent-encoding in URI {:?}: {}", uri, e))
}

impl SceneLoader for GltfLoader {
    fn load(&self, path: &Path) -> Result<SceneData> {
        let raw = Self::load_raw(path)?;
        RawGltfProcessor::process(raw)
    }

    fn supports_advanced_materials(&self) -> bool {
        true
    }

    fn format_name(&self) -> &'static str {
        "glTF"
    }
}

pub struct RawGltf {
    path: PathBuf,
    document: Document,
    buffers: Vec<BufferData>,
}

impl RawGltf {
    pub fn load_path(&self) -> &Path {
        self.path.as_path()
    }
}

/// Turns a parsed document into scene data. Node transforms are not applied.
pub struct RawGltfProcessor {
    textures: Vec<Texture>,
    image_textures: HashMap<usize, u32>,
    materials: Vec<Material>,
    default_material: Option<u32>,
    meshes: Vec<Mesh>,
    visited_meshes: HashSet<usize>,
}

impl RawGltfProcessor {
    fn new() -> Self {
        Self {
            textures: Vec::new(),
            image_textures: HashMap::new(),
            materials: Vec::new(),
            default_material: None,
            meshes: Vec::new(),
            visited_meshes: HashSet::new(),
        }
    }

    pub fn process(raw: RawGltf) -> Result<SceneData> {
        let RawGltf {
            path,
            document,
            buffers,
        } = raw;

        let mut processor = Self::new();
        processor.process_materials(&document)?;

        if document.scenes().len() == 0 {
            for mesh in document.meshes() {
                processor.process_mesh(&mesh, &buffers)?;
            }
        } else {
            for scene in document.scenes() {
                for node in scene.nodes() {
                    processor.process_node(&node, &buffers)?;
                }
            }
        }

        let scene = SceneData {
            meshes: processor.meshes,
            materials: processor.materials,
            textures: processor.textures,
        };
        info!(
            "[{:?}] is loaded: {} meshes, {} materials, {} textures.",
            path,
            scene.meshes.len(),
            scene.materials.len(),
            scene.textures.len()
        );

        Ok(scene)
    }

    fn process_node(&mut self, node: &gltf::Node, buffers: &[BufferData]) -> Result<()> {
        if let Some(mesh) = node.mesh() {
            self.process_mesh(&mesh, buffers)?;
        }

        for child in node.children() {
            self.process_node(&child, buffers)?;
        }

        Ok(())
    }

    fn process_mesh(&mut self, mesh: &gltf::Mesh, buffers: &[BufferData]) -> Result<()> {
        // instanced meshes would produce identical geometry without transforms
        if !self.visited_meshes.insert(mesh.index()) {
            return Ok(());
        }

        let mesh_name = mesh
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));

        for primitive in mesh.primitives() {
            let name = format!("{}.{}", mesh_name, primitive.index());
            if primitive.mode() != Mode::Triangles {
                warn!("Skipping primitive {} with unsupported mode {:?}", name, primitive.mode());
                continue;
            }

            let material_index = match primitive.material().index() {
                Some(index) => index as u32,
                None => self.default_material_index(),
            };
            let mesh = Self::process_primitive(name, &primitive, buffers, material_index)?;
            self.meshes.push(mesh);
        }

        Ok(())
    }

    fn process_primitive(
        name: String,
        primitive: &Primitive,
        buffers: &[BufferData],
        material_index: u32,
    ) -> Result<Mesh> {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &**data));

        let positions = reader
            .read_positions()
            .ok_or(anyhow!("Primitive {} is missing positions", name))?
            .collect::<Vec<_>>();
        let vertex_count = positions.len();

        let normals = match reader.read_normals() {
            Some(normals) => normals.collect::<Vec<_>>(),
            None => {
                debug!("Primitive {} has no normals, filling with zero", name);
                vec![[0.0; 3]; vertex_count]
            }
        };

        let tex_coords = match reader.read_tex_coords(0) {
            Some(tex_coords) => tex_coords.into_f32().collect::<Vec<_>>(),
            None => vec![[0.0; 2]; vertex_count],
        };

        let tangents = match reader.read_tangents() {
            Some(tangents) => tangents.map(|[x, y, z, _]| [x, y, z]).collect::<Vec<_>>(),
            None => vec![[0.0; 3]; vertex_count],
        };

        if normals.len() != vertex_count || tex_coords.len() != vertex_count || tangents.len() != vertex_count {
            return Err(anyhow!("Vertex attribute count mismatch in primitive {}", name));
        }

        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect::<Vec<_>>(),
            None => (0..vertex_count as u32).collect(),
        };

        let vertices: Vec<Vertex> = positions
            .into_iter()
            .zip(normals)
            .zip(tex_coords)
            .zip(tangents)
            .map(|(((position, normal), tex_coord), tangent)| Vertex {
                position,
                normal,
                tex_coord,
                tangent,
            })
            .collect();

        let mesh = MeshBuilder::default()
            .name(name)
            .vertices(vertices)
            .indices(indices)
            .material_index(material_index)
            .build()?;

        Ok(mesh)
    }

    fn default_material_index(&mut self) -> u32 {
        match self.default_material {
            Some(index) => index,
            None => {
                let index = self.materials.len() as u32;
                self.materials.push(Material::named(DEFAULT_MATERIAL_NAME));
                self.default_material = Some(index);
                index
            }
        }
    }

    fn process_materials(&mut self, document: &Document) -> Result<()> {
        for material in document.materials() {
            let pbr = material.pbr_metallic_roughness();
            let [r, g, b, alpha] = pbr.base_color_factor();
            let index = material.index().unwrap_or(self.materials.len());

            let textures = TextureSlots {
                base_color: pbr.base_color_texture().and_then(|info| self.register_texture(&info.texture())),
                normal: material.normal_texture().and_then(|normal| self.register_texture(&normal.texture())),
                metallic_roughness: pbr
                    .metallic_roughness_texture()
                    .and_then(|info| self.register_texture(&info.texture())),
                emission: material.emissive_texture().and_then(|info| self.register_texture(&info.texture())),
            };

            let transmission = material.transmission().map(|transmission| TransmissionLayer {
                strength: transmission.transmission_factor(),
                texture_index: transmission
                    .transmission_texture()
                    .and_then(|info| self.register_texture(&info.texture())),
                ..Default::default()
            });

            let material = MaterialBuilder::default()
                .name(material.name().map(str::to_owned).unwrap_or_else(|| format!("material_{}", index)))
                .base_color([r, g, b])
                .opacity(alpha)
                .metallic(pbr.metallic_factor())
                .roughness(pbr.roughness_factor())
                .emission(material.emissive_factor())
                .ior(material.ior().unwrap_or(DEFAULT_IOR))
                .textures(textures)
                .layers(MaterialLayers {
                    transmission,
                    ..Default::default()
                })
                .build()?;

            self.materials.push(material);
        }

        Ok(())
    }

    /// Only external images are referenced; the scene format stores paths, not pixels.
    fn register_texture(&mut self, texture: &gltf::Texture) -> Option<u32> {
        let image = texture.source();
        if let Some(&index) = self.image_textures.get(&image.index()) {
            return Some(index);
        }

        match image.source() {
            gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
                let path = match decode_relative_uri(uri) {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("Skipping image {}: {}", image.index(), e);
                        return None;
                    }
                };

                let index = self.textures.len() as u32;
                self.textures.push(Texture::new(path));
                self.image_textures.insert(image.index(), index);
                Some(index)
            }
            _ => {
                warn!("Skipping embedded image {}, only external image files can be referenced", image.index());
                None
            }
        }
    }
}
