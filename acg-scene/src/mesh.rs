use bytemuck::{Pod, Zeroable};
use derive_builder::Builder;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Number of `f32` components in a packed [`Vertex`].
pub const VERTEX_FLOATS: usize = 11;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
    pub tangent: [f32; 3],
}

impl Vertex {
    /// Packed size on the wire and in memory.
    pub const SIZE: usize = VERTEX_FLOATS * size_of::<f32>();

    pub fn new(position: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            tex_coord: tex_coord.to_array(),
            tangent: [0.0; 3],
        }
    }

    pub fn with_tangent(mut self, tangent: Vec3) -> Self {
        self.tangent = tangent.to_array();
        self
    }

    /// Components in wire order: position, normal, tex_coord, tangent.
    pub fn as_floats(&self) -> &[f32; VERTEX_FLOATS] {
        bytemuck::cast_ref(self)
    }

    pub fn from_floats(floats: [f32; VERTEX_FLOATS]) -> Self {
        bytemuck::cast(floats)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), default)]
pub struct Mesh {
    pub name: String,
    /// Draw order, not deduplicated.
    pub vertices: Vec<Vertex>,
    /// Triangle list.
    pub indices: Vec<u32>,
    pub material_index: u32,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(size_of::<Vertex>(), 44);
        assert_eq!(Vertex::SIZE, 44);
    }

    #[test]
    fn floats_follow_wire_order() {
        let vertex = Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Z, Vec2::new(0.25, 0.75))
            .with_tangent(Vec3::X);

        assert_eq!(
            vertex.as_floats(),
            &[1.0, 2.0, 3.0, 0.0, 0.0, 1.0, 0.25, 0.75, 1.0, 0.0, 0.0]
        );
        assert_eq!(Vertex::from_floats(*vertex.as_floats()), vertex);
    }

    #[test]
    fn tangent_defaults_to_zero() {
        let vertex = Vertex::new(Vec3::ONE, Vec3::Y, Vec2::ZERO);
        assert_eq!(vertex.tangent, [0.0; 3]);
    }

    #[test]
    fn builder_fills_defaults() {
        let mesh = MeshBuilder::default()
            .name("quad")
            .indices(vec![0u32, 1, 2, 2, 1, 3])
            .build()
            .unwrap();

        assert_eq!(mesh.name, "quad");
        assert!(mesh.vertices.is_empty());
        assert_eq!(mesh.material_index, 0);
        assert_eq!(mesh.triangle_count(), 2);
    }
}
