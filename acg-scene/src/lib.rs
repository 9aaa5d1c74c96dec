//! In-memory scene model -> (encode) -> `.acg` bytes -> (decode) -> scene model

mod mesh;
mod material;
mod texture;
mod layer;
mod scene;
pub mod codec;

pub use mesh::{Mesh, MeshBuilder, MeshBuilderError, Vertex, VERTEX_FLOATS};
pub use material::{Material, MaterialBuilder, MaterialBuilderError, TextureSlots, DEFAULT_MATERIAL_NAME};
pub use texture::Texture;
pub use layer::{
    layer_flags, AnisotropyLayer, ClearcoatLayer, IridescenceLayer, Layer, LayerFlags, LayerKind,
    MaterialLayers, SheenLayer, SubsurfaceLayer, TransmissionLayer, VolumeLayer, PERSISTED_LAYERS,
};
pub use scene::{SceneData, SceneError, SceneStatistics};
pub use codec::{decode, encode, read_scene_file, write_scene_file, FormatError};
