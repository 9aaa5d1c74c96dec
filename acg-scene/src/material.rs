use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use crate::layer::{LayerFlags, MaterialLayers};

pub const DEFAULT_MATERIAL_NAME: &str = "Default";

/// Indices into `SceneData::textures`; `None` is written as `-1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureSlots {
    pub base_color: Option<u32>,
    pub normal: Option<u32>,
    pub metallic_roughness: Option<u32>,
    pub emission: Option<u32>,
}

impl TextureSlots {
    pub const ABSENT: i32 = -1;

    pub fn to_wire(&self) -> [i32; 4] {
        // Indices past i32::MAX are rejected by `SceneData::validate` before encoding.
        let encode = |slot: Option<u32>| slot.and_then(|index| i32::try_from(index).ok()).unwrap_or(Self::ABSENT);
        [
            encode(self.base_color),
            encode(self.normal),
            encode(self.metallic_roughness),
            encode(self.emission),
        ]
    }

    pub fn from_wire(raw: [i32; 4]) -> Self {
        let decode = |value: i32| u32::try_from(value).ok();
        Self {
            base_color: decode(raw[0]),
            normal: decode(raw[1]),
            metallic_roughness: decode(raw[2]),
            emission: decode(raw[3]),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<u32>)> {
        [
            ("base_color", self.base_color),
            ("normal", self.normal),
            ("metallic_roughness", self.metallic_roughness),
            ("emission", self.emission),
        ]
        .into_iter()
    }
}

#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), default)]
pub struct Material {
    pub name: String,
    /// Linear RGB.
    pub base_color: [f32; 3],
    pub metallic: f32,
    pub roughness: f32,
    pub emission: [f32; 3],
    pub ior: f32,
    pub opacity: f32,
    pub textures: TextureSlots,
    pub layers: MaterialLayers,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color: [0.8, 0.8, 0.8],
            metallic: 0.0,
            roughness: 0.5,
            emission: [0.0, 0.0, 0.0],
            ior: 1.5,
            opacity: 1.0,
            textures: TextureSlots::default(),
            layers: MaterialLayers::default(),
        }
    }
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn layer_flags(&self) -> LayerFlags {
        self.layers.flags()
    }

    pub fn is_advanced(&self) -> bool {
        !self.layer_flags().is_empty()
    }
}
