//! Optional material layers and the bitmask that advertises which of them are active.
//!
//! Bit assignment is fixed; new layers only ever take the next free bit.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use crate::material::Material;

bitflags::bitflags! {
    #[derive(Default)]
    pub struct LayerFlags: u32 {
        const CLEARCOAT    = 1 << 0;
        const TRANSMISSION = 1 << 1;
        const SHEEN        = 1 << 2;
        const SUBSURFACE   = 1 << 3;
        const ANISOTROPY   = 1 << 4;
        const IRIDESCENCE  = 1 << 5;
        const VOLUME       = 1 << 6;
    }
}

/// Layers that carry an extension block in the current format version.
pub const PERSISTED_LAYERS: LayerFlags = LayerFlags::TRANSMISSION;

#[derive(Clone, Copy, Debug, Display, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    #[display("clearcoat")]
    Clearcoat,
    #[display("transmission")]
    Transmission,
    #[display("sheen")]
    Sheen,
    #[display("subsurface")]
    Subsurface,
    #[display("anisotropy")]
    Anisotropy,
    #[display("iridescence")]
    Iridescence,
    #[display("volume")]
    Volume,
}

impl LayerKind {
    pub const ALL: [LayerKind; 7] = [
        LayerKind::Clearcoat,
        LayerKind::Transmission,
        LayerKind::Sheen,
        LayerKind::Subsurface,
        LayerKind::Anisotropy,
        LayerKind::Iridescence,
        LayerKind::Volume,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Clearcoat => "clearcoat",
            LayerKind::Transmission => "transmission",
            LayerKind::Sheen => "sheen",
            LayerKind::Subsurface => "subsurface",
            LayerKind::Anisotropy => "anisotropy",
            LayerKind::Iridescence => "iridescence",
            LayerKind::Volume => "volume",
        }
    }

    pub fn flag(self) -> LayerFlags {
        match self {
            LayerKind::Clearcoat => LayerFlags::CLEARCOAT,
            LayerKind::Transmission => LayerFlags::TRANSMISSION,
            LayerKind::Sheen => LayerFlags::SHEEN,
            LayerKind::Subsurface => LayerFlags::SUBSURFACE,
            LayerKind::Anisotropy => LayerFlags::ANISOTROPY,
            LayerKind::Iridescence => LayerFlags::IRIDESCENCE,
            LayerKind::Volume => LayerFlags::VOLUME,
        }
    }
}

impl LayerFlags {
    pub fn kinds(self) -> impl Iterator<Item = LayerKind> {
        LayerKind::ALL.into_iter().filter(move |kind| self.contains(kind.flag()))
    }
}

pub trait Layer {
    const KIND: LayerKind;

    /// The strength (or density) field that decides activity.
    fn primary(&self) -> f32;

    fn is_active(&self) -> bool {
        self.primary() > 0.0
    }

    fn texture_index(&self) -> Option<u32> {
        None
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClearcoatLayer {
    pub strength: f32,
    pub roughness: f32,
    pub ior: f32,
    pub texture_index: Option<u32>,
    pub color: [f32; 3],
}

impl Default for ClearcoatLayer {
    fn default() -> Self {
        Self {
            strength: 0.0,
            roughness: 0.0,
            ior: 1.5,
            texture_index: None,
            color: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransmissionLayer {
    pub strength: f32,
    pub roughness: f32,
    pub depth: f32,
    pub texture_index: Option<u32>,
    pub color: [f32; 3],
}

impl Default for TransmissionLayer {
    fn default() -> Self {
        Self {
            strength: 0.0,
            roughness: 0.0,
            depth: 0.0,
            texture_index: None,
            color: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheenLayer {
    pub strength: f32,
    pub roughness: f32,
    pub tint: f32,
    pub texture_index: Option<u32>,
    pub color: [f32; 3],
}

impl Default for SheenLayer {
    fn default() -> Self {
        Self {
            strength: 0.0,
            roughness: 0.0,
            tint: 0.0,
            texture_index: None,
            color: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubsurfaceLayer {
    pub strength: f32,
    pub radius: f32,
    pub scale: f32,
    pub texture_index: Option<u32>,
    pub color: [f32; 3],
}

impl Default for SubsurfaceLayer {
    fn default() -> Self {
        Self {
            strength: 0.0,
            radius: 1.0,
            scale: 1.0,
            texture_index: None,
            color: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnisotropyLayer {
    pub strength: f32,
    pub rotation: f32,
    pub texture_index: Option<u32>,
    pub tangent: [f32; 3],
}

impl Default for AnisotropyLayer {
    fn default() -> Self {
        Self {
            strength: 0.0,
            rotation: 0.0,
            texture_index: None,
            tangent: [1.0, 0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IridescenceLayer {
    pub strength: f32,
    pub ior: f32,
    /// Film thickness in nanometres.
    pub thickness: f32,
    pub texture_index: Option<u32>,
}

impl Default for IridescenceLayer {
    fn default() -> Self {
        Self {
            strength: 0.0,
            ior: 1.3,
            thickness: 400.0,
            texture_index: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeLayer {
    pub density: f32,
    pub anisotropy: f32,
    pub absorption_color: [f32; 3],
}

impl Default for VolumeLayer {
    fn default() -> Self {
        Self {
            density: 0.0,
            anisotropy: 0.0,
            absorption_color: [1.0, 1.0, 1.0],
        }
    }
}

macro_rules! impl_layer {
    ($layer:ty, $kind:ident, $primary:ident) => {
        impl Layer for $layer {
            const KIND: LayerKind = LayerKind::$kind;

            fn primary(&self) -> f32 {
                self.$primary
            }
        }
    };
    ($layer:ty, $kind:ident, $primary:ident, textured) => {
        impl Layer for $layer {
            const KIND: LayerKind = LayerKind::$kind;

            fn primary(&self) -> f32 {
                self.$primary
            }

            fn texture_index(&self) -> Option<u32> {
                self.texture_index
            }
        }
    };
}

impl_layer!(ClearcoatLayer, Clearcoat, strength, textured);
impl_layer!(TransmissionLayer, Transmission, strength, textured);
impl_layer!(SheenLayer, Sheen, strength, textured);
impl_layer!(SubsurfaceLayer, Subsurface, strength, textured);
impl_layer!(AnisotropyLayer, Anisotropy, strength, textured);
impl_layer!(IridescenceLayer, Iridescence, strength, textured);
impl_layer!(VolumeLayer, Volume, density);

/// `None` means the material does not own the layer at all, which is distinct from a
/// present layer whose strength is zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialLayers {
    pub clearcoat: Option<ClearcoatLayer>,
    pub transmission: Option<TransmissionLayer>,
    pub sheen: Option<SheenLayer>,
    pub subsurface: Option<SubsurfaceLayer>,
    pub anisotropy: Option<AnisotropyLayer>,
    pub iridescence: Option<IridescenceLayer>,
    pub volume: Option<VolumeLayer>,
}

fn active<L: Layer>(layer: &Option<L>) -> LayerFlags {
    match layer {
        Some(layer) if layer.is_active() => L::KIND.flag(),
        _ => LayerFlags::empty(),
    }
}

fn present<L: Layer>(layer: &Option<L>) -> LayerFlags {
    match layer {
        Some(_) => L::KIND.flag(),
        None => LayerFlags::empty(),
    }
}

fn texture<L: Layer>(layer: &Option<L>) -> Option<(LayerKind, u32)> {
    layer
        .as_ref()
        .and_then(|layer| layer.texture_index())
        .map(|index| (L::KIND, index))
}

impl MaterialLayers {
    /// Layers that are present and active.
    pub fn flags(&self) -> LayerFlags {
        active(&self.clearcoat)
            | active(&self.transmission)
            | active(&self.sheen)
            | active(&self.subsurface)
            | active(&self.anisotropy)
            | active(&self.iridescence)
            | active(&self.volume)
    }

    /// Layers that are present, active or not.
    pub fn present(&self) -> LayerFlags {
        present(&self.clearcoat)
            | present(&self.transmission)
            | present(&self.sheen)
            | present(&self.subsurface)
            | present(&self.anisotropy)
            | present(&self.iridescence)
            | present(&self.volume)
    }

    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }

    /// Texture references held by present layers, active or not.
    pub fn texture_indices(&self) -> impl Iterator<Item = (LayerKind, u32)> {
        [
            texture(&self.clearcoat),
            texture(&self.transmission),
            texture(&self.sheen),
            texture(&self.subsurface),
            texture(&self.anisotropy),
            texture(&self.iridescence),
        ]
        .into_iter()
        .flatten()
    }
}

pub fn layer_flags(material: &Material) -> LayerFlags {
    material.layers.flags()
}
