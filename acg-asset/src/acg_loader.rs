use std::path::Path;
use anyhow::{Context, Result};
use acg_scene::{read_scene_file, SceneData};
use crate::SceneLoader;

/// Reads scenes that were already converted. Only the transmission layer survives encoding.
#[derive(Debug, Clone, Default)]
pub struct AcgLoader;

impl AcgLoader {
    pub fn new() -> Self {
        Self
    }
}

impl SceneLoader for AcgLoader {
    fn load(&self, path: &Path) -> Result<SceneData> {
        read_scene_file(path).with_context(|| format!("Failed to read scene {:?}", path))
    }

    fn supports_advanced_materials(&self) -> bool {
        true
    }

    fn format_name(&self) -> &'static str {
        "ACG"
    }
}
