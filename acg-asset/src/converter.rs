use std::ffi::OsStr;
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use derive_builder::Builder;
use acg_core::log::{debug, info, warn};
use acg_scene::codec::FILE_EXTENSION;
use acg_scene::{write_scene_file, SceneData, SceneStatistics};
use crate::{registry, LoaderRegistry};

#[derive(Clone, Debug, Builder)]
#[builder(setter(into), default)]
pub struct ConvertOptions {
    /// Convert even when the output is newer than the input.
    pub force: bool,
    /// Read width and height of referenced images. Missing images are skipped.
    pub probe_texture_dimensions: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            force: false,
            probe_texture_dimensions: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConvertOutcome {
    UpToDate,
    Converted { bytes: usize, statistics: SceneStatistics },
}

/// Load with the registered loader, validate, encode and write.
pub struct SceneConverter<'r> {
    registry: &'r LoaderRegistry,
    options: ConvertOptions,
}

impl SceneConverter<'static> {
    pub fn new(options: ConvertOptions) -> Self {
        Self::with_registry(registry(), options)
    }
}

impl<'r> SceneConverter<'r> {
    pub fn with_registry(registry: &'r LoaderRegistry, options: ConvertOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn convert(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<ConvertOutcome> {
        let input = input.as_ref();
        let output = output.as_ref();

        if !input.is_file() {
            return Err(anyhow!("Input file {:?} does not exist", input));
        }
        if output.extension() != Some(OsStr::new(FILE_EXTENSION)) {
            warn!("Output {:?} does not use the .{} extension", output, FILE_EXTENSION);
        }

        if !self.options.force && !Self::should_convert(input, output) {
            info!("{:?} is up to date", output);
            return Ok(ConvertOutcome::UpToDate);
        }

        let loader = self.registry.create_loader(input)?;
        info!("Loading {:?} ({} format)", input, loader.format_name());

        let mut scene = loader.load(input)?;
        scene
            .validate()
            .with_context(|| format!("Scene {:?} is invalid", input))?;

        if self.options.probe_texture_dimensions {
            let base_dir = input.parent().unwrap_or(Path::new(""));
            probe_texture_dimensions(&mut scene, base_dir);
        }

        let statistics = scene.statistics();
        if !loader.supports_advanced_materials() && statistics.advanced_materials > 0 {
            warn!("{} loader reported advanced materials it cannot express", loader.format_name());
        }
        info!("Scene statistics:\n{}", statistics);

        let bytes = write_scene_file(output, &scene)
            .with_context(|| format!("Failed to write {:?}", output))?;
        info!("Wrote {} bytes to {:?}", bytes, output);

        Ok(ConvertOutcome::Converted { bytes, statistics })
    }

    /// True unless the output exists and is at least as new as the input.
    fn should_convert(input: &Path, output: &Path) -> bool {
        let output_metadata = match std::fs::metadata(output) {
            Ok(metadata) => metadata,
            Err(_) => return true,
        };

        let input_metadata = match std::fs::metadata(input) {
            Ok(metadata) => metadata,
            Err(_) => return true,
        };

        let output_last_modified_time = match output_metadata.modified() {
            Ok(time) => time,
            Err(_) => return true,
        };

        let input_last_modified_time = match input_metadata.modified() {
            Ok(time) => time,
            Err(_) => return true,
        };

        input_last_modified_time > output_last_modified_time
    }
}

/// Fill in texture dimensions for images found relative to `base_dir`.
pub fn probe_texture_dimensions(scene: &mut SceneData, base_dir: &Path) {
    for texture in scene.textures.iter_mut().filter(|texture| texture.dimensions.is_none()) {
        let image_path = base_dir.join(&texture.path);
        if !image_path.is_file() {
            debug!("Texture {:?} not found, dimensions unknown", image_path);
            continue;
        }

        match image::image_dimensions(&image_path) {
            Ok(dimensions) => texture.dimensions = Some(dimensions),
            Err(e) => warn!("Failed to read dimensions of {:?}: {}", image_path, e),
        }
    }
}
