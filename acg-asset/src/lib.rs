//! Load (authoring file) -> SceneData -> validate -> encode -> store `.acg` to disk

use std::path::Path;
use std::sync::OnceLock;
use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use acg_core::collections::hashmap::HashMap;
use acg_core::log::{debug, warn};
use acg_scene::SceneData;

pub mod gltf_loader;
pub mod acg_loader;
pub mod converter;

pub use converter::{ConvertOptions, ConvertOptionsBuilder, ConvertOutcome, SceneConverter};

static LOADER_REGISTRY: OnceLock<LoaderRegistry> = OnceLock::new();

/// Process-wide registry, built with the built-in loaders on first use.
pub fn registry() -> &'static LoaderRegistry {
    LOADER_REGISTRY.get_or_init(LoaderRegistry::with_builtin_loaders)
}

/// Produces a [`SceneData`] from an authoring file.
///
/// Implementations only need to satisfy the scene invariants; the codec never looks at
/// how the scene was built.
pub trait SceneLoader {
    fn load(&self, path: &Path) -> Result<SceneData>;

    /// Whether the format can express clearcoat, transmission and the other layers.
    fn supports_advanced_materials(&self) -> bool;

    fn format_name(&self) -> &'static str;
}

pub type LoaderConstructor = fn() -> Box<dyn SceneLoader>;

/// Extension -> loader constructor.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: RwLock<HashMap<String, LoaderConstructor>>,
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

fn create_gltf_loader() -> Box<dyn SceneLoader> {
    Box::new(gltf_loader::GltfLoader::new())
}

fn create_acg_loader() -> Box<dyn SceneLoader> {
    Box::new(acg_loader::AcgLoader::new())
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self {
            ..Default::default()
        }
    }

    pub fn with_builtin_loaders() -> Self {
        let registry = Self::new();
        registry.register(&["gltf", "glb"], create_gltf_loader);
        registry.register(&["acg"], create_acg_loader);
        registry
    }

    /// Register `constructor` for each extension. A previous registration is replaced.
    pub fn register(&self, extensions: &[&str], constructor: LoaderConstructor) {
        let mut loaders = self.loaders.write();
        for extension in extensions {
            let key = normalize_extension(extension);
            if loaders.insert(key.clone(), constructor).is_some() {
                warn!("Overwriting existing loader for .{}", key);
            } else {
                debug!("Registered loader for .{}", key);
            }
        }
    }

    pub fn unregister(&self, extension: &str) -> bool {
        self.loaders.write().remove(&normalize_extension(extension)).is_some()
    }

    pub fn get(&self, extension: &str) -> Option<LoaderConstructor> {
        self.loaders.read().get(&normalize_extension(extension)).copied()
    }

    pub fn create_loader(&self, path: &Path) -> Result<Box<dyn SceneLoader>> {
        let extension = path
            .extension()
            .and_then(|os_str| os_str.to_str())
            .ok_or(anyhow!("File {:?} has no extension to pick a loader from", path))?;

        let constructor = self.get(extension).ok_or_else(|| {
            anyhow!(
                "No loader registered for extension .{} (supported: {})",
                normalize_extension(extension),
                self.supported_extensions().join(", ")
            )
        })?;

        Ok(constructor())
    }

    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.loaders.read().keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use super::*;

    struct NamedLoader;

    impl SceneLoader for NamedLoader {
        fn load(&self, _path: &Path) -> Result<SceneData> {
            Ok(SceneData::default())
        }

        fn supports_advanced_materials(&self) -> bool {
            false
        }

        fn format_name(&self) -> &'static str {
            "Named"
        }
    }

    fn create_named_loader() -> Box<dyn SceneLoader> {
        Box::new(NamedLoader)
    }

    #[test]
    fn builtin_extensions() {
        let registry = LoaderRegistry::with_builtin_loaders();
        assert_eq!(registry.supported_extensions(), vec!["acg", "glb", "gltf"]);
        assert_eq!(registry.create_loader(Path::new("a/scene.glb")).unwrap().format_name(), "glTF");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = LoaderRegistry::new();
        registry.register(&[".Named"], create_named_loader);

        assert!(registry.get("NAMED").is_some());
        assert!(registry.create_loader(&PathBuf::from("scene.NaMeD")).is_ok());
    }

    #[test]
    fn duplicate_registration_replaces() {
        let registry = LoaderRegistry::with_builtin_loaders();
        registry.register(&["gltf"], create_named_loader);

        assert_eq!(registry.create_loader(Path::new("x.gltf")).unwrap().format_name(), "Named");
        assert_eq!(registry.create_loader(Path::new("x.glb")).unwrap().format_name(), "glTF");
        assert_eq!(registry.supported_extensions().len(), 3);
    }

    #[test]
    fn unknown_extension_lists_supported_formats() {
        let registry = LoaderRegistry::with_builtin_loaders();
        let message = registry.create_loader(Path::new("model.fbx")).err().unwrap().to_string();

        assert!(message.contains(".fbx"));
        assert!(message.contains("acg, glb, gltf"));
    }

    #[test]
    fn missing_extension_is_an_error() {
        let registry = LoaderRegistry::with_builtin_loaders();
        assert!(registry.create_loader(Path::new("README")).is_err());
    }

    #[test]
    fn unregister_removes_entry() {
        let registry = LoaderRegistry::with_builtin_loaders();
        assert!(registry.unregister("ACG"));
        assert!(!registry.unregister("acg"));
        assert!(registry.get("acg").is_none());
    }

    #[test]
    fn global_registry_is_shared() {
        assert!(std::ptr::eq(registry(), registry()));
        assert!(registry().get("gltf").is_some());
    }
}
