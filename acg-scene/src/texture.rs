use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texture {
    pub path: String,
    /// Width and height when the image was probed. Informational only, never encoded.
    pub dimensions: Option<(u32, u32)>,
}

impl Texture {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }
}
