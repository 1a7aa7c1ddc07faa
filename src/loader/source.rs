use std::collections::HashMap;
use std::time::Duration;

use crate::catalog::assets::AssetPath;
use crate::foundation::error::{CakeError, CakeResult};
use crate::foundation::raster::RasterImage;
use crate::scene::model::SceneNode;

/// Where models and uploaded images come from.
///
/// Called from loader worker threads; implementations must be shareable.
pub trait AssetSource: Send + Sync {
    /// Load the model identified by an extension-less asset path.
    fn load_model(&self, path: &AssetPath) -> CakeResult<SceneNode>;
    /// Load an uploaded image by its stored URI.
    fn load_image(&self, uri: &str) -> CakeResult<RasterImage>;
}

/// In-memory source for tests and debugging.
///
/// Per-entry delays let callers force completions to arrive out of request order.
#[derive(Debug, Default)]
pub struct MemoryAssetSource {
    models: HashMap<String, (SceneNode, Duration)>,
    images: HashMap<String, (RasterImage, Duration)>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, path: &str, node: SceneNode) -> Self {
        self.models.insert(path.to_string(), (node, Duration::ZERO));
        self
    }

    pub fn with_delayed_model(mut self, path: &str, node: SceneNode, delay: Duration) -> Self {
        self.models.insert(path.to_string(), (node, delay));
        self
    }

    pub fn with_image(mut self, uri: &str, image: RasterImage) -> Self {
        self.images.insert(uri.to_string(), (image, Duration::ZERO));
        self
    }

    pub fn insert_model(&mut self, path: &str, node: SceneNode) {
        self.models.insert(path.to_string(), (node, Duration::ZERO));
    }
}

impl AssetSource for MemoryAssetSource {
    fn load_model(&self, path: &AssetPath) -> CakeResult<SceneNode> {
        let (node, delay) = self
            .models
            .get(path.as_str())
            .ok_or_else(|| CakeError::asset(format!("no model at '{path}'")))?;
        if !delay.is_zero() {
            std::thread::sleep(*delay);
        }
        Ok(node.clone())
    }

    fn load_image(&self, uri: &str) -> CakeResult<RasterImage> {
        let (image, delay) = self
            .images
            .get(uri)
            .ok_or_else(|| CakeError::asset(format!("no image at '{uri}'")))?;
        if !delay.is_zero() {
            std::thread::sleep(*delay);
        }
        Ok(image.clone())
    }
}
