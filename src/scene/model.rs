//! Owned scene-node tree handed back by asset sources.
//!
//! This is deliberately small: enough structure to target named surfaces, swap materials,
//! toggle visibility and place accessories. Geometry stays with the rendering engine.

use std::sync::Arc;

use crate::foundation::core::{Rgba8, Vec2, Vector3};
use crate::foundation::raster::RasterImage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Mesh,
    Group,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureWrap {
    Clamp,
    Repeat,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
/// An image bound to a material with its sampling setup.
pub struct TextureMap {
    pub image: Arc<RasterImage>,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub repeat: Vec2,
}

impl TextureMap {
    /// Clamp-to-edge mapping with unit repeat.
    pub fn plain(image: Arc<RasterImage>) -> Self {
        Self {
            image,
            wrap_s: TextureWrap::Clamp,
            wrap_t: TextureWrap::Clamp,
            repeat: Vec2::new(1.0, 1.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Material {
    /// Base color (straight alpha).
    pub color: Rgba8,
    pub map: Option<TextureMap>,
    pub transparent: bool,
}

impl Material {
    pub fn solid(color: Rgba8) -> Self {
        Self {
            color,
            map: None,
            transparent: false,
        }
    }

    /// Unlit, transparent material showing `map` as-is.
    pub fn textured(map: TextureMap) -> Self {
        Self {
            color: Rgba8::WHITE,
            map: Some(map),
            transparent: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub material: Option<Material>,
    /// Material as loaded; restored when a stage resets its overrides.
    #[serde(skip)]
    pub original_material: Option<Material>,
    pub visible: bool,
    pub position: Vector3,
    pub scale: Vector3,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// A mesh whose current and original material are both `material`.
    pub fn mesh(name: impl Into<String>, material: Material) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Mesh,
            original_material: Some(material.clone()),
            material: Some(material),
            visible: true,
            position: Vector3::ZERO,
            scale: Vector3::new(1.0, 1.0, 1.0),
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>, children: Vec<SceneNode>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Group,
            material: None,
            original_material: None,
            visible: true,
            position: Vector3::ZERO,
            scale: Vector3::new(1.0, 1.0, 1.0),
            children,
        }
    }

    pub fn is_mesh(&self) -> bool {
        self.kind == NodeKind::Mesh
    }

    /// Depth-first, parent before children.
    pub fn visit(&self, f: &mut impl FnMut(&SceneNode)) {
        f(self);
        for c in &self.children {
            c.visit(f);
        }
    }

    /// Depth-first, parent before children.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut SceneNode)) {
        f(self);
        for c in &mut self.children {
            c.visit_mut(f);
        }
    }

    /// First node named `name`, depth-first.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }

    pub fn node_count(&self) -> usize {
        let mut n = 0;
        self.visit(&mut |_| n += 1);
        n
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
