//! Named-surface rules shared by every stage.

use std::sync::Arc;

use crate::foundation::core::Rgba8;
use crate::foundation::raster::RasterImage;
use crate::scene::model::{Material, SceneNode, TextureMap};

/// Meshes painted by the frosting color.
pub const FROSTING_SURFACES: &[&str] = &[
    "IcingRing",
    "IcingRing001",
    "WaveIcing",
    "design1",
    "design2",
    "design3",
    "design4",
    "design5",
    "design6",
    "design7",
    "design8",
    "design9",
    "design10",
    "design11",
    "design12",
    "design13",
    "design14",
    "design15",
    "design16",
    "Mesh1",
    "CakeTopColor",
    "CakecolorCircle",
];

/// Surface that carries the customer's uploaded image.
pub const UPLOADED_IMAGE_SURFACE: &str = "CakeTopImage";

pub fn is_frosting_surface(name: &str) -> bool {
    FROSTING_SURFACES.contains(&name)
}

/// Whether a node receives the name decal.
///
/// Only the `CakeTopCircle` comparison is gated on the node being a mesh; a non-mesh node named
/// `CakeTopColor` also matches.
pub fn decal_target_matches(node: &SceneNode) -> bool {
    (node.is_mesh() && node.name == "CakeTopCircle") || node.name == "CakeTopColor"
}

/// Paint every frosting mesh with `color`, starting from its original material.
///
/// Returns how many meshes were painted.
pub fn apply_frosting_color(root: &mut SceneNode, color: Rgba8) -> usize {
    let mut painted = 0;
    root.visit_mut(&mut |node| {
        if !node.is_mesh() || !is_frosting_surface(&node.name) {
            return;
        }
        let Some(original) = node.original_material.clone() else {
            return;
        };
        let mut m = original;
        m.color = color;
        node.material = Some(m);
        painted += 1;
    });
    painted
}

/// Restore original materials everywhere except the uploaded-image surface.
pub fn reset_materials(root: &mut SceneNode) -> usize {
    let mut reset = 0;
    root.visit_mut(&mut |node| {
        if !node.is_mesh() || node.name == UPLOADED_IMAGE_SURFACE {
            return;
        }
        if let Some(original) = &node.original_material {
            node.material = Some(original.clone());
            reset += 1;
        }
    });
    reset
}

/// Put the decal texture on every decal target.
pub fn apply_decal(root: &mut SceneNode, decal: TextureMap) -> usize {
    let mut applied = 0;
    root.visit_mut(&mut |node| {
        if decal_target_matches(node) {
            node.material = Some(Material::textured(decal.clone()));
            applied += 1;
        }
    });
    applied
}

/// Map the uploaded image onto the `CakeTopImage` mesh.
pub fn apply_uploaded_image(root: &mut SceneNode, image: Arc<RasterImage>) -> usize {
    let mut applied = 0;
    root.visit_mut(&mut |node| {
        if node.is_mesh() && node.name == UPLOADED_IMAGE_SURFACE {
            node.material = Some(Material::textured(TextureMap::plain(image.clone())));
            applied += 1;
        }
    });
    applied
}

#[cfg(test)]
#[path = "../../tests/unit/scene/surfaces.rs"]
mod tests;
