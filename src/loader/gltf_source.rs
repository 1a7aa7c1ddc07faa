//! Filesystem asset source reading binary glTF models.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::catalog::assets::{AssetPath, normalize_rel_path};
use crate::foundation::core::{Rgba8, Vector3};
use crate::foundation::error::{CakeError, CakeResult};
use crate::foundation::raster::RasterImage;
use crate::loader::source::AssetSource;
use crate::scene::model::{Material, SceneNode, TextureMap, TextureWrap};

#[derive(Clone, Debug)]
/// Resolves `<models_root>/<asset>.glb` and uploaded images under `uploads_root`.
pub struct GltfAssetSource {
    models_root: PathBuf,
    uploads_root: PathBuf,
}

impl GltfAssetSource {
    pub fn new(models_root: impl Into<PathBuf>, uploads_root: impl Into<PathBuf>) -> Self {
        Self {
            models_root: models_root.into(),
            uploads_root: uploads_root.into(),
        }
    }

    pub fn model_file(&self, path: &AssetPath) -> PathBuf {
        self.models_root.join(format!("{}.glb", path.as_str()))
    }

    /// Uploaded-image URIs are absolute paths or paths relative to the uploads root.
    pub fn image_file(&self, uri: &str) -> CakeResult<PathBuf> {
        let uri = uri.strip_prefix("file://").unwrap_or(uri);
        if Path::new(uri).is_absolute() {
            return Ok(PathBuf::from(uri));
        }
        Ok(self.uploads_root.join(normalize_rel_path(uri)?))
    }
}

impl AssetSource for GltfAssetSource {
    #[tracing::instrument(skip(self, path), fields(path = %path))]
    fn load_model(&self, path: &AssetPath) -> CakeResult<SceneNode> {
        let file = self.model_file(path);
        let (doc, _buffers, images) = gltf::import(&file)
            .map_err(|e| CakeError::asset(format!("load '{}': {e}", file.display())))?;
        let scene = doc
            .default_scene()
            .or_else(|| doc.scenes().next())
            .ok_or_else(|| CakeError::asset(format!("'{}' has no scenes", file.display())))?;

        let textures = images
            .iter()
            .map(|img| gltf_image_to_raster(img).map(Arc::new).ok())
            .collect::<Vec<_>>();
        let children = scene.nodes().map(|n| convert_node(&n, &textures)).collect();
        Ok(SceneNode::group(path.as_str(), children))
    }

    fn load_image(&self, uri: &str) -> CakeResult<RasterImage> {
        let file = self.image_file(uri)?;
        let bytes =
            std::fs::read(&file).with_context(|| format!("read image '{}'", file.display()))?;
        RasterImage::decode(&bytes)
    }
}

fn convert_node(node: &gltf::Node<'_>, textures: &[Option<Arc<RasterImage>>]) -> SceneNode {
    let name = node.name().unwrap_or_default().to_string();
    let mut children: Vec<SceneNode> = node.children().map(|c| convert_node(&c, textures)).collect();

    let mut out = match node.mesh() {
        Some(mesh) => {
            let mut prims: Vec<SceneNode> = mesh
                .primitives()
                .map(|p| SceneNode::mesh(name.clone(), convert_material(&p.material(), textures)))
                .collect();
            if prims.len() == 1 && children.is_empty() {
                prims.remove(0)
            } else {
                for (i, p) in prims.iter_mut().enumerate() {
                    p.name = format!("{name}_{i}");
                }
                prims.append(&mut children);
                SceneNode::group(name, prims)
            }
        }
        None => SceneNode::group(name, children),
    };

    let (t, _r, s) = node.transform().decomposed();
    out.position = Vector3::new(f64::from(t[0]), f64::from(t[1]), f64::from(t[2]));
    out.scale = Vector3::new(f64::from(s[0]), f64::from(s[1]), f64::from(s[2]));
    out
}

fn convert_material(
    m: &gltf::Material<'_>,
    textures: &[Option<Arc<RasterImage>>],
) -> Material {
    let pbr = m.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;

    let map = pbr.base_color_texture().and_then(|info| {
        let image = textures.get(info.texture().source().index())?.clone()?;
        let mut map = TextureMap::plain(image);
        let sampler = info.texture().sampler();
        map.wrap_s = convert_wrap(sampler.wrap_s());
        map.wrap_t = convert_wrap(sampler.wrap_t());
        Some(map)
    });

    Material {
        color: Rgba8::new(to_u8(r), to_u8(g), to_u8(b), to_u8(a)),
        map,
        transparent: m.alpha_mode() == gltf::material::AlphaMode::Blend,
    }
}

fn convert_wrap(mode: gltf::texture::WrappingMode) -> TextureWrap {
    match mode {
        gltf::texture::WrappingMode::ClampToEdge => TextureWrap::Clamp,
        gltf::texture::WrappingMode::MirroredRepeat | gltf::texture::WrappingMode::Repeat => {
            TextureWrap::Repeat
        }
    }
}

fn gltf_image_to_raster(img: &gltf::image::Data) -> CakeResult<RasterImage> {
    use gltf::image::Format;

    let pixels = (img.width as usize) * (img.height as usize);
    let mut rgba = Vec::with_capacity(pixels * 4);
    match img.format {
        Format::R8G8B8A8 => rgba.extend_from_slice(&img.pixels),
        Format::R8G8B8 => {
            for c in img.pixels.chunks_exact(3) {
                rgba.extend_from_slice(&[c[0], c[1], c[2], 255]);
            }
        }
        Format::R8G8 => {
            for c in img.pixels.chunks_exact(2) {
                rgba.extend_from_slice(&[c[0], c[0], c[0], c[1]]);
            }
        }
        Format::R8 => {
            for &v in &img.pixels {
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        other => {
            return Err(CakeError::asset(format!(
                "unsupported embedded texture format {other:?}"
            )));
        }
    }
    RasterImage::from_straight(img.width, img.height, rgba)
}

#[cfg(test)]
#[path = "../../tests/unit/loader/gltf_source.rs"]
mod tests;
