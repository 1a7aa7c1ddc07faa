pub mod core;
pub mod error;
/// Owned premultiplied RGBA8 images.
pub mod raster;
