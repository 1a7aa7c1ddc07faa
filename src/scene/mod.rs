//! Boundary scene model handed back by asset sources.

pub mod model;
/// Named-surface rules for color, decals and uploaded images.
pub mod surfaces;
