/// `.glb` models and uploaded images from disk.
pub mod gltf_source;
pub mod queue;
/// Asset source trait and the in-memory source.
pub mod source;
