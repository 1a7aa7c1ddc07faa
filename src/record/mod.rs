//! The persisted configuration record.
//!
//! One JSON object under a well-known key carries every stage's choices. Stages only ever add or
//! overwrite their own fields; see [`store::ConfigStore::merge`].

/// Field names, typed view and patches.
pub mod schema;
/// Backends and the store handle.
pub mod store;
