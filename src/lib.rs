//! cakecraft is the engine behind a step-by-step custom cake configurator.
//!
//! A customer walks through stages (shape, color, candle, stick, sprinkle, preview). Every stage
//! reads one persisted record, rebuilds the cake scene from it and writes its own fields back:
//!
//! - Read and merge the record through a [`ConfigStore`]
//! - Enter a [`Stage`] with a [`StageController`] and pump asset loads into the scene
//! - Submit the finished cake from the preview stage with an [`OrderIntake`]
#![forbid(unsafe_code)]

pub mod accessory;
pub mod catalog;
pub mod config;
pub mod decal;
pub mod foundation;
pub mod loader;
pub mod order;
pub mod placement;
pub mod record;
pub mod scene;
pub mod stage;

pub use crate::foundation::core::{Rgba8, Vector3};
pub use crate::foundation::error::{CakeError, CakeResult};
pub use crate::foundation::raster::RasterImage;

pub use crate::accessory::selector::AccessorySelector;
pub use crate::catalog::assets::{AccessoryCategory, AccessoryKind, AssetPath};
pub use crate::config::settings::ConfiguratorSettings;
pub use crate::decal::compositor::{DecalCompositor, DecalFont};
pub use crate::loader::gltf_source::GltfAssetSource;
pub use crate::loader::queue::{AssetLoadQueue, CancelToken};
pub use crate::loader::source::{AssetSource, MemoryAssetSource};
pub use crate::order::submit::{
    JsonSceneExporter, OrderForm, OrderIntake, OrderSubmission, SceneExporter, SpoolIntake,
};
pub use crate::placement::resolver::{AnchorKind, placement, resolve};
pub use crate::record::schema::{
    CakeConfiguration, DesignNumber, Icing, RecordField, RecordPatch, Shape, SourceMode,
};
pub use crate::record::store::{ConfigStore, FileBackend, MemoryBackend, RecordBackend};
pub use crate::scene::model::{Material, SceneNode};
pub use crate::stage::controller::{Stage, StageController};
