use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::core::Vector3;
use crate::foundation::error::CakeResult;
use crate::record::store::ConfigStore;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Runtime knobs for a configurator session.
///
/// Every field has a default, so a settings file only needs the keys it changes.
pub struct ConfiguratorSettings {
    /// Directory holding `icing/`, `designs/`, `image/` and `accessories/` models.
    pub models_root: PathBuf,
    /// Directory uploaded images are resolved against.
    pub uploads_root: PathBuf,
    /// Font used for name decals. `None` picks a bold sans face from the system.
    pub decal_font: Option<PathBuf>,
    /// Asset loader worker threads. `None` lets the pool decide.
    pub load_threads: Option<usize>,
    /// Key of the persisted record.
    pub record_key: String,
    /// Scale applied to every loaded model.
    pub model_scale: Vector3,
    /// Offset applied to every loaded model.
    pub model_offset: Vector3,
    /// Where sprinkle models sit regardless of shape or design.
    pub sprinkle_anchor: Vector3,
}

impl Default for ConfiguratorSettings {
    fn default() -> Self {
        Self {
            models_root: PathBuf::from("models"),
            uploads_root: PathBuf::from("uploads"),
            decal_font: None,
            load_threads: None,
            record_key: ConfigStore::DEFAULT_KEY.to_string(),
            model_scale: Vector3::new(2.5, 2.0, 2.5),
            model_offset: Vector3::new(0.0, -2.0, 0.0),
            sprinkle_anchor: Vector3::new(0.0, -1.9, 0.0),
        }
    }
}

impl ConfiguratorSettings {
    /// Defaults with `CAKECRAFT_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env(|k| std::env::var(k).ok())
    }

    /// Read a JSON settings file, then apply environment overrides.
    pub fn from_file(path: &Path) -> CakeResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read settings '{}'", path.display()))?;
        let settings: Self = serde_json::from_str(&text)?;
        Ok(settings.with_env(|k| std::env::var(k).ok()))
    }

    /// Apply overrides from `lookup`. Empty or unparsable values are ignored.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("CAKECRAFT_MODELS_ROOT") {
            self.models_root = PathBuf::from(v);
        }
        if let Some(v) = get("CAKECRAFT_UPLOADS_ROOT") {
            self.uploads_root = PathBuf::from(v);
        }
        if let Some(v) = get("CAKECRAFT_DECAL_FONT") {
            self.decal_font = Some(PathBuf::from(v));
        }
        if let Some(n) = get("CAKECRAFT_LOAD_THREADS")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            self.load_threads = Some(n);
        }
        if let Some(v) = get("CAKECRAFT_RECORD_KEY") {
            self.record_key = v;
        }
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/settings.rs"]
mod tests;
