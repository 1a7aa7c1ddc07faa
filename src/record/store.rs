//! Session persistence for the configuration record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde_json::{Map, Value};

use crate::foundation::error::{CakeError, CakeResult};
use crate::record::schema::{CakeConfiguration, RecordField, RecordPatch, sync_came_from};

/// Storage of serialized records by key.
///
/// Implementations must make `save` atomic with respect to `load`: a reader sees either the old or
/// the new string, never a mix.
pub trait RecordBackend: Send + Sync {
    /// Stored string for `key`, if any.
    fn load(&self, key: &str) -> CakeResult<Option<String>>;
    /// Overwrite the string stored under `key`.
    fn save(&self, key: &str, value: &str) -> CakeResult<()>;
}

#[derive(Debug, Default)]
/// In-process backend; lives as long as the session that owns it.
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordBackend for MemoryBackend {
    fn load(&self, key: &str) -> CakeResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory backend lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> CakeResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory backend lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Clone, Debug)]
/// Directory-backed store: one `<key>.json` file per record.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> CakeResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(CakeError::validation(format!("invalid record key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl RecordBackend for FileBackend {
    fn load(&self, key: &str) -> CakeResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("read record '{}'", path.display()))
                .into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> CakeResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create session dir '{}'", self.dir.display()))?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        std::fs::write(&tmp, value).with_context(|| format!("write '{}'", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("replace '{}'", path.display()))?;
        Ok(())
    }
}

#[derive(Clone)]
/// Read/write/merge/clear access to the single persisted configuration record.
///
/// Clones share the same backend and write lock, so a stage and its selectors can each hold a
/// handle. Every write recomputes `cameFrom`.
pub struct ConfigStore {
    backend: Arc<dyn RecordBackend>,
    key: String,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore").field("key", &self.key).finish()
    }
}

impl ConfigStore {
    /// Default record key shared by every stage.
    pub const DEFAULT_KEY: &'static str = "finalCake";

    pub fn new(backend: Arc<dyn RecordBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Fresh in-memory store under the default key.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), Self::DEFAULT_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Typed view of the record; schema defaults when nothing usable is stored.
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    pub fn read(&self) -> CakeConfiguration {
        CakeConfiguration::from_record(&self.read_raw())
    }

    /// Raw record object, including keys this crate does not know about.
    ///
    /// Missing, unreadable or non-object records read as empty.
    pub fn read_raw(&self) -> Map<String, Value> {
        let stored = match self.backend.load(&self.key) {
            Ok(Some(s)) => s,
            Ok(None) => return Map::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, "record backend read failed: {e}");
                return Map::new();
            }
        };
        match serde_json::from_str::<Value>(&stored) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                tracing::warn!(key = %self.key, kind = json_kind(&other), "record is not an object, ignoring");
                Map::new()
            }
            Err(e) => {
                tracing::warn!(key = %self.key, "record is not valid JSON, ignoring: {e}");
                Map::new()
            }
        }
    }

    /// Overwrite the whole record with `cfg`.
    #[tracing::instrument(skip(self, cfg), fields(key = %self.key))]
    pub fn write(&self, cfg: &CakeConfiguration) -> CakeResult<()> {
        let _guard = self.lock()?;
        self.save_map(cfg.to_record())
    }

    /// Shallow field-level merge over the stored record; unrelated keys survive.
    #[tracing::instrument(skip(self, patch), fields(key = %self.key))]
    pub fn merge(&self, patch: &RecordPatch) -> CakeResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let _guard = self.lock()?;
        let mut map = self.read_raw();
        patch.apply_to(&mut map);
        self.save_map(map)
    }

    /// Remove one field and persist immediately.
    pub fn clear_field(&self, field: RecordField) -> CakeResult<()> {
        self.clear_fields(&[field])
    }

    /// Remove several fields in one write.
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    pub fn clear_fields(&self, fields: &[RecordField]) -> CakeResult<()> {
        let patch = fields
            .iter()
            .fold(RecordPatch::new(), |p, f| p.remove(*f));
        self.merge(&patch)
    }

    fn lock(&self) -> CakeResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("config store write lock poisoned").into())
    }

    fn save_map(&self, mut map: Map<String, Value>) -> CakeResult<()> {
        sync_came_from(&mut map);
        let s = serde_json::to_string(&Value::Object(map))?;
        tracing::debug!(key = %self.key, bytes = s.len(), "persisting record");
        self.backend.save(&self.key, &s)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/store.rs"]
mod tests;
