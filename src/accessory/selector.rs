//! Cycling through one accessory category with a single visible variant.

use crate::catalog::assets::{AccessoryCategory, AccessoryKind, catalog, catalog_len};
use crate::foundation::core::Vector3;
use crate::foundation::error::{CakeError, CakeResult};
use crate::loader::queue::{AssetLoadQueue, CancelToken, LoadTicket};
use crate::record::schema::{CandleChoice, RecordPatch, Shape};
use crate::record::store::ConfigStore;
use crate::scene::model::SceneNode;

/// Selection state for one accessory kind.
///
/// Variants land in pre-sized slots by catalog index as their loads complete. Visibility is only
/// asserted once every slot of the current batch has reported, so an early variant never flashes.
///
/// With a store attached every selection change is persisted; without one the selector only
/// mirrors the record (used for the kinds a stage does not edit).
pub struct AccessorySelector {
    kind: AccessoryKind,
    shape: Shape,
    anchor: Vector3,
    model_scale: Vector3,
    category: Option<AccessoryCategory>,
    index: usize,
    slots: Vec<Option<SceneNode>>,
    reported: usize,
    generation: u64,
    token: CancelToken,
    store: Option<ConfigStore>,
}

impl std::fmt::Debug for AccessorySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessorySelector")
            .field("kind", &self.kind)
            .field("category", &self.category)
            .field("index", &self.index)
            .field("slots", &self.slots.len())
            .field("reported", &self.reported)
            .field("generation", &self.generation)
            .finish()
    }
}

impl AccessorySelector {
    pub fn new(
        kind: AccessoryKind,
        shape: Shape,
        anchor: Vector3,
        model_scale: Vector3,
        store: Option<ConfigStore>,
    ) -> Self {
        Self {
            kind,
            shape,
            anchor,
            model_scale,
            category: None,
            index: 0,
            slots: Vec::new(),
            reported: 0,
            generation: 0,
            token: CancelToken::new(),
            store,
        }
    }

    pub fn kind(&self) -> AccessoryKind {
        self.kind
    }

    pub fn category(&self) -> Option<AccessoryCategory> {
        self.category
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn anchor(&self) -> Vector3 {
        self.anchor
    }

    pub fn is_editable(&self) -> bool {
        self.store.is_some()
    }

    /// Catalog length of the current category (0 when none).
    pub fn variant_count(&self) -> usize {
        self.slots.len()
    }

    /// Every slot of the current batch has reported.
    pub fn is_settled(&self) -> bool {
        !self.slots.is_empty() && self.reported == self.slots.len()
    }

    /// Loaded variants in catalog order; `None` for pending or failed slots.
    pub fn slots(&self) -> &[Option<SceneNode>] {
        &self.slots
    }

    pub fn visible_count(&self) -> usize {
        self.slots.iter().flatten().filter(|n| n.visible).count()
    }

    /// The variant currently shown, if loaded and settled.
    pub fn visible(&self) -> Option<&SceneNode> {
        self.slots.iter().flatten().find(|n| n.visible)
    }

    /// Switch to `category`, load its whole catalog and persist `{category, 0}`.
    #[tracing::instrument(skip(self, queue), fields(kind = self.kind.as_str()))]
    pub fn select_category(
        &mut self,
        category: AccessoryCategory,
        queue: &mut AssetLoadQueue,
    ) -> CakeResult<()> {
        self.check_kind(category)?;
        self.start_batch(category, 0, queue);
        self.persist()
    }

    /// Rebuild the selection from the persisted record without writing it back.
    pub fn restore(
        &mut self,
        category: AccessoryCategory,
        index: usize,
        queue: &mut AssetLoadQueue,
    ) -> CakeResult<()> {
        self.check_kind(category)?;
        let index = if index < catalog_len(category, self.shape) {
            index
        } else {
            0
        };
        self.start_batch(category, index, queue);
        Ok(())
    }

    fn check_kind(&self, category: AccessoryCategory) -> CakeResult<()> {
        if category.kind() != self.kind {
            return Err(CakeError::validation(format!(
                "{} category '{}' given to the {} selector",
                category.kind().as_str(),
                category.as_str(),
                self.kind.as_str()
            )));
        }
        Ok(())
    }

    fn start_batch(&mut self, category: AccessoryCategory, index: usize, queue: &mut AssetLoadQueue) {
        self.token.cancel();
        self.token = CancelToken::new();
        self.generation += 1;
        self.category = Some(category);
        self.index = index;
        self.reported = 0;

        let paths = catalog(category, self.shape);
        self.slots = vec![None; paths.len()];
        for (slot, path) in paths.into_iter().enumerate() {
            queue.request_model(
                LoadTicket::Variant {
                    kind: self.kind,
                    generation: self.generation,
                    slot,
                },
                path,
                self.token.clone(),
            );
        }
    }

    /// Deliver a completed variant load. Returns `false` when the result is stale and ignored.
    pub fn fill_slot(
        &mut self,
        generation: u64,
        slot: usize,
        result: CakeResult<SceneNode>,
    ) -> bool {
        if generation != self.generation || slot >= self.slots.len() {
            tracing::debug!(
                kind = self.kind.as_str(),
                generation,
                current = self.generation,
                slot,
                "ignoring stale variant"
            );
            return false;
        }
        match result {
            Ok(mut node) => {
                node.visible = false;
                node.position = self.anchor;
                node.scale = self.model_scale;
                self.slots[slot] = Some(node);
            }
            Err(e) => {
                tracing::warn!(kind = self.kind.as_str(), slot, "variant failed to load: {e}");
            }
        }
        self.reported += 1;
        if self.is_settled() {
            self.apply_visibility();
        }
        true
    }

    /// Show the variant at `index` (wrapped into range) and persist the choice.
    pub fn show(&mut self, index: usize) -> CakeResult<()> {
        let len = self.slots.len();
        if len == 0 {
            return Ok(());
        }
        self.index = index % len;
        if self.is_settled() {
            self.apply_visibility();
        }
        self.persist()
    }

    pub fn next(&mut self) -> CakeResult<()> {
        let len = self.slots.len();
        if len == 0 {
            return Ok(());
        }
        self.show((self.index + 1) % len)
    }

    pub fn previous(&mut self) -> CakeResult<()> {
        let len = self.slots.len();
        if len == 0 {
            return Ok(());
        }
        self.show((self.index + len - 1) % len)
    }

    /// Drop every variant, forget the category and remove it from the record.
    pub fn clear(&mut self) -> CakeResult<()> {
        self.reset();
        match &self.store {
            Some(store) => store.merge(&RecordPatch::new().remove_group(self.kind)),
            None => Ok(()),
        }
    }

    /// Forget the selection locally; in-flight loads are cancelled.
    pub fn reset(&mut self) {
        self.token.cancel();
        self.token = CancelToken::new();
        self.generation += 1;
        self.category = None;
        self.index = 0;
        self.slots.clear();
        self.reported = 0;
    }

    /// Cancel in-flight loads without touching the selection.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Move every placed variant to a new anchor.
    pub fn set_anchor(&mut self, anchor: Vector3) {
        self.anchor = anchor;
        for node in self.slots.iter_mut().flatten() {
            node.position = anchor;
        }
    }

    fn apply_visibility(&mut self) {
        let index = self.index;
        for (i, node) in self.slots.iter_mut().enumerate() {
            if let Some(node) = node {
                node.visible = i == index;
            }
        }
    }

    fn persist(&self) -> CakeResult<()> {
        let (Some(store), Some(category)) = (&self.store, self.category) else {
            return Ok(());
        };
        let patch = match category {
            AccessoryCategory::Candle(c) => RecordPatch::new().candle(Some(CandleChoice {
                category: c,
                index: self.index,
                position_override: Some(self.anchor),
            })),
            other => RecordPatch::new().accessory(other, self.index),
        };
        store.merge(&patch)
    }
}

impl Drop for AccessorySelector {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/accessory/selector.rs"]
mod tests;
