//! Per-stage orchestration of the configurator wizard.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::accessory::selector::AccessorySelector;
use crate::catalog::assets::{AccessoryCategory, AccessoryKind, base_cake_path};
use crate::config::settings::ConfiguratorSettings;
use crate::decal::compositor::{DecalCompositor, DecalFont};
use crate::decal::layout::decal_texture_map;
use crate::foundation::core::{Rgba8, Vector3};
use crate::foundation::error::{CakeError, CakeResult};
use crate::foundation::raster::RasterImage;
use crate::loader::queue::{AssetLoadQueue, CancelToken, LoadCompletion, LoadTicket, LoadedAsset};
use crate::loader::source::AssetSource;
use crate::order::submit::{OrderForm, OrderIntake, OrderSubmission, SceneExporter};
use crate::placement::resolver::{AnchorKind, placement, resolve};
use crate::record::schema::{
    CakeConfiguration, CandleChoice, DesignNumber, Icing, RecordField, RecordPatch, Shape, SourceMode,
};
use crate::record::store::ConfigStore;
use crate::scene::model::SceneNode;
use crate::scene::surfaces::{
    apply_decal, apply_frosting_color, apply_uploaded_image, reset_materials,
};

/// Longest celebrant name the color stage accepts, in characters.
pub const MAX_NAME_CHARS: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Shape,
    Color,
    Candle,
    Stick,
    Sprinkle,
    Preview,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Shape,
        Stage::Color,
        Stage::Candle,
        Stage::Stick,
        Stage::Sprinkle,
        Stage::Preview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Shape => "shape",
            Stage::Color => "color",
            Stage::Candle => "candle",
            Stage::Stick => "stick",
            Stage::Sprinkle => "sprinkle",
            Stage::Preview => "preview",
        }
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.position() + 1).copied()
    }

    pub fn back(self) -> Option<Stage> {
        self.position().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Accessory kind this stage edits.
    pub fn edits(self) -> Option<AccessoryKind> {
        match self {
            Stage::Candle => Some(AccessoryKind::Candle),
            Stage::Stick => Some(AccessoryKind::Stick),
            Stage::Sprinkle => Some(AccessoryKind::Sprinkle),
            _ => None,
        }
    }

    /// Whether accessories of `kind` are part of this stage's scene.
    ///
    /// Each accessory stage shows what earlier stages chose plus its own kind.
    pub fn shows(self, kind: AccessoryKind) -> bool {
        let first = match kind {
            AccessoryKind::Candle => Stage::Candle,
            AccessoryKind::Stick => Stage::Stick,
            AccessoryKind::Sprinkle => Stage::Sprinkle,
        };
        self.position() >= first.position()
    }
}

impl std::str::FromStr for Stage {
    type Err = CakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| CakeError::validation(format!("unknown stage '{s}'")))
    }
}

/// Drives one stage: restores the record into a scene, applies edits, persists on exit.
///
/// Loads complete on worker threads; call [`StageController::pump`] or
/// [`StageController::wait_idle`] to fold their results into the scene. Dropping the controller
/// cancels every outstanding load.
pub struct StageController {
    stage: Stage,
    settings: ConfiguratorSettings,
    store: ConfigStore,
    queue: AssetLoadQueue,
    compositor: Option<DecalCompositor>,
    config: CakeConfiguration,
    cake: Option<SceneNode>,
    uploaded_image: Option<Arc<RasterImage>>,
    decal: Option<Arc<RasterImage>>,
    cake_generation: u64,
    cake_token: CancelToken,
    selectors: Vec<AccessorySelector>,
}

impl std::fmt::Debug for StageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageController")
            .field("stage", &self.stage)
            .field("config", &self.config)
            .field("cake_loaded", &self.cake.is_some())
            .field("cake_generation", &self.cake_generation)
            .field("selectors", &self.selectors)
            .field("in_flight", &self.queue.in_flight())
            .finish()
    }
}

impl StageController {
    /// Enter `stage`: read the record, request the cake and restore accessory selections.
    ///
    /// Without a font, names are kept in the record but no decal is drawn.
    #[tracing::instrument(skip_all, fields(stage = stage.as_str()))]
    pub fn enter(
        stage: Stage,
        settings: ConfiguratorSettings,
        store: ConfigStore,
        source: Arc<dyn AssetSource>,
        font: Option<&DecalFont>,
    ) -> CakeResult<Self> {
        let queue = AssetLoadQueue::new(source, settings.load_threads)?;
        let compositor = match font.map(DecalCompositor::new).transpose() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("decal font unusable, names will not be drawn: {e}");
                None
            }
        };
        let config = store.read();
        let raw = store.read_raw();
        if [RecordField::Shape, RecordField::Icing]
            .iter()
            .any(|f| !raw.contains_key(f.as_str()))
        {
            store.merge(&RecordPatch::new().shape(config.shape).icing(config.icing))?;
        }

        let mut ctl = Self {
            stage,
            settings,
            store,
            queue,
            compositor,
            config,
            cake: None,
            uploaded_image: None,
            decal: None,
            cake_generation: 0,
            cake_token: CancelToken::new(),
            selectors: Vec::new(),
        };
        ctl.refresh_decal();
        ctl.request_cake();
        ctl.restore_selectors()?;
        tracing::debug!(mode = ?ctl.config.source_mode(), "stage entered");
        Ok(ctl)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn settings(&self) -> &ConfiguratorSettings {
        &self.settings
    }

    /// The working configuration, including edits not yet re-read from the store.
    pub fn config(&self) -> &CakeConfiguration {
        &self.config
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// The base cake once loaded, with overrides applied.
    pub fn cake(&self) -> Option<&SceneNode> {
        self.cake.as_ref()
    }

    /// The current name decal, if any.
    pub fn decal(&self) -> Option<&Arc<RasterImage>> {
        self.decal.as_ref()
    }

    pub fn selector(&self, kind: AccessoryKind) -> Option<&AccessorySelector> {
        self.selectors.iter().find(|s| s.kind() == kind)
    }

    pub fn is_idle(&self) -> bool {
        self.queue.in_flight() == 0
    }

    fn anchor_for(&self, kind: AccessoryKind) -> Vector3 {
        let (shape, design) = (self.config.shape, self.config.design_number);
        match kind {
            AccessoryKind::Sprinkle => self.settings.sprinkle_anchor,
            // Only the candle stage re-derives the candle anchor; later stages keep the stored one.
            AccessoryKind::Candle if self.stage.edits() != Some(kind) => placement(
                shape,
                design,
                AnchorKind::Candle,
                self.config.candle.and_then(|c| c.position_override),
            ),
            _ => resolve(shape, design, kind.into()),
        }
    }

    fn restore_selectors(&mut self) -> CakeResult<()> {
        for kind in AccessoryKind::ALL {
            if !self.stage.shows(kind) {
                continue;
            }
            let editable = self.stage.edits() == Some(kind);
            let mut selector = AccessorySelector::new(
                kind,
                self.config.shape,
                self.anchor_for(kind),
                self.settings.model_scale,
                editable.then(|| self.store.clone()),
            );
            let restored = self.config.accessory(kind);
            if let Some((category, index)) = restored {
                selector.restore(category, index, &mut self.queue)?;
            }
            self.selectors.push(selector);
            if editable && restored.is_some() {
                // Re-showing the choice rewrites its fields, so a stale candle position is replaced.
                self.sync_accessory(self.selectors.len() - 1);
                self.store.merge(&self.stage_patch())?;
            }
        }
        Ok(())
    }

    fn request_cake(&mut self) {
        self.cake_token.cancel();
        self.cake_token = CancelToken::new();
        self.cake_generation += 1;
        self.cake = None;
        self.uploaded_image = None;

        let generation = self.cake_generation;
        let mode = self.config.source_mode();
        let path = base_cake_path(self.config.shape, self.config.icing, mode);
        self.queue.request_model(
            LoadTicket::Cake { generation },
            path,
            self.cake_token.clone(),
        );
        if mode == SourceMode::UploadedImage
            && let Some(uri) = self.config.uploaded_image_path.clone()
        {
            self.queue.request_image(
                LoadTicket::UploadedImage { generation },
                uri,
                self.cake_token.clone(),
            );
        }
    }

    /// Fold every completion that has already arrived into the scene.
    pub fn pump(&mut self) -> usize {
        let done = self.queue.try_drain();
        let n = done.len();
        for completion in done {
            self.route(completion);
        }
        n
    }

    /// Block until every outstanding load has reported or `timeout` passes.
    ///
    /// Returns whether the queue drained.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_idle() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            if let Some(c) = self.queue.recv_timeout(left) {
                self.route(c);
            }
        }
        self.is_idle()
    }

    fn route(&mut self, completion: LoadCompletion) {
        let LoadCompletion { ticket, result } = completion;
        match ticket {
            LoadTicket::Cake { generation } => {
                if generation != self.cake_generation {
                    tracing::debug!(generation, "ignoring stale cake");
                    return;
                }
                match result {
                    Ok(LoadedAsset::Model(mut node)) => {
                        node.scale = self.settings.model_scale;
                        node.position = self.settings.model_offset;
                        self.cake = Some(node);
                        self.apply_cake_overrides();
                    }
                    Ok(LoadedAsset::Image(_)) => {
                        tracing::warn!("cake request returned an image");
                    }
                    Err(e) => tracing::warn!("cake model failed to load: {e}"),
                }
            }
            LoadTicket::UploadedImage { generation } => {
                if generation != self.cake_generation {
                    return;
                }
                match result {
                    Ok(LoadedAsset::Image(img)) => {
                        let img = Arc::new(img);
                        if let Some(cake) = &mut self.cake {
                            apply_uploaded_image(cake, img.clone());
                        }
                        self.uploaded_image = Some(img);
                    }
                    Ok(LoadedAsset::Model(_)) => {
                        tracing::warn!("uploaded image request returned a model");
                    }
                    Err(e) => tracing::warn!("uploaded image failed to load: {e}"),
                }
            }
            LoadTicket::Variant {
                kind,
                generation,
                slot,
            } => {
                let Some(selector) = self.selectors.iter_mut().find(|s| s.kind() == kind) else {
                    return;
                };
                let result = result.and_then(|asset| match asset {
                    LoadedAsset::Model(node) => Ok(node),
                    LoadedAsset::Image(_) => {
                        Err(CakeError::asset("variant request returned an image"))
                    }
                });
                selector.fill_slot(generation, slot, result);
            }
        }
    }

    /// Reapply record-driven overrides on the loaded cake: uploaded image, color, then name.
    fn apply_cake_overrides(&mut self) {
        let Some(cake) = &mut self.cake else {
            return;
        };
        if let Some(img) = &self.uploaded_image {
            apply_uploaded_image(cake, img.clone());
        }
        if let Some(color) = self.config.frosting_color {
            let n = apply_frosting_color(cake, color);
            tracing::debug!(surfaces = n, %color, "frosting applied");
        }
        if let Some(decal) = &self.decal {
            let n = apply_decal(cake, decal_texture_map(decal.clone()));
            if n == 0 {
                tracing::debug!("cake has no decal target");
            }
        }
    }

    fn refresh_decal(&mut self) {
        self.decal = None;
        if self.config.source_mode() == SourceMode::UploadedImage {
            return;
        }
        let Some(name) = self.config.celebrant_name.clone() else {
            return;
        };
        let Some(compositor) = self.compositor.as_mut() else {
            tracing::warn!("no decal font available; name left off the cake");
            return;
        };
        match compositor.compose(&name, self.config.icing, self.config.design_number) {
            Ok(decal) => self.decal = decal,
            Err(e) => tracing::warn!("decal failed to render: {e}"),
        }
    }

    fn require_stage(&self, stage: Stage, op: &str) -> CakeResult<()> {
        if self.stage != stage {
            return Err(CakeError::validation(format!(
                "{op} is not available on the {} stage",
                self.stage.as_str()
            )));
        }
        Ok(())
    }

    fn cake_changed(&mut self, patch: RecordPatch) -> CakeResult<()> {
        self.store.merge(&patch)?;
        self.refresh_decal();
        self.request_cake();
        Ok(())
    }

    pub fn select_shape(&mut self, shape: Shape) -> CakeResult<()> {
        self.require_stage(Stage::Shape, "choosing a shape")?;
        self.config.shape = shape;
        self.cake_changed(RecordPatch::new().shape(shape))
    }

    pub fn select_icing(&mut self, icing: Icing) -> CakeResult<()> {
        self.require_stage(Stage::Shape, "choosing an icing")?;
        self.config.icing = icing;
        self.cake_changed(RecordPatch::new().icing(icing))
    }

    /// Choose a catalog design, or plain icing with `None`. Drops any uploaded image.
    pub fn select_design(&mut self, design: Option<DesignNumber>) -> CakeResult<()> {
        self.require_stage(Stage::Shape, "choosing a design")?;
        self.config.design_number = design;
        self.config.uploaded_image_path = None;
        self.cake_changed(RecordPatch::new().design(design).uploaded_image(None))
    }

    /// Put an uploaded image on the cake top. A chosen design is kept but overridden.
    pub fn set_uploaded_image(&mut self, uri: Option<String>) -> CakeResult<()> {
        self.require_stage(Stage::Shape, "uploading an image")?;
        let uri = uri.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        self.config.uploaded_image_path = uri.clone();
        self.cake_changed(RecordPatch::new().uploaded_image(uri))
    }

    /// Paint the frosting surfaces with a `#rrggbb` color and persist it.
    pub fn set_frosting_color(&mut self, hex: &str) -> CakeResult<Rgba8> {
        self.require_stage(Stage::Color, "setting the frosting color")?;
        let color = Rgba8::parse_hex(hex)?;
        self.config.frosting_color = Some(color);
        self.store
            .merge(&RecordPatch::new().frosting_color(Some(color)))?;
        if let Some(cake) = &mut self.cake {
            apply_frosting_color(cake, color);
        }
        Ok(color)
    }

    /// Write `name` onto the cake top and persist it.
    ///
    /// Returns `false` when the trimmed name is empty and nothing changed.
    pub fn apply_name(&mut self, name: &str) -> CakeResult<bool> {
        self.require_stage(Stage::Color, "naming the cake")?;
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        if self.config.source_mode() == SourceMode::UploadedImage {
            return Err(CakeError::validation(
                "names cannot be added to a cake with an uploaded image",
            ));
        }
        let chars = name.chars().count();
        if chars > MAX_NAME_CHARS {
            return Err(CakeError::validation(format!(
                "name is {chars} characters, at most {MAX_NAME_CHARS} allowed"
            )));
        }

        self.config.celebrant_name = Some(name.to_string());
        self.store
            .merge(&RecordPatch::new().celebrant_name(Some(name.to_string())))?;
        self.refresh_decal();
        if let (Some(cake), Some(decal)) = (&mut self.cake, &self.decal) {
            apply_decal(cake, decal_texture_map(decal.clone()));
        }
        Ok(true)
    }

    /// Remove color and name from the record and restore the cake's original materials.
    pub fn clear_color_and_name(&mut self) -> CakeResult<()> {
        self.require_stage(Stage::Color, "clearing color and name")?;
        self.config.frosting_color = None;
        self.config.celebrant_name = None;
        self.decal = None;
        self.store
            .clear_fields(&[RecordField::FrostingColor, RecordField::CelebrantName])?;
        if let Some(cake) = &mut self.cake {
            reset_materials(cake);
        }
        Ok(())
    }

    fn editable_index(&self) -> CakeResult<usize> {
        let kind = self.stage.edits().ok_or_else(|| {
            CakeError::validation(format!(
                "the {} stage has no accessories to edit",
                self.stage.as_str()
            ))
        })?;
        self.selectors
            .iter()
            .position(|s| s.kind() == kind)
            .ok_or_else(|| CakeError::validation(format!("no {} selector", kind.as_str())))
    }

    /// Switch the stage's accessory to `category` and start loading its variants.
    pub fn select_category(&mut self, category: AccessoryCategory) -> CakeResult<()> {
        let i = self.editable_index()?;
        self.selectors[i].select_category(category, &mut self.queue)?;
        self.sync_accessory(i);
        Ok(())
    }

    pub fn next_variant(&mut self) -> CakeResult<()> {
        let i = self.editable_index()?;
        self.selectors[i].next()?;
        self.sync_accessory(i);
        Ok(())
    }

    pub fn previous_variant(&mut self) -> CakeResult<()> {
        let i = self.editable_index()?;
        self.selectors[i].previous()?;
        self.sync_accessory(i);
        Ok(())
    }

    pub fn clear_accessory(&mut self) -> CakeResult<()> {
        let i = self.editable_index()?;
        self.selectors[i].clear()?;
        self.sync_accessory(i);
        Ok(())
    }

    /// Mirror selector state into the working configuration.
    fn sync_accessory(&mut self, i: usize) {
        let selector = &self.selectors[i];
        let patch = match selector.category() {
            Some(AccessoryCategory::Candle(c)) => {
                RecordPatch::new().candle(Some(CandleChoice {
                    category: c,
                    index: selector.index(),
                    position_override: Some(selector.anchor()),
                }))
            }
            Some(other) => RecordPatch::new().accessory(other, selector.index()),
            None => RecordPatch::new().remove_group(selector.kind()),
        };
        let mut record = self.config.to_record();
        patch.apply_to(&mut record);
        self.config = CakeConfiguration::from_record(&record);
    }

    fn stage_patch(&self) -> RecordPatch {
        let cfg = &self.config;
        match self.stage {
            Stage::Shape => RecordPatch::new()
                .shape(cfg.shape)
                .icing(cfg.icing)
                .design(cfg.design_number)
                .uploaded_image(cfg.uploaded_image_path.clone()),
            Stage::Color => RecordPatch::new()
                .frosting_color(cfg.frosting_color)
                .celebrant_name(cfg.celebrant_name.clone()),
            Stage::Candle => RecordPatch::new().candle(cfg.candle),
            Stage::Stick => RecordPatch::new().stick(cfg.stick),
            Stage::Sprinkle => RecordPatch::new().sprinkle(cfg.sprinkle),
            Stage::Preview => RecordPatch::new(),
        }
    }

    /// Persist this stage's fields, stop every load and return the following stage.
    #[tracing::instrument(skip_all, fields(stage = self.stage.as_str()))]
    pub fn advance(self) -> CakeResult<Option<Stage>> {
        self.store.merge(&self.stage_patch())?;
        Ok(self.stage.next())
    }

    /// Leave without merging; edits already applied stay persisted.
    pub fn go_back(self) -> Option<Stage> {
        self.stage.back()
    }

    /// The scene as the customer sees it: the cake plus every visible accessory.
    pub fn scene_snapshot(&self) -> SceneNode {
        let mut children: Vec<SceneNode> = self.cake.iter().cloned().collect();
        for selector in &self.selectors {
            if let Some(node) = selector.visible() {
                children.push(node.clone());
            }
        }
        SceneNode::group("cake_scene", children)
    }

    /// Export the scene and send the order. The intake's reply is returned unchanged.
    #[tracing::instrument(skip_all)]
    pub fn submit(
        &self,
        form: &OrderForm,
        exporter: &dyn SceneExporter,
        intake: &dyn OrderIntake,
    ) -> CakeResult<String> {
        self.require_stage(Stage::Preview, "submitting an order")?;
        let export = exporter.export(&self.scene_snapshot())?;
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let submission = OrderSubmission::build(form, &self.config, export, millis);
        intake.submit(&submission)
    }
}

impl Drop for StageController {
    fn drop(&mut self) {
        self.cake_token.cancel();
        for selector in &self.selectors {
            selector.cancel();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/controller.rs"]
mod tests;
