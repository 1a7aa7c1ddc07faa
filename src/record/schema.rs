//! The persisted cake record.
//!
//! [`CakeConfiguration`] is the typed view every stage works with. On disk (or in the session
//! store) the record is a flat JSON object whose keys are listed in [`RecordField`]; those names
//! are shared with other stages and must not change.
//!
//! Reading is lenient field-by-field: a malformed or unknown value drops only that field (with a
//! warning) and the schema default applies. Writing is exact.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::catalog::assets::{
    AccessoryCategory, AccessoryKind, CandleCategory, SprinkleCategory, StickCategory,
    catalog_len,
};
use crate::foundation::core::{Rgba8, Vector3};
use crate::foundation::error::{CakeError, CakeResult};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
/// Cake tier shape.
pub enum Shape {
    /// Round cake (default).
    #[default]
    Round,
    /// Square cake.
    Square,
    /// Heart-shaped cake.
    Heart,
}

impl Shape {
    /// All shapes in catalog order.
    pub const ALL: [Shape; 3] = [Shape::Round, Shape::Square, Shape::Heart];

    /// Record/asset-path spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Round => "round",
            Shape::Square => "square",
            Shape::Heart => "heart",
        }
    }
}

impl std::str::FromStr for Shape {
    type Err = CakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_closed(s, "shape")
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
/// Icing flavor.
pub enum Icing {
    /// Vanilla icing (default).
    #[default]
    Vanilla,
    /// Chocolate icing.
    Chocolate,
    /// Strawberry icing.
    Strawberry,
}

impl Icing {
    /// All flavors.
    pub const ALL: [Icing; 3] = [Icing::Vanilla, Icing::Chocolate, Icing::Strawberry];

    /// Record/asset-path spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Icing::Vanilla => "vanilla",
            Icing::Chocolate => "chocolate",
            Icing::Strawberry => "strawberry",
        }
    }
}

impl std::str::FromStr for Icing {
    type Err = CakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_closed(s, "icing")
    }
}

fn parse_closed<T: DeserializeOwned>(s: &str, what: &str) -> CakeResult<T> {
    serde_json::from_value(Value::String(s.trim().to_ascii_lowercase()))
        .map_err(|_| CakeError::validation(format!("unknown {what} '{s}'")))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Where the cake top comes from. Never stored; see [`CakeConfiguration::source_mode`].
pub enum SourceMode {
    /// Plain icing model, no design.
    PlainIcing,
    /// One of the numbered catalog designs.
    CatalogDesign(DesignNumber),
    /// A customer-uploaded image mapped onto the top.
    UploadedImage,
}

impl SourceMode {
    /// Value written to the `cameFrom` field for this mode.
    pub fn came_from(self) -> Option<&'static str> {
        match self {
            SourceMode::PlainIcing => None,
            SourceMode::CatalogDesign(_) => Some("design"),
            SourceMode::UploadedImage => Some("upload"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Catalog design number in `1..=5`.
///
/// Serialized as a decimal string; deserialized from a string or an integer.
pub struct DesignNumber(u8);

impl DesignNumber {
    /// Smallest catalog design.
    pub const MIN: u8 = 1;
    /// Largest catalog design.
    pub const MAX: u8 = 5;

    /// Validate and wrap a design number.
    pub fn new(n: u8) -> CakeResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&n) {
            Ok(Self(n))
        } else {
            Err(CakeError::validation(format!(
                "design number must be in {}..={}, got {n}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Raw value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Every catalog design in order.
    pub fn all() -> impl Iterator<Item = DesignNumber> {
        (Self::MIN..=Self::MAX).map(DesignNumber)
    }
}

impl std::fmt::Display for DesignNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DesignNumber {
    type Err = CakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u8 = s
            .trim()
            .parse()
            .map_err(|_| CakeError::validation(format!("invalid design number '{s}'")))?;
        Self::new(n)
    }
}

impl serde::Serialize for DesignNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for DesignNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(n) => u8::try_from(n)
                .map_err(|_| serde::de::Error::custom(format!("design number {n} out of range")))
                .and_then(|n| DesignNumber::new(n).map_err(serde::de::Error::custom)),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Selected candle variant.
pub struct CandleChoice {
    pub category: CandleCategory,
    pub index: usize,
    /// Explicit placement; wins over the resolved anchor.
    pub position_override: Option<Vector3>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Selected cake-topper stick variant.
pub struct StickChoice {
    pub category: StickCategory,
    pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Selected sprinkle variant.
pub struct SprinkleChoice {
    pub category: SprinkleCategory,
    pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Keys of the persisted record, in their exact on-disk spelling.
pub enum RecordField {
    Shape,
    Icing,
    Design,
    CameFrom,
    UploadedImagePath,
    FrostingColor,
    CelebrantName,
    CandleCategory,
    CandleIndex,
    CandlePosition,
    StickCategory,
    StickIndex,
    SprinkleCategory,
    SprinkleIndex,
    Cost,
}

impl RecordField {
    /// Every field in record order.
    pub const ALL: [RecordField; 15] = [
        RecordField::Shape,
        RecordField::Icing,
        RecordField::Design,
        RecordField::CameFrom,
        RecordField::UploadedImagePath,
        RecordField::FrostingColor,
        RecordField::CelebrantName,
        RecordField::CandleCategory,
        RecordField::CandleIndex,
        RecordField::CandlePosition,
        RecordField::StickCategory,
        RecordField::StickIndex,
        RecordField::SprinkleCategory,
        RecordField::SprinkleIndex,
        RecordField::Cost,
    ];

    /// JSON key.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordField::Shape => "shape",
            RecordField::Icing => "icing",
            RecordField::Design => "design",
            RecordField::CameFrom => "cameFrom",
            RecordField::UploadedImagePath => "uploadedImagePath",
            RecordField::FrostingColor => "frostingColor",
            RecordField::CelebrantName => "celebrantName",
            RecordField::CandleCategory => "candleCategory",
            RecordField::CandleIndex => "candleIndex",
            RecordField::CandlePosition => "candlePosition",
            RecordField::StickCategory => "stickCategory",
            RecordField::StickIndex => "stickIndex",
            RecordField::SprinkleCategory => "sprinkleCategory",
            RecordField::SprinkleIndex => "sprinkleIndex",
            RecordField::Cost => "cost",
        }
    }

    /// Look up a field by its JSON key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == key)
    }

    /// The fields that make up one accessory sub-object.
    pub fn accessory_group(kind: AccessoryKind) -> &'static [RecordField] {
        match kind {
            AccessoryKind::Candle => &[
                RecordField::CandleCategory,
                RecordField::CandleIndex,
                RecordField::CandlePosition,
            ],
            AccessoryKind::Stick => &[RecordField::StickCategory, RecordField::StickIndex],
            AccessoryKind::Sprinkle => &[RecordField::SprinkleCategory, RecordField::SprinkleIndex],
        }
    }
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Typed view of the single persisted configuration record.
pub struct CakeConfiguration {
    pub shape: Shape,
    pub icing: Icing,
    pub design_number: Option<DesignNumber>,
    pub uploaded_image_path: Option<String>,
    pub frosting_color: Option<Rgba8>,
    pub celebrant_name: Option<String>,
    pub candle: Option<CandleChoice>,
    pub stick: Option<StickChoice>,
    pub sprinkle: Option<SprinkleChoice>,
    /// Passed through untouched.
    pub cost: Option<f64>,
}

impl CakeConfiguration {
    /// Derive the source mode: uploaded image > catalog design > plain icing.
    pub fn source_mode(&self) -> SourceMode {
        if self.uploaded_image_path.is_some() {
            SourceMode::UploadedImage
        } else if let Some(d) = self.design_number {
            SourceMode::CatalogDesign(d)
        } else {
            SourceMode::PlainIcing
        }
    }

    /// Persisted `{category, index}` for an accessory kind.
    pub fn accessory(&self, kind: AccessoryKind) -> Option<(AccessoryCategory, usize)> {
        match kind {
            AccessoryKind::Candle => self
                .candle
                .map(|c| (AccessoryCategory::Candle(c.category), c.index)),
            AccessoryKind::Stick => self
                .stick
                .map(|s| (AccessoryCategory::Stick(s.category), s.index)),
            AccessoryKind::Sprinkle => self
                .sprinkle
                .map(|s| (AccessoryCategory::Sprinkle(s.category), s.index)),
        }
    }

    /// Build the typed view from a raw record object.
    ///
    /// Never fails: bad fields are logged and replaced by defaults, accessory indices outside
    /// their catalog are clamped to `0`.
    pub fn from_record(map: &Map<String, Value>) -> Self {
        let shape = field::<Shape>(map, RecordField::Shape).unwrap_or_default();
        let icing = field::<Icing>(map, RecordField::Icing).unwrap_or_default();

        let candle = field::<CandleCategory>(map, RecordField::CandleCategory).map(|category| {
            let index = clamped_index(
                map,
                RecordField::CandleIndex,
                AccessoryCategory::Candle(category),
                shape,
            );
            let position_override = map
                .get(RecordField::CandlePosition.as_str())
                .and_then(|v| serde_json::from_value::<Vector3>(v.clone()).ok())
                .filter(|p| p.is_finite());
            CandleChoice {
                category,
                index,
                position_override,
            }
        });
        let stick = field::<StickCategory>(map, RecordField::StickCategory).map(|category| {
            StickChoice {
                category,
                index: clamped_index(
                    map,
                    RecordField::StickIndex,
                    AccessoryCategory::Stick(category),
                    shape,
                ),
            }
        });
        let sprinkle =
            field::<SprinkleCategory>(map, RecordField::SprinkleCategory).map(|category| {
                SprinkleChoice {
                    category,
                    index: clamped_index(
                        map,
                        RecordField::SprinkleIndex,
                        AccessoryCategory::Sprinkle(category),
                        shape,
                    ),
                }
            });

        Self {
            shape,
            icing,
            design_number: field::<DesignNumber>(map, RecordField::Design),
            uploaded_image_path: non_blank(field::<String>(map, RecordField::UploadedImagePath)),
            frosting_color: field::<Rgba8>(map, RecordField::FrostingColor),
            celebrant_name: non_blank(field::<String>(map, RecordField::CelebrantName)),
            candle,
            stick,
            sprinkle,
            cost: lenient_number(map.get(RecordField::Cost.as_str())),
        }
    }

    /// Serialize into the exact on-disk record object, including the derived `cameFrom`.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (k, v) in RecordPatch::from_configuration(self).into_entries() {
            if let Some(v) = v {
                map.insert(k.as_str().to_string(), v);
            }
        }
        sync_came_from(&mut map);
        map
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// A shallow, field-level change to the persisted record.
///
/// `Some(value)` sets a key, `None` removes it. Keys not mentioned are left alone by
/// [`crate::ConfigStore::merge`].
pub struct RecordPatch {
    entries: std::collections::BTreeMap<RecordField, Option<Value>>,
}

impl RecordPatch {
    /// Empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch that sets every field of `cfg` and removes the ones it leaves empty.
    pub fn from_configuration(cfg: &CakeConfiguration) -> Self {
        Self::new()
            .shape(cfg.shape)
            .icing(cfg.icing)
            .design(cfg.design_number)
            .uploaded_image(cfg.uploaded_image_path.clone())
            .frosting_color(cfg.frosting_color)
            .celebrant_name(cfg.celebrant_name.clone())
            .candle(cfg.candle)
            .stick(cfg.stick)
            .sprinkle(cfg.sprinkle)
            .cost(cfg.cost)
    }

    /// Set a raw JSON value.
    pub fn set(mut self, field: RecordField, value: impl Into<Value>) -> Self {
        self.entries.insert(field, Some(value.into()));
        self
    }

    /// Remove a field.
    pub fn remove(mut self, field: RecordField) -> Self {
        self.entries.insert(field, None);
        self
    }

    fn set_or_remove<T: serde::Serialize>(self, field: RecordField, value: Option<T>) -> Self {
        match value.and_then(|v| serde_json::to_value(v).ok()) {
            Some(v) => self.set(field, v),
            None => self.remove(field),
        }
    }

    pub fn shape(self, shape: Shape) -> Self {
        self.set(RecordField::Shape, shape.as_str())
    }

    pub fn icing(self, icing: Icing) -> Self {
        self.set(RecordField::Icing, icing.as_str())
    }

    pub fn design(self, design: Option<DesignNumber>) -> Self {
        self.set_or_remove(RecordField::Design, design)
    }

    pub fn uploaded_image(self, path: Option<String>) -> Self {
        self.set_or_remove(RecordField::UploadedImagePath, non_blank(path))
    }

    pub fn frosting_color(self, color: Option<Rgba8>) -> Self {
        self.set_or_remove(RecordField::FrostingColor, color)
    }

    pub fn celebrant_name(self, name: Option<String>) -> Self {
        self.set_or_remove(RecordField::CelebrantName, non_blank(name))
    }

    pub fn cost(self, cost: Option<f64>) -> Self {
        self.set_or_remove(RecordField::Cost, cost.filter(|c| c.is_finite()))
    }

    pub fn candle(self, candle: Option<CandleChoice>) -> Self {
        match candle {
            Some(c) => self
                .set(RecordField::CandleCategory, c.category.as_str())
                .set(RecordField::CandleIndex, c.index)
                .set_or_remove(RecordField::CandlePosition, c.position_override),
            None => self.remove_group(AccessoryKind::Candle),
        }
    }

    pub fn stick(self, stick: Option<StickChoice>) -> Self {
        match stick {
            Some(s) => self
                .set(RecordField::StickCategory, s.category.as_str())
                .set(RecordField::StickIndex, s.index),
            None => self.remove_group(AccessoryKind::Stick),
        }
    }

    pub fn sprinkle(self, sprinkle: Option<SprinkleChoice>) -> Self {
        match sprinkle {
            Some(s) => self
                .set(RecordField::SprinkleCategory, s.category.as_str())
                .set(RecordField::SprinkleIndex, s.index),
            None => self.remove_group(AccessoryKind::Sprinkle),
        }
    }

    /// Set `{category, index}` for whichever accessory kind `category` belongs to.
    pub fn accessory(self, category: AccessoryCategory, index: usize) -> Self {
        let kind = category.kind();
        let group = RecordField::accessory_group(kind);
        self.set(group[0], category.as_str()).set(group[1], index)
    }

    /// Remove the whole sub-object of an accessory kind.
    pub fn remove_group(mut self, kind: AccessoryKind) -> Self {
        for f in RecordField::accessory_group(kind) {
            self = self.remove(*f);
        }
        self
    }

    /// Whether the patch touches nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (RecordField, Option<Value>)> {
        self.entries.into_iter()
    }

    /// Apply onto a raw record object.
    pub fn apply_to(&self, map: &mut Map<String, Value>) {
        for (field, change) in &self.entries {
            match change {
                Some(v) => {
                    map.insert(field.as_str().to_string(), v.clone());
                }
                None => {
                    map.remove(field.as_str());
                }
            }
        }
    }
}

/// Recompute `cameFrom` from the fields it is derived from.
pub fn sync_came_from(map: &mut Map<String, Value>) {
    let cfg = CakeConfiguration::from_record(map);
    match cfg.source_mode().came_from() {
        Some(tag) => {
            map.insert(RecordField::CameFrom.as_str().to_string(), tag.into());
        }
        None => {
            map.remove(RecordField::CameFrom.as_str());
        }
    }
}

fn field<T: DeserializeOwned>(map: &Map<String, Value>, f: RecordField) -> Option<T> {
    let raw = map.get(f.as_str())?;
    if raw.is_null() {
        return None;
    }
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(field = f.as_str(), value = %raw, "dropping unreadable record field: {e}");
            None
        }
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

fn lenient_number(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn clamped_index(
    map: &Map<String, Value>,
    f: RecordField,
    category: AccessoryCategory,
    shape: Shape,
) -> usize {
    let len = catalog_len(category, shape);
    let raw = lenient_number(map.get(f.as_str())).unwrap_or(0.0);
    if raw.fract() != 0.0 || raw < 0.0 || raw >= len as f64 {
        if raw != 0.0 {
            tracing::warn!(
                field = f.as_str(),
                index = raw,
                catalog_len = len,
                "accessory index out of range, clamping to 0"
            );
        }
        return 0;
    }
    raw as usize
}

#[cfg(test)]
#[path = "../../tests/unit/record/schema.rs"]
mod tests;
