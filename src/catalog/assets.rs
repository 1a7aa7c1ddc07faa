//! Asset naming contract shared with the rendering engine.
//!
//! Paths are extension-less identifiers relative to the models root
//! (e.g. `designs/heart_chocolate_style3`); the asset source decides the file format.

use crate::foundation::error::{CakeError, CakeResult};
use crate::record::schema::{Icing, Shape, SourceMode};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
/// Extension-less asset identifier.
pub struct AssetPath(String);

impl AssetPath {
    /// Wrap a normalized relative identifier.
    pub fn new(path: impl Into<String>) -> CakeResult<Self> {
        let path = path.into();
        normalize_rel_path(&path).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize and validate a models-root-relative path.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> CakeResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(CakeError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(CakeError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(CakeError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(CakeError::validation("asset path must contain a file name"));
    }

    Ok(out.join("/"))
}

/// Base cake model for a shape/icing in the given source mode.
pub fn base_cake_path(shape: Shape, icing: Icing, mode: SourceMode) -> AssetPath {
    let (shape, icing) = (shape.as_str(), icing.as_str());
    AssetPath(match mode {
        SourceMode::PlainIcing => format!("icing/{shape}_{icing}"),
        SourceMode::CatalogDesign(n) => format!("designs/{shape}_{icing}_style{n}"),
        SourceMode::UploadedImage => format!("image/{shape}_{icing}_image"),
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
/// The three accessory families, one per accessory stage.
pub enum AccessoryKind {
    Candle,
    Stick,
    Sprinkle,
}

impl AccessoryKind {
    pub const ALL: [AccessoryKind; 3] = [
        AccessoryKind::Candle,
        AccessoryKind::Stick,
        AccessoryKind::Sprinkle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccessoryKind::Candle => "candle",
            AccessoryKind::Stick => "stick",
            AccessoryKind::Sprinkle => "sprinkle",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleCategory {
    Wax,
    Sparkler,
    Number,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickCategory {
    Birthday,
    Anniversary,
    Mother,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprinkleCategory {
    Rainbow,
    Choco,
    Sugar,
}

impl CandleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            CandleCategory::Wax => "wax",
            CandleCategory::Sparkler => "sparkler",
            CandleCategory::Number => "number",
        }
    }
}

impl StickCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            StickCategory::Birthday => "birthday",
            StickCategory::Anniversary => "anniversary",
            StickCategory::Mother => "mother",
        }
    }
}

impl SprinkleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            SprinkleCategory::Rainbow => "rainbow",
            SprinkleCategory::Choco => "choco",
            SprinkleCategory::Sugar => "sugar",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// A category key within one accessory kind.
pub enum AccessoryCategory {
    Candle(CandleCategory),
    Stick(StickCategory),
    Sprinkle(SprinkleCategory),
}

impl AccessoryCategory {
    pub fn kind(self) -> AccessoryKind {
        match self {
            AccessoryCategory::Candle(_) => AccessoryKind::Candle,
            AccessoryCategory::Stick(_) => AccessoryKind::Stick,
            AccessoryCategory::Sprinkle(_) => AccessoryKind::Sprinkle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessoryCategory::Candle(c) => c.as_str(),
            AccessoryCategory::Stick(c) => c.as_str(),
            AccessoryCategory::Sprinkle(c) => c.as_str(),
        }
    }

    /// Parse a category name within `kind`; unknown names are rejected.
    pub fn parse(kind: AccessoryKind, name: &str) -> CakeResult<Self> {
        let v = serde_json::Value::String(name.trim().to_ascii_lowercase());
        let parsed = match kind {
            AccessoryKind::Candle => serde_json::from_value(v).map(AccessoryCategory::Candle),
            AccessoryKind::Stick => serde_json::from_value(v).map(AccessoryCategory::Stick),
            AccessoryKind::Sprinkle => serde_json::from_value(v).map(AccessoryCategory::Sprinkle),
        };
        parsed.map_err(|_| {
            CakeError::validation(format!("unknown {} category '{name}'", kind.as_str()))
        })
    }
}

const WAX: &[&str] = &[
    "accessories/candles/wax1",
    "accessories/candles/wax2",
    "accessories/candles/wax3",
    "accessories/candles/wax4",
];
const SPARKLER: &[&str] = &[
    "accessories/candles/sparkler1",
    "accessories/candles/sparkler2",
    "accessories/candles/sparkler3",
    "accessories/candles/sparkler4",
];
const NUMBER: &[&str] = &[
    "accessories/candles/number1",
    "accessories/candles/number2",
    "accessories/candles/number3",
    "accessories/candles/number4",
    "accessories/candles/number5",
    "accessories/candles/number6",
    "accessories/candles/number7",
    "accessories/candles/number8",
    "accessories/candles/number9",
    "accessories/candles/number0",
];

const BIRTHDAY: &[&str] = &[
    "accessories/sticks/birthday_stick1",
    "accessories/sticks/birthday_stick2",
    "accessories/sticks/birthday_stick3",
];
const ANNIVERSARY: &[&str] = &[
    "accessories/sticks/anniversary_stick1",
    "accessories/sticks/anniversary_stick2",
    "accessories/sticks/anniversary_stick3",
];
const MOTHER: &[&str] = &[
    "accessories/sticks/mother_stick1",
    "accessories/sticks/mother_stick2",
    "accessories/sticks/mother_stick3",
];

// Sprinkles are modelled per shape; rows are round, square, heart.
const RAINBOW: [&[&str]; 3] = [
    &[
        "accessories/sprinkles/rainbow_round1",
        "accessories/sprinkles/rainbow_round2",
        "accessories/sprinkles/rainbow_round3",
    ],
    &[
        "accessories/sprinkles/rainbow_square1",
        "accessories/sprinkles/rainbow_square2",
        "accessories/sprinkles/rainbow_square3",
    ],
    &[
        "accessories/sprinkles/rainbow_heart1",
        "accessories/sprinkles/rainbow_heart2",
        "accessories/sprinkles/rainbow_heart3",
    ],
];
const CHOCO: [&[&str]; 3] = [
    &[
        "accessories/sprinkles/choco_round1",
        "accessories/sprinkles/choco_round2",
        "accessories/sprinkles/choco_round3",
    ],
    &[
        "accessories/sprinkles/choco_square1",
        "accessories/sprinkles/choco_square2",
        "accessories/sprinkles/choco_square3",
    ],
    &[
        "accessories/sprinkles/choco_heart1",
        "accessories/sprinkles/choco_heart2",
        "accessories/sprinkles/choco_heart3",
    ],
];
const SUGAR: [&[&str]; 3] = [
    &[
        "accessories/sprinkles/sugar_round1",
        "accessories/sprinkles/sugar_round2",
        "accessories/sprinkles/sugar_round3",
    ],
    &[
        "accessories/sprinkles/sugar_square1",
        "accessories/sprinkles/sugar_square2",
        "accessories/sprinkles/sugar_square3",
    ],
    &[
        "accessories/sprinkles/sugar_heart1",
        "accessories/sprinkles/sugar_heart2",
        "accessories/sprinkles/sugar_heart3",
    ],
];

fn shape_row(shape: Shape) -> usize {
    match shape {
        Shape::Round => 0,
        Shape::Square => 1,
        Shape::Heart => 2,
    }
}

fn catalog_entries(category: AccessoryCategory, shape: Shape) -> &'static [&'static str] {
    match category {
        AccessoryCategory::Candle(CandleCategory::Wax) => WAX,
        AccessoryCategory::Candle(CandleCategory::Sparkler) => SPARKLER,
        AccessoryCategory::Candle(CandleCategory::Number) => NUMBER,
        AccessoryCategory::Stick(StickCategory::Birthday) => BIRTHDAY,
        AccessoryCategory::Stick(StickCategory::Anniversary) => ANNIVERSARY,
        AccessoryCategory::Stick(StickCategory::Mother) => MOTHER,
        AccessoryCategory::Sprinkle(SprinkleCategory::Rainbow) => RAINBOW[shape_row(shape)],
        AccessoryCategory::Sprinkle(SprinkleCategory::Choco) => CHOCO[shape_row(shape)],
        AccessoryCategory::Sprinkle(SprinkleCategory::Sugar) => SUGAR[shape_row(shape)],
    }
}

/// Ordered variant list for a category. `shape` only matters for sprinkles.
pub fn catalog(category: AccessoryCategory, shape: Shape) -> Vec<AssetPath> {
    catalog_entries(category, shape)
        .iter()
        .map(|p| AssetPath((*p).to_string()))
        .collect()
}

/// Number of variants in a category's catalog.
pub fn catalog_len(category: AccessoryCategory, shape: Shape) -> usize {
    catalog_entries(category, shape).len()
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/assets.rs"]
mod tests;
