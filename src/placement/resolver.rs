//! Default accessory anchors per cake shape and catalog design.
//!
//! Candles and sticks use independent tables. Sprinkles have a single anchor on the cake top.

use crate::foundation::core::Vector3;
use crate::record::schema::{DesignNumber, Shape};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Which anchor table to consult.
pub enum AnchorKind {
    Candle,
    Stick,
    Sprinkle,
}

impl AnchorKind {
    /// Value returned when no table entry applies.
    pub const fn fallback(self) -> Vector3 {
        match self {
            AnchorKind::Candle => CANDLE_FALLBACK,
            AnchorKind::Stick => STICK_FALLBACK,
            AnchorKind::Sprinkle => SPRINKLE_ANCHOR,
        }
    }
}

impl From<crate::catalog::assets::AccessoryKind> for AnchorKind {
    fn from(kind: crate::catalog::assets::AccessoryKind) -> Self {
        use crate::catalog::assets::AccessoryKind;
        match kind {
            AccessoryKind::Candle => AnchorKind::Candle,
            AccessoryKind::Stick => AnchorKind::Stick,
            AccessoryKind::Sprinkle => AnchorKind::Sprinkle,
        }
    }
}

const CANDLE_FALLBACK: Vector3 = Vector3::new(0.0, 1.2, 0.0);
const STICK_FALLBACK: Vector3 = Vector3::ZERO;
const SPRINKLE_ANCHOR: Vector3 = Vector3::new(0.0, -1.9, 0.0);

const fn v(x: f64, y: f64, z: f64) -> Vector3 {
    Vector3::new(x, y, z)
}

// Rows: round, square, heart. Columns: designs 1..=5.
const CANDLE_ANCHORS: [[Vector3; 5]; 3] = [
    [
        v(-1.7, 0.0, 2.0),
        v(2.5, 0.0, 0.0),
        v(-1.0, 0.0, 2.0),
        v(0.0, 0.0, -2.0),
        v(0.0, 0.0, -2.0),
    ],
    [
        v(1.5, 0.0, 1.5),
        v(2.4, 0.0, 0.0),
        v(0.0, 0.0, -1.0),
        v(-1.5, 0.0, -1.9),
        v(0.0, 0.0, -2.0),
    ],
    [
        v(-2.0, -0.2, -1.0),
        v(2.0, -0.2, 0.7),
        v(1.5, -0.2, 0.1),
        v(-2.0, -0.2, -1.0),
        v(0.0, -0.2, -0.45),
    ],
];

const STICK_ANCHORS: [[Vector3; 5]; 3] = [
    [
        v(1.7, 0.0, -1.7),
        v(-1.0, 0.0, -2.0),
        v(-2.0, 0.0, -2.0),
        v(3.0, 0.0, 0.0),
        v(3.0, 0.0, 0.0),
    ],
    [
        v(-1.5, 0.0, 1.9),
        v(-1.0, 0.0, -2.0),
        v(2.5, 0.0, -2.0),
        v(2.0, 0.0, 1.9),
        v(2.5, 0.0, 0.0),
    ],
    [
        v(2.0, 0.0, -1.0),
        v(-2.0, 0.0, -1.5),
        v(-1.2, 0.0, -1.0),
        v(2.5, 0.0, 0.0),
        v(2.5, 0.0, 0.0),
    ],
];

/// Anchor for an accessory on a given cake. Total: unknown combinations yield the fallback.
pub fn resolve(shape: Shape, design: Option<DesignNumber>, kind: AnchorKind) -> Vector3 {
    let table = match kind {
        AnchorKind::Candle => &CANDLE_ANCHORS,
        AnchorKind::Stick => &STICK_ANCHORS,
        AnchorKind::Sprinkle => return SPRINKLE_ANCHOR,
    };
    let Some(design) = design else {
        return kind.fallback();
    };
    let row = match shape {
        Shape::Round => 0,
        Shape::Square => 1,
        Shape::Heart => 2,
    };
    table[row]
        .get(usize::from(design.get()) - 1)
        .copied()
        .unwrap_or_else(|| kind.fallback())
}

/// Final position for a placed accessory: an explicit override beats the table.
pub fn placement(
    shape: Shape,
    design: Option<DesignNumber>,
    kind: AnchorKind,
    position_override: Option<Vector3>,
) -> Vector3 {
    position_override.unwrap_or_else(|| resolve(shape, design, kind))
}

#[cfg(test)]
#[path = "../../tests/unit/placement/resolver.rs"]
mod tests;
