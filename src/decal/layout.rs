//! Font-independent part of the name decal: color, wrapping and line placement.
//!
//! Coordinates are in the rotated canvas frame: origin at the canvas center, rotated -90°.
//! Each line is horizontally centered on `x` and vertically centered on `y`.

use std::sync::Arc;

use crate::foundation::core::{Affine, Rgba8, Vec2};
use crate::foundation::raster::RasterImage;
use crate::record::schema::{DesignNumber, Icing};
use crate::scene::model::{TextureMap, TextureWrap};

/// Width and height of the decal canvas in pixels.
pub const DECAL_CANVAS_SIZE: u32 = 1024;
/// Lines are cut every this many characters, ignoring word boundaries.
pub const MAX_CHARS_PER_LINE: usize = 14;
/// Vertical distance between consecutive lines.
pub const LINE_HEIGHT: f64 = 150.0;

/// Texture repeat used when mapping the decal onto the cake top (flips vertically).
pub const DECAL_TEXTURE_REPEAT: Vec2 = Vec2::new(1.0, -1.0);

/// Text color for an icing flavor.
pub fn text_color(icing: Icing) -> Rgba8 {
    match icing {
        Icing::Vanilla => Rgba8::BLACK,
        Icing::Chocolate => Rgba8::opaque(0xFF, 0xD7, 0x00),
        Icing::Strawberry => Rgba8::opaque(0xC7, 0x15, 0x85),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecalLayoutParams {
    /// Bold font size in pixels.
    pub font_size: f32,
    pub line_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl DecalLayoutParams {
    pub fn for_design(design: Option<DesignNumber>) -> Self {
        let (font_size, offset_y, offset_x) = match design.map(DesignNumber::get) {
            Some(1) => (85.0, 30.0, 0.0),
            Some(2) => (85.0, 170.0, 0.0),
            Some(3) => (110.0, 60.0, 0.0),
            Some(4) => (80.0, 150.0, -140.0),
            Some(5) => (70.0, 150.0, 190.0),
            _ => (90.0, 0.0, 0.0),
        };
        Self {
            font_size,
            line_height: LINE_HEIGHT,
            offset_x,
            offset_y,
        }
    }
}

/// Split into consecutive chunks of at most `width` characters.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    chars
        .chunks(width.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// Center y of the first line so the block is centered on `offset_y`.
pub fn first_line_y(offset_y: f64, line_count: usize, line_height: f64) -> f64 {
    offset_y - (line_count.saturating_sub(1) as f64) * line_height / 2.0
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecalLine {
    pub text: String,
    /// Horizontal center.
    pub x: f64,
    /// Vertical center.
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq)]
/// Everything needed to rasterize a name decal.
pub struct DecalLayout {
    pub color: Rgba8,
    pub params: DecalLayoutParams,
    pub lines: Vec<DecalLine>,
}

impl DecalLayout {
    /// Plan the decal for `name`; `None` when the trimmed name is empty.
    pub fn plan(name: &str, icing: Icing, design: Option<DesignNumber>) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let params = DecalLayoutParams::for_design(design);
        let chunks = wrap_lines(name, MAX_CHARS_PER_LINE);
        let y0 = first_line_y(params.offset_y, chunks.len(), params.line_height);
        let lines = chunks
            .into_iter()
            .enumerate()
            .map(|(i, text)| DecalLine {
                text,
                x: params.offset_x,
                y: y0 + i as f64 * params.line_height,
            })
            .collect();
        Some(Self {
            color: text_color(icing),
            params,
            lines,
        })
    }
}

/// Canvas transform applied before drawing: move to the center, then rotate -90°.
pub fn canvas_transform() -> Affine {
    let half = f64::from(DECAL_CANVAS_SIZE) / 2.0;
    Affine::translate((half, half)) * Affine::rotate(-std::f64::consts::FRAC_PI_2)
}

/// Texture mapping for a rendered decal.
pub fn decal_texture_map(image: Arc<RasterImage>) -> TextureMap {
    TextureMap {
        image,
        wrap_s: TextureWrap::Repeat,
        wrap_t: TextureWrap::Repeat,
        repeat: DECAL_TEXTURE_REPEAT,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decal/layout.rs"]
mod tests;
