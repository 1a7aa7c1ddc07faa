use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::decal::layout::{DECAL_CANVAS_SIZE, DecalLayout, DecalLine, canvas_transform};
use crate::foundation::core::{Affine, affine_to_cpu};
use crate::foundation::error::{CakeError, CakeResult};
use crate::foundation::raster::RasterImage;
use crate::record::schema::{DesignNumber, Icing};

#[derive(Clone)]
/// Raw font file used for decals.
pub struct DecalFont {
    bytes: Arc<Vec<u8>>,
    index: u32,
    label: String,
}

impl std::fmt::Debug for DecalFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecalFont")
            .field("label", &self.label)
            .field("index", &self.index)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl DecalFont {
    pub fn from_bytes(bytes: Vec<u8>, label: impl Into<String>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            index: 0,
            label: label.into(),
        }
    }

    pub fn from_path(path: &Path) -> CakeResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        Ok(Self::from_bytes(bytes, path.display().to_string()))
    }

    /// A bold sans-serif face from the installed system fonts (Arial when present).
    pub fn system_bold_sans() -> CakeResult<Self> {
        use usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight};

        let mut db = Database::new();
        db.load_system_fonts();

        let families = [Family::Name("Arial"), Family::SansSerif];
        let query = Query {
            families: &families,
            weight: Weight::BOLD,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = db
            .query(&query)
            .or_else(|| db.faces().next().map(|f| f.id))
            .ok_or_else(|| CakeError::asset("no system fonts installed"))?;
        let label = db
            .face(id)
            .map(|f| f.post_script_name.clone())
            .unwrap_or_default();
        let (bytes, index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| CakeError::asset(format!("font face '{label}' has no data")))?;

        tracing::debug!(font = %label, index, "using system decal font");
        Ok(Self {
            bytes: Arc::new(bytes),
            index,
            label,
        })
    }

    /// `path` when given, otherwise the system bold sans face.
    pub fn resolve(path: Option<&Path>) -> CakeResult<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::system_bold_sans(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
struct TextBrushRgba8 {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

/// Parley contexts with the decal font registered once.
struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
}

impl TextLayoutEngine {
    fn new(font: &DecalFont) -> CakeResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.bytes.as_ref().clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            CakeError::render(format!("no font families registered from '{}'", font.label))
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CakeError::render("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    /// Shape one unwrapped line.
    fn layout_line(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> CakeResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CakeError::validation("text size must be finite and > 0"));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Renders name decals onto the 1024×1024 transparent canvas.
///
/// Output is a pure function of `(name, icing, design)` for a given font; the last result is
/// memoized since every stage re-derives the same decal on entry.
pub struct DecalCompositor {
    engine: TextLayoutEngine,
    font: vello_cpu::peniko::FontData,
    last: Option<(DecalKey, Arc<RasterImage>)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct DecalKey {
    name: String,
    icing: Icing,
    design: Option<DesignNumber>,
}

impl DecalCompositor {
    pub fn new(font: &DecalFont) -> CakeResult<Self> {
        Ok(Self {
            engine: TextLayoutEngine::new(font)?,
            font: vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()),
                font.index,
            ),
            last: None,
        })
    }

    /// Rasterize the decal for a name; `Ok(None)` when the trimmed name is empty.
    #[tracing::instrument(skip(self))]
    pub fn compose(
        &mut self,
        name: &str,
        icing: Icing,
        design: Option<DesignNumber>,
    ) -> CakeResult<Option<Arc<RasterImage>>> {
        let Some(layout) = DecalLayout::plan(name, icing, design) else {
            return Ok(None);
        };
        let key = DecalKey {
            name: name.trim().to_string(),
            icing,
            design,
        };
        if let Some((k, img)) = &self.last
            && *k == key
        {
            return Ok(Some(img.clone()));
        }

        let img = Arc::new(self.render(&layout)?);
        tracing::debug!(
            lines = layout.lines.len(),
            fingerprint = img.fingerprint(),
            "composed decal"
        );
        self.last = Some((key, img.clone()));
        Ok(Some(img))
    }

    /// Rasterize a planned layout.
    pub fn render(&mut self, layout: &DecalLayout) -> CakeResult<RasterImage> {
        let size: u16 = DECAL_CANVAS_SIZE
            .try_into()
            .map_err(|_| CakeError::render("decal canvas exceeds u16"))?;
        let brush = TextBrushRgba8 {
            r: layout.color.r,
            g: layout.color.g,
            b: layout.color.b,
            a: layout.color.a,
        };

        let mut ctx = vello_cpu::RenderContext::new(size, size);
        for line in &layout.lines {
            let text = self
                .engine
                .layout_line(&line.text, layout.params.font_size, brush)?;
            ctx.set_transform(affine_to_cpu(line_transform(&text, line)));
            for pline in text.lines() {
                for item in pline.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let b = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&self.font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
        }
        ctx.flush();

        let mut pixmap = vello_cpu::Pixmap::new(size, size);
        ctx.render_to_pixmap(&mut pixmap);
        RasterImage::from_premul(
            DECAL_CANVAS_SIZE,
            DECAL_CANVAS_SIZE,
            pixmap.data_as_u8_slice().to_vec(),
        )
    }
}

/// Place a laid-out line so its box is centered on `(line.x, line.y)` in the rotated frame.
fn line_transform(text: &parley::Layout<TextBrushRgba8>, line: &DecalLine) -> Affine {
    let (baseline, ascent, descent) = text
        .lines()
        .next()
        .map(|l| {
            let m = l.metrics();
            (
                f64::from(m.baseline),
                f64::from(m.ascent),
                f64::from(m.descent),
            )
        })
        .unwrap_or_default();
    let width = f64::from(text.width());
    canvas_transform()
        * Affine::translate((
            line.x - width / 2.0,
            line.y - baseline + (ascent - descent) / 2.0,
        ))
}

#[cfg(test)]
#[path = "../../tests/unit/decal/compositor.rs"]
mod tests;
