use std::io::Cursor;
use std::sync::Arc;

use anyhow::Context;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::foundation::error::{CakeError, CakeResult};

const XXH3_SEED: u64 = 0x6361_6b65_6372_6166;

#[derive(Clone, PartialEq, Eq)]
/// Raster image in premultiplied RGBA8 form.
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint()))
            .finish()
    }
}

impl RasterImage {
    /// Wrap premultiplied bytes, checking the buffer matches the dimensions.
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> CakeResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| CakeError::validation("image dimensions overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(CakeError::validation(format!(
                "image buffer is {} bytes, expected {expected} for {width}x{height}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Decode PNG/JPEG/etc. bytes and premultiply.
    pub fn decode(bytes: &[u8]) -> CakeResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Self::from_straight(width, height, rgba.into_raw())
    }

    /// Premultiply straight-alpha RGBA8 bytes, checking the buffer matches the dimensions.
    pub fn from_straight(width: u32, height: u32, mut rgba8: Vec<u8>) -> CakeResult<Self> {
        premultiply_rgba8_in_place(&mut rgba8);
        Self::from_premul(width, height, rgba8)
    }

    /// Stable content hash of dimensions and pixels.
    pub fn fingerprint(&self) -> u64 {
        let mut buf = Vec::with_capacity(8 + self.rgba8_premul.len());
        buf.extend_from_slice(&self.width.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());
        buf.extend_from_slice(&self.rgba8_premul);
        xxh3_64_with_seed(&buf, XXH3_SEED)
    }

    /// Alpha of pixel `(x, y)`; `0` outside the image.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4 + 3;
        self.rgba8_premul[i]
    }

    /// Number of pixels with non-zero alpha.
    pub fn covered_pixels(&self) -> usize {
        self.rgba8_premul
            .chunks_exact(4)
            .filter(|px| px[3] != 0)
            .count()
    }

    /// Un-premultiplied copy of the pixels.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.rgba8_premul.as_ref().clone();
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }

    /// Encode as PNG (straight alpha).
    pub fn encode_png(&self) -> CakeResult<Vec<u8>> {
        let rgba = image::RgbaImage::from_raw(self.width, self.height, self.to_straight_rgba8())
            .ok_or_else(|| CakeError::render("image buffer does not match dimensions"))?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(buf)
    }
}

impl serde::Serialize for RasterImage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("RasterImage", 3)?;
        s.serialize_field("width", &self.width)?;
        s.serialize_field("height", &self.height)?;
        s.serialize_field("xxh3", &format!("{:016x}", self.fingerprint()))?;
        s.end()
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/raster.rs"]
mod tests;
