//! Engraving-friendly grayscale preprocessing.
//!
//! Turns a color photo into a single-channel image whose tonal distribution
//! suits the engraver's limited dynamic range: BT.601 luma decolorization,
//! a min-max contrast stretch, then contrast-limited adaptive histogram
//! equalization (CLAHE) with a clip limit optionally derived from the
//! calibration's usable range.

use engrave_core::LightnessImage;
use serde::{Deserialize, Serialize};

use crate::CalibrationData;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PreprocessParams {
    /// CLAHE clip limit. `None` derives it from the calibration's dark/light
    /// range (narrow range, aggressive equalization).
    pub clip_limit: Option<f32>,
    /// CLAHE tile grid (columns, rows).
    pub tile_grid: (usize, usize),
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            clip_limit: Some(4.0),
            tile_grid: (16, 16),
        }
    }
}

/// Collapse interleaved 8-bit RGB to a lightness image via BT.601 luma.
///
/// Returns `None` when the buffer length does not match the dimensions.
pub fn decolorize(rgb: &[u8], width: usize, height: usize) -> Option<LightnessImage> {
    if rgb.len() != width * height * 3 {
        return None;
    }
    let data = rgb
        .chunks_exact(3)
        .map(|p| 0.299 * f32::from(p[0]) + 0.587 * f32::from(p[1]) + 0.114 * f32::from(p[2]))
        .collect();
    LightnessImage::from_raw(width, height, data)
}

/// Preprocess an already-decolorized image for engraving.
pub fn engraving_friendly_bw(
    gray: &LightnessImage,
    calibration: Option<&CalibrationData>,
    params: &PreprocessParams,
) -> LightnessImage {
    let stretched = contrast_stretch(gray);
    let clip = params
        .clip_limit
        .or_else(|| calibration.map(derived_clip_limit))
        .unwrap_or(4.0);
    clahe(&stretched, params.tile_grid, clip)
}

/// Clip limit from the calibration's usable dynamic range: the narrower the
/// range the engraver can reproduce, the harder the local equalization works.
fn derived_clip_limit(data: &CalibrationData) -> f32 {
    let inverted_range = 1.0 - data.dark_light_range();
    if inverted_range <= 0.05 {
        0.05
    } else {
        35.0 * inverted_range
    }
}

/// Min-max stretch to the full `[0, 255]` range. Flat images pass through.
fn contrast_stretch(img: &LightnessImage) -> LightnessImage {
    let min = img.pixels().iter().copied().fold(f32::INFINITY, f32::min);
    let max = img
        .pixels()
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    if max - min < 1e-6 {
        return img.clone();
    }
    img.map(|v| (v - min) / (max - min) * 255.0)
}

/// Contrast-limited adaptive histogram equalization.
///
/// Per-tile clipped histograms become per-tile equalization LUTs; each pixel
/// blends the four surrounding tile LUTs bilinearly so tile seams do not
/// show.
fn clahe(img: &LightnessImage, tile_grid: (usize, usize), clip_limit: f32) -> LightnessImage {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return img.clone();
    }
    let tx = tile_grid.0.clamp(1, w);
    let ty = tile_grid.1.clamp(1, h);

    let mut luts = Vec::with_capacity(tx * ty);
    for j in 0..ty {
        let (y0, y1) = (j * h / ty, (j + 1) * h / ty);
        for i in 0..tx {
            let (x0, x1) = (i * w / tx, (i + 1) * w / tx);
            luts.push(tile_lut(img, x0, y0, x1, y1, clip_limit));
        }
    }

    let mut out = img.clone();
    for y in 0..h {
        let gy = ((y as f32 + 0.5) * ty as f32 / h as f32 - 0.5).clamp(0.0, (ty - 1) as f32);
        let j0 = gy.floor() as usize;
        let j1 = (j0 + 1).min(ty - 1);
        let fy = gy - j0 as f32;
        for x in 0..w {
            let gx = ((x as f32 + 0.5) * tx as f32 / w as f32 - 0.5).clamp(0.0, (tx - 1) as f32);
            let i0 = gx.floor() as usize;
            let i1 = (i0 + 1).min(tx - 1);
            let fx = gx - i0 as f32;

            let level = img.get(x, y).clamp(0.0, 255.0) as usize;
            let top = lerp(luts[j0 * tx + i0][level], luts[j0 * tx + i1][level], fx);
            let bottom = lerp(luts[j1 * tx + i0][level], luts[j1 * tx + i1][level], fx);
            out.set(x, y, lerp(top, bottom, fy));
        }
    }
    out
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Equalization LUT for the tile `[x0, x1) x [y0, y1)`.
fn tile_lut(
    img: &LightnessImage,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    clip_limit: f32,
) -> [f32; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.get(x, y).clamp(0.0, 255.0) as usize] += 1;
        }
    }
    let pixels = ((x1 - x0) * (y1 - y0)) as u32;

    // clip the histogram and redistribute the excess evenly
    let bin_limit = ((clip_limit * pixels as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > bin_limit {
            excess += *bin - bin_limit;
            *bin = bin_limit;
        }
    }
    let bonus = excess / 256;
    for bin in hist.iter_mut() {
        *bin += bonus;
    }

    let mut lut = [0.0f32; 256];
    let total: u32 = hist.iter().sum();
    let scale = if total > 0 { 255.0 / total as f32 } else { 0.0 };
    let mut cumulative = 0u32;
    for (level, slot) in lut.iter_mut().enumerate() {
        cumulative += hist[level];
        *slot = (cumulative as f32 * scale).min(255.0);
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn decolorize_uses_bt601_weights() {
        let img = decolorize(&[255, 0, 0], 1, 1).expect("size");
        assert!((img.get(0, 0) - 0.299 * 255.0).abs() < 1e-3);
        assert!(decolorize(&[0, 0], 1, 1).is_none());
    }

    #[test]
    fn contrast_stretch_reaches_the_full_range() {
        let img = LightnessImage::from_raw(3, 1, vec![100.0, 150.0, 200.0]).expect("size");
        let out = contrast_stretch(&img);
        assert_eq!(out.get(0, 0), 0.0);
        assert_eq!(out.get(1, 0), 127.5);
        assert_eq!(out.get(2, 0), 255.0);
    }

    #[test]
    fn flat_images_pass_through_the_stretch() {
        let img = LightnessImage::filled(4, 4, 77.0);
        assert_eq!(contrast_stretch(&img), img);
    }

    #[test]
    fn clahe_preserves_dimensions_and_range() {
        let data: Vec<f32> = (0..64 * 64).map(|i| (i % 256) as f32).collect();
        let img = LightnessImage::from_raw(64, 64, data).expect("size");
        let out = clahe(&img, (8, 8), 4.0);
        assert_eq!(out.width(), 64);
        assert_eq!(out.height(), 64);
        assert!(out.pixels().iter().all(|&v| (0.0..=255.0).contains(&v)));
    }

    #[test]
    fn clahe_on_a_constant_image_stays_constant() {
        let img = LightnessImage::filled(32, 32, 90.0);
        let out = clahe(&img, (4, 4), 4.0);
        let first = out.get(0, 0);
        assert!(out.pixels().iter().all(|&v| (v - first).abs() < 1e-3));
    }

    #[test]
    fn narrow_calibration_range_raises_the_derived_clip_limit() {
        let wide: BTreeMap<u8, f32> = [(0u8, 20.0_f32)].into_iter().collect();
        let narrow: BTreeMap<u8, f32> = [(0u8, 220.0_f32)].into_iter().collect();
        let wide = derived_clip_limit(&CalibrationData::from_parts(250.0, wide));
        let narrow = derived_clip_limit(&CalibrationData::from_parts(250.0, narrow));
        assert!(narrow > wide);
    }

    #[test]
    fn preprocess_produces_a_full_range_image() {
        let data: Vec<f32> = (0..32 * 32).map(|i| 100.0 + (i % 50) as f32).collect();
        let img = LightnessImage::from_raw(32, 32, data).expect("size");
        let out = engraving_friendly_bw(&img, None, &PreprocessParams::default());
        assert_eq!(out.width(), 32);
        assert!(out.pixels().iter().all(|&v| (0.0..=255.0).contains(&v)));
    }
}
