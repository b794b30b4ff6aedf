use crate::color::{hsl_to_rgb, Hsl};

/// Single-channel lightness raster, row-major, values in `[0, 255]`.
///
/// All pipeline stages operate on floating point and defer integer rounding
/// to the persistence edge.
#[derive(Clone, Debug, PartialEq)]
pub struct LightnessImage {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl LightnessImage {
    /// Create an image filled with a constant lightness.
    pub fn filled(width: usize, height: usize, lightness: f32) -> Self {
        Self {
            width,
            height,
            data: vec![lightness; width * height],
        }
    }

    /// Wrap an existing row-major buffer. `data.len()` must equal `width * height`.
    pub fn from_raw(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, lightness: f32) {
        self.data[y * self.width + x] = lightness;
    }

    /// Fill the axis-aligned rectangle `[x0, x1) x [y0, y1)`, clamped to the
    /// image bounds.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, lightness: f32) {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        for y in y0..y1 {
            let row = y * self.width;
            self.data[row + x0..row + x1].fill(lightness);
        }
    }

    /// Copy out the rectangle `[x0, x1) x [y0, y1)` as a new image.
    ///
    /// The rectangle must lie inside the image.
    pub fn crop(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> LightnessImage {
        debug_assert!(x0 <= x1 && x1 <= self.width);
        debug_assert!(y0 <= y1 && y1 <= self.height);
        let mut data = Vec::with_capacity((x1 - x0) * (y1 - y0));
        for y in y0..y1 {
            let row = y * self.width;
            data.extend_from_slice(&self.data[row + x0..row + x1]);
        }
        LightnessImage {
            width: x1 - x0,
            height: y1 - y0,
            data,
        }
    }

    /// Apply a per-pixel map, producing a new image.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> LightnessImage {
        LightnessImage {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Reconstruct an interleaved 8-bit RGB buffer by injecting each pixel as
    /// the lightness channel of a zero-hue, zero-saturation HSL color.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 3);
        for &l in &self.data {
            let (r, g, b) = hsl_to_rgb(Hsl {
                hue: 0.0,
                saturation: 0.0,
                lightness: (l / 255.0).clamp(0.0, 1.0),
            });
            out.push((r * 255.0).round() as u8);
            out.push((g * 255.0).round() as u8);
            out.push((b * 255.0).round() as u8);
        }
        out
    }
}
