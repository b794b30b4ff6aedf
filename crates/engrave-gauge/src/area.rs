use serde::{Deserialize, Serialize};

/// One rectangular calibration patch with its intended lightness.
///
/// Coordinates are pixels on the gauge canvas; `bottom_right` is exclusive.
/// The lightness is quantized to `u8` at construction because the rendered
/// gauge is an 8-bit raster and the extraction keys its mapping by the exact
/// drawn value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationArea {
    pub top_left: (u32, u32),
    pub bottom_right: (u32, u32),
    pub lightness: u8,
}

impl CalibrationArea {
    pub fn new(top_left: (u32, u32), bottom_right: (u32, u32), lightness: u8) -> Self {
        Self {
            top_left,
            bottom_right,
            lightness,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.bottom_right.0 - self.top_left.0
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.bottom_right.1 - self.top_left.1
    }

    /// True if the rectangle lies inside a `width x height` canvas.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.top_left.0 < self.bottom_right.0
            && self.top_left.1 < self.bottom_right.1
            && self.bottom_right.0 <= width
            && self.bottom_right.1 <= height
    }
}
