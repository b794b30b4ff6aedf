use serde::{Deserialize, Serialize};

use crate::spec::{lightness_factor, GaugeSpec, GaugeSpecError};
use crate::CalibrationArea;

/// Plain grid gauge: `rows x cols` square cells, cell (0, 0) reserved as the
/// unengraved whitespace reference.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GridGaugeSpec {
    block_size: u32,
    rows: u32,
    cols: u32,
    non_linearity: f64,
}

impl GridGaugeSpec {
    /// Default power-law exponent of the lightness progression.
    pub const DEFAULT_NON_LINEARITY: f64 = 1.8;

    /// Fraction of the block size kept clear around each block interior.
    const SPACING_FRAC: f64 = 0.1;

    /// Fraction of the inset block height reserved above dark blocks so smoke
    /// and soot drifting upward do not contaminate lighter neighbors.
    const VERTICAL_SAFETY_FRAC: f64 = 0.3;

    pub fn new(block_size: u32, rows: u32, cols: u32) -> Result<Self, GaugeSpecError> {
        Self::with_non_linearity(block_size, rows, cols, Self::DEFAULT_NON_LINEARITY)
    }

    pub fn with_non_linearity(
        block_size: u32,
        rows: u32,
        cols: u32,
        non_linearity: f64,
    ) -> Result<Self, GaugeSpecError> {
        if block_size < 10 {
            return Err(GaugeSpecError::BlockTooSmall { min: 10 });
        }
        if rows == 0 || cols == 0 || rows * cols < 2 {
            return Err(GaugeSpecError::GridTooSmall);
        }
        if !non_linearity.is_finite() || non_linearity < 0.0 {
            return Err(GaugeSpecError::InvalidNonLinearity);
        }
        Ok(Self {
            block_size,
            rows,
            cols,
            non_linearity,
        })
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Number of graded test blocks (one grid cell is the whitespace).
    #[inline]
    pub fn colored_block_count(&self) -> u32 {
        self.rows * self.cols - 1
    }

    #[inline]
    fn spacing(&self) -> f64 {
        f64::from(self.block_size) * Self::SPACING_FRAC
    }

    fn colored_area(&self, cell: u32) -> CalibrationArea {
        let block = f64::from(self.block_size);
        let spacing = self.spacing();
        let row = f64::from(cell / self.cols);
        let col = f64::from(cell % self.cols);

        let factor = lightness_factor(cell - 1, self.colored_block_count(), self.non_linearity);
        let vertical_safety = (block - spacing) * Self::VERTICAL_SAFETY_FRAC * factor;

        let x = (col * block + spacing).ceil() as u32;
        let y = (row * block + spacing + vertical_safety).ceil() as u32;
        let x_end = ((col + 1.0) * block - spacing).ceil() as u32;
        let y_end = ((row + 1.0) * block - spacing).ceil() as u32;

        CalibrationArea::new((x, y), (x_end, y_end), (255.0 - factor * 255.0) as u8)
    }
}

impl GaugeSpec for GridGaugeSpec {
    fn width(&self) -> u32 {
        self.cols * self.block_size
    }

    fn height(&self) -> u32 {
        self.rows * self.block_size
    }

    fn whitespace_areas(&self) -> impl Iterator<Item = CalibrationArea> + '_ {
        let spacing = self.spacing();
        let lo = spacing.ceil() as u32;
        let hi = (f64::from(self.block_size) - spacing).ceil() as u32;
        std::iter::once(CalibrationArea::new((lo, lo), (hi, hi), 255))
    }

    fn colored_areas(&self) -> impl Iterator<Item = CalibrationArea> + '_ {
        // cell 0 is the whitespace reference
        (1..self.rows * self.cols).map(|cell| self.colored_area(cell))
    }
}
