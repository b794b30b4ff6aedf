use serde::{Deserialize, Serialize};

use crate::spec::{lightness_factor, GaugeSpec, GaugeSpecError};
use crate::CalibrationArea;

/// Marker-bordered gauge: a fiducial marker column on the left, a whitespace
/// reference strip below it, and `rows x cols` graded blocks to the right.
///
/// All grid cells carry a test block; the whitespace reference lives outside
/// the grid. The lightness progression uses a fixed exponent of 1.5.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MarkerGaugeSpec {
    block_size: u32,
    marker_size: u32,
    rows: u32,
    cols: u32,
}

impl MarkerGaugeSpec {
    const NON_LINEARITY: f64 = 1.5;
    const SPACING_FRAC: f64 = 0.15;

    pub fn new(
        block_size: u32,
        marker_size: u32,
        rows: u32,
        cols: u32,
    ) -> Result<Self, GaugeSpecError> {
        if block_size < 10 {
            return Err(GaugeSpecError::BlockTooSmall { min: 10 });
        }
        if rows < 2 {
            return Err(GaugeSpecError::TooFewRows);
        }
        if cols == 0 {
            return Err(GaugeSpecError::GridTooSmall);
        }
        // the marker column must fit left of the block grid
        let max_marker = block_size * 3 / 2;
        if marker_size == 0 || marker_size > max_marker {
            return Err(GaugeSpecError::MarkerTooLarge { max: max_marker });
        }
        let spec = Self {
            block_size,
            marker_size,
            rows,
            cols,
        };
        // a tall marker can squeeze the whitespace strip below it to nothing
        let all_fit = spec
            .whitespace_areas()
            .chain(spec.colored_areas())
            .all(|a| a.fits(spec.width(), spec.height()));
        if !all_fit {
            return Err(GaugeSpecError::DegenerateLayout);
        }
        Ok(spec)
    }

    #[inline]
    fn block(&self) -> f64 {
        f64::from(self.block_size)
    }

    fn colored_area(&self, index: u32) -> CalibrationArea {
        let block = self.block();
        let spacing = block * Self::SPACING_FRAC;
        let row = f64::from(index / self.cols);
        let col = f64::from(index % self.cols);

        let x = (f64::from(self.marker_size) + col * block + block + spacing).ceil();
        let y = (row * block + block / 2.0 + spacing).ceil();
        let x_end = (x + block - spacing).ceil() as u32;
        let y_end = (y + block - spacing).ceil() as u32;

        let factor = lightness_factor(index, self.rows * self.cols, Self::NON_LINEARITY);
        CalibrationArea::new(
            (x as u32, y as u32),
            (x_end, y_end),
            (255.0 - factor * 255.0) as u8,
        )
    }
}

impl GaugeSpec for MarkerGaugeSpec {
    fn width(&self) -> u32 {
        (self.block() + f64::from(self.cols) * self.block() + 3.0 * self.block() / 2.0).ceil()
            as u32
    }

    fn height(&self) -> u32 {
        (f64::from(self.rows) * self.block() + self.block()).ceil() as u32
    }

    fn whitespace_areas(&self) -> impl Iterator<Item = CalibrationArea> + '_ {
        let half = self.block() / 2.0;
        let x = half.ceil() as u32;
        let x_end = (half + f64::from(self.marker_size)).ceil() as u32;
        let y = (f64::from(self.marker_size) + self.block()).ceil() as u32;
        let y_end = (f64::from(self.height()) - half).floor() as u32;
        std::iter::once(CalibrationArea::new((x, y), (x_end, y_end), 255))
    }

    fn colored_areas(&self) -> impl Iterator<Item = CalibrationArea> + '_ {
        (0..self.rows * self.cols).map(|i| self.colored_area(i))
    }
}
