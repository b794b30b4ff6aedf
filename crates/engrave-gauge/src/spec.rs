use crate::CalibrationArea;

/// Gauge specification validation errors.
#[derive(thiserror::Error, Debug)]
pub enum GaugeSpecError {
    #[error("block_size must be >= {min}")]
    BlockTooSmall { min: u32 },
    #[error("gauge needs at least two grid cells")]
    GridTooSmall,
    #[error("non_linearity must be finite and >= 0")]
    InvalidNonLinearity,
    #[error("marker_size must be in [1, {max}] for this block size")]
    MarkerTooLarge { max: u32 },
    #[error("marker gauge needs at least two rows")]
    TooFewRows,
    #[error("gauge layout leaves no room for the whitespace reference")]
    DegenerateLayout,
}

/// A calibration gauge layout.
///
/// `whitespace_areas` and `colored_areas` are finite, restartable sequences
/// of [`CalibrationArea`]; calling them again restarts the enumeration.
/// Colored areas are produced in row-major block order, which is what ties a
/// block index to its intended lightness.
pub trait GaugeSpec {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn whitespace_areas(&self) -> impl Iterator<Item = CalibrationArea> + '_;
    fn colored_areas(&self) -> impl Iterator<Item = CalibrationArea> + '_;
}

/// Intended-lightness progression for colored block `index` of `total`.
///
/// Engraving darkness is suspected to follow a root-like curve in burn
/// intensity, so the sampling uses a power law to place more blocks near the
/// light end: `factor = ((1 + i) / n)^p`, `lightness = 255 - 255 * factor`.
pub(crate) fn lightness_factor(index: u32, total: u32, non_linearity: f64) -> f64 {
    (f64::from(1 + index) / f64::from(total)).powf(non_linearity)
}
