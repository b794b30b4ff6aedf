//! Calibration gauge specifications.
//!
//! A gauge is a grid of graded test blocks that gets physically engraved and
//! then scanned back. Each specification variant deterministically computes
//! its canvas size and the rectangles to engrave; it is stateless after
//! construction.

mod area;
mod grid;
mod marker;
mod render;
mod spec;

pub use area::CalibrationArea;
pub use grid::GridGaugeSpec;
pub use marker::MarkerGaugeSpec;
pub use render::render_gauge;
pub use spec::{GaugeSpec, GaugeSpecError};
