//! Core primitives for engraving tone calibration.
//!
//! This crate is intentionally small and image-format agnostic. It does *not*
//! depend on any concrete raster codec; decoding and encoding happen at the
//! CLI edge.

mod color;
mod image;
mod logger;
mod stats;

pub use color::{hsl_to_rgb, lightness_of_rgb, rgb_to_hsl, Hsl};
pub use image::LightnessImage;
pub use logger::init_logging;
pub use stats::{filter_quantile, median, quantile, smooth_quadratic};
