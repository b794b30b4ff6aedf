//! Engraving tone calibration and correction.
//!
//! A physical engraver distorts the lightness values it is asked to burn.
//! This crate measures that distortion from a scanned calibration gauge,
//! fits a transfer model that answers "what lightness should I feed the
//! engraver so that the material ends up at the lightness I want", applies
//! the model to arbitrary grayscale images, and can preview the physical
//! result without engraving anything.
//!
//! Pipeline:
//! 1. [`engrave_gauge::render_gauge`] produces the gauge to engrave.
//! 2. [`CalibrationData::extract`] measures the scanned result.
//! 3. [`TransferModel::fit`] builds the correction model.
//! 4. [`prepare_for_engraving`] corrects a photo for the engraver.
//! 5. [`simulate_engraving`] previews what the engraver would produce.

mod error;
mod extract;
mod preprocess;
mod simulate;
mod transfer;
mod transform;

pub use engrave_core as core;
pub use engrave_gauge as gauge;

pub use error::ProfileError;
pub use extract::{CalibrationData, ExtractParams, ProfileId};
pub use preprocess::{decolorize, engraving_friendly_bw, PreprocessParams};
pub use simulate::{simulate_engraving, SimulationCache, SimulationTable};
pub use transfer::TransferModel;
pub use transform::prepare_for_engraving;
