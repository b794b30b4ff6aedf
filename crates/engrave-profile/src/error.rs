/// Errors surfaced by calibration extraction and model construction.
///
/// All of these are fail-fast domain validity violations: a partially fit
/// model is worse than no model. Per-pixel range clipping during the image
/// transforms is *not* an error and never aborts a whole-image pass.
#[derive(thiserror::Error, Debug)]
pub enum ProfileError {
    #[error("scan is {got_w}x{got_h}, gauge spec declares {want_w}x{want_h}")]
    DimensionMismatch {
        want_w: u32,
        want_h: u32,
        got_w: usize,
        got_h: usize,
    },
    #[error("calibration area produced no samples")]
    EmptyArea,
    #[error("no calibration block is separable from the unengraved baseline")]
    NoSeparableSamples,
    #[error("light and dark references coincide, relative lightness is undefined")]
    DegenerateRange,
    #[error("{got} calibration samples survive truncation, {needed} needed for the fit")]
    TooFewSamples { needed: usize, got: usize },
    #[error("polynomial regression failed: {0}")]
    FitFailed(&'static str),
}
