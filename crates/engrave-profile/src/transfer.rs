use engrave_core::smooth_quadratic;
use nalgebra::{DMatrix, DVector};

use crate::{CalibrationData, ProfileError};

/// Degree of the fitted correction polynomial.
const DEGREE: usize = 3;

/// Window of the quadratic smoothing pass that guards the truncation
/// heuristic. Changing it changes which samples survive truncation.
const SMOOTHING_WINDOW: usize = 5;

/// Weight of the calibration-relative term in the blended measured scale;
/// the rest comes from the absolute 0-255 scale. Damps sensitivity to an
/// unrepresentative single dark extreme.
const CALIBRATION_WEIGHT: f64 = 0.6;

/// Fitted correction model: maps the relative lightness the engraver should
/// *produce* to the relative lightness the input image must *contain*.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransferModel {
    coeffs: [f64; DEGREE + 1],
}

impl TransferModel {
    /// Fit the correction polynomial to a measured engraver response.
    ///
    /// The raw calibration curve is often non-monotonic at its extremes
    /// (noise, material saturation), so the sample sequence is smoothed and
    /// truncated to the span between the smoothed global extrema before the
    /// least-squares fit. That span is assumed, not proven, to be the
    /// monotonic core of the curve.
    pub fn fit(data: &CalibrationData) -> Result<Self, ProfileError> {
        let (measured, intended) = prepare_dataset(data)?;

        let (lo, hi) = truncate_span(&measured, SMOOTHING_WINDOW);
        let measured = &measured[lo..=hi];
        let intended = &intended[lo..=hi];
        if measured.len() <= DEGREE {
            return Err(ProfileError::TooFewSamples {
                needed: DEGREE + 1,
                got: measured.len(),
            });
        }
        log::debug!(
            "transfer fit: {} samples in truncation span [{lo}, {hi}]",
            measured.len()
        );

        let coeffs = polyfit(measured, intended)?;
        Ok(Self { coeffs })
    }

    /// Raw polynomial prediction; may extrapolate outside `[0, 1]`.
    #[inline]
    pub fn predict(&self, measured_relative: f64) -> f64 {
        let x = measured_relative;
        self.coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }

    /// Prediction clipped to the valid relative-lightness range.
    ///
    /// Extrapolation near the domain edges is expected; clipping is silent.
    #[inline]
    pub fn correct(&self, measured_relative: f64) -> f64 {
        self.predict(measured_relative).clamp(0.0, 1.0)
    }
}

/// Assemble (measured-relative, intended-relative) samples ordered by
/// descending intended lightness, starting with the synthetic no-engraving
/// pair `(median_whiteness, 255)`.
fn prepare_dataset(data: &CalibrationData) -> Result<(Vec<f64>, Vec<f64>), ProfileError> {
    let whiteness = f64::from(data.median_whiteness());

    let mut pairs = vec![(255.0_f64, whiteness)];
    pairs.extend(
        data.lightness_map()
            .iter()
            .rev()
            .map(|(&intended, &measured)| (f64::from(intended), f64::from(measured))),
    );

    let darkest = pairs
        .iter()
        .map(|&(_, m)| m)
        .fold(f64::INFINITY, f64::min);

    let mut measured = Vec::with_capacity(pairs.len());
    let mut intended = Vec::with_capacity(pairs.len());
    for (file_value, scan_value) in pairs {
        measured.push(blended_relative(scan_value, whiteness, darkest)?);
        intended.push(relative_lightness(file_value, 255.0, 0.0)?);
    }
    Ok((measured, intended))
}

/// `(value - dark) / (light - dark)`.
fn relative_lightness(value: f64, light: f64, dark: f64) -> Result<f64, ProfileError> {
    let span = light - dark;
    if span.abs() < f64::EPSILON {
        return Err(ProfileError::DegenerateRange);
    }
    Ok((value - dark) / span)
}

/// Blend of the calibration-relative and absolute-scale relative lightness.
fn blended_relative(value: f64, light: f64, dark: f64) -> Result<f64, ProfileError> {
    let calibrated = relative_lightness(value, light, dark)?;
    let absolute = relative_lightness(value, 255.0, 0.0)?;
    Ok(calibrated * CALIBRATION_WEIGHT + absolute * (1.0 - CALIBRATION_WEIGHT))
}

/// Inclusive index span between the global minimum and maximum of the
/// smoothed sequence. Samples outside the span are discarded by the caller.
fn truncate_span(measured: &[f64], window: usize) -> (usize, usize) {
    let as_f32: Vec<f32> = measured.iter().map(|&v| v as f32).collect();
    let smoothed = smooth_quadratic(&as_f32, window);

    let mut min_idx = 0;
    let mut max_idx = 0;
    for (i, &v) in smoothed.iter().enumerate() {
        if v < smoothed[min_idx] {
            min_idx = i;
        }
        if v > smoothed[max_idx] {
            max_idx = i;
        }
    }
    (min_idx.min(max_idx), min_idx.max(max_idx))
}

/// Ordinary least squares fit of a degree-3 polynomial via SVD.
fn polyfit(xs: &[f64], ys: &[f64]) -> Result<[f64; DEGREE + 1], ProfileError> {
    let rows = xs.len();
    let design = DMatrix::from_fn(rows, DEGREE + 1, |r, c| xs[r].powi(c as i32));
    let rhs = DVector::from_column_slice(ys);

    let svd = design.svd(true, true);
    let solution = svd.solve(&rhs, 1e-12).map_err(ProfileError::FitFailed)?;

    let mut coeffs = [0.0; DEGREE + 1];
    for (c, v) in coeffs.iter_mut().zip(solution.iter()) {
        *c = *v;
    }
    Ok(coeffs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn affine_data() -> CalibrationData {
        // engraver response: measured = 40 + 0.75 * intended, baseline 240
        let map: BTreeMap<u8, f32> = [0u8, 29, 57, 84, 109, 132, 153, 172, 190, 205, 219, 231]
            .into_iter()
            .map(|l| (l, 40.0 + 0.75 * f32::from(l)))
            .collect();
        CalibrationData::from_parts(240.0, map)
    }

    #[test]
    fn fit_recovers_an_affine_response_exactly() {
        let model = TransferModel::fit(&affine_data()).expect("fit");
        let data = affine_data();
        let whiteness = f64::from(data.median_whiteness());
        for (&intended, &measured) in data.lightness_map() {
            let x = blended_relative(f64::from(measured), whiteness, 40.0).expect("rel");
            assert_relative_eq!(
                model.predict(x),
                f64::from(intended) / 255.0,
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn correct_clips_extrapolated_predictions() {
        let model = TransferModel {
            coeffs: [2.0, 0.0, 0.0, 0.0],
        };
        assert_eq!(model.correct(0.5), 1.0);
        let model = TransferModel {
            coeffs: [-1.0, 0.0, 0.0, 0.0],
        };
        assert_eq!(model.correct(0.5), 0.0);
    }

    #[test]
    fn relative_lightness_blend_weights_are_60_40() {
        // calibrated: (120 - 20) / (220 - 20) = 0.5; absolute: 120 / 255
        let blended = blended_relative(120.0, 220.0, 20.0).expect("blend");
        assert_relative_eq!(blended, 0.6 * 0.5 + 0.4 * (120.0 / 255.0), epsilon = 1e-12);
    }

    #[test]
    fn zero_width_reference_span_is_an_error() {
        assert!(matches!(
            relative_lightness(10.0, 100.0, 100.0),
            Err(ProfileError::DegenerateRange)
        ));
    }

    #[test]
    fn truncation_retains_the_inclusive_span_between_smoothed_extrema() {
        // exact quadratic: smoothing reproduces it, max at 0, min at 7,
        // rising again afterwards
        let values: Vec<f64> = (0..10).map(|i| ((i - 7) * (i - 7)) as f64 / 49.0).collect();
        assert_eq!(truncate_span(&values, 5), (0, 7));
    }

    #[test]
    fn monotonic_sequences_are_not_truncated() {
        let values: Vec<f64> = (0..12).map(|i| 1.0 - f64::from(i) / 11.0).collect();
        assert_eq!(truncate_span(&values, 5), (0, 11));
    }

    #[test]
    fn too_few_surviving_samples_fail_the_fit() {
        let map: BTreeMap<u8, f32> = [(100u8, 120.0_f32), (50, 80.0)].into_iter().collect();
        let data = CalibrationData::from_parts(240.0, map);
        assert!(matches!(
            TransferModel::fit(&data),
            Err(ProfileError::TooFewSamples { .. })
        ));
    }
}
