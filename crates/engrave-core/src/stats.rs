//! Order statistics and smoothing used by the calibration pipeline.

use nalgebra::{SMatrix, SVector};

/// Median of a sample set, or `None` when it is empty.
///
/// Even-sized inputs average the two middle order statistics.
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Linearly interpolated quantile `q` in `[0, 1]` of a **sorted** sample set.
pub fn quantile(sorted: &[f32], q: f32) -> Option<f32> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f32;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Keep only the samples inside the `[lower, upper]` quantile band.
///
/// Never empty for a non-empty input: the band endpoints are interpolated
/// between existing order statistics, so at least one sample always lies
/// inside a non-degenerate band.
pub fn filter_quantile(values: &[f32], lower: f32, upper: f32) -> Vec<f32> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let (Some(lo), Some(hi)) = (quantile(&sorted, lower), quantile(&sorted, upper)) else {
        return Vec::new();
    };
    values
        .iter()
        .copied()
        .filter(|&v| lo <= v && v <= hi)
        .collect()
}

/// Savitzky-Golay style smoothing: a local quadratic least-squares fit over a
/// sliding window, evaluated at the window's target index.
///
/// Windows are shifted (never shrunk) at the sequence boundaries. Inputs
/// shorter than three samples, or a `window` below three, are returned
/// unchanged.
pub fn smooth_quadratic(values: &[f32], window: usize) -> Vec<f32> {
    let n = values.len();
    let w = window.min(n);
    if n < 3 || w < 3 {
        return values.to_vec();
    }

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let start = i.saturating_sub(w / 2).min(n - w);
        out.push(fit_quadratic_at(&values[start..start + w], start, i).unwrap_or(values[i]));
    }
    out
}

/// Fit `y = a + b*x + c*x^2` to `window` (whose first sample sits at absolute
/// index `start`) and evaluate at absolute index `at`.
///
/// Coordinates are centred on `at`, so the evaluation is just the constant
/// coefficient. Normal equations are fine here: windows are tiny and the
/// centred Vandermonde is well conditioned.
fn fit_quadratic_at(window: &[f32], start: usize, at: usize) -> Option<f32> {
    let mut ata = SMatrix::<f64, 3, 3>::zeros();
    let mut atb = SVector::<f64, 3>::zeros();

    for (j, &y) in window.iter().enumerate() {
        let x = (start + j) as f64 - at as f64;
        let row = [1.0, x, x * x];
        for r in 0..3 {
            for c in 0..3 {
                ata[(r, c)] += row[r] * row[c];
            }
            atb[r] += row[r] * y as f64;
        }
    }

    let coeffs = ata.lu().solve(&atb)?;
    Some(coeffs[0] as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn median_handles_odd_and_even_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn filter_quantile_keeps_central_band() {
        let data: Vec<f32> = (0..=100).map(|v| v as f32).collect();
        let band = filter_quantile(&data, 0.4, 0.6);
        assert!(!band.is_empty());
        assert!(band.iter().all(|&v| (40.0..=60.0).contains(&v)));
    }

    #[test]
    fn filter_quantile_of_constant_input_keeps_everything() {
        let data = vec![7.0; 9];
        assert_eq!(filter_quantile(&data, 0.4, 0.6).len(), 9);
    }

    #[test]
    fn quadratic_smoothing_reproduces_a_parabola_exactly() {
        let data: Vec<f32> = (0..12).map(|x| (x * x) as f32 - 3.0 * x as f32).collect();
        let smoothed = smooth_quadratic(&data, 5);
        for (&s, &d) in smoothed.iter().zip(&data) {
            assert_relative_eq!(s, d, epsilon = 1e-3);
        }
    }

    #[test]
    fn smoothing_damps_a_single_spike() {
        let mut data = vec![10.0_f32; 11];
        data[5] = 100.0;
        let smoothed = smooth_quadratic(&data, 5);
        assert!(smoothed[5] < data[5]);
        // endpoints are unaffected by a spike outside their window
        assert_relative_eq!(smoothed[0], 10.0, epsilon = 1e-3);
    }

    #[test]
    fn short_inputs_pass_through() {
        let data = vec![1.0, 2.0];
        assert_eq!(smooth_quadratic(&data, 5), data);
    }
}
