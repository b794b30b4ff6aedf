use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use engrave_core::{filter_quantile, median, LightnessImage};
use engrave_gauge::{CalibrationArea, GaugeSpec};
use serde::{Deserialize, Serialize};

use crate::ProfileError;

/// Tunable extraction thresholds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ExtractParams {
    /// Quantile band of per-area samples kept for the median. The default
    /// `(0.4, 0.6)` discards edge bleed and capture-noise outliers.
    pub quantile_band: (f32, f32),
    /// Minimum lightness drop below the unengraved baseline for a block to
    /// count as measurably engraved, on the 0-255 scale.
    pub separability_threshold: f32,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self {
            quantile_band: (0.4, 0.6),
            separability_threshold: 10.0,
        }
    }
}

/// Opaque handle identifying one calibration run.
///
/// Used as the simulation-cache key instead of object identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProfileId(u64);

static NEXT_PROFILE_ID: AtomicU64 = AtomicU64::new(0);

impl ProfileId {
    fn next() -> Self {
        Self(NEXT_PROFILE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Measured engraver response, extracted once from a scanned gauge and
/// read-only afterwards.
#[derive(Clone, Debug)]
pub struct CalibrationData {
    id: ProfileId,
    median_whiteness: f32,
    lightness_map: BTreeMap<u8, f32>,
}

impl CalibrationData {
    /// Measure the engraver response from a scanned gauge.
    ///
    /// `scan` must be the lightness channel of the captured gauge image and
    /// must match the specification's declared dimensions. Blocks whose
    /// measured lightness stays within `separability_threshold` of the
    /// whitespace baseline are dropped as indistinguishable from unengraved
    /// material; if that drops every block, extraction fails.
    pub fn extract(
        spec: &impl GaugeSpec,
        scan: &LightnessImage,
        params: &ExtractParams,
    ) -> Result<Self, ProfileError> {
        if scan.width() != spec.width() as usize || scan.height() != spec.height() as usize {
            return Err(ProfileError::DimensionMismatch {
                want_w: spec.width(),
                want_h: spec.height(),
                got_w: scan.width(),
                got_h: scan.height(),
            });
        }

        let mut white_samples = Vec::new();
        for area in spec.whitespace_areas() {
            white_samples.extend_from_slice(crop_area(scan, &area).pixels());
        }
        let median_whiteness = median(&white_samples).ok_or(ProfileError::EmptyArea)?;

        let mut lightness_map = BTreeMap::new();
        let mut dropped = 0usize;
        for area in spec.colored_areas() {
            let measured = area_lightness(scan, &area, params)?;
            if median_whiteness - measured > params.separability_threshold {
                lightness_map.insert(area.lightness, measured);
            } else {
                dropped += 1;
            }
        }
        if lightness_map.is_empty() {
            return Err(ProfileError::NoSeparableSamples);
        }
        if dropped > 0 {
            log::debug!("{dropped} calibration blocks were not separable from the baseline");
        }
        log::info!(
            "calibration: baseline {median_whiteness:.1}, {} separable blocks",
            lightness_map.len()
        );

        Ok(Self {
            id: ProfileId::next(),
            median_whiteness,
            lightness_map,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(median_whiteness: f32, lightness_map: BTreeMap<u8, f32>) -> Self {
        assert!(!lightness_map.is_empty());
        Self {
            id: ProfileId::next(),
            median_whiteness,
            lightness_map,
        }
    }

    #[inline]
    pub fn id(&self) -> ProfileId {
        self.id
    }

    /// Baseline lightness of the unengraved material.
    #[inline]
    pub fn median_whiteness(&self) -> f32 {
        self.median_whiteness
    }

    /// Intended lightness -> measured lightness, separable blocks only.
    #[inline]
    pub fn lightness_map(&self) -> &BTreeMap<u8, f32> {
        &self.lightness_map
    }

    /// Usable dynamic range of this engraver/material pair, in `[0, 1]`.
    pub fn dark_light_range(&self) -> f32 {
        let darkest = self
            .lightness_map
            .values()
            .copied()
            .fold(f32::INFINITY, f32::min);
        (self.median_whiteness - darkest) / 255.0
    }
}

/// Representative measured lightness of one calibration area: the median of
/// the central quantile band of its samples.
fn area_lightness(
    scan: &LightnessImage,
    area: &CalibrationArea,
    params: &ExtractParams,
) -> Result<f32, ProfileError> {
    let samples = crop_area(scan, area);
    let (lower, upper) = params.quantile_band;
    let band = filter_quantile(samples.pixels(), lower, upper);
    median(&band).ok_or(ProfileError::EmptyArea)
}

fn crop_area(scan: &LightnessImage, area: &CalibrationArea) -> LightnessImage {
    scan.crop(
        area.top_left.0 as usize,
        area.top_left.1 as usize,
        area.bottom_right.0 as usize,
        area.bottom_right.1 as usize,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use engrave_gauge::{render_gauge, GridGaugeSpec};

    /// Affine engraver response: unengraved material scans at 240, engraved
    /// blocks at `40 + 0.75 * intended`.
    fn synthetic_scan(spec: &GridGaugeSpec) -> LightnessImage {
        render_gauge(spec).map(|v| if v >= 254.0 { 240.0 } else { 40.0 + 0.75 * v })
    }

    #[test]
    fn extract_measures_baseline_and_blocks() {
        let spec = GridGaugeSpec::new(50, 4, 4).expect("spec");
        let data = CalibrationData::extract(&spec, &synthetic_scan(&spec), &Default::default())
            .expect("extract");

        assert_eq!(data.median_whiteness(), 240.0);
        assert_eq!(data.lightness_map().len(), 15);
        for (&intended, &measured) in data.lightness_map() {
            assert_eq!(measured, 40.0 + 0.75 * f32::from(intended));
        }
    }

    #[test]
    fn dimension_mismatch_fails_fast() {
        let spec = GridGaugeSpec::new(50, 4, 4).expect("spec");
        let scan = LightnessImage::filled(10, 10, 255.0);
        assert!(matches!(
            CalibrationData::extract(&spec, &scan, &Default::default()),
            Err(ProfileError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn unseparable_blocks_are_dropped() {
        let spec = GridGaugeSpec::new(50, 4, 4).expect("spec");
        // only blocks darker than 100 leave a measurable mark
        let scan = render_gauge(&spec).map(|v| if v < 100.0 { v } else { 255.0 });
        let data =
            CalibrationData::extract(&spec, &scan, &Default::default()).expect("extract");
        assert!(data.lightness_map().len() < 15);
        assert!(data.lightness_map().keys().all(|&k| k < 100));
    }

    #[test]
    fn flat_scan_has_no_separable_blocks() {
        let spec = GridGaugeSpec::new(50, 4, 4).expect("spec");
        let scan = LightnessImage::filled(200, 200, 250.0);
        assert!(matches!(
            CalibrationData::extract(&spec, &scan, &Default::default()),
            Err(ProfileError::NoSeparableSamples)
        ));
    }

    #[test]
    fn dark_light_range_spans_baseline_to_darkest_block() {
        let spec = GridGaugeSpec::new(50, 4, 4).expect("spec");
        let data = CalibrationData::extract(&spec, &synthetic_scan(&spec), &Default::default())
            .expect("extract");
        // darkest block: intended 0 scans at 40
        assert!((data.dark_light_range() - (240.0 - 40.0) / 255.0).abs() < 1e-6);
    }
}
