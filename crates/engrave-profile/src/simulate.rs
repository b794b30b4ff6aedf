use std::collections::HashMap;

use engrave_core::LightnessImage;

use crate::{CalibrationData, ProfileId};

/// Total lookup table from every integer lightness level to the lightness
/// the engraver is predicted to produce for it.
///
/// Built from the raw measured mapping, not the fitted transfer model: the
/// simulator's job is a faithful preview, so it interpolates the actual
/// measurements piecewise-linearly and extrapolates flat beyond them.
#[derive(Clone, Debug)]
pub struct SimulationTable {
    values: [f32; 256],
}

impl SimulationTable {
    pub fn build(data: &CalibrationData) -> Self {
        let keys: Vec<u8> = data.lightness_map().keys().copied().collect();
        let measured: Vec<f32> = data.lightness_map().values().copied().collect();

        let mut values = [0.0f32; 256];
        for (level, slot) in values.iter_mut().enumerate() {
            *slot = interpolate(&keys, &measured, level as u8);
        }
        Self { values }
    }

    #[inline]
    pub fn lookup(&self, lightness: u8) -> f32 {
        self.values[usize::from(lightness)]
    }
}

/// Predicted measured lightness for `level`, from sorted calibration keys.
fn interpolate(keys: &[u8], measured: &[f32], level: u8) -> f32 {
    // index of the first key above `level`, counting equal keys as below
    let idx = keys.partition_point(|&k| k <= level);
    if idx == 0 {
        return measured[0];
    }
    if idx == keys.len() {
        return measured[keys.len() - 1];
    }
    let lower = f32::from(keys[idx - 1]);
    let upper = f32::from(keys[idx]);
    let below_weight = (upper - f32::from(level)) / (upper - lower);
    measured[idx] * (1.0 - below_weight) + measured[idx - 1] * below_weight
}

/// Session-scoped store of simulation tables, keyed by calibration handle.
///
/// Populated compute-if-absent, never evicted. Replaces hidden global state
/// with an explicitly owned component.
#[derive(Debug, Default)]
pub struct SimulationCache {
    tables: HashMap<ProfileId, SimulationTable>,
}

impl SimulationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for this calibration, building it on first request.
    pub fn table(&mut self, data: &CalibrationData) -> &SimulationTable {
        self.tables
            .entry(data.id())
            .or_insert_with(|| SimulationTable::build(data))
    }
}

/// Preview the physical appearance of `image` under this calibration.
pub fn simulate_engraving(
    image: &LightnessImage,
    data: &CalibrationData,
    cache: &mut SimulationCache,
) -> LightnessImage {
    let table = cache.table(data);
    image.map(|l| table.lookup(l.clamp(0.0, 255.0) as u8))
}
