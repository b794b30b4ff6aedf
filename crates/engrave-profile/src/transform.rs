use engrave_core::LightnessImage;

use crate::TransferModel;

/// Correct a grayscale image so that the engraver reproduces its tones.
///
/// Every pixel is handled independently: normalize to `[0, 1]`, ask the
/// model which input lightness produces the desired output, clip, and scale
/// back to the 0-255 lightness range. The transfer model is not mutated.
pub fn prepare_for_engraving(image: &LightnessImage, model: &TransferModel) -> LightnessImage {
    image.map(|l| (model.correct(f64::from(l) / 255.0) * 255.0) as f32)
}
