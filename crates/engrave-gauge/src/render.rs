use engrave_core::LightnessImage;

use crate::spec::GaugeSpec;

/// Render a gauge specification into a lightness raster ready for engraving.
///
/// The canvas starts white (unengraved material) and each graded block is
/// filled with its intended lightness. Whitespace areas stay untouched.
pub fn render_gauge(spec: &impl GaugeSpec) -> LightnessImage {
    let mut canvas = LightnessImage::filled(spec.width() as usize, spec.height() as usize, 255.0);
    for area in spec.colored_areas() {
        canvas.fill_rect(
            area.top_left.0 as usize,
            area.top_left.1 as usize,
            area.bottom_right.0 as usize,
            area.bottom_right.1 as usize,
            f32::from(area.lightness),
        );
    }
    canvas
}
