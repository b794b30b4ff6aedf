//! RGB <-> HSL conversion.
//!
//! The pipeline only ever touches the lightness channel; hue and saturation
//! are carried so that reconstructed images go through the same color-space
//! round trip as the captured ones.

/// HSL color. Hue in degrees `[0, 360)`, saturation and lightness in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsl {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

/// Lightness of an 8-bit RGB triple on the `[0, 255]` scale.
///
/// This is the HSL definition, `(max + min) / 2`, not a luma weighting.
#[inline]
pub fn lightness_of_rgb(r: u8, g: u8, b: u8) -> f32 {
    let max = r.max(g).max(b) as f32;
    let min = r.min(g).min(b) as f32;
    (max + min) / 2.0
}

/// Convert normalized RGB (`[0, 1]` per channel) to HSL.
pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> Hsl {
    let r = r.clamp(0.0, 1.0);
    let g = g.clamp(0.0, 1.0);
    let b = b.clamp(0.0, 1.0);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let lightness = (max + min) / 2.0;
    let chroma = max - min;

    if chroma < 1e-6 {
        return Hsl {
            hue: 0.0,
            saturation: 0.0,
            lightness,
        };
    }

    let saturation = if lightness < 0.5 {
        chroma / (max + min)
    } else {
        chroma / (2.0 - max - min)
    };

    let sector = if max == r {
        ((g - b) / chroma).rem_euclid(6.0)
    } else if max == g {
        (b - r) / chroma + 2.0
    } else {
        (r - g) / chroma + 4.0
    };

    Hsl {
        hue: sector * 60.0,
        saturation,
        lightness,
    }
}

/// Convert HSL back to normalized RGB.
pub fn hsl_to_rgb(hsl: Hsl) -> (f32, f32, f32) {
    let s = hsl.saturation.clamp(0.0, 1.0);
    let l = hsl.lightness.clamp(0.0, 1.0);

    if s < 1e-6 {
        return (l, l, l);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = hsl.hue.rem_euclid(360.0) / 360.0;

    (
        hue_component(p, q, h + 1.0 / 3.0),
        hue_component(p, q, h),
        hue_component(p, q, h - 1.0 / 3.0),
    )
}

fn hue_component(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
