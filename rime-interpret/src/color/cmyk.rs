//! Conversion of device CMYK to RGB.
//!
//! This is a fixed empirical blend over the corners of the CMY cube. It is not
//! colorimetric and needs no profile.

/// The default factor applied to the black component.
pub const DEFAULT_BLACK_RATIO: f32 = 1.0;

/// Convert a CMYK color with components in `[0, 1]` to RGB8.
///
/// The black component is multiplied by `black_ratio`, unless cyan, magenta
/// or yellow is zero, so that pure black stays untouched.
pub fn cmyk_to_rgb(cmyk: [f32; 4], black_ratio: f32) -> [u8; 3] {
    // Stored as [K, Y, M, C].
    let f = [cmyk[3], cmyk[2], cmyk[1], cmyk[0]];
    let (in_cyan, in_magenta, in_yellow) = (f[3], f[2], f[1]);
    let mut in_black = f[0];

    if in_cyan != 0.0 && in_magenta != 0.0 && in_yellow != 0.0 {
        in_black = f[0] * black_ratio;
    }

    let c = clip(0.0, 1.0, (in_cyan + in_black) as f64);
    let m = clip(0.0, 1.0, (in_magenta + in_black) as f64);
    let y = clip(0.0, 1.0, (in_yellow + in_black) as f64);

    let aw = (1.0 - c) * (1.0 - m) * (1.0 - y);
    let ac = c * (1.0 - m) * (1.0 - y);
    let am = (1.0 - c) * m * (1.0 - y);
    let ay = (1.0 - c) * (1.0 - m) * y;
    let ar = (1.0 - c) * m * y;
    let ag = c * (1.0 - m) * y;
    let ab = c * m * (1.0 - y);
    // The black corner contributes nothing.

    let r = clip(0.0, 1.0, aw + 0.9137 * am + 0.9961 * ay + 0.9882 * ar) as f32;
    let g = clip(0.0, 1.0, aw + 0.6196 * ac + ay + 0.5176 * ag) as f32;
    let b = clip(
        0.0,
        1.0,
        aw + 0.7804 * ac + 0.5412 * am + 0.0667 * ar + 0.2118 * ag + 0.4863 * ab,
    ) as f32;

    [to_u8(r), to_u8(g), to_u8(b)]
}

/// Convert 8-bit CMYK samples to RGB8.
#[inline]
pub fn cmyk8_to_rgb(cmyk: [u8; 4], black_ratio: f32) -> [u8; 3] {
    cmyk_to_rgb(cmyk.map(|v| v as f32 / 255.0), black_ratio)
}

#[inline]
fn clip(floor: f64, ceiling: f64, value: f64) -> f64 {
    if value < floor {
        floor
    } else if value > ceiling {
        ceiling
    } else {
        value
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v * 255.0 + 0.5) as u8
}
