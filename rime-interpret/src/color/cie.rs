//! The CIE based color spaces CalGray, CalRGB and Lab.
//!
//! All three are converted by computing CIE XYZ, adapting it to the D65 white
//! point with the Bradford transform and then applying the sRGB matrix and
//! transfer function. The math follows pdf.js, see
//! <https://github.com/mozilla/pdf.js/blob/06f44916c8936b92f464d337fe3a0a6b2b78d5b4/src/core/colorspace.js#L846>.

use rime_syntax::object::{Array, Dict};
use rime_syntax::object::dict::keys::{BLACK_POINT, GAMMA, MATRIX, RANGE, WHITE_POINT};

const BRADFORD_SCALE_MATRIX: [f32; 9] = [
    0.8951, 0.2664, -0.1614, -0.7502, 1.7135, 0.0367, 0.0389, -0.0685, 1.0296,
];

const BRADFORD_SCALE_INVERSE_MATRIX: [f32; 9] = [
    0.9869929, -0.1470543, 0.1599627, 0.4323053, 0.5183603, 0.0492912, -0.0085287, 0.0400428,
    0.9684867,
];

const SRGB_D65_XYZ_TO_RGB_MATRIX: [f32; 9] = [
    3.2404542, -1.5371385, -0.4985314, -0.969_266, 1.8760108, 0.0415560, 0.0556434, -0.2040259,
    1.0572252,
];

const FLAT_WHITE_POINT: [f32; 3] = [1.0, 1.0, 1.0];
const D65_WHITE_POINT: [f32; 3] = [0.95047, 1.0, 1.08883];

fn array<const N: usize>(dict: &Dict, key: &[u8]) -> Option<[f32; N]> {
    let array = dict.get::<Array>(key)?;
    let mut out = [0.0; N];

    if array.len() != N {
        return None;
    }

    for (o, v) in out.iter_mut().zip(array.iter_as::<f32>()) {
        *o = v;
    }

    Some(out)
}

fn white_point(dict: &Dict) -> [f32; 3] {
    array::<3>(dict, WHITE_POINT)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0 && w[2] > 0.0)
        .unwrap_or(FLAT_WHITE_POINT)
}

/// A CalGray color space.
#[derive(Debug, Clone, PartialEq)]
pub struct CalGray {
    white_point: [f32; 3],
    gamma: f32,
}

impl CalGray {
    pub(crate) fn new(dict: &Dict) -> Self {
        Self {
            white_point: white_point(dict),
            gamma: dict.get::<f32>(GAMMA).unwrap_or(1.0),
        }
    }

    pub(crate) fn convert(&self, input: &[f32], output: &mut [u8]) {
        for (a, output) in input.iter().zip(output.chunks_exact_mut(3)) {
            let ag = a.clamp(0.0, 1.0).powf(self.gamma);
            let l = self.white_point[1] * ag;
            let val = (0.0_f32.max(295.8 * l.powf(0.333_333_34) - 40.8) + 0.5).min(255.0) as u8;

            output.copy_from_slice(&[val, val, val]);
        }
    }
}

/// A CalRGB color space.
#[derive(Debug, Clone, PartialEq)]
pub struct CalRgb {
    white_point: [f32; 3],
    black_point: [f32; 3],
    matrix: [f32; 9],
    gamma: [f32; 3],
}

impl CalRgb {
    pub(crate) fn new(dict: &Dict) -> Self {
        Self {
            white_point: white_point(dict),
            black_point: array::<3>(dict, BLACK_POINT).unwrap_or([0.0; 3]),
            matrix: array::<9>(dict, MATRIX).unwrap_or([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
            gamma: array::<3>(dict, GAMMA).unwrap_or([1.0; 3]),
        }
    }

    pub(crate) fn convert(&self, input: &[f32], output: &mut [u8]) {
        for (input, output) in input.chunks_exact(3).zip(output.chunks_exact_mut(3)) {
            let [r, g, b] = [
                input[0].clamp(0.0, 1.0),
                input[1].clamp(0.0, 1.0),
                input[2].clamp(0.0, 1.0),
            ];
            let [gr, gg, gb] = self.gamma;
            let [agr, bgg, cgb] = [
                if r == 1.0 { 1.0 } else { r.powf(gr) },
                if g == 1.0 { 1.0 } else { g.powf(gg) },
                if b == 1.0 { 1.0 } else { b.powf(gb) },
            ];

            let m = &self.matrix;
            let xyz = [
                m[0] * agr + m[3] * bgg + m[6] * cgb,
                m[1] * agr + m[4] * bgg + m[7] * cgb,
                m[2] * agr + m[5] * bgg + m[8] * cgb,
            ];

            let xyz_flat = normalize_white_point_to_flat(&self.white_point, &xyz);
            let xyz_black = compensate_black_point(&self.black_point, &xyz_flat);

            output.copy_from_slice(&xyz_to_srgb(&FLAT_WHITE_POINT, &xyz_black));
        }
    }
}

/// A Lab color space.
#[derive(Debug, Clone, PartialEq)]
pub struct Lab {
    white_point: [f32; 3],
    range: [f32; 4],
}

impl Lab {
    pub(crate) fn new(dict: &Dict) -> Self {
        Self {
            white_point: white_point(dict),
            range: array::<4>(dict, RANGE).unwrap_or([-100.0, 100.0, -100.0, 100.0]),
        }
    }

    /// The ranges of the a* and b* components.
    pub(crate) fn range(&self) -> [f32; 4] {
        self.range
    }

    pub(crate) fn convert(&self, input: &[f32], output: &mut [u8]) {
        for (input, output) in input.chunks_exact(3).zip(output.chunks_exact_mut(3)) {
            let l = input[0].clamp(0.0, 100.0);
            let a = input[1].clamp(self.range[0], self.range[1].max(self.range[0]));
            let b = input[2].clamp(self.range[2], self.range[3].max(self.range[2]));

            let fy = (l + 16.0) / 116.0;
            let fx = fy + a / 500.0;
            let fz = fy - b / 200.0;

            let g = |t: f32| {
                if t >= 6.0 / 29.0 {
                    t * t * t
                } else {
                    108.0 / 841.0 * (t - 4.0 / 29.0)
                }
            };

            let xyz = [
                self.white_point[0] * g(fx),
                self.white_point[1] * g(fy),
                self.white_point[2] * g(fz),
            ];

            output.copy_from_slice(&xyz_to_srgb(&self.white_point, &xyz));
        }
    }
}

fn xyz_to_srgb(source_white_point: &[f32; 3], xyz: &[f32; 3]) -> [u8; 3] {
    let xyz_d65 = normalize_white_point_to_d65(source_white_point, xyz);
    let rgb = matrix_product(&SRGB_D65_XYZ_TO_RGB_MATRIX, &xyz_d65);

    rgb.map(|c| (srgb_transfer_function(c) * 255.0 + 0.5) as u8)
}

fn srgb_transfer_function(color: f32) -> f32 {
    if color <= 0.0031308 {
        (12.92 * color).clamp(0.0, 1.0)
    } else if color >= 0.99554525 {
        1.0
    } else {
        ((1.0 + 0.055) * color.powf(1.0 / 2.4) - 0.055).clamp(0.0, 1.0)
    }
}

fn matrix_product(a: &[f32; 9], b: &[f32; 3]) -> [f32; 3] {
    [
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2],
        a[3] * b[0] + a[4] * b[1] + a[5] * b[2],
        a[6] * b[0] + a[7] * b[1] + a[8] * b[2],
    ]
}

fn decode_l(l: f32) -> f32 {
    const DECODE_L_CONSTANT: f32 = ((8.0 + 16.0) / 116.0) * ((8.0 + 16.0) / 116.0)
        * ((8.0 + 16.0) / 116.0)
        / 8.0;

    if l < 0.0 {
        -decode_l(-l)
    } else if l > 8.0 {
        ((l + 16.0) / 116.0).powi(3)
    } else {
        l * DECODE_L_CONSTANT
    }
}

fn compensate_black_point(source_bp: &[f32; 3], xyz_flat: &[f32; 3]) -> [f32; 3] {
    if source_bp == &[0.0, 0.0, 0.0] {
        return *xyz_flat;
    }

    let zero_decode_l = decode_l(0.0);
    let mut out = [0.0; 3];

    for i in 0..3 {
        let src = decode_l(source_bp[i]);
        let scale = (1.0 - zero_decode_l) / (1.0 - src);
        let offset = 1.0 - scale;
        out[i] = xyz_flat[i] * scale + offset;
    }

    out
}

fn normalize_white_point_to_flat(source_white_point: &[f32; 3], xyz: &[f32; 3]) -> [f32; 3] {
    if source_white_point[0] == 1.0 && source_white_point[2] == 1.0 {
        return *xyz;
    }

    let lms = matrix_product(&BRADFORD_SCALE_MATRIX, xyz);
    let lms_flat = [
        lms[0] / source_white_point[0],
        lms[1] / source_white_point[1],
        lms[2] / source_white_point[2],
    ];

    matrix_product(&BRADFORD_SCALE_INVERSE_MATRIX, &lms_flat)
}

fn normalize_white_point_to_d65(source_white_point: &[f32; 3], xyz: &[f32; 3]) -> [f32; 3] {
    let lms = matrix_product(&BRADFORD_SCALE_MATRIX, xyz);
    let lms_d65 = [
        lms[0] * D65_WHITE_POINT[0] / source_white_point[0],
        lms[1] * D65_WHITE_POINT[1] / source_white_point[1],
        lms[2] * D65_WHITE_POINT[2] / source_white_point[2],
    ];

    matrix_product(&BRADFORD_SCALE_INVERSE_MATRIX, &lms_d65)
}
