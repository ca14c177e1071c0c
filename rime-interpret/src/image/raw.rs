//! Conversion of raw, bit-packed samples to RGB.

use crate::bit_reader::BitReader;
use crate::color::{ColorSpace, cmyk8_to_rgb};
use crate::image::{DecodeMap, ImageDescriptor, fit};
use log::warn;

/// Unpack the samples of an image. Each row starts at a byte boundary, missing
/// samples are 0.
pub(crate) fn samples(
    data: &[u8],
    width: u32,
    height: u32,
    components: usize,
    bits_per_component: u8,
) -> Vec<u16> {
    let per_row = width as usize * components;
    let len = per_row * height as usize;

    match bits_per_component {
        8 => {
            let mut out = data.iter().take(len).map(|v| *v as u16).collect::<Vec<_>>();
            out.resize(len, 0);
            out
        }
        16 => {
            let mut out = data
                .chunks_exact(2)
                .take(len)
                .map(|v| u16::from_be_bytes([v[0], v[1]]))
                .collect::<Vec<_>>();
            out.resize(len, 0);
            out
        }
        _ => {
            let mut out = Vec::with_capacity(len);
            let mut reader = BitReader::new(data);

            for _ in 0..height {
                for _ in 0..per_row {
                    // Some images don't have enough data, pad with zeroes.
                    out.push(reader.read(bits_per_component).unwrap_or(0) as u16);
                }

                reader.align();
            }

            out
        }
    }
}

/// Convert raw samples to interleaved RGB, with one triple per pixel.
pub(crate) fn to_rgb(
    image: &ImageDescriptor,
    data: &[u8],
    bits_per_component: u8,
    black_ratio: f32,
) -> Vec<u8> {
    let cs = &image.color_space;
    let n = cs.num_components();
    let pixels = image.num_pixels();
    let maps = image.decode_maps(bits_per_component);

    if let Some(rgb) = fast_path(image, data, &maps, bits_per_component, black_ratio) {
        return rgb;
    }

    let samples = samples(data, image.width, image.height, n, bits_per_component);

    if n == 1 && bits_per_component <= 8 && !maps.is_empty() {
        let lut = one_component_lut(cs, maps[0], bits_per_component, black_ratio);

        return samples
            .iter()
            .flat_map(|s| lut.get(*s as usize).copied().unwrap_or([255; 3]))
            .collect();
    }

    let mut out = vec![0; pixels * 3];

    if maps.len() < n {
        out.fill(255);

        return out;
    }

    let input = samples
        .chunks_exact(n)
        .flat_map(|c| c.iter().zip(maps.iter()).map(|(s, m)| m.apply(*s as u32)))
        .collect::<Vec<_>>();

    if cs.convert(&input, &mut out, black_ratio).is_none() {
        warn!("failed to convert image with {n} components, using white");

        out.fill(255);
    }

    out
}

/// Build the raster directly for the common layouts.
fn fast_path(
    image: &ImageDescriptor,
    data: &[u8],
    maps: &[DecodeMap],
    bits_per_component: u8,
    black_ratio: f32,
) -> Option<Vec<u8>> {
    if !maps.iter().all(|m| m.is_identity(bits_per_component)) {
        return None;
    }

    let pixels = image.num_pixels();
    let len = pixels * 3;

    let rgb = match (&image.color_space, bits_per_component) {
        (ColorSpace::DeviceGray, 8) => data.iter().take(pixels).flat_map(|v| [*v; 3]).collect(),
        (ColorSpace::DeviceRgb, 8) => data.iter().take(len).copied().collect(),
        (ColorSpace::DeviceCmyk, 8) => data
            .chunks_exact(4)
            .take(pixels)
            .flat_map(|c| cmyk8_to_rgb([c[0], c[1], c[2], c[3]], black_ratio))
            .collect(),
        (ColorSpace::DeviceGray, 1) => {
            let stride = (image.width as usize).div_ceil(8);
            let mut out = Vec::with_capacity(len);

            for row in data.chunks(stride).take(image.height as usize) {
                for x in 0..image.width as usize {
                    let bit = row.get(x >> 3).is_some_and(|b| b & (0x80 >> (x & 7)) != 0);
                    out.extend_from_slice(&[if bit { 255 } else { 0 }; 3]);
                }
            }

            out
        }
        _ => return None,
    };

    Some(fit(rgb, len, 0))
}

/// A color for each possible sample of a one-component image.
fn one_component_lut(
    cs: &ColorSpace,
    map: DecodeMap,
    bits_per_component: u8,
    black_ratio: f32,
) -> Vec<[u8; 3]> {
    let max = (1_u32 << bits_per_component) - 1;
    let scale = |s: u32| ((s * 255 + max / 2) / max) as u8;

    (0..=max)
        .map(|s| match cs {
            ColorSpace::DeviceGray if map.is_identity(bits_per_component) => [scale(s); 3],
            ColorSpace::DeviceGray if map.is_inverted(bits_per_component) => [scale(max - s); 3],
            _ => cs.to_rgb_with(&[map.apply(s)], black_ratio),
        })
        .collect()
}
