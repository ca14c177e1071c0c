//! `DCTDecode` images.
//!
//! The registered [`RasterReader`] only decodes the JPEG data, the color
//! transform is chosen here based on the markers of the JPEG stream.

use crate::color::{ColorSpace, cmyk8_to_rgb};
use crate::config::{DecodeConfig, JPEG, RasterReader, RawRaster};
use crate::image::{ImageDescriptor, fit};
use log::warn;
use rime_syntax::object::Dict;
use rime_syntax::object::dict::keys::COLOR_TRANSFORM;
use rime_syntax::{Error, Result};
use std::io::Cursor;
use zune_jpeg::JpegDecoder;
use zune_jpeg::zune_core::colorspace::ColorSpace as JpegColorSpace;
use zune_jpeg::zune_core::options::DecoderOptions;

/// Only this many bytes are scanned for markers.
const SNIFF_LIMIT: usize = 2048;

/// Reads JPEG data with `zune-jpeg`, without converting colors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZuneJpegReader;

fn options() -> DecoderOptions {
    DecoderOptions::default()
        .set_max_width(u16::MAX as usize)
        .set_max_height(u16::MAX as usize)
}

impl RasterReader for ZuneJpegReader {
    fn read(&self, data: &[u8]) -> Result<RawRaster> {
        let mut decoder = JpegDecoder::new_with_options(Cursor::new(data), options());
        decoder.decode_headers().map_err(|e| {
            warn!("failed to read JPEG headers: {e:?}");

            Error::CodecFailure("invalid JPEG headers")
        })?;

        // Ask for the color space of the data itself, so that no transform is
        // applied.
        let out_colorspace = match decoder.input_colorspace() {
            Some(JpegColorSpace::RGB | JpegColorSpace::RGBA) => JpegColorSpace::RGB,
            Some(JpegColorSpace::Luma | JpegColorSpace::LumaA) => JpegColorSpace::Luma,
            Some(JpegColorSpace::CMYK) => JpegColorSpace::CMYK,
            Some(JpegColorSpace::YCCK) => JpegColorSpace::YCCK,
            Some(JpegColorSpace::YCbCr) => JpegColorSpace::YCbCr,
            other => {
                warn!("unsupported JPEG color space {other:?}");

                return Err(Error::UnsupportedVariant("JPEG color space"));
            }
        };

        decoder.set_options(options().jpeg_set_out_colorspace(out_colorspace));

        let data = decoder.decode().map_err(|e| {
            warn!("failed to decode JPEG: {e:?}");

            Error::CodecFailure("invalid JPEG data")
        })?;
        let (width, height) = decoder
            .dimensions()
            .ok_or(Error::CodecFailure("JPEG without dimensions"))?;

        Ok(RawRaster {
            width: width as u32,
            height: height as u32,
            components: out_colorspace.num_components() as u8,
            data,
            alpha: None,
        })
    }
}

/// The encoding of the samples in a JPEG stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Gray,
    Rgb,
    YCbCr,
    Cmyk,
    Ycck,
}

#[derive(Debug)]
struct JpegInfo {
    /// The color transform flag of the Adobe APP14 marker, if present.
    adobe_transform: Option<u8>,
    component_ids: Vec<u8>,
}

impl JpegInfo {
    fn encoding(&self, color_transform: Option<u8>) -> Encoding {
        match self.component_ids.len() {
            1 => Encoding::Gray,
            3 => match self.adobe_transform {
                Some(0) => Encoding::Rgb,
                Some(_) => Encoding::YCbCr,
                // pdf.js issue 11931.
                None if self.component_ids == b"RGB" => Encoding::Rgb,
                None if color_transform == Some(0) => Encoding::Rgb,
                None => Encoding::YCbCr,
            },
            4 => match self.adobe_transform {
                Some(2) => Encoding::Ycck,
                _ => Encoding::Cmyk,
            },
            _ => Encoding::YCbCr,
        }
    }
}

fn extract_jpeg_info(data: &[u8]) -> Option<JpegInfo> {
    if data.len() < 4 || data[0..2] != [0xFF, 0xD8] {
        return None;
    }

    let mut pos = 2;
    let mut adobe_transform = None;
    let mut component_ids = None;

    while pos + 3 < data.len() {
        if data[pos] != 0xFF {
            return None;
        }

        let marker = data[pos + 1];

        if marker == 0xFF {
            pos += 1;
            continue;
        }

        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 || marker == 0xDA {
            break;
        }

        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let segment = data.get(pos + 4..pos + 2 + length);

        // APP14
        if marker == 0xEE
            && let Some(segment) = segment
            && segment.len() >= 12
            && &segment[0..5] == b"Adobe"
        {
            adobe_transform = Some(segment[11]);
        }

        // SOF, but not DHT, JPG or DAC.
        if (0xC0..=0xCF).contains(&marker)
            && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
            && let Some(&count) = data.get(pos + 9)
        {
            component_ids = Some(
                (0..count as usize)
                    .filter_map(|i| data.get(pos + 10 + i * 3).copied())
                    .collect::<Vec<_>>(),
            );
        }

        pos += 2 + length;
    }

    Some(JpegInfo {
        adobe_transform,
        component_ids: component_ids?,
    })
}

/// Decode a JPEG image to interleaved RGB.
pub(crate) fn decode(
    data: &[u8],
    params: Option<&Dict>,
    image: &ImageDescriptor,
    config: &DecodeConfig,
) -> Option<Vec<u8>> {
    let reader = config.reader(JPEG).or_else(|| {
        warn!("no JPEG reader is registered");

        None
    })?;
    let raster = reader
        .read(data)
        .inspect_err(|e| warn!("failed to read JPEG image: {e}"))
        .ok()?;

    if !raster.is_consistent() {
        warn!("JPEG reader returned an inconsistent raster");

        return None;
    }

    let color_transform = params.and_then(|p| p.get::<u8>(COLOR_TRANSFORM));
    let info = extract_jpeg_info(&data[..data.len().min(SNIFF_LIMIT)]);
    let encoding = info
        .as_ref()
        .map(|i| i.encoding(color_transform))
        .filter(|e| num_components(*e) == raster.components as usize)
        .unwrap_or(match raster.components {
            1 => Encoding::Gray,
            4 => Encoding::Cmyk,
            _ => Encoding::YCbCr,
        });
    let adobe = info.is_some_and(|i| i.adobe_transform.is_some());

    let pixels = image.num_pixels();
    let rgb = convert(&raster, encoding, adobe, image, config.black_ratio);

    if raster.width != image.width || raster.height != image.height {
        warn!(
            "JPEG size {}x{} differs from image size {}x{}",
            raster.width, raster.height, image.width, image.height
        );
    }

    Some(fit(rgb, pixels * 3, 0))
}

fn num_components(encoding: Encoding) -> usize {
    match encoding {
        Encoding::Gray => 1,
        Encoding::Rgb | Encoding::YCbCr => 3,
        Encoding::Cmyk | Encoding::Ycck => 4,
    }
}

fn convert(
    raster: &RawRaster,
    encoding: Encoding,
    adobe: bool,
    image: &ImageDescriptor,
    black_ratio: f32,
) -> Vec<u8> {
    let data = &raster.data;
    let cs = &image.color_space;
    let pixels = raster.width as usize * raster.height as usize;
    let mut out = vec![0; pixels * 3];

    match encoding {
        Encoding::Rgb => {
            if cs.num_components() != 3 || cs.convert_u8(data, &mut out, black_ratio).is_none() {
                out.copy_from_slice(&data[..pixels * 3]);
            }
        }
        Encoding::YCbCr => {
            for (ycc, rgb) in data.chunks_exact(3).zip(out.chunks_exact_mut(3)) {
                rgb.copy_from_slice(&ycbcr_to_rgb(ycc[0], ycc[1], ycc[2]));
            }
        }
        Encoding::Cmyk => {
            for (cmyk, rgb) in data.chunks_exact(4).zip(out.chunks_exact_mut(3)) {
                let mut cmyk = [cmyk[0], cmyk[1], cmyk[2], cmyk[3]];

                // Adobe stores inverted CMYK.
                if adobe {
                    cmyk = cmyk.map(|c| 255 - c);
                }

                rgb.copy_from_slice(&cmyk8_to_rgb(cmyk, black_ratio));
            }
        }
        Encoding::Ycck => {
            for (ycck, rgb) in data.chunks_exact(4).zip(out.chunks_exact_mut(3)) {
                rgb.copy_from_slice(&cmyk8_to_rgb(ycck_to_cmyk(ycck), black_ratio));
            }
        }
        Encoding::Gray => {
            let inverted = image
                .decode
                .first()
                .is_some_and(|m| m.is_inverted(image.bits_per_component));
            let gray = data
                .iter()
                .map(|v| if inverted { 255 - v } else { *v })
                .collect::<Vec<_>>();

            let plain = matches!(
                cs,
                ColorSpace::DeviceGray | ColorSpace::IccBased(_) | ColorSpace::Indexed(_)
            ) || cs.is_named_color()
                || cs.num_components() != 1;

            if plain || cs.convert_u8(&gray, &mut out, black_ratio).is_none() {
                for (v, rgb) in gray.iter().zip(out.chunks_exact_mut(3)) {
                    rgb.fill(*v);
                }
            }
        }
    }

    out
}

#[inline]
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;

    [
        y + 1.402 * cr,
        y - 0.344136 * cb - 0.714136 * cr,
        y + 1.772 * cb,
    ]
    .map(|v| (v + 0.5).clamp(0.0, 255.0) as u8)
}

/// See <https://github.com/mozilla/pdf.js/blob/69595a29192b7704733404a42a2ebb537601117b/src/core/jpg.js#L1331>.
#[inline]
fn ycck_to_cmyk(ycck: &[u8]) -> [u8; 4] {
    let y = ycck[0] as f32;
    let cb = ycck[1] as f32;
    let cr = ycck[2] as f32;

    [
        (434.456 - y - 1.402 * cr) as u8,
        (119.541 - y + 0.344 * cb + 0.714 * cr) as u8,
        (481.816 - y - 1.772 * cb) as u8,
        // Black is stored inverted.
        255 - ycck[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(adobe_transform: Option<u8>, ids: &[u8]) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];

        if let Some(transform) = adobe_transform {
            data.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
            data.extend_from_slice(b"Adobe");
            data.extend_from_slice(&[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, transform]);
        }

        let length = 8 + 3 * ids.len() as u16;
        data.extend_from_slice(&[0xFF, 0xC0]);
        data.extend_from_slice(&length.to_be_bytes());
        data.extend_from_slice(&[8, 0, 1, 0, 1, ids.len() as u8]);

        for id in ids {
            data.extend_from_slice(&[*id, 0x11, 0]);
        }

        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        data
    }

    fn encoding(adobe_transform: Option<u8>, ids: &[u8]) -> Encoding {
        extract_jpeg_info(&header(adobe_transform, ids))
            .unwrap()
            .encoding(None)
    }

    #[test]
    fn sniff_encoding() {
        assert_eq!(encoding(None, &[1]), Encoding::Gray);
        assert_eq!(encoding(None, &[1, 2, 3]), Encoding::YCbCr);
        assert_eq!(encoding(None, b"RGB"), Encoding::Rgb);
        assert_eq!(encoding(Some(0), &[1, 2, 3]), Encoding::Rgb);
        assert_eq!(encoding(Some(1), &[1, 2, 3]), Encoding::YCbCr);
        assert_eq!(encoding(None, &[1, 2, 3, 4]), Encoding::Cmyk);
        assert_eq!(encoding(Some(0), &[1, 2, 3, 4]), Encoding::Cmyk);
        assert_eq!(encoding(Some(2), &[1, 2, 3, 4]), Encoding::Ycck);
    }

    #[test]
    fn color_transform_parameter() {
        let info = extract_jpeg_info(&header(None, &[1, 2, 3])).unwrap();

        assert_eq!(info.encoding(Some(0)), Encoding::Rgb);
        assert_eq!(info.encoding(Some(1)), Encoding::YCbCr);
    }

    #[test]
    fn not_a_jpeg() {
        assert!(extract_jpeg_info(b"GIF89a").is_none());
    }

    #[test]
    fn ycbcr() {
        assert_eq!(ycbcr_to_rgb(255, 128, 128), [255, 255, 255]);
        assert_eq!(ycbcr_to_rgb(0, 128, 128), [0, 0, 0]);
        assert_eq!(ycbcr_to_rgb(76, 85, 255), [254, 0, 0]);
    }

    #[test]
    fn ycck() {
        // White in YCC with inverted black of 255 is no ink at all.
        assert_eq!(ycck_to_cmyk(&[255, 128, 128, 255]), [0, 0, 0, 0]);
        assert_eq!(ycck_to_cmyk(&[0, 128, 128, 0])[3], 255);
    }
}
