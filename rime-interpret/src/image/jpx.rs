//! `JPXDecode` images.

use crate::color::{ColorSpace, cmyk8_to_rgb};
use crate::config::{DecodeConfig, JPEG2000, RawRaster};
use crate::image::{ImageDescriptor, fit, max_value};
use log::warn;

#[cfg(feature = "jpx")]
pub use reader::Jpeg2000Reader;

#[cfg(feature = "jpx")]
mod reader {
    use crate::config::{RasterReader, RawRaster};
    use hayro_jpeg2000::bitmap::ChannelData;
    use hayro_jpeg2000::{ColourSpecificationMethod, DecodeSettings, EnumeratedColourspace};
    use log::warn;
    use rime_syntax::{Error, Result};

    /// Reads JPEG 2000 data with `hayro-jpeg2000`.
    ///
    /// Palettes are not resolved, so images with an `Indexed` color space get
    /// their indices. Channels are scaled to 8 bits.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Jpeg2000Reader;

    impl RasterReader for Jpeg2000Reader {
        fn read(&self, data: &[u8]) -> Result<RawRaster> {
            let settings = DecodeSettings {
                resolve_palette_indices: false,
            };

            let mut bitmap = hayro_jpeg2000::read(data, &settings).map_err(|e| {
                warn!("failed to decode JPEG 2000 image: {e:?}");

                Error::CodecFailure("invalid JPEG 2000 data")
            })?;

            let width = bitmap.metadata.width;
            let height = bitmap.metadata.height;
            let is_sycc = matches!(
                bitmap
                    .metadata
                    .colour_specification
                    .as_ref()
                    .map(|spec| &spec.method),
                Some(ColourSpecificationMethod::Enumerated(
                    EnumeratedColourspace::Sycc
                ))
            );

            let channels = &mut bitmap.channels;
            let alpha = channels
                .iter()
                .position(|c| c.is_alpha)
                .map(|i| to_8bit(&channels.remove(i)));

            if channels.is_empty() || channels.len() > 4 {
                return Err(Error::UnsupportedVariant("JPEG 2000 channel count"));
            }

            if is_sycc && let [y, cb, cr] = channels.as_mut_slice() {
                sycc_to_rgb(y, cb, cr);
            }

            let channels = channels.iter().map(to_8bit).collect::<Vec<_>>();
            let pixels = width as usize * height as usize;
            let mut data = Vec::with_capacity(pixels * channels.len());

            for i in 0..pixels {
                for channel in &channels {
                    data.push(channel.get(i).copied().unwrap_or(0));
                }
            }

            Ok(RawRaster {
                width,
                height,
                components: channels.len() as u8,
                data,
                alpha: alpha.map(|mut a| {
                    a.resize(pixels, 255);
                    a
                }),
            })
        }
    }

    fn to_8bit(channel: &ChannelData) -> Vec<u8> {
        let max = ((1_u32 << channel.bit_depth.min(31)) - 1) as f32;

        channel
            .container
            .iter()
            .map(|v| {
                if channel.bit_depth == 8 {
                    v.round().clamp(0.0, 255.0) as u8
                } else {
                    (v / max * 255.0).round().clamp(0.0, 255.0) as u8
                }
            })
            .collect()
    }

    fn sycc_to_rgb(y: &mut ChannelData, cb: &mut ChannelData, cr: &mut ChannelData) {
        let bit_depth = y.bit_depth.clamp(1, 31);
        let offset = (1_u32 << (bit_depth as u32 - 1)) as f32;
        let max_value = ((1_u32 << bit_depth as u32) - 1) as f32;

        for ((y, cb), cr) in y
            .container
            .iter_mut()
            .zip(cb.container.iter_mut())
            .zip(cr.container.iter_mut())
        {
            *cb -= offset;
            *cr -= offset;

            let r = *y + 1.402_f32 * *cr;
            let g = *y - 0.344136_f32 * *cb - 0.714136_f32 * *cr;
            let b = *y + 1.772_f32 * *cb;

            *y = r.min(max_value).max(0.0);
            *cb = g.min(max_value).max(0.0);
            *cr = b.min(max_value).max(0.0);
        }

        cb.bit_depth = bit_depth;
        cr.bit_depth = bit_depth;
    }
}

/// Decode a JPEG 2000 image to interleaved RGB, together with its alpha
/// channel.
pub(crate) fn decode(
    data: &[u8],
    image: &ImageDescriptor,
    config: &DecodeConfig,
) -> Option<(Vec<u8>, Option<Vec<u8>>)> {
    let Some(reader) = config.reader(JPEG2000) else {
        warn!("no JPEG 2000 reader is registered, enable the `jpx` feature");

        return None;
    };

    let raster = reader
        .read(data)
        .inspect_err(|e| warn!("failed to read JPEG 2000 image: {e}"))
        .ok()?;

    if !raster.is_consistent() {
        warn!("JPEG 2000 reader returned an inconsistent raster");

        return None;
    }

    let pixels = image.num_pixels();
    let rgb = convert(&raster, image, config.black_ratio);
    let alpha = raster.alpha.map(|a| fit(a, pixels, 255));

    Some((fit(rgb, pixels * 3, 0), alpha))
}

fn convert(raster: &RawRaster, image: &ImageDescriptor, black_ratio: f32) -> Vec<u8> {
    let pixels = raster.width as usize * raster.height as usize;
    let components = raster.components as usize;
    let mut out = vec![0; pixels * 3];
    let data = &raster.data;

    if !image.declares_color_space {
        by_layout(data, components, &mut out, black_ratio);

        return out;
    }

    let cs = &image.color_space;

    let converted = match cs {
        ColorSpace::DeviceGray if components == 1 => {
            for (v, rgb) in data.iter().zip(out.chunks_exact_mut(3)) {
                rgb.fill(*v);
            }

            Some(())
        }
        ColorSpace::DeviceCmyk if components == 4 => {
            for (cmyk, rgb) in data.chunks_exact(4).zip(out.chunks_exact_mut(3)) {
                rgb.copy_from_slice(&cmyk8_to_rgb([cmyk[0], cmyk[1], cmyk[2], cmyk[3]], black_ratio));
            }

            Some(())
        }
        ColorSpace::Separation(_) if components == 1 && cs.is_named_color() => {
            for (v, rgb) in data.iter().zip(out.chunks_exact_mut(3)) {
                rgb.fill(*v);
            }

            Some(())
        }
        ColorSpace::Indexed(_) if components == 1 => {
            let bpc = image.bits_per_component;

            for (v, rgb) in data.iter().zip(out.chunks_exact_mut(3)) {
                let index = if bpc >= 8 {
                    *v as f32
                } else {
                    (*v as f32 * max_value(bpc) / 255.0).round()
                };

                rgb.copy_from_slice(&cs.to_rgb_with(&[index], black_ratio));
            }

            Some(())
        }
        // DeviceRGB, ICC profiles and everything else with a matching layout.
        // ICC profiles convert through their alternate if the transform fails.
        _ if cs.num_components() == components => cs.convert_u8(data, &mut out, black_ratio),
        _ => None,
    };

    if converted.is_none() {
        warn!("failed to convert JPEG 2000 image with its color space, using its own layout");

        by_layout(data, components, &mut out, black_ratio);
    }

    out
}

/// Convert according to the number of channels of the raster.
fn by_layout(data: &[u8], components: usize, out: &mut [u8], black_ratio: f32) {
    match components {
        1 => {
            for (v, rgb) in data.iter().zip(out.chunks_exact_mut(3)) {
                rgb.fill(*v);
            }
        }
        3 => out.copy_from_slice(&data[..out.len()]),
        4 => {
            for (cmyk, rgb) in data.chunks_exact(4).zip(out.chunks_exact_mut(3)) {
                rgb.copy_from_slice(&cmyk8_to_rgb([cmyk[0], cmyk[1], cmyk[2], cmyk[3]], black_ratio));
            }
        }
        n => {
            // Use the first channel as gray.
            for (v, rgb) in data.chunks_exact(n.max(1)).zip(out.chunks_exact_mut(3)) {
                rgb.fill(v[0]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RasterReader;
    use crate::resources::Resources;
    use rime_syntax::object::{Dict, Stream};
    use rime_syntax::{XRef, parse_object};
    use std::sync::Arc;

    struct Fixed(RawRaster);

    impl RasterReader for Fixed {
        fn read(&self, _: &[u8]) -> rime_syntax::Result<RawRaster> {
            Ok(self.0.clone())
        }
    }

    fn decode_with(dict: &[u8], raster: RawRaster) -> Option<(Vec<u8>, Option<Vec<u8>>)> {
        let mut config = DecodeConfig::default();
        config.register_reader(JPEG2000, Fixed(raster));

        let dict = parse_object(dict).unwrap().cast::<Dict>().unwrap();
        let stream = Stream::new(dict, b"jp2".to_vec());
        let resources = Resources::new(&Dict::new(), Arc::new(XRef::new()));
        let image = ImageDescriptor::new(&stream, None, &resources, &config).unwrap();

        decode(b"jp2", &image, &config)
    }

    #[test]
    fn layout_without_color_space() {
        let raster = RawRaster {
            width: 2,
            height: 1,
            components: 4,
            data: vec![0, 0, 0, 0, 0, 0, 0, 255],
            alpha: Some(vec![255, 0]),
        };
        let (rgb, alpha) = decode_with(b"<< /Width 2 /Height 1 /Filter /JPXDecode >>", raster).unwrap();

        assert_eq!(rgb, [255, 255, 255, 0, 0, 0]);
        assert_eq!(alpha, Some(vec![255, 0]));
    }

    #[test]
    fn indexed() {
        let raster = RawRaster {
            width: 2,
            height: 1,
            components: 1,
            data: vec![1, 0],
            alpha: None,
        };
        let (rgb, _) = decode_with(
            b"<< /Width 2 /Height 1 /ColorSpace [/Indexed /DeviceRGB 1 <FF000000FF00>]
                 /BitsPerComponent 8 /Filter /JPXDecode >>",
            raster,
        )
        .unwrap();

        assert_eq!(rgb, [0, 255, 0, 255, 0, 0]);
    }

    #[test]
    fn mismatching_color_space_uses_layout() {
        let raster = RawRaster {
            width: 1,
            height: 1,
            components: 3,
            data: vec![1, 2, 3],
            alpha: None,
        };
        let (rgb, _) = decode_with(
            b"<< /Width 1 /Height 1 /ColorSpace /DeviceGray /Filter /JPXDecode >>",
            raster,
        )
        .unwrap();

        assert_eq!(rgb, [1, 2, 3]);
    }

    #[test]
    fn missing_reader_fails() {
        let mut config = DecodeConfig::default();
        config.remove_reader(JPEG2000);

        let dict = parse_object(b"<< /Width 1 /Height 1 /Filter /JPXDecode >>")
            .unwrap()
            .cast::<Dict>()
            .unwrap();
        let stream = Stream::new(dict, b"jp2".to_vec());
        let resources = Resources::new(&Dict::new(), Arc::new(XRef::new()));
        let image = ImageDescriptor::new(&stream, None, &resources, &config).unwrap();

        assert!(decode(b"jp2", &image, &config).is_none());
    }
}
