//! Decoding image XObjects into RGBA rasters.
//!
//! An image is described by an [`ImageDescriptor`], which is resolved once from
//! the image dictionary. Decoding runs the image filter (if any), converts the
//! samples to RGB and finally composites the soft mask, the stencil mask or the
//! color key mask into the alpha channel.

mod ccitt;
pub(crate) mod dct;
mod jbig2;
pub(crate) mod jpx;
mod mask;
mod raw;

pub use dct::ZuneJpegReader;
pub use mask::ColorKey;
#[cfg(feature = "jpx")]
pub use jpx::Jpeg2000Reader;

use crate::color::{ColorSpace, Rgb};
use crate::config::DecodeConfig;
use crate::resources::Resources;
use crate::util::FloatExt;
use log::warn;
use rime_syntax::XRef;
use rime_syntax::filter::Filter;
use rime_syntax::object::dict::keys::{
    BITS_PER_COMPONENT, COLOR_SPACE, DECODE, HEIGHT, IMAGE_MASK, MASK, SMASK, SMASK_IN_DATA, WIDTH,
};
use rime_syntax::object::{Array, Object, Stream};
use smallvec::SmallVec;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// The largest number of pixels an image may have.
const MAX_PIXELS: u64 = 1 << 30;

/// A decoded image with unpremultiplied 8-bit RGBA pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
    stencil_fill: Option<Rgb>,
}

impl Raster {
    /// The width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The interleaved RGBA samples, row by row.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The pixels, row by row.
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.data)
    }

    /// The pixel at the given position.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width {
            return None;
        }

        self.pixels()
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// For image masks, the fill color the mask was painted with.
    pub fn stencil_fill(&self) -> Option<Rgb> {
        self.stencil_fill
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stencil_fill", &self.stencil_fill)
            .finish_non_exhaustive()
    }
}

/// Maps a stored sample to a value in the colorant range, as given by one pair
/// of the decode array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeMap {
    /// The decoded value of sample 0.
    pub min: f32,
    /// The increase of the decoded value per sample step.
    pub step: f32,
}

impl DecodeMap {
    pub(crate) fn new((d_min, d_max): (f32, f32), bits_per_component: u8) -> Self {
        Self {
            min: d_min,
            step: (d_max - d_min) / max_value(bits_per_component),
        }
    }

    /// Decode a sample.
    #[inline]
    pub fn apply(&self, sample: u32) -> f32 {
        self.min + sample as f32 * self.step
    }

    /// The same mapping for samples with a different bit depth.
    pub(crate) fn rescale(&self, from: u8, to: u8) -> Self {
        Self {
            min: self.min,
            step: self.step * max_value(from) / max_value(to),
        }
    }

    /// Whether this maps `[0, max]` to `[0, 1]`.
    pub(crate) fn is_identity(&self, bits_per_component: u8) -> bool {
        self.min == 0.0 && (self.step * max_value(bits_per_component)).is_nearly_equal(1.0)
    }

    /// Whether this maps `[0, max]` to `[1, 0]`.
    pub(crate) fn is_inverted(&self, bits_per_component: u8) -> bool {
        self.min == 1.0 && (self.step * max_value(bits_per_component)).is_nearly_equal(-1.0)
    }
}

#[inline]
pub(crate) fn max_value(bits_per_component: u8) -> f32 {
    ((1_u32 << bits_per_component.min(16)) - 1) as f32
}

/// The explicit mask of an image.
#[derive(Debug, Clone)]
pub enum ExplicitMask {
    /// A stencil mask, given as a separate image mask.
    Stencil(Box<ImageDescriptor>),
    /// A color key mask. Pixels whose color lies in the range are transparent.
    ColorKey(ColorKey),
}

/// The resolved parameters of an image.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    /// The width in pixels.
    pub width: u32,
    /// The height in pixels.
    pub height: u32,
    /// The number of bits per stored sample.
    pub bits_per_component: u8,
    /// The color space of the samples.
    pub color_space: ColorSpace,
    /// The decode array, one entry per component.
    pub decode: SmallVec<[DecodeMap; 4]>,
    /// Whether the image is a stencil mask painted with the fill color.
    pub is_image_mask: bool,
    /// The explicit mask.
    pub mask: Option<ExplicitMask>,
    /// The soft mask, which supersedes the explicit mask.
    pub soft_mask: Option<Box<ImageDescriptor>>,
    /// Whether a JPX image provides its own soft mask.
    pub smask_in_data: bool,
    declares_color_space: bool,
    stream: Stream,
}

impl ImageDescriptor {
    /// Resolve the parameters and masks of an image XObject.
    ///
    /// `color_space` overrides the `/ColorSpace` entry of the dictionary.
    pub fn new(
        stream: &Stream,
        color_space: Option<ColorSpace>,
        resources: &Resources,
        config: &DecodeConfig,
    ) -> Option<Self> {
        let mut descriptor = Self::new_inner(stream, color_space, false, resources, config)?;
        let xref = resources.xref();
        let dict = stream.dict();

        descriptor.soft_mask = xref
            .get::<Stream>(dict, SMASK)
            .and_then(|s| Self::new_inner(&s, None, false, resources, config))
            .map(Box::new);

        if descriptor.soft_mask.is_none() {
            descriptor.mask = match dict.get_raw(MASK).and_then(|m| xref.resolve(m)) {
                Some(Object::Stream(s)) => Self::new_inner(&s, None, true, resources, config)
                    .map(|d| ExplicitMask::Stencil(Box::new(d))),
                Some(Object::Array(a)) => ColorKey::new(&a, &descriptor, config.black_ratio)
                    .map(ExplicitMask::ColorKey),
                _ => None,
            };
        }

        Some(descriptor)
    }

    fn new_inner(
        stream: &Stream,
        color_space: Option<ColorSpace>,
        force_image_mask: bool,
        resources: &Resources,
        config: &DecodeConfig,
    ) -> Option<Self> {
        let xref = resources.xref();
        let dict = stream.dict();

        let is_image_mask = force_image_mask || xref.get::<bool>(dict, IMAGE_MASK).unwrap_or(false);
        let image_filter = stream
            .filters(xref)
            .ok()?
            .into_iter()
            .map(|(f, _)| f)
            .find(Filter::is_image_filter);

        let declares_color_space = dict.contains_key(COLOR_SPACE);
        let color_space = if is_image_mask {
            ColorSpace::DeviceGray
        } else {
            color_space
                .or_else(|| {
                    dict.get_raw(COLOR_SPACE)
                        .and_then(|c| resources.resolve_color_space(c))
                })
                .unwrap_or(ColorSpace::DeviceGray)
        };

        let bits_per_component = match xref.get::<u8>(dict, BITS_PER_COMPONENT) {
            Some(bpc) => bpc,
            None if is_image_mask => 1,
            None => match image_filter {
                Some(Filter::CcittFaxDecode | Filter::Jbig2Decode) => 1,
                _ => 8,
            },
        };

        if !matches!(bits_per_component, 1 | 2 | 4 | 8 | 16) {
            warn!("unsupported bits per component {bits_per_component}");

            return None;
        }

        let (width, height) = dimensions(
            xref.get::<u32>(dict, WIDTH).unwrap_or(0),
            xref.get::<u32>(dict, HEIGHT).unwrap_or(0),
            config.page_ratio,
        )?;

        let num_components = color_space.num_components();
        let ranges = xref
            .get::<Array>(dict, DECODE)
            .map(|a| {
                a.iter_as::<f32>()
                    .collect::<Vec<_>>()
                    .chunks_exact(2)
                    .map(|c| (c[0], c[1]))
                    .collect::<SmallVec<[_; 4]>>()
            })
            .filter(|d| d.len() >= num_components)
            .unwrap_or_else(|| color_space.default_decode_array(bits_per_component));

        let decode = ranges
            .into_iter()
            .take(num_components)
            .map(|r| DecodeMap::new(r, bits_per_component))
            .collect();

        Some(Self {
            width,
            height,
            bits_per_component,
            color_space,
            decode,
            is_image_mask,
            mask: None,
            soft_mask: None,
            smask_in_data: xref.get::<u8>(dict, SMASK_IN_DATA).is_some_and(|s| s != 0),
            declares_color_space,
            stream: stream.clone(),
        })
    }

    pub(crate) fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The decode array for samples with the given bit depth.
    pub(crate) fn decode_maps(&self, bits_per_component: u8) -> SmallVec<[DecodeMap; 4]> {
        self.decode
            .iter()
            .map(|m| m.rescale(self.bits_per_component, bits_per_component))
            .collect()
    }

    /// Decode the image into a raster. Image masks are painted with `fill`.
    pub fn decode(&self, fill: Rgb, xref: &XRef, config: &DecodeConfig) -> Option<Raster> {
        let samples = self.decode_samples(xref, config)?;
        let pixels = self.num_pixels();

        if self.is_image_mask {
            let data = self
                .coverage(&samples)
                .into_iter()
                .flat_map(|c| {
                    if c == 255 {
                        [fill[0], fill[1], fill[2], 255]
                    } else {
                        [0; 4]
                    }
                })
                .collect();

            return Some(Raster {
                width: self.width,
                height: self.height,
                data,
                stencil_fill: Some(fill),
            });
        }

        let (rgb, embedded_alpha) = self.rgb(samples, config);
        let alpha = self.alpha(&rgb, embedded_alpha, xref, config);

        let mut data = Vec::with_capacity(pixels * 4);

        for (i, color) in rgb.chunks_exact(3).enumerate() {
            let a = alpha.as_ref().and_then(|a| a.get(i).copied()).unwrap_or(255);
            data.extend_from_slice(&[color[0], color[1], color[2], a]);
        }

        Some(Raster {
            width: self.width,
            height: self.height,
            data,
            stencil_fill: None,
        })
    }

    fn decode_samples(&self, xref: &XRef, config: &DecodeConfig) -> Option<Samples> {
        let decoded = self
            .stream
            .decode(xref)
            .inspect_err(|e| warn!("failed to decode image stream: {e}"))
            .ok()?;
        let data = decoded.data;

        let Some((filter, params)) = decoded.image_filter else {
            return Some(Samples::Packed {
                data,
                bits_per_component: self.bits_per_component,
            });
        };

        let samples = match filter {
            Filter::CcittFaxDecode => ccitt::decode(&data, params.as_ref(), self, xref, config)
                .map(|data| Samples::Packed {
                    data,
                    bits_per_component: 1,
                }),
            Filter::Jbig2Decode => jbig2::decode(&data, params.as_ref(), self, xref, config)
                .map(|data| Samples::Packed {
                    data,
                    bits_per_component: 1,
                }),
            Filter::DctDecode => dct::decode(&data, params.as_ref(), self, config)
                .map(|data| Samples::Rgb { data, alpha: None }),
            Filter::JpxDecode => {
                jpx::decode(&data, self, config).map(|(data, alpha)| Samples::Rgb { data, alpha })
            }
            _ => {
                warn!("{filter:?} is not an image filter");

                return None;
            }
        };

        samples.or_else(|| {
            warn!("failed to decode {filter:?} image, reading it as raw samples");

            Some(Samples::Packed {
                data,
                bits_per_component: self.bits_per_component,
            })
        })
    }

    fn rgb(&self, samples: Samples, config: &DecodeConfig) -> (Vec<u8>, Option<Vec<u8>>) {
        let len = self.num_pixels() * 3;

        match samples {
            Samples::Packed {
                data,
                bits_per_component,
            } => (
                raw::to_rgb(self, &data, bits_per_component, config.black_ratio),
                None,
            ),
            Samples::Rgb { data, alpha } => (fit(data, len, 0), alpha),
        }
    }

    /// The alpha channel, from the soft mask, the codec, the stencil mask or
    /// the color key, in that order.
    fn alpha(
        &self,
        rgb: &[u8],
        embedded: Option<Vec<u8>>,
        xref: &XRef,
        config: &DecodeConfig,
    ) -> Option<Vec<u8>> {
        if let Some(soft_mask) = &self.soft_mask {
            return soft_mask
                .luminance(xref, config)
                .map(|l| mask::resample(&l, soft_mask.width, soft_mask.height, self.width, self.height));
        }

        if self.smask_in_data
            && let Some(alpha) = embedded
        {
            return Some(fit(alpha, self.num_pixels(), 255));
        }

        match &self.mask {
            Some(ExplicitMask::Stencil(stencil)) => {
                let samples = stencil.decode_samples(xref, config)?;

                Some(mask::resample(
                    &stencil.coverage(&samples),
                    stencil.width,
                    stencil.height,
                    self.width,
                    self.height,
                ))
            }
            Some(ExplicitMask::ColorKey(key)) => Some(key.alpha(rgb)),
            None => None,
        }
    }

    /// The luminance of the image, used when it is a soft mask.
    fn luminance(&self, xref: &XRef, config: &DecodeConfig) -> Option<Vec<u8>> {
        let samples = self
            .decode_samples(xref, config)
            .or_else(|| {
                warn!("failed to decode soft mask");

                None
            })?;
        let (rgb, _) = self.rgb(samples, config);

        Some(rgb.chunks_exact(3).map(mask::luminance).collect())
    }

    /// Whether each pixel of a stencil mask is painted (255) or not (0).
    fn coverage(&self, samples: &Samples) -> Vec<u8> {
        let painted = |decoded: f32| if decoded < 0.5 { 255 } else { 0 };

        let coverage = match samples {
            Samples::Packed {
                data,
                bits_per_component,
            } => {
                let map = self
                    .decode_maps(*bits_per_component)
                    .first()
                    .copied()
                    .unwrap_or(DecodeMap::new((0.0, 1.0), *bits_per_component));

                raw::samples(data, self.width, self.height, 1, *bits_per_component)
                    .into_iter()
                    .map(|s| painted(map.apply(s as u32)))
                    .collect()
            }
            Samples::Rgb { data, .. } => {
                let map = self.decode_maps(1).first().copied().unwrap_or(DecodeMap {
                    min: 0.0,
                    step: 1.0,
                });

                data.chunks_exact(3)
                    .map(|c| painted(map.apply(u32::from(c[0] >= 128))))
                    .collect()
            }
        };

        fit(coverage, self.num_pixels(), 0)
    }
}

/// The decoded samples of an image, before masks are applied.
enum Samples {
    /// Samples packed as described by the color space, unconverted.
    Packed {
        data: Vec<u8>,
        bits_per_component: u8,
    },
    /// RGB8 as produced by a codec, with an optional alpha channel.
    Rgb {
        data: Vec<u8>,
        alpha: Option<Vec<u8>>,
    },
}

/// Fill in a missing dimension from the other one using the page ratio.
fn dimensions(width: u32, height: u32, page_ratio: f32) -> Option<(u32, u32)> {
    let (width, height) = match (width, height) {
        (0, 0) => {
            warn!("image has neither width nor height");

            return None;
        }
        (w, 0) => (w, (w as f32 / page_ratio).round() as u32),
        (0, h) => ((page_ratio * h as f32).round() as u32, h),
        (w, h) => (w, h),
    };

    if width == 0 || height == 0 || width as u64 * height as u64 > MAX_PIXELS {
        warn!("unsupported image dimensions {width}x{height}");

        return None;
    }

    Some((width, height))
}

/// Truncate or pad a buffer to the given length.
pub(crate) fn fit(mut data: Vec<u8>, len: usize, filler: u8) -> Vec<u8> {
    data.resize(len, filler);
    data
}

/// An image XObject, decoded on demand.
///
/// The decoded raster is cached until [`ImageStream::discard`] is called.
pub struct ImageStream {
    stream: Stream,
    config: Arc<DecodeConfig>,
    color_space: OnceLock<ColorSpace>,
    cache: Mutex<Option<Arc<Raster>>>,
}

impl ImageStream {
    /// Create a new image from its stream.
    pub fn new(stream: Stream, config: Arc<DecodeConfig>) -> Self {
        Self {
            stream,
            config,
            color_space: OnceLock::new(),
            cache: Mutex::new(None),
        }
    }

    /// The image stream.
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    fn declared_dimensions(&self) -> Option<(u32, u32)> {
        let dict = self.stream.dict();

        dimensions(
            dict.get::<u32>(WIDTH).unwrap_or(0),
            dict.get::<u32>(HEIGHT).unwrap_or(0),
            self.config.page_ratio,
        )
    }

    /// The width in pixels, or 0 if the image is invalid.
    pub fn width(&self) -> u32 {
        self.declared_dimensions().map_or(0, |d| d.0)
    }

    /// The height in pixels, or 0 if the image is invalid.
    pub fn height(&self) -> u32 {
        self.declared_dimensions().map_or(0, |d| d.1)
    }

    /// Whether the image is a stencil mask.
    pub fn is_image_mask(&self) -> bool {
        self.stream.dict().get::<bool>(IMAGE_MASK).unwrap_or(false)
    }

    /// The color space of the image, resolved on first use.
    pub fn color_space(&self, resources: &Resources) -> &ColorSpace {
        self.color_space.get_or_init(|| {
            self.stream
                .dict()
                .get_raw(COLOR_SPACE)
                .and_then(|c| resources.resolve_color_space(c))
                .unwrap_or(ColorSpace::DeviceGray)
        })
    }

    /// Resolve the parameters of the image.
    pub fn descriptor(&self, resources: &Resources) -> Option<ImageDescriptor> {
        let color_space = self.color_space(resources).clone();

        ImageDescriptor::new(&self.stream, Some(color_space), resources, &self.config)
    }

    /// The decoded image. Image masks are painted with `fill`.
    pub fn image(&self, fill: Rgb, resources: &Resources) -> Option<Arc<Raster>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(raster) = cache.as_ref()
            && raster.stencil_fill.is_none_or(|f| f == fill)
        {
            return Some(raster.clone());
        }

        let raster = self
            .descriptor(resources)?
            .decode(fill, resources.xref(), &self.config)
            .map(Arc::new)
            .or_else(|| {
                warn!("failed to decode image");

                None
            })?;

        *cache = Some(raster.clone());

        Some(raster)
    }

    /// Drop the cached raster. It is decoded again on next use.
    pub fn discard(&self) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl fmt::Debug for ImageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageStream")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rime_syntax::object::Dict;
    use rime_syntax::parse_object;

    fn image(dict: &[u8], data: &[u8]) -> ImageStream {
        let dict = parse_object(dict).unwrap().cast::<Dict>().unwrap();

        ImageStream::new(Stream::new(dict, data.to_vec()), Arc::default())
    }

    fn resources() -> Resources {
        Resources::new(&Dict::new(), Arc::new(XRef::new()))
    }

    #[test]
    fn gray_8_bit() {
        let image = image(
            b"<< /Width 2 /Height 1 /ColorSpace /DeviceGray /BitsPerComponent 8 >>",
            &[0x00, 0x80],
        );
        let raster = image.image([0, 0, 0], &resources()).unwrap();

        assert_eq!(raster.pixels(), &[[0, 0, 0, 255], [128, 128, 128, 255]]);
    }

    #[test]
    fn image_mask_uses_fill() {
        let image = image(b"<< /Width 4 /Height 1 /ImageMask true >>", &[0b0101_0000]);
        let raster = image.image([255, 0, 0], &resources()).unwrap();

        assert_eq!(
            raster.pixels(),
            &[[255, 0, 0, 255], [0, 0, 0, 0], [255, 0, 0, 255], [0, 0, 0, 0]]
        );
        assert_eq!(raster.stencil_fill(), Some([255, 0, 0]));

        // A different fill color is not served from the cache.
        let raster = image.image([0, 0, 255], &resources()).unwrap();
        assert_eq!(raster.pixel(0, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn inverted_image_mask() {
        let image = image(
            b"<< /Width 2 /Height 1 /ImageMask true /Decode [1 0] >>",
            &[0b1000_0000],
        );
        let raster = image.image([0, 0, 0], &resources()).unwrap();

        assert_eq!(raster.pixels(), &[[0, 0, 0, 255], [0, 0, 0, 0]]);
    }

    #[test]
    fn cache_and_discard() {
        let image = image(b"<< /Width 1 /Height 1 /ColorSpace /DeviceRGB >>", &[1, 2, 3]);
        let first = image.image([0, 0, 0], &resources()).unwrap();
        let second = image.image([0, 0, 0], &resources()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));

        image.discard();
        let third = image.image([0, 0, 0], &resources()).unwrap();

        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first, third);
    }

    #[test]
    fn missing_dimension_uses_page_ratio() {
        assert_eq!(dimensions(826, 0, 8.26 / 11.68), Some((826, 1168)));
        assert_eq!(dimensions(0, 1168, 8.26 / 11.68), Some((826, 1168)));
        assert_eq!(dimensions(0, 0, 1.0), None);
        assert_eq!(dimensions(1 << 16, 1 << 16, 1.0), None);

        let image = image(b"<< /Width 826 /Height 0 >>", &[]);
        assert_eq!(image.height(), 1168);
    }

    #[test]
    fn decode_map() {
        let map = DecodeMap::new((0.0, 1.0), 8);
        assert_eq!(map.min, 0.0);
        assert_eq!(map.step, 1.0 / 255.0);
        assert!(map.is_identity(8));

        let inverted = DecodeMap::new((1.0, 0.0), 1);
        assert!(inverted.is_inverted(1));
        assert_eq!(inverted.apply(1), 0.0);
        assert_eq!(inverted.rescale(1, 8).apply(255), 0.0);
    }

    #[test]
    fn color_space_is_resolved_once() {
        let image = image(b"<< /Width 1 /Height 1 /ColorSpace /DeviceCMYK >>", &[0; 4]);

        assert!(matches!(image.color_space(&resources()), ColorSpace::DeviceCmyk));
        assert!(std::ptr::eq(
            image.color_space(&resources()),
            image.color_space(&resources())
        ));
    }

    #[test]
    fn soft_mask_supersedes_mask() {
        let mut xref = XRef::new();
        let smask = parse_object(b"<< /Width 2 /Height 1 /ColorSpace /DeviceGray /BitsPerComponent 8 >>")
            .unwrap()
            .cast::<Dict>()
            .unwrap();
        xref.insert(
            rime_syntax::object::ObjRef::new(2, 0),
            Stream::new(smask, vec![0xFF, 0x40]),
        );
        let resources = Resources::new(&Dict::new(), Arc::new(xref));

        let dict = parse_object(
            b"<< /Width 2 /Height 1 /ColorSpace /DeviceGray /BitsPerComponent 8
                 /SMask 2 0 R /Mask [0 255] >>",
        )
        .unwrap()
        .cast::<Dict>()
        .unwrap();
        let image = ImageStream::new(Stream::new(dict, vec![10, 20]), Arc::default());
        let descriptor = image.descriptor(&resources).unwrap();

        assert!(descriptor.soft_mask.is_some());
        assert!(descriptor.mask.is_none());

        let raster = image.image([0, 0, 0], &resources).unwrap();
        assert_eq!(raster.pixels(), &[[10, 10, 10, 255], [20, 20, 20, 64]]);
    }
}
