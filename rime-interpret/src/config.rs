//! Configuration of the image decoders.

use rime_syntax::Result;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// The format name of the reader used for `DCTDecode` images.
pub const JPEG: &str = "JPEG";
/// The format name of the reader used for `JPXDecode` images.
pub const JPEG2000: &str = "JPEG2000";

/// The default ratio between the width and the height of a page, used to
/// guess a missing image dimension.
pub const DEFAULT_PAGE_RATIO: f32 = 8.26 / 11.68;

/// A raster as produced by a [`RasterReader`], before any color conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRaster {
    /// The width in pixels.
    pub width: u32,
    /// The height in pixels.
    pub height: u32,
    /// The number of interleaved color channels per pixel.
    pub components: u8,
    /// The 8-bit samples, interleaved, row by row without padding.
    pub data: Vec<u8>,
    /// A separate 8-bit alpha channel, if the codec produced one.
    pub alpha: Option<Vec<u8>>,
}

impl RawRaster {
    /// Whether the length of the sample buffer matches the dimensions.
    pub fn is_consistent(&self) -> bool {
        let pixels = self.width as usize * self.height as usize;

        self.data.len() == pixels * self.components as usize
            && self.alpha.as_ref().is_none_or(|a| a.len() == pixels)
    }
}

/// A codec that reads encoded image data into a [`RawRaster`].
///
/// Readers must not apply any color transform of their own, except for
/// transforms that are internal to the codec (like the multiple component
/// transform of JPEG 2000).
pub trait RasterReader: Send + Sync {
    /// Read the encoded data.
    fn read(&self, data: &[u8]) -> Result<RawRaster>;
}

/// Which decoder to use for JBIG2 images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Jbig2Backend {
    /// Use `hayro-jbig2` if the `jbig2` feature is enabled, and fall back to
    /// the internal decoder if it is not or if it fails.
    #[default]
    Preferred,
    /// Always use the internal decoder.
    Internal,
}

/// Configuration for decoding images.
///
/// The defaults are:
///
/// - `black_ratio`: 1.0
/// - `force_alternate_ccitt`: false
/// - `page_ratio`: 8.26 / 11.68
/// - `jbig2_backend`: [`Jbig2Backend::Preferred`]
/// - readers: `zune-jpeg` for [`JPEG`], and `hayro-jpeg2000` for [`JPEG2000`]
///   if the `jpx` feature is enabled.
#[derive(Clone)]
pub struct DecodeConfig {
    /// The factor applied to the black component of CMYK colors that are not
    /// pure black.
    pub black_ratio: f32,
    /// Try the alternate CCITT decoder before the internal one.
    pub force_alternate_ccitt: bool,
    /// The width to height ratio used to guess a missing image dimension.
    pub page_ratio: f32,
    /// The JBIG2 decoder to use.
    pub jbig2_backend: Jbig2Backend,
    readers: FxHashMap<&'static str, Arc<dyn RasterReader>>,
}

impl DecodeConfig {
    /// Register a reader for the given format name, replacing any previous one.
    pub fn register_reader(&mut self, format: &'static str, reader: impl RasterReader + 'static) {
        self.readers.insert(format, Arc::new(reader));
    }

    /// Remove the reader for the given format name.
    pub fn remove_reader(&mut self, format: &str) {
        self.readers.remove(format);
    }

    /// The reader registered for the given format name.
    pub fn reader(&self, format: &str) -> Option<&dyn RasterReader> {
        self.readers.get(format).map(|r| r.as_ref())
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        let mut config = Self {
            black_ratio: 1.0,
            force_alternate_ccitt: false,
            page_ratio: DEFAULT_PAGE_RATIO,
            jbig2_backend: Jbig2Backend::Preferred,
            readers: FxHashMap::default(),
        };

        config.register_reader(JPEG, crate::image::dct::ZuneJpegReader);
        #[cfg(feature = "jpx")]
        config.register_reader(JPEG2000, crate::image::jpx::Jpeg2000Reader);

        config
    }
}

impl fmt::Debug for DecodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats = self.readers.keys().collect::<Vec<_>>();
        formats.sort();

        f.debug_struct("DecodeConfig")
            .field("black_ratio", &self.black_ratio)
            .field("force_alternate_ccitt", &self.force_alternate_ccitt)
            .field("page_ratio", &self.page_ratio)
            .field("jbig2_backend", &self.jbig2_backend)
            .field("readers", &formats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rime_syntax::Error;

    struct Failing;

    impl RasterReader for Failing {
        fn read(&self, _: &[u8]) -> Result<RawRaster> {
            Err(Error::CodecFailure("always fails"))
        }
    }

    #[test]
    fn defaults() {
        let config = DecodeConfig::default();

        assert_eq!(config.black_ratio, 1.0);
        assert!(!config.force_alternate_ccitt);
        assert_eq!(config.page_ratio, 8.26 / 11.68);
        assert_eq!(config.jbig2_backend, Jbig2Backend::Preferred);
        assert!(config.reader(JPEG).is_some());
    }

    #[test]
    fn replace_reader() {
        let mut config = DecodeConfig::default();
        config.register_reader(JPEG, Failing);

        assert!(config.reader(JPEG).unwrap().read(&[]).is_err());

        config.remove_reader(JPEG);
        assert!(config.reader(JPEG).is_none());
    }

    #[test]
    fn raster_consistency() {
        let mut raster = RawRaster {
            width: 2,
            height: 1,
            components: 3,
            data: vec![0; 6],
            alpha: None,
        };
        assert!(raster.is_consistent());

        raster.alpha = Some(vec![0; 3]);
        assert!(!raster.is_consistent());
    }
}
