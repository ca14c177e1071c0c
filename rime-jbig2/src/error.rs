//! Errors that can occur while decoding a JBIG2 image.

use core::fmt;

/// An error that occurred while decoding a JBIG2 image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The data ended prematurely.
    UnexpectedEof,
    /// The file header is invalid.
    InvalidHeader,
    /// A segment has a reserved type or a malformed header.
    InvalidSegment,
    /// A segment refers to a segment that doesn't precede it.
    InvalidReference,
    /// A region segment appeared before the page information segment.
    MissingPageInfo,
    /// A region has invalid parameters.
    InvalidRegion,
    /// An adaptive template pixel points at an undecoded pixel.
    InvalidTemplatePixel,
    /// A region of unknown length has no end marker.
    MissingEndMarker,
    /// The page or a region exceeds the supported size.
    Overflow,
    /// An MMR coded region failed to decode.
    Mmr(rime_ccitt::DecodeError),
    /// The image uses a segment type that isn't supported.
    Unsupported,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of data"),
            Self::InvalidHeader => write!(f, "invalid file header"),
            Self::InvalidSegment => write!(f, "invalid segment header"),
            Self::InvalidReference => write!(f, "invalid segment reference"),
            Self::MissingPageInfo => write!(f, "missing page information"),
            Self::InvalidRegion => write!(f, "invalid region parameters"),
            Self::InvalidTemplatePixel => write!(f, "invalid adaptive template pixel"),
            Self::MissingEndMarker => write!(f, "missing end marker for region of unknown length"),
            Self::Overflow => write!(f, "image is too large"),
            Self::Mmr(e) => write!(f, "MMR decoding failed: {e}"),
            Self::Unsupported => write!(f, "unsupported segment type"),
        }
    }
}

impl core::error::Error for DecodeError {}

impl From<rime_ccitt::DecodeError> for DecodeError {
    fn from(e: rime_ccitt::DecodeError) -> Self {
        Self::Mmr(e)
    }
}

/// A result type for JBIG2 decoding.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

pub(crate) use bail;
