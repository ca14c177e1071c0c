//! Decoding of stream filters.
//!
//! Only the general-purpose filters are implemented here. The image filters
//! (`CCITTFaxDecode`, `DCTDecode`, `JBIG2Decode` and `JPXDecode`) are recognized
//! but decoding them is left to the image pipeline.

use crate::object::Dict;
use log::warn;

mod ascii_85;
mod ascii_hex;
mod flate;
mod run_length;

/// A PDF stream filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `ASCIIHexDecode`.
    AsciiHexDecode,
    /// `ASCII85Decode`.
    Ascii85Decode,
    /// `FlateDecode`.
    FlateDecode,
    /// `RunLengthDecode`.
    RunLengthDecode,
    /// `CCITTFaxDecode`.
    CcittFaxDecode,
    /// `DCTDecode`.
    DctDecode,
    /// `JBIG2Decode`.
    Jbig2Decode,
    /// `JPXDecode`.
    JpxDecode,
    /// `Crypt`.
    Crypt,
}

impl Filter {
    /// Look up a filter by its name or abbreviation.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"ASCIIHexDecode" | b"AHx" => Some(Self::AsciiHexDecode),
            b"ASCII85Decode" | b"A85" => Some(Self::Ascii85Decode),
            b"FlateDecode" | b"Fl" => Some(Self::FlateDecode),
            b"RunLengthDecode" | b"RL" => Some(Self::RunLengthDecode),
            b"CCITTFaxDecode" | b"CCF" => Some(Self::CcittFaxDecode),
            b"DCTDecode" | b"DCT" => Some(Self::DctDecode),
            b"JBIG2Decode" => Some(Self::Jbig2Decode),
            b"JPXDecode" => Some(Self::JpxDecode),
            b"Crypt" => Some(Self::Crypt),
            _ => None,
        }
    }

    /// Whether the filter is one of the image codecs.
    pub fn is_image_filter(&self) -> bool {
        matches!(
            self,
            Self::CcittFaxDecode | Self::DctDecode | Self::Jbig2Decode | Self::JpxDecode
        )
    }

    /// Apply a general-purpose filter to the data.
    ///
    /// Returns `None` for image filters and if decoding failed.
    pub fn apply(&self, data: &[u8], params: Option<&Dict>) -> Option<Vec<u8>> {
        match self {
            Self::AsciiHexDecode => ascii_hex::decode(data),
            Self::Ascii85Decode => ascii_85::decode(data),
            Self::FlateDecode => flate::decode(data, params),
            Self::RunLengthDecode => run_length::decode(data),
            // Decryption happens before filters are applied.
            Self::Crypt => Some(data.to_vec()),
            Self::CcittFaxDecode | Self::DctDecode | Self::Jbig2Decode | Self::JpxDecode => {
                warn!("{self:?} can only be decoded as part of an image");

                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations() {
        assert_eq!(Filter::from_name(b"CCF"), Some(Filter::CcittFaxDecode));
        assert_eq!(Filter::from_name(b"DCT"), Some(Filter::DctDecode));
        assert_eq!(Filter::from_name(b"Fl"), Some(Filter::FlateDecode));
        assert_eq!(Filter::from_name(b"LZW"), None);
    }

    #[test]
    fn image_filters_are_not_applied() {
        assert!(Filter::DctDecode.is_image_filter());
        assert_eq!(Filter::DctDecode.apply(b"\xFF\xD8", None), None);
        assert_eq!(
            Filter::AsciiHexDecode.apply(b"414243>", None).unwrap(),
            b"ABC"
        );
    }
}
