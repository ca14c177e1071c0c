//! The error taxonomy shared by all rime crates.

use core::fmt;

/// An error that occurred while reading or decoding part of a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An object, name tree or ASN.1 structure did not have the expected shape.
    MalformedStructure(&'static str),
    /// A valid but unsupported variant was encountered.
    UnsupportedVariant(&'static str),
    /// An image decoder failed.
    CodecFailure(&'static str),
    /// No security provider or algorithm is available to decrypt the document.
    SecurityUnavailable(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedStructure(d) => write!(f, "malformed structure: {d}"),
            Self::UnsupportedVariant(d) => write!(f, "unsupported variant: {d}"),
            Self::CodecFailure(d) => write!(f, "codec failure: {d}"),
            Self::SecurityUnavailable(d) => write!(f, "security unavailable: {d}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<rime_ccitt::DecodeError> for Error {
    fn from(_: rime_ccitt::DecodeError) -> Self {
        Self::CodecFailure("invalid CCITT data")
    }
}

impl From<rime_jbig2::DecodeError> for Error {
    fn from(e: rime_jbig2::DecodeError) -> Self {
        match e {
            rime_jbig2::DecodeError::Unsupported => {
                Self::UnsupportedVariant("JBIG2 segment type")
            }
            _ => Self::CodecFailure("invalid JBIG2 data"),
        }
    }
}

/// Result type used throughout rime.
pub type Result<T> = core::result::Result<T, Error>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

pub(crate) use bail;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let e = Error::SecurityUnavailable("no provider");
        assert_eq!(e.to_string(), "security unavailable: no provider");
    }

    #[test]
    fn bail_converts() {
        fn inner() -> Result<()> {
            bail!(Error::CodecFailure("x"));
        }

        assert_eq!(inner(), Err(Error::CodecFailure("x")));
    }

    #[test]
    fn codec_errors() {
        assert_eq!(
            Error::from(rime_jbig2::DecodeError::Unsupported),
            Error::UnsupportedVariant("JBIG2 segment type")
        );
        assert_eq!(
            Error::from(rime_ccitt::DecodeError::InvalidCode),
            Error::CodecFailure("invalid CCITT data")
        );
    }
}
