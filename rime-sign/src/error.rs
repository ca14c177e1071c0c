//! Errors that can occur while parsing a signature.

use core::fmt;

/// An error in the DER encoding of a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerError {
    /// The data ended prematurely.
    UnexpectedEof,
    /// A length is malformed or exceeds the supported size.
    InvalidLength,
    /// An element has a different tag than expected.
    UnexpectedTag {
        /// The expected tag.
        expected: u8,
        /// The tag that was found.
        found: u8,
    },
    /// An integer is empty or too large.
    InvalidInteger,
    /// An object identifier is malformed.
    InvalidObjectIdentifier,
    /// A time value is malformed.
    InvalidTime,
    /// Elements are nested too deeply.
    TooDeep,
}

impl fmt::Display for DerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of data"),
            Self::InvalidLength => write!(f, "invalid length"),
            Self::UnexpectedTag { expected, found } => {
                write!(f, "expected tag {expected:#04x}, found {found:#04x}")
            }
            Self::InvalidInteger => write!(f, "invalid integer"),
            Self::InvalidObjectIdentifier => write!(f, "invalid object identifier"),
            Self::InvalidTime => write!(f, "invalid time"),
            Self::TooDeep => write!(f, "elements are nested too deeply"),
        }
    }
}

impl core::error::Error for DerError {}

/// An error that occurred while parsing a CMS signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// The DER encoding is invalid.
    Der(DerError),
    /// The structure does not have the expected shape.
    MalformedStructure(&'static str),
    /// A valid but unsupported variant was encountered.
    UnsupportedVariant(&'static str),
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Der(e) => write!(f, "invalid DER: {e}"),
            Self::MalformedStructure(d) => write!(f, "malformed signature: {d}"),
            Self::UnsupportedVariant(d) => write!(f, "unsupported signature: {d}"),
        }
    }
}

impl core::error::Error for SignatureError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Der(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DerError> for SignatureError {
    fn from(e: DerError) -> Self {
        Self::Der(e)
    }
}

impl From<SignatureError> for rime_syntax::Error {
    fn from(e: SignatureError) -> Self {
        match e {
            SignatureError::Der(_) => Self::MalformedStructure("invalid DER in signature"),
            SignatureError::MalformedStructure(d) => Self::MalformedStructure(d),
            SignatureError::UnsupportedVariant(d) => Self::UnsupportedVariant(d),
        }
    }
}

/// A result type for signature parsing.
pub type Result<T> = core::result::Result<T, SignatureError>;

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
    fn converts_into_taxonomy() {
        assert_eq!(
            rime_syntax::Error::from(SignatureError::UnsupportedVariant("x")),
            rime_syntax::Error::UnsupportedVariant("x")
        );
        assert_eq!(
            rime_syntax::Error::from(SignatureError::from(DerError::UnexpectedEof)),
            rime_syntax::Error::MalformedStructure("invalid DER in signature")
        );
    }

    #[test]
    fn display() {
        let e = SignatureError::Der(DerError::UnexpectedTag {
            expected: 0x30,
            found: 0x31,
        });

        assert_eq!(e.to_string(), "invalid DER: expected tag 0x30, found 0x31");
    }
}
