//! Object identifiers.

use crate::error::DerError;
use core::fmt;

// PKCS #7 content types
pub(crate) const DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
pub(crate) const SIGNED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 2];
pub(crate) const ENVELOPED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 3];
pub(crate) const DIGESTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 5];
pub(crate) const ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];
pub(crate) const TST_INFO: &[u64] = &[1, 2, 840, 113549, 1, 9, 16, 1, 4];

// Attributes
pub(crate) const MESSAGE_DIGEST: &[u64] = &[1, 2, 840, 113549, 1, 9, 4];
pub(crate) const SIGNING_TIME: &[u64] = &[1, 2, 840, 113549, 1, 9, 5];
pub(crate) const TIMESTAMP_TOKEN: &[u64] = &[1, 2, 840, 113549, 1, 9, 16, 2, 14];
pub(crate) const COMMON_NAME: &[u64] = &[2, 5, 4, 3];

// Digests
pub(crate) const MD5: &[u64] = &[1, 2, 840, 113549, 2, 5];
pub(crate) const SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
pub(crate) const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
pub(crate) const SHA384: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 2];
pub(crate) const SHA512: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 3];

// Signature algorithms, which some signers put where a digest belongs.
pub(crate) const RSA_ENCRYPTION: &[u64] = &[1, 2, 840, 113549, 1, 1, 1];
pub(crate) const MD5_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 4];
pub(crate) const SHA1_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 5];
pub(crate) const SHA256_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 11];
pub(crate) const SHA384_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 12];
pub(crate) const SHA512_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 13];
pub(crate) const ECDSA_WITH_SHA256: &[u64] = &[1, 2, 840, 10045, 4, 3, 2];
pub(crate) const ECDSA_WITH_SHA384: &[u64] = &[1, 2, 840, 10045, 4, 3, 3];
pub(crate) const ECDSA_WITH_SHA512: &[u64] = &[1, 2, 840, 10045, 4, 3, 4];

/// An ASN.1 object identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    arcs: Vec<u64>,
}

impl ObjectIdentifier {
    /// Create an identifier from its arcs.
    pub fn new(arcs: &[u64]) -> Self {
        Self {
            arcs: arcs.to_vec(),
        }
    }

    /// Decode the contents octets of an encoded identifier.
    pub fn from_der(contents: &[u8]) -> Result<Self, DerError> {
        let mut arcs = Vec::with_capacity(contents.len() + 1);
        let mut value: u64 = 0;
        let mut pending = false;

        for b in contents {
            // An arc may not start with a padding byte.
            if !pending && *b == 0x80 {
                return Err(DerError::InvalidObjectIdentifier);
            }

            value = value
                .checked_mul(128)
                .ok_or(DerError::InvalidObjectIdentifier)?
                | u64::from(b & 0x7F);
            pending = b & 0x80 != 0;

            if !pending {
                if arcs.is_empty() {
                    let first = (value / 40).min(2);
                    arcs.push(first);
                    arcs.push(value - first * 40);
                } else {
                    arcs.push(value);
                }

                value = 0;
            }
        }

        if pending || arcs.is_empty() {
            return Err(DerError::InvalidObjectIdentifier);
        }

        Ok(Self { arcs })
    }

    /// The arcs.
    pub fn arcs(&self) -> &[u64] {
        &self.arcs
    }

    /// Whether the identifier has the given arcs.
    pub fn is(&self, arcs: &[u64]) -> bool {
        self.arcs == arcs
    }

    /// A readable name for well-known identifiers.
    pub fn name(&self) -> Option<&'static str> {
        let name = match self.arcs.as_slice() {
            DATA => "data",
            SIGNED_DATA => "signedData",
            ENVELOPED_DATA => "envelopedData",
            DIGESTED_DATA => "digestedData",
            ENCRYPTED_DATA => "encryptedData",
            TST_INFO => "tstInfo",
            MESSAGE_DIGEST => "messageDigest",
            SIGNING_TIME => "signingTime",
            TIMESTAMP_TOKEN => "timeStampToken",
            COMMON_NAME => "commonName",
            MD5 => "md5",
            SHA1 => "sha1",
            SHA256 => "sha256",
            SHA384 => "sha384",
            SHA512 => "sha512",
            RSA_ENCRYPTION => "rsaEncryption",
            MD5_WITH_RSA => "md5WithRSAEncryption",
            SHA1_WITH_RSA => "sha1WithRSAEncryption",
            SHA256_WITH_RSA => "sha256WithRSAEncryption",
            SHA384_WITH_RSA => "sha384WithRSAEncryption",
            SHA512_WITH_RSA => "sha512WithRSAEncryption",
            ECDSA_WITH_SHA256 => "ecdsa-with-SHA256",
            ECDSA_WITH_SHA384 => "ecdsa-with-SHA384",
            ECDSA_WITH_SHA512 => "ecdsa-with-SHA512",
            _ => return None,
        };

        Some(name)
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.arcs.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }

            write!(f, "{arc}")?;
        }

        Ok(())
    }
}

impl fmt::Debug for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{self} ({name})"),
            None => write!(f, "{self}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_data() {
        let oid = ObjectIdentifier::from_der(&[
            0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02,
        ])
        .unwrap();

        assert!(oid.is(SIGNED_DATA));
        assert_eq!(oid.to_string(), "1.2.840.113549.1.7.2");
        assert_eq!(oid.name(), Some("signedData"));
    }

    #[test]
    fn joint_iso_itu() {
        let oid = ObjectIdentifier::from_der(&[
            0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
        ])
        .unwrap();

        assert_eq!(oid, ObjectIdentifier::new(SHA256));
    }

    #[test]
    fn malformed() {
        assert!(ObjectIdentifier::from_der(&[]).is_err());
        assert!(ObjectIdentifier::from_der(&[0x2A, 0x86]).is_err());
        assert!(ObjectIdentifier::from_der(&[0x2A, 0x80, 0x01]).is_err());
    }
}
