//! Message digests.

use crate::oid::{self, ObjectIdentifier};
use sha2::Digest;

/// A digest algorithm that signatures can be computed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// MD5.
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    /// The algorithm with the given identifier.
    ///
    /// Identifiers of RSA signature algorithms are accepted as well, since
    /// some signers use them in place of the digest algorithm.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match oid.arcs() {
            oid::MD5 | oid::MD5_WITH_RSA => Some(Self::Md5),
            oid::SHA1 | oid::SHA1_WITH_RSA => Some(Self::Sha1),
            oid::SHA256 | oid::SHA256_WITH_RSA => Some(Self::Sha256),
            oid::SHA384 | oid::SHA384_WITH_RSA => Some(Self::Sha384),
            oid::SHA512 | oid::SHA512_WITH_RSA => Some(Self::Sha512),
            _ => None,
        }
    }

    /// The name of the algorithm.
    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// The length of a digest in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Start an incremental digest.
    pub fn hasher(self) -> Hasher {
        let inner = match self {
            Self::Md5 => Inner::Md5(md5::Context::new()),
            Self::Sha1 => Inner::Sha1(sha1::Sha1::new()),
            Self::Sha256 => Inner::Sha256(sha2::Sha256::new()),
            Self::Sha384 => Inner::Sha384(sha2::Sha384::new()),
            Self::Sha512 => Inner::Sha512(sha2::Sha512::new()),
        };

        Hasher(inner)
    }

    /// The digest of `data`.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize()
    }
}

/// An incremental digest computation.
pub struct Hasher(Inner);

enum Inner {
    Md5(md5::Context),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
}

impl Hasher {
    /// Feed more data.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.0 {
            Inner::Md5(c) => c.consume(data),
            Inner::Sha1(h) => h.update(data),
            Inner::Sha256(h) => h.update(data),
            Inner::Sha384(h) => h.update(data),
            Inner::Sha512(h) => h.update(data),
        }
    }

    /// Finish the digest.
    pub fn finalize(self) -> Vec<u8> {
        match self.0 {
            Inner::Md5(c) => c.finalize().0.to_vec(),
            Inner::Sha1(h) => h.finalize().to_vec(),
            Inner::Sha256(h) => h.finalize().to_vec(),
            Inner::Sha384(h) => h.finalize().to_vec(),
            Inner::Sha512(h) => h.finalize().to_vec(),
        }
    }
}
