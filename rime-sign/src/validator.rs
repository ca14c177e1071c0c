//! Checking whether a signed document was modified.

use crate::cert::Certificate;
use crate::cms::SignedData;
use crate::digest::DigestAlgorithm;
use crate::oid::ObjectIdentifier;
use crate::time::DateTime;
use log::{debug, warn};
use rime_syntax::XRef;
use rime_syntax::object::{Array, Object};

/// Verifies a signature value with the public key of a certificate.
///
/// Public-key cryptography is not part of this crate, so callers provide it.
pub trait SignatureVerifier {
    /// Whether `signature` is a valid signature of `message` by the owner of
    /// `certificate`.
    fn verify(
        &self,
        certificate: &Certificate,
        digest: DigestAlgorithm,
        signature_algorithm: &ObjectIdentifier,
        message: &[u8],
        signature: &[u8],
    ) -> bool;
}

/// Decides whether a signer certificate is trusted.
pub trait TrustStore {
    /// Whether `certificate` is trusted. `chain` contains all certificates
    /// shipped with the signature.
    fn is_trusted(&self, certificate: &Certificate, chain: &[Certificate]) -> bool;
}

/// The two parts of a file covered by a signature, as given by `/ByteRange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    first: (usize, usize),
    second: (usize, usize),
}

impl ByteRange {
    /// Create a new byte range from offsets and lengths.
    pub fn new(offset1: usize, len1: usize, offset2: usize, len2: usize) -> Self {
        Self {
            first: (offset1, len1),
            second: (offset2, len2),
        }
    }

    /// Read a `/ByteRange` array.
    pub fn from_object(object: &Object, xref: &XRef) -> Option<Self> {
        let array = xref.resolve_as::<Array>(object)?;

        if array.len() != 4 {
            warn!("byte range has {} entries instead of 4", array.len());

            return None;
        }

        let value = |i| xref.get_item::<usize>(&array, i);

        Some(Self::new(value(0)?, value(1)?, value(2)?, value(3)?))
    }

    /// The parts of `document` covered by the range, or `None` if the range
    /// exceeds the document.
    pub fn covered<'a>(&self, document: &'a [u8]) -> Option<[&'a [u8]; 2]> {
        let part = |(offset, len): (usize, usize)| document.get(offset..offset.checked_add(len)?);

        Some([part(self.first)?, part(self.second)?])
    }
}

/// The outcome of validating a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationResult {
    document_modified: bool,
    signature_verified: bool,
    certificate_trusted: bool,
    signer_time_valid: bool,
    signing_time: Option<DateTime>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            document_modified: true,
            signature_verified: false,
            certificate_trusted: false,
            signer_time_valid: false,
            signing_time: None,
        }
    }
}

impl ValidationResult {
    /// Whether the signed bytes differ from what was signed. This is `true`
    /// when the check could not be performed.
    pub fn is_document_modified(&self) -> bool {
        self.document_modified
    }

    /// Whether the signature value is valid.
    pub fn is_signature_verified(&self) -> bool {
        self.signature_verified
    }

    /// Whether the signer certificate is trusted.
    pub fn is_certificate_trusted(&self) -> bool {
        self.certificate_trusted
    }

    /// Whether the signing time lies within the validity of the signer
    /// certificate.
    pub fn is_signer_time_valid(&self) -> bool {
        self.signer_time_valid
    }

    /// Whether all checks passed.
    pub fn is_valid(&self) -> bool {
        !self.document_modified
            && self.signature_verified
            && self.certificate_trusted
            && self.signer_time_valid
    }

    /// The signing time claimed by the signer.
    pub fn signing_time(&self) -> Option<DateTime> {
        self.signing_time
    }
}

/// Validates a parsed signature against the document it belongs to.
pub struct SignatureValidator<'a> {
    signed_data: &'a SignedData,
    verifier: &'a dyn SignatureVerifier,
    trust_store: Option<&'a dyn TrustStore>,
}

impl<'a> SignatureValidator<'a> {
    /// Create a new validator. Without a trust store, the signer is not
    /// trusted.
    pub fn new(signed_data: &'a SignedData, verifier: &'a dyn SignatureVerifier) -> Self {
        Self {
            signed_data,
            verifier,
            trust_store: None,
        }
    }

    /// Use a trust store for the signer certificate.
    pub fn with_trust_store(mut self, trust_store: &'a dyn TrustStore) -> Self {
        self.trust_store = Some(trust_store);
        self
    }

    /// Validate the signature over the bytes of `document` covered by `range`.
    pub fn validate_document(&self, document: &[u8], range: &ByteRange) -> ValidationResult {
        let signer = self.signed_data.signer_info();
        let certificate = self.signed_data.signer_certificate();
        let mut result = ValidationResult {
            signing_time: signer.signing_time(),
            ..ValidationResult::default()
        };

        result.certificate_trusted = self
            .trust_store
            .is_some_and(|store| store.is_trusted(certificate, self.signed_data.certificates()));
        result.signer_time_valid = result
            .signing_time
            .is_some_and(|time| certificate.is_valid_at(&time));

        let Some(digest) = signer.digest_algorithm() else {
            warn!(
                "unsupported digest algorithm {:?}",
                signer.digest_algorithm_oid()
            );

            return result;
        };

        let Some(covered) = range.covered(document) else {
            warn!("byte range exceeds the document");

            return result;
        };

        let mut hasher = digest.hasher();

        for part in covered {
            hasher.update(part);
        }

        let document_digest = hasher.finalize();
        let content = self.signed_data.encapsulated_content();

        let verify = |message: &[u8]| {
            self.verifier.verify(
                certificate,
                digest,
                signer.signature_algorithm(),
                message,
                signer.signature(),
            )
        };

        let (digest_matches, verified) = match (signer.signed_attributes(), signer.message_digest())
        {
            (Some(attributes), Some(message_digest)) => {
                let encapsulated = content.is_some_and(|c| digest.digest(c) == message_digest);
                let document = document_digest == message_digest;

                debug!("message digest matches content: {encapsulated}, document: {document}");

                (encapsulated || document, verify(attributes))
            }
            // Without signed attributes the signer signs the content itself.
            _ => match content {
                Some(content) => (true, verify(content)),
                None => (true, verify(&covered.concat())),
            },
        };

        let content_matches = content.is_none_or(|c| c == document_digest);

        result.signature_verified = verified;
        result.document_modified = !(digest_matches && verified && content_matches);

        result
    }
}
