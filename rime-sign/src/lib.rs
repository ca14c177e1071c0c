/*!
Parsing CMS signatures of signed PDF documents and checking whether the signed
bytes were modified.

A signature field stores a [`SignatureDictionary`] whose `/Contents` holds a
DER encoded CMS `SignedData` structure. [`SignedData::parse`] reads that
structure, and [`SignatureValidator`] digests the bytes covered by the
`/ByteRange` and compares them with what the signer signed.

Checking the signature value itself needs public-key cryptography, which is
not part of this crate. It is delegated to a [`SignatureVerifier`]. Whether
the signer is trusted is decided by an optional [`TrustStore`].

# Example
```
use rime_sign::{ByteRange, Certificate, DigestAlgorithm, ObjectIdentifier};
use rime_sign::{SignatureValidator, SignatureVerifier, SignedData};

struct Verifier;

impl SignatureVerifier for Verifier {
    fn verify(
        &self,
        _: &Certificate,
        _: DigestAlgorithm,
        _: &ObjectIdentifier,
        _: &[u8],
        _: &[u8],
    ) -> bool {
        true
    }
}

fn check(signature: &[u8], document: &[u8], range: ByteRange) -> bool {
    let Ok(signed_data) = SignedData::parse(signature) else {
        return false;
    };

    let result =
        SignatureValidator::new(&signed_data, &Verifier).validate_document(document, &range);

    !result.is_document_modified()
}

assert!(!check(&[0x30, 0x00], b"document", ByteRange::new(0, 8, 8, 0)));
```
*/

#![forbid(unsafe_code)]

mod cert;
mod cms;
mod der;
mod dictionary;
mod digest;
mod error;
mod oid;
mod time;
mod validator;

pub use cert::Certificate;
pub use cms::{SignedData, SignerInfo, TimestampToken};
pub use der::{Children, Element};
pub use dictionary::SignatureDictionary;
pub use digest::{DigestAlgorithm, Hasher};
pub use error::{DerError, Result, SignatureError};
pub use oid::ObjectIdentifier;
pub use time::DateTime;
pub use validator::{
    ByteRange, SignatureValidator, SignatureVerifier, TrustStore, ValidationResult,
};
