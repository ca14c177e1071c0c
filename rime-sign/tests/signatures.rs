use rime_sign::{
    ByteRange, Certificate, DigestAlgorithm, ObjectIdentifier, SignatureDictionary,
    SignatureError, SignatureValidator, SignatureVerifier, SignedData, TrustStore,
};
use rime_syntax::object::Dict;
use rime_syntax::{XRef, parse_indirect};
use std::ops::Range;

const SIGNED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 2];
const ENVELOPED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 3];
const DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
const MESSAGE_DIGEST: &[u64] = &[1, 2, 840, 113549, 1, 9, 4];
const SIGNING_TIME: &[u64] = &[1, 2, 840, 113549, 1, 9, 5];
const COMMON_NAME: &[u64] = &[2, 5, 4, 3];
const SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 1];

const PLACEHOLDER: usize = 1024;

fn tlv(tag: u8, parts: &[&[u8]]) -> Vec<u8> {
    let contents = parts.concat();
    let mut out = vec![tag];

    match contents.len() {
        len @ 0..=0x7F => out.push(len as u8),
        len @ 0x80..=0xFF => out.extend([0x81, len as u8]),
        len => out.extend([0x82, (len >> 8) as u8, len as u8]),
    }

    out.extend(contents);
    out
}

fn oid(arcs: &[u64]) -> Vec<u8> {
    let mut contents = vec![(arcs[0] * 40 + arcs[1]) as u8];

    for arc in &arcs[2..] {
        let mut groups = vec![(*arc & 0x7F) as u8];
        let mut rest = *arc >> 7;

        while rest > 0 {
            groups.push((rest & 0x7F) as u8 | 0x80);
            rest >>= 7;
        }

        contents.extend(groups.into_iter().rev());
    }

    tlv(0x06, &[&contents])
}

fn algorithm(arcs: &[u64]) -> Vec<u8> {
    tlv(0x30, &[&oid(arcs), &[0x05, 0x00]])
}

fn name(common_name: &str) -> Vec<u8> {
    let attribute = tlv(
        0x30,
        &[&oid(COMMON_NAME), &tlv(0x13, &[common_name.as_bytes()])],
    );

    tlv(0x30, &[&tlv(0x31, &[&attribute])])
}

fn attribute(arcs: &[u64], value: &[u8]) -> Vec<u8> {
    tlv(0x30, &[&oid(arcs), &tlv(0x31, &[value])])
}

fn certificate(issuer: &str, subject: &str, serial: u8) -> Vec<u8> {
    let tbs = tlv(
        0x30,
        &[
            &tlv(0xA0, &[&[0x02, 0x01, 0x02]]),
            &tlv(0x02, &[&[serial]]),
            &algorithm(RSA),
            &name(issuer),
            &tlv(
                0x30,
                &[
                    &tlv(0x17, &[b"200101000000Z"]),
                    &tlv(0x17, &[b"300101000000Z"]),
                ],
            ),
            &name(subject),
            &tlv(
                0x30,
                &[&algorithm(RSA), &tlv(0x03, &[&[0x00, 0x30, 0x00]])],
            ),
        ],
    );

    tlv(0x30, &[&tbs, &algorithm(RSA), &tlv(0x03, &[&[0x00]])])
}

/// Signs by digesting, which is what [`DigestVerifier`] checks.
struct Signer {
    digest: &'static [u64],
    version: u8,
    serial: u8,
    signed_attributes: bool,
    signing_time: &'static [u8],
    content_type: &'static [u64],
    encapsulated: Option<Vec<u8>>,
}

impl Default for Signer {
    fn default() -> Self {
        Self {
            digest: SHA256,
            version: 1,
            serial: 7,
            signed_attributes: true,
            signing_time: b"240615120000Z",
            content_type: SIGNED_DATA,
            encapsulated: None,
        }
    }
}

impl Signer {
    fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::from_oid(&ObjectIdentifier::new(self.digest)).unwrap()
    }

    fn sign(&self, covered: &[u8]) -> Vec<u8> {
        let digest = self.algorithm();
        let document_digest = digest.digest(covered);

        let (signed, signature) = if self.signed_attributes {
            let message_digest = match &self.encapsulated {
                Some(content) => digest.digest(content),
                None => document_digest,
            };
            let attributes = [
                attribute(SIGNING_TIME, &tlv(0x17, &[self.signing_time])),
                attribute(MESSAGE_DIGEST, &tlv(0x04, &[&message_digest])),
            ]
            .concat();
            let signature = digest.digest(&tlv(0x31, &[&attributes]));

            (tlv(0xA0, &[&attributes]), signature)
        } else {
            let signature = match &self.encapsulated {
                Some(content) => digest.digest(content),
                None => document_digest,
            };

            (vec![], signature)
        };

        let sid = match self.version {
            3 => tlv(0x80, &[&[0x01, 0x02]]),
            _ => tlv(0x30, &[&name("Test CA"), &tlv(0x02, &[&[7]])]),
        };
        let signer_info = tlv(
            0x30,
            &[
                &tlv(0x02, &[&[self.version]]),
                &sid,
                &algorithm(self.digest),
                &signed,
                &algorithm(RSA),
                &tlv(0x04, &[&signature]),
            ],
        );
        let encapsulated = match &self.encapsulated {
            Some(content) => tlv(0x30, &[&oid(DATA), &tlv(0xA0, &[&tlv(0x04, &[content])])]),
            None => tlv(0x30, &[&oid(DATA)]),
        };
        let signed_data = tlv(
            0x30,
            &[
                &tlv(0x02, &[&[1]]),
                &tlv(0x31, &[&algorithm(self.digest)]),
                &encapsulated,
                &tlv(
                    0xA0,
                    &[
                        &certificate("Test Root", "Test CA", 1),
                        &certificate("Test CA", "Jane Doe", self.serial),
                    ],
                ),
                &tlv(0x31, &[&signer_info]),
            ],
        );

        tlv(0x30, &[&oid(self.content_type), &tlv(0xA0, &[&signed_data])])
    }
}

struct DigestVerifier;

impl SignatureVerifier for DigestVerifier {
    fn verify(
        &self,
        _: &Certificate,
        digest: DigestAlgorithm,
        _: &ObjectIdentifier,
        message: &[u8],
        signature: &[u8],
    ) -> bool {
        digest.digest(message) == signature
    }
}

struct TrustedIssuer(&'static str);

impl TrustStore for TrustedIssuer {
    fn is_trusted(&self, certificate: &Certificate, chain: &[Certificate]) -> bool {
        certificate.issuer_common_name().as_deref() == Some(self.0) && chain.len() == 2
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// A signed document together with the position of the hex digits in its
/// placeholder.
struct Document {
    data: Vec<u8>,
    range: ByteRange,
    placeholder: Range<usize>,
}

/// Build a document with a signature dictionary and sign it.
fn signed_document(signer: &Signer) -> Document {
    let head = b"%PDF-1.7\n1 0 obj\n<< /Type /Sig /Filter /Adobe.PPKLite \
        /SubFilter /adbe.pkcs7.detached /Reason (Testing) /Contents "
        .to_vec();
    let contents_len = PLACEHOLDER * 2 + 2;
    let tail_start = head.len() + contents_len;

    // The byte range is padded so that its length does not depend on the values.
    let tail_len = " /ByteRange [0 0000000000 0000000000 0000000000] >>\nendobj\n%%EOF\n".len();
    let byte_range = format!(
        " /ByteRange [0 {:<10} {:<10} {:<10}] >>\nendobj\n%%EOF\n",
        head.len(),
        tail_start,
        tail_len
    );
    assert_eq!(byte_range.len(), tail_len);

    let range = ByteRange::new(0, head.len(), tail_start, tail_len);
    let covered = [head.as_slice(), byte_range.as_bytes()].concat();

    let signature = hex(&signer.sign(&covered));
    let contents = format!("<{signature:0<width$}>", width = PLACEHOLDER * 2);

    Document {
        data: [head.as_slice(), contents.as_bytes(), byte_range.as_bytes()].concat(),
        range,
        placeholder: head.len() + 1..tail_start - 1,
    }
}

fn signature_dictionary(document: &Document) -> SignatureDictionary {
    let (_, object) = parse_indirect(&document.data).unwrap();

    SignatureDictionary::from_dict(&object.cast::<Dict>().unwrap(), &XRef::new()).unwrap()
}

#[test]
fn unmodified_document() {
    let document = signed_document(&Signer::default());
    let dictionary = signature_dictionary(&document);

    assert_eq!(dictionary.byte_range(), document.range);
    assert_eq!(dictionary.reason(), Some("Testing"));
    assert_eq!(dictionary.contents().len(), PLACEHOLDER);

    let signed_data = dictionary.signed_data().unwrap();
    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .validate_document(&document.data, &dictionary.byte_range());

    assert!(!result.is_document_modified());
    assert!(result.is_signature_verified());
    assert!(result.is_signer_time_valid());
    assert!(!result.is_certificate_trusted());
    assert!(!result.is_valid());
    assert_eq!(
        result.signing_time().map(|t| t.to_string()).as_deref(),
        Some("2024-06-15T12:00:00Z")
    );
    assert_eq!(
        signed_data.signer_certificate().subject_common_name().as_deref(),
        Some("Jane Doe")
    );
}

#[test]
fn trusted_signer() {
    let document = signed_document(&Signer::default());
    let signed_data = signature_dictionary(&document).signed_data().unwrap();

    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .with_trust_store(&TrustedIssuer("Test CA"))
        .validate_document(&document.data, &document.range);
    assert!(result.is_certificate_trusted());
    assert!(result.is_valid());

    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .with_trust_store(&TrustedIssuer("Someone Else"))
        .validate_document(&document.data, &document.range);
    assert!(!result.is_certificate_trusted());
    assert!(!result.is_valid());
}

#[test]
fn modified_covered_byte() {
    let document = signed_document(&Signer::default());
    let signed_data = signature_dictionary(&document).signed_data().unwrap();

    for position in [0, 20, document.data.len() - 2] {
        let mut data = document.data.clone();
        data[position] ^= 0x01;

        let result = SignatureValidator::new(&signed_data, &DigestVerifier)
            .validate_document(&data, &document.range);

        assert!(result.is_document_modified(), "byte {position}");
        assert!(!result.is_valid());
    }
}

#[test]
fn modified_placeholder_byte() {
    let document = signed_document(&Signer::default());
    let signed_data = signature_dictionary(&document).signed_data().unwrap();

    let mut data = document.data.clone();
    // The signature is shorter than the placeholder, so this is padding.
    data[document.placeholder.end - 1] = b'F';

    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .validate_document(&data, &document.range);
    assert!(!result.is_document_modified());

    let mutated = Document {
        data,
        range: document.range,
        placeholder: document.placeholder.clone(),
    };
    let reparsed = signature_dictionary(&mutated).signed_data().unwrap();
    let result = SignatureValidator::new(&reparsed, &DigestVerifier)
        .validate_document(&mutated.data, &mutated.range);
    assert!(!result.is_document_modified());
}

#[test]
fn encapsulated_digest() {
    // adbe.pkcs7.sha1 stores the digest of the document as content.
    // The covered bytes do not depend on the signature.
    let unsigned = signed_document(&Signer::default());
    let covered = unsigned.range.covered(&unsigned.data).unwrap().concat();
    let signer = Signer {
        digest: SHA1,
        encapsulated: Some(DigestAlgorithm::Sha1.digest(&covered)),
        ..Signer::default()
    };
    let document = signed_document(&signer);
    let signed_data = signature_dictionary(&document).signed_data().unwrap();

    assert_eq!(signed_data.encapsulated_content().map(<[u8]>::len), Some(20));

    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .validate_document(&document.data, &document.range);
    assert!(!result.is_document_modified());

    let mut data = document.data.clone();
    data[3] ^= 0x01;
    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .validate_document(&data, &document.range);
    assert!(result.is_document_modified());
}

#[test]
fn without_signed_attributes() {
    let signer = Signer {
        signed_attributes: false,
        ..Signer::default()
    };
    let document = signed_document(&signer);
    let signed_data = signature_dictionary(&document).signed_data().unwrap();

    assert_eq!(signed_data.signer_info().signed_attributes(), None);

    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .validate_document(&document.data, &document.range);
    assert!(!result.is_document_modified());
    assert!(result.is_signature_verified());
    assert_eq!(result.signing_time(), None);
    assert!(!result.is_signer_time_valid());

    let mut data = document.data.clone();
    data[10] ^= 0x01;
    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .validate_document(&data, &document.range);
    assert!(result.is_document_modified());
    assert!(!result.is_signature_verified());
}

#[test]
fn encapsulated_without_signed_attributes() {
    let unsigned = signed_document(&Signer::default());
    let covered = unsigned.range.covered(&unsigned.data).unwrap().concat();
    let signer = Signer {
        digest: SHA1,
        signed_attributes: false,
        encapsulated: Some(DigestAlgorithm::Sha1.digest(&covered)),
        ..Signer::default()
    };
    let document = signed_document(&signer);
    let signed_data = signature_dictionary(&document).signed_data().unwrap();

    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .validate_document(&document.data, &document.range);
    assert!(!result.is_document_modified());
    assert!(result.is_signature_verified());

    // The signature covers the content, which no longer matches the document.
    let mut data = document.data.clone();
    data[3] ^= 0x01;
    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .validate_document(&data, &document.range);
    assert!(result.is_document_modified());
    assert!(result.is_signature_verified());
}

#[test]
fn signing_time_outside_validity() {
    let signer = Signer {
        signing_time: b"350101000000Z",
        ..Signer::default()
    };
    let document = signed_document(&signer);
    let signed_data = signature_dictionary(&document).signed_data().unwrap();

    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .with_trust_store(&TrustedIssuer("Test CA"))
        .validate_document(&document.data, &document.range);

    assert!(!result.is_document_modified());
    assert!(!result.is_signer_time_valid());
    assert!(!result.is_valid());
}

#[test]
fn byte_range_outside_document() {
    let document = signed_document(&Signer::default());
    let signed_data = signature_dictionary(&document).signed_data().unwrap();
    let range = ByteRange::new(0, 10, document.data.len(), 1);

    let result = SignatureValidator::new(&signed_data, &DigestVerifier)
        .validate_document(&document.data, &range);

    assert!(result.is_document_modified());
}

#[test]
fn subject_key_identifier_is_unsupported() {
    let signer = Signer {
        version: 3,
        ..Signer::default()
    };

    assert!(matches!(
        SignedData::parse(&signer.sign(b"document")),
        Err(SignatureError::UnsupportedVariant(_))
    ));
}

#[test]
fn enveloped_data_is_unsupported() {
    let signer = Signer {
        content_type: ENVELOPED_DATA,
        ..Signer::default()
    };

    assert!(matches!(
        SignedData::parse(&signer.sign(b"document")),
        Err(SignatureError::UnsupportedVariant(_))
    ));
}

#[test]
fn missing_signer_certificate() {
    let signer = Signer {
        serial: 8,
        ..Signer::default()
    };

    assert!(matches!(
        SignedData::parse(&signer.sign(b"document")),
        Err(SignatureError::MalformedStructure(_))
    ));
}

#[test]
fn truncated_signature() {
    let signature = Signer::default().sign(b"document");

    for len in [0, 1, 2, signature.len() / 3, signature.len() - 1] {
        assert!(
            matches!(
                SignedData::parse(&signature[..len]),
                Err(SignatureError::Der(_))
            ),
            "length {len}"
        );
    }
}

#[test]
fn errors_convert_to_syntax_errors() {
    let error = SignedData::parse(&[0x30]).unwrap_err();

    assert_eq!(
        rime_syntax::Error::from(error),
        rime_syntax::Error::MalformedStructure("invalid DER in signature")
    );
}
