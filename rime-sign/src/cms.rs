//! CMS `SignedData` structures, as stored in the `/Contents` of a signature.
//!
//! The structure is read at fixed positions, following RFC 5652.

use crate::cert::{self, Certificate};
use crate::der::{self, Element};
use crate::digest::DigestAlgorithm;
use crate::error::{Result, SignatureError, bail};
use crate::oid::{self, ObjectIdentifier};
use crate::time::DateTime;
use log::{debug, warn};

/// A parsed `SignedData` structure with its first signer.
#[derive(Debug, Clone)]
pub struct SignedData {
    digest_algorithms: Vec<ObjectIdentifier>,
    encapsulated_content: Option<Vec<u8>>,
    certificates: Vec<Certificate>,
    signer: SignerInfo,
    signer_certificate: usize,
}

impl SignedData {
    /// Parse a DER encoded `ContentInfo` holding a `SignedData`.
    ///
    /// Trailing bytes after the structure are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let content_info = Element::parse(data)?.expect(der::SEQUENCE)?.child_vec()?;

        let [content_type, content, ..] = content_info.as_slice() else {
            bail!(SignatureError::MalformedStructure(
                "content info is missing fields"
            ));
        };

        let content_type = content_type.object_identifier()?;

        match content_type.arcs() {
            oid::SIGNED_DATA => {}
            oid::DATA | oid::ENVELOPED_DATA | oid::DIGESTED_DATA | oid::ENCRYPTED_DATA => {
                warn!("signature has content type {content_type:?}");

                bail!(SignatureError::UnsupportedVariant(
                    "content type other than signed data"
                ));
            }
            _ => bail!(SignatureError::MalformedStructure("unknown content type")),
        }

        Self::parse_signed_data(&content.explicit(0)?)
    }

    fn parse_signed_data(signed_data: &Element<'_>) -> Result<Self> {
        let fields = signed_data.expect(der::SEQUENCE)?.child_vec()?;

        let [version, digest_algorithms, encapsulated, rest @ ..] = fields.as_slice() else {
            bail!(SignatureError::MalformedStructure(
                "signed data is missing fields"
            ));
        };

        debug!("signed data version {}", version.small_integer()?);

        let digest_algorithms = digest_algorithms
            .expect(der::SET)?
            .children()
            .map(|a| algorithm_identifier(&a?))
            .collect::<Result<Vec<_>>>()?;

        let encapsulated = encapsulated.expect(der::SEQUENCE)?.child_vec()?;
        let encapsulated_content = match encapsulated.as_slice() {
            [_, content, ..] => Some(content.explicit(0)?.octets()?),
            _ => None,
        };

        let Some((signer_infos, optional)) = rest.split_last() else {
            bail!(SignatureError::MalformedStructure("missing signer infos"));
        };

        let mut certificates = Vec::new();

        for element in optional {
            match element.tag() {
                t if t == der::context(0) => certificates.extend(cert::parse_set(element)),
                t if t == der::context(1) => debug!("ignoring revocation information"),
                _ => bail!(SignatureError::MalformedStructure(
                    "unexpected element in signed data"
                )),
            }
        }

        let signer = signer_infos
            .expect(der::SET)?
            .children()
            .next()
            .ok_or(SignatureError::MalformedStructure("no signer info"))??;
        let signer = SignerInfo::parse(&signer)?;

        let signer_certificate = certificates
            .iter()
            .position(|c| c.is_identified_by(&signer.issuer, &signer.serial_number))
            .ok_or(SignatureError::MalformedStructure(
                "no certificate matches the signer",
            ))?;

        Ok(Self {
            digest_algorithms,
            encapsulated_content,
            certificates,
            signer,
            signer_certificate,
        })
    }

    /// The digest algorithms announced for the whole structure.
    pub fn digest_algorithms(&self) -> &[ObjectIdentifier] {
        &self.digest_algorithms
    }

    /// The encapsulated content, if any.
    pub fn encapsulated_content(&self) -> Option<&[u8]> {
        self.encapsulated_content.as_deref()
    }

    /// All certificates embedded in the structure.
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// The certificate of the signer.
    pub fn signer_certificate(&self) -> &Certificate {
        &self.certificates[self.signer_certificate]
    }

    /// The first signer.
    pub fn signer_info(&self) -> &SignerInfo {
        &self.signer
    }
}

/// The information about a single signer.
#[derive(Debug, Clone)]
pub struct SignerInfo {
    issuer: Vec<u8>,
    serial_number: Vec<u8>,
    digest_algorithm: ObjectIdentifier,
    signed_attributes: Option<Vec<u8>>,
    message_digest: Option<Vec<u8>>,
    signing_time: Option<DateTime>,
    signature_algorithm: ObjectIdentifier,
    signature: Vec<u8>,
    timestamp_token: Option<TimestampToken>,
}

impl SignerInfo {
    fn parse(signer: &Element<'_>) -> Result<Self> {
        let fields = signer.expect(der::SEQUENCE)?.child_vec()?;

        let [version, sid, digest_algorithm, rest @ ..] = fields.as_slice() else {
            bail!(SignatureError::MalformedStructure(
                "signer info is missing fields"
            ));
        };

        let (issuer, serial_number) = match version.small_integer()? {
            1 => {
                let sid = sid.expect(der::SEQUENCE)?.child_vec()?;

                let [issuer, serial, ..] = sid.as_slice() else {
                    bail!(SignatureError::MalformedStructure(
                        "invalid issuer and serial number"
                    ));
                };

                (
                    issuer.expect(der::SEQUENCE)?.raw().to_vec(),
                    serial.integer()?.to_vec(),
                )
            }
            3 => bail!(SignatureError::UnsupportedVariant(
                "signer identified by subject key identifier"
            )),
            _ => bail!(SignatureError::UnsupportedVariant("signer info version")),
        };

        let digest_algorithm = algorithm_identifier(digest_algorithm)?;

        let (signed, rest) = match rest {
            [first, rest @ ..] if first.tag() == der::context(0) => (Some(first), rest),
            _ => (None, rest),
        };

        let [signature_algorithm, signature, rest @ ..] = rest else {
            bail!(SignatureError::MalformedStructure(
                "signer info is missing the signature"
            ));
        };

        let signature_algorithm = algorithm_identifier(signature_algorithm)?;
        let signature = signature.octets()?;

        let mut signed_attributes = None;
        let mut message_digest = None;
        let mut signing_time = None;

        if let Some(signed) = signed {
            // The signature is computed over the attributes with a SET tag,
            // not the implicit tag they are stored with.
            let mut raw = signed.raw().to_vec();
            raw[0] = der::SET;
            signed_attributes = Some(raw);

            for (kind, value) in attributes(signed)? {
                match kind.arcs() {
                    oid::MESSAGE_DIGEST => message_digest = Some(value.octets()?),
                    oid::SIGNING_TIME => match value.time() {
                        Ok(time) => signing_time = Some(time),
                        Err(e) => warn!("failed to read signing time: {e}"),
                    },
                    _ => {}
                }
            }

            if message_digest.is_none() {
                bail!(SignatureError::MalformedStructure(
                    "signed attributes lack a message digest"
                ));
            }
        }

        let timestamp_token = match rest.first() {
            Some(unsigned) if unsigned.tag() == der::context(1) => timestamp_token(unsigned),
            _ => None,
        };

        Ok(Self {
            issuer,
            serial_number,
            digest_algorithm,
            signed_attributes,
            message_digest,
            signing_time,
            signature_algorithm,
            signature,
            timestamp_token,
        })
    }

    /// The DER encoding of the issuer of the signer certificate.
    pub fn issuer(&self) -> &[u8] {
        &self.issuer
    }

    /// The serial number of the signer certificate.
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    /// The identifier of the digest algorithm.
    pub fn digest_algorithm_oid(&self) -> &ObjectIdentifier {
        &self.digest_algorithm
    }

    /// The digest algorithm, if it is supported.
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        DigestAlgorithm::from_oid(&self.digest_algorithm)
    }

    /// The DER encoding of the signed attributes, tagged as a `SET`.
    pub fn signed_attributes(&self) -> Option<&[u8]> {
        self.signed_attributes.as_deref()
    }

    /// The `messageDigest` attribute.
    pub fn message_digest(&self) -> Option<&[u8]> {
        self.message_digest.as_deref()
    }

    /// The `signingTime` attribute.
    pub fn signing_time(&self) -> Option<DateTime> {
        self.signing_time
    }

    /// The identifier of the signature algorithm.
    pub fn signature_algorithm(&self) -> &ObjectIdentifier {
        &self.signature_algorithm
    }

    /// The signature value.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The timestamp token among the unsigned attributes.
    pub fn timestamp_token(&self) -> Option<&TimestampToken> {
        self.timestamp_token.as_ref()
    }
}

/// A timestamp token attached to a signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampToken {
    raw: Vec<u8>,
    time: Option<DateTime>,
}

impl TimestampToken {
    /// The DER encoding of the token, itself a `ContentInfo`.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The time at which the token was generated, if it could be read.
    pub fn time(&self) -> Option<DateTime> {
        self.time
    }
}

fn timestamp_token(unsigned: &Element<'_>) -> Option<TimestampToken> {
    let attributes = attributes(unsigned)
        .inspect_err(|e| debug!("failed to read unsigned attributes: {e}"))
        .ok()?;

    let (_, token) = attributes
        .into_iter()
        .find(|(kind, _)| kind.is(oid::TIMESTAMP_TOKEN))?;

    let time = generation_time(&token)
        .inspect_err(|e| debug!("failed to read timestamp token: {e}"))
        .ok();

    Some(TimestampToken {
        raw: token.raw().to_vec(),
        time,
    })
}

/// Read `genTime` from the `TSTInfo` inside a timestamp token.
fn generation_time(token: &Element<'_>) -> Result<DateTime> {
    let token = token.expect(der::SEQUENCE)?.child_vec()?;

    let [_, content, ..] = token.as_slice() else {
        bail!(SignatureError::MalformedStructure("invalid timestamp token"));
    };

    let signed_data = content.explicit(0)?.expect(der::SEQUENCE)?.child_vec()?;

    let Some(encapsulated) = signed_data.get(2) else {
        bail!(SignatureError::MalformedStructure("invalid timestamp token"));
    };

    let encapsulated = encapsulated.expect(der::SEQUENCE)?.child_vec()?;

    let [content_type, content, ..] = encapsulated.as_slice() else {
        bail!(SignatureError::MalformedStructure("timestamp token lacks content"));
    };

    if !content_type.object_identifier()?.is(oid::TST_INFO) {
        bail!(SignatureError::MalformedStructure("timestamp token lacks content"));
    }

    let info = content.explicit(0)?.octets()?;
    let info = Element::parse(&info)?.expect(der::SEQUENCE)?.child_vec()?;

    // version, policy, messageImprint, serialNumber, genTime
    match info.get(4) {
        Some(time) => Ok(time.time()?),
        None => bail!(SignatureError::MalformedStructure("invalid timestamp info")),
    }
}

/// The first value of every attribute in a set of attributes.
fn attributes<'a>(set: &Element<'a>) -> Result<Vec<(ObjectIdentifier, Element<'a>)>> {
    let mut out = Vec::new();

    for attribute in set.children() {
        let attribute = attribute?.expect(der::SEQUENCE)?.child_vec()?;

        let [kind, values, ..] = attribute.as_slice() else {
            bail!(SignatureError::MalformedStructure("invalid attribute"));
        };

        let kind = kind.object_identifier()?;

        match values.expect(der::SET)?.children().next() {
            Some(value) => out.push((kind, value?)),
            None => bail!(SignatureError::MalformedStructure("attribute without value")),
        }
    }

    Ok(out)
}

fn algorithm_identifier(element: &Element<'_>) -> Result<ObjectIdentifier> {
    match element.expect(der::SEQUENCE)?.children().next() {
        Some(algorithm) => Ok(algorithm?.object_identifier()?),
        None => bail!(SignatureError::MalformedStructure(
            "empty algorithm identifier"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::tests::{certificate, name, oid, tlv};

    fn algorithm(arcs: &[u64]) -> Vec<u8> {
        tlv(0x30, &[&oid(arcs), &[0x05, 0x00]])
    }

    fn attribute(arcs: &[u64], value: &[u8]) -> Vec<u8> {
        tlv(0x30, &[&oid(arcs), &tlv(0x31, &[value])])
    }

    fn signer(version: u8, signed: Option<&[u8]>, unsigned: Option<&[u8]>) -> Vec<u8> {
        let sid = match version {
            3 => tlv(0x80, &[&[1, 2, 3]]),
            _ => tlv(0x30, &[&name("CA"), &tlv(0x02, &[&[0x2A]])]),
        };

        tlv(
            0x30,
            &[
                &tlv(0x02, &[&[version]]),
                &sid,
                &algorithm(oid::SHA256),
                &signed.map(|s| tlv(0xA0, &[s])).unwrap_or_default(),
                &algorithm(oid::RSA_ENCRYPTION),
                &tlv(0x04, &[b"signature"]),
                &unsigned.map(|u| tlv(0xA1, &[u])).unwrap_or_default(),
            ],
        )
    }

    fn content_info(content_type: &[u64], signer: &[u8], encapsulated: Option<&[u8]>) -> Vec<u8> {
        let encapsulated = match encapsulated {
            Some(content) => tlv(
                0x30,
                &[&oid(oid::DATA), &tlv(0xA0, &[&tlv(0x04, &[content])])],
            ),
            None => tlv(0x30, &[&oid(oid::DATA)]),
        };
        let signed_data = tlv(
            0x30,
            &[
                &tlv(0x02, &[&[1]]),
                &tlv(0x31, &[&algorithm(oid::SHA256)]),
                &encapsulated,
                &tlv(
                    0xA0,
                    &[
                        &certificate("Root", "CA", &[7]),
                        &certificate("CA", "Signer", &[0x2A]),
                    ],
                ),
                &tlv(0x31, &[signer]),
            ],
        );

        tlv(0x30, &[&oid(content_type), &tlv(0xA0, &[&signed_data])])
    }

    #[test]
    fn signer_with_attributes() {
        let signed = [
            attribute(oid::SIGNING_TIME, &tlv(0x17, &[b"240102030405Z"])),
            attribute(oid::MESSAGE_DIGEST, &tlv(0x04, &[&[0xAB; 32]])),
        ]
        .concat();
        let mut data = content_info(oid::SIGNED_DATA, &signer(1, Some(&signed), None), None);
        // Placeholder padding.
        data.extend([0; 16]);

        let signed_data = SignedData::parse(&data).unwrap();
        let signer = signed_data.signer_info();

        assert_eq!(signed_data.certificates().len(), 2);
        assert_eq!(
            signed_data.signer_certificate().subject_common_name().as_deref(),
            Some("Signer")
        );
        assert_eq!(signed_data.encapsulated_content(), None);
        assert_eq!(signer.digest_algorithm(), Some(DigestAlgorithm::Sha256));
        assert_eq!(signer.message_digest(), Some([0xAB; 32].as_slice()));
        assert_eq!(
            signer.signing_time().map(|t| t.to_string()).as_deref(),
            Some("2024-01-02T03:04:05Z")
        );
        assert_eq!(signer.signature(), b"signature");
        assert!(signer.signature_algorithm().is(oid::RSA_ENCRYPTION));

        let attributes = signer.signed_attributes().unwrap();
        assert_eq!(attributes[0], 0x31);
        assert_eq!(&attributes[2..], signed.as_slice());
    }

    #[test]
    fn encapsulated_content() {
        let data = content_info(oid::SIGNED_DATA, &signer(1, None, None), Some(b"digest"));
        let signed_data = SignedData::parse(&data).unwrap();

        assert_eq!(signed_data.encapsulated_content(), Some(b"digest".as_slice()));
        assert_eq!(signed_data.signer_info().signed_attributes(), None);
    }

    #[test]
    fn message_digest_is_required() {
        let signed = attribute(oid::SIGNING_TIME, &tlv(0x17, &[b"240102030405Z"]));
        let data = content_info(oid::SIGNED_DATA, &signer(1, Some(&signed), None), None);

        assert!(matches!(
            SignedData::parse(&data),
            Err(SignatureError::MalformedStructure(_))
        ));
    }

    #[test]
    fn subject_key_identifier() {
        let data = content_info(oid::SIGNED_DATA, &signer(3, None, None), None);

        assert!(matches!(
            SignedData::parse(&data),
            Err(SignatureError::UnsupportedVariant(_))
        ));
    }

    #[test]
    fn other_content_types() {
        let signer = signer(1, None, None);

        assert!(matches!(
            SignedData::parse(&content_info(oid::ENVELOPED_DATA, &signer, None)),
            Err(SignatureError::UnsupportedVariant(_))
        ));
        assert!(matches!(
            SignedData::parse(&content_info(&[1, 2, 3], &signer, None)),
            Err(SignatureError::MalformedStructure(_))
        ));
    }

    #[test]
    fn broken_timestamp_is_ignored() {
        let unsigned = attribute(oid::TIMESTAMP_TOKEN, &tlv(0x30, &[&oid(oid::SIGNED_DATA)]));
        let data = content_info(oid::SIGNED_DATA, &signer(1, None, Some(&unsigned)), None);
        let signed_data = SignedData::parse(&data).unwrap();
        let token = signed_data.signer_info().timestamp_token().unwrap();

        assert_eq!(token.time(), None);
        assert_eq!(token.raw()[0], 0x30);
    }

    #[test]
    fn timestamp_time() {
        let info = tlv(
            0x30,
            &[
                &tlv(0x02, &[&[1]]),
                &oid(&[1, 2, 3, 4]),
                &tlv(0x30, &[&algorithm(oid::SHA256), &tlv(0x04, &[&[0; 32]])]),
                &tlv(0x02, &[&[5]]),
                &tlv(0x18, &[b"20240506070809Z"]),
            ],
        );
        let token = tlv(
            0x30,
            &[
                &oid(oid::SIGNED_DATA),
                &tlv(
                    0xA0,
                    &[&tlv(
                        0x30,
                        &[
                            &tlv(0x02, &[&[3]]),
                            &tlv(0x31, &[]),
                            &tlv(
                                0x30,
                                &[&oid(oid::TST_INFO), &tlv(0xA0, &[&tlv(0x04, &[&info])])],
                            ),
                        ],
                    )],
                ),
            ],
        );
        let unsigned = attribute(oid::TIMESTAMP_TOKEN, &token);
        let data = content_info(oid::SIGNED_DATA, &signer(1, None, Some(&unsigned)), None);
        let signed_data = SignedData::parse(&data).unwrap();
        let token = signed_data.signer_info().timestamp_token().unwrap();

        assert_eq!(
            token.time().map(|t| t.to_string()).as_deref(),
            Some("2024-05-06T07:08:09Z")
        );
    }

    #[test]
    fn truncated() {
        let data = content_info(oid::SIGNED_DATA, &signer(1, None, None), None);

        assert!(matches!(
            SignedData::parse(&data[..data.len() / 2]),
            Err(SignatureError::Der(_))
        ));
    }
}
