//! X.509 certificates.
//!
//! Only the fields needed to identify the signer and hand its public key to a
//! [`SignatureVerifier`](crate::SignatureVerifier) are extracted.

use crate::der::{self, Element};
use crate::error::{Result, SignatureError};
use crate::oid::{self, ObjectIdentifier};
use crate::time::DateTime;
use log::{debug, warn};

/// A certificate embedded in a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    raw: Vec<u8>,
    serial_number: Vec<u8>,
    issuer: Vec<u8>,
    subject: Vec<u8>,
    validity: Option<(DateTime, DateTime)>,
    public_key_algorithm: ObjectIdentifier,
    subject_public_key_info: Vec<u8>,
}

impl Certificate {
    /// Parse a DER encoded certificate.
    pub fn from_der(data: &[u8]) -> Result<Self> {
        Self::from_element(&Element::parse(data)?)
    }

    pub(crate) fn from_element(element: &Element<'_>) -> Result<Self> {
        let certificate = element.expect(der::SEQUENCE)?.child_vec()?;
        let tbs = certificate
            .first()
            .ok_or(SignatureError::MalformedStructure("empty certificate"))?
            .expect(der::SEQUENCE)?
            .child_vec()?;

        // The version is optional and explicitly tagged.
        let fields = match tbs.first() {
            Some(version) if version.tag() == der::context(0) => &tbs[1..],
            _ => &tbs[..],
        };

        let [serial, _signature, issuer, validity, subject, spki, ..] = fields else {
            return Err(SignatureError::MalformedStructure(
                "certificate is missing fields",
            ));
        };

        let spki = spki.expect(der::SEQUENCE)?;
        let public_key_algorithm = spki
            .children()
            .next()
            .ok_or(SignatureError::MalformedStructure(
                "missing public key algorithm",
            ))??
            .expect(der::SEQUENCE)?
            .children()
            .next()
            .ok_or(SignatureError::MalformedStructure(
                "missing public key algorithm",
            ))??
            .object_identifier()?;

        let validity = parse_validity(validity)
            .inspect_err(|e| debug!("ignoring certificate validity: {e}"))
            .ok();

        Ok(Self {
            raw: element.raw().to_vec(),
            serial_number: serial.integer()?.to_vec(),
            issuer: issuer.expect(der::SEQUENCE)?.raw().to_vec(),
            subject: subject.expect(der::SEQUENCE)?.raw().to_vec(),
            validity,
            public_key_algorithm,
            subject_public_key_info: spki.raw().to_vec(),
        })
    }

    /// The complete DER encoding.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The serial number as a minimal big-endian integer.
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    /// The DER encoding of the issuer name.
    pub fn issuer(&self) -> &[u8] {
        &self.issuer
    }

    /// The DER encoding of the subject name.
    pub fn subject(&self) -> &[u8] {
        &self.subject
    }

    /// The period in which the certificate is valid, if it could be read.
    pub fn validity(&self) -> Option<(DateTime, DateTime)> {
        self.validity
    }

    /// Whether `time` lies within the validity period.
    pub fn is_valid_at(&self, time: &DateTime) -> bool {
        self.validity.is_some_and(|(not_before, not_after)| {
            let t = time.unix_timestamp();

            not_before.unix_timestamp() <= t && t <= not_after.unix_timestamp()
        })
    }

    /// The algorithm of the public key.
    pub fn public_key_algorithm(&self) -> &ObjectIdentifier {
        &self.public_key_algorithm
    }

    /// The DER encoding of the `SubjectPublicKeyInfo`.
    pub fn subject_public_key_info(&self) -> &[u8] {
        &self.subject_public_key_info
    }

    /// The common name of the subject.
    pub fn subject_common_name(&self) -> Option<String> {
        common_name(&self.subject)
    }

    /// The common name of the issuer.
    pub fn issuer_common_name(&self) -> Option<String> {
        common_name(&self.issuer)
    }

    /// Whether this certificate has the given issuer and serial number.
    pub(crate) fn is_identified_by(&self, issuer: &[u8], serial_number: &[u8]) -> bool {
        self.issuer == issuer && self.serial_number == serial_number
    }
}

fn parse_validity(validity: &Element<'_>) -> Result<(DateTime, DateTime)> {
    let times = validity.expect(der::SEQUENCE)?.child_vec()?;

    match times.as_slice() {
        [not_before, not_after] => Ok((not_before.time()?, not_after.time()?)),
        _ => Err(SignatureError::MalformedStructure("invalid validity")),
    }
}

/// Find the first common name in a DER encoded name.
fn common_name(name: &[u8]) -> Option<String> {
    let name = Element::parse(name).ok()?;

    // Name ::= SEQUENCE OF SET OF SEQUENCE { type, value }
    for rdn in name.children() {
        for attribute in rdn.ok()?.children() {
            let attribute = attribute.ok()?.child_vec().ok()?;

            if let [kind, value] = attribute.as_slice()
                && kind.object_identifier().is_ok_and(|k| k.is(oid::COMMON_NAME))
            {
                return value.text();
            }
        }
    }

    None
}

/// Parse the certificates of a `CertificateSet`. Other kinds of certificates
/// and malformed ones are skipped.
pub(crate) fn parse_set(set: &Element<'_>) -> Vec<Certificate> {
    let mut certificates = Vec::new();

    for element in set.children() {
        let element = match element {
            Ok(element) => element,
            Err(e) => {
                warn!("failed to read certificate set: {e}");

                break;
            }
        };

        if element.tag() != der::SEQUENCE {
            debug!("skipping certificate choice with tag {:#04x}", element.tag());

            continue;
        }

        match Certificate::from_element(&element) {
            Ok(certificate) => certificates.push(certificate),
            Err(e) => warn!("skipping malformed certificate: {e}"),
        }
    }

    certificates
}
