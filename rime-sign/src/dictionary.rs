//! Signature dictionaries.

use crate::cms::SignedData;
use crate::error::Result;
use crate::validator::ByteRange;
use log::warn;
use rime_syntax::XRef;
use rime_syntax::object::dict::keys::{
    BYTE_RANGE, CONTACT_INFO, CONTENTS, FILTER, LOCATION, M, NAME, REASON, SUB_FILTER,
};
use rime_syntax::object::{Dict, Name, PdfString};

/// The value of a `/V` entry of a signature field.
#[derive(Debug, Clone)]
pub struct SignatureDictionary {
    filter: Option<Name>,
    sub_filter: Option<Name>,
    contents: Vec<u8>,
    byte_range: ByteRange,
    name: Option<String>,
    reason: Option<String>,
    location: Option<String>,
    contact_info: Option<String>,
    signing_time: Option<String>,
}

impl SignatureDictionary {
    /// Read a signature dictionary. Returns `None` if `/Contents` or
    /// `/ByteRange` are missing.
    pub fn from_dict(dict: &Dict, xref: &XRef) -> Option<Self> {
        // The signature itself is never encrypted.
        let Some(contents) = xref.get::<PdfString>(dict, CONTENTS) else {
            warn!("signature dictionary has no contents");

            return None;
        };

        let Some(byte_range) = dict
            .get_raw(BYTE_RANGE)
            .and_then(|b| ByteRange::from_object(b, xref))
        else {
            warn!("signature dictionary has no valid byte range");

            return None;
        };

        let text = |key: &[u8]| {
            let string = xref.get::<PdfString>(dict, key)?;

            Some(
                string
                    .decrypted_literal_string(xref.security())
                    .unwrap_or_else(|e| {
                        warn!("failed to decrypt signature entry: {e}");

                        string.literal_string()
                    }),
            )
        };

        Some(Self {
            filter: xref.get::<Name>(dict, FILTER),
            sub_filter: xref.get::<Name>(dict, SUB_FILTER),
            contents: contents.bytes(),
            byte_range,
            name: text(NAME),
            reason: text(REASON),
            location: text(LOCATION),
            contact_info: text(CONTACT_INFO),
            signing_time: text(M),
        })
    }

    /// The preferred signature handler, like `Adobe.PPKLite`.
    pub fn filter(&self) -> Option<&Name> {
        self.filter.as_ref()
    }

    /// The encoding of the signature, like `adbe.pkcs7.detached`.
    pub fn sub_filter(&self) -> Option<&Name> {
        self.sub_filter.as_ref()
    }

    /// The raw signature bytes, including the zero padding of the placeholder.
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// The parts of the file covered by the signature.
    pub fn byte_range(&self) -> ByteRange {
        self.byte_range
    }

    /// The name of the signer.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The reason for signing.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Where the document was signed.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// How to contact the signer.
    pub fn contact_info(&self) -> Option<&str> {
        self.contact_info.as_deref()
    }

    /// The signing time as a PDF date string, like `D:20240102030405Z`.
    pub fn signing_time(&self) -> Option<&str> {
        self.signing_time.as_deref()
    }

    /// Parse the `SignedData` stored in `/Contents`.
    pub fn signed_data(&self) -> Result<SignedData> {
        SignedData::parse(&self.contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rime_syntax::parse_object;

    #[test]
    fn entries() {
        let dict = parse_object(
            b"<< /Type /Sig /Filter /Adobe.PPKLite /SubFilter /adbe.pkcs7.detached \
              /ByteRange [0 100 200 50] /Contents <3003020101000000> \
              /Reason (Approved) /Name <FEFF0041006C> /M (D:20240102030405Z) >>",
        )
        .unwrap()
        .cast::<Dict>()
        .unwrap();
        let signature = SignatureDictionary::from_dict(&dict, &XRef::new()).unwrap();

        assert_eq!(
            signature.filter().map(|f| f.as_str().into_owned()).as_deref(),
            Some("Adobe.PPKLite")
        );
        assert_eq!(
            signature.sub_filter().map(|f| f.as_str().into_owned()).as_deref(),
            Some("adbe.pkcs7.detached")
        );
        assert_eq!(signature.byte_range(), ByteRange::new(0, 100, 200, 50));
        assert_eq!(signature.contents(), &[0x30, 0x03, 0x02, 0x01, 0x01, 0, 0, 0]);
        assert_eq!(signature.reason(), Some("Approved"));
        assert_eq!(signature.name(), Some("Al"));
        assert_eq!(signature.location(), None);
        assert_eq!(signature.signing_time(), Some("D:20240102030405Z"));
        assert!(signature.signed_data().is_err());
    }

    #[test]
    fn missing_byte_range() {
        let dict = parse_object(b"<< /Contents <00> >>")
            .unwrap()
            .cast::<Dict>()
            .unwrap();

        assert!(SignatureDictionary::from_dict(&dict, &XRef::new()).is_none());
    }
}
