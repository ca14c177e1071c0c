//! The standard (password-based) security handler, revisions 2 to 4.

use super::aes::{decrypt_cbc, encrypt_cbc};
use super::rc4::Rc4;
use super::{SecurityProvider, object_key};
use crate::error::{Error, Result, bail};
use crate::object::dict::keys::{
    AESV2, CF, CFM, ENCRYPT_META_DATA, IDENTITY, LENGTH, NONE, O, P, R, STM_F, STR_F, U, V, V2,
};
use crate::object::{Dict, Name, ObjRef, PdfString};

const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

bitflags::bitflags! {
    /// The user access permissions from the `/P` entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u32 {
        /// Print the document.
        const PRINT = 1 << 2;
        /// Modify the contents of the document.
        const MODIFY = 1 << 3;
        /// Copy or extract text and graphics.
        const COPY = 1 << 4;
        /// Add or modify annotations and fill in form fields.
        const ANNOTATE = 1 << 5;
        /// Fill in existing form fields.
        const FILL_FORMS = 1 << 8;
        /// Extract text and graphics for accessibility.
        const EXTRACT_FOR_ACCESSIBILITY = 1 << 9;
        /// Insert, rotate or delete pages.
        const ASSEMBLE = 1 << 10;
        /// Print at full quality.
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CryptMethod {
    Identity,
    Rc4,
    Aes128,
}

impl CryptMethod {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            NONE | IDENTITY => Some(Self::Identity),
            V2 => Some(Self::Rc4),
            AESV2 => Some(Self::Aes128),
            _ => None,
        }
    }
}

/// The standard security handler, opened with the empty user password.
#[derive(Debug, Clone)]
pub struct StandardSecurityHandler {
    key: Vec<u8>,
    revision: u8,
    permissions: Permissions,
    string_method: CryptMethod,
    stream_method: CryptMethod,
}

impl StandardSecurityHandler {
    /// Set up the handler from the `/Encrypt` dictionary and the first element of
    /// the file identifier.
    pub fn new(dict: &Dict, file_id: &[u8]) -> Result<Self> {
        let version = dict
            .get::<u8>(V)
            .ok_or(Error::MalformedStructure("missing /V in encryption dictionary"))?;
        let revision = dict
            .get::<u8>(R)
            .ok_or(Error::MalformedStructure("missing /R in encryption dictionary"))?;
        let encrypt_metadata = dict.get::<bool>(ENCRYPT_META_DATA).unwrap_or(true);

        let length = match version {
            1 => 40,
            2 => dict.get::<u16>(LENGTH).unwrap_or(40),
            4 => dict.get::<u16>(LENGTH).unwrap_or(128),
            _ => bail!(Error::SecurityUnavailable("unsupported encryption version")),
        };

        if !(2..=4).contains(&revision) {
            bail!(Error::SecurityUnavailable("unsupported encryption revision"));
        }

        let byte_length = (length / 8).clamp(5, 16) as usize;

        let (string_method, stream_method) = if version == 4 {
            (
                crypt_filter(dict, STR_F)?,
                crypt_filter(dict, STM_F)?,
            )
        } else {
            (CryptMethod::Rc4, CryptMethod::Rc4)
        };

        let owner = dict
            .get::<PdfString>(O)
            .ok_or(Error::MalformedStructure("missing /O in encryption dictionary"))?
            .bytes();
        let user = dict
            .get::<PdfString>(U)
            .ok_or(Error::MalformedStructure("missing /U in encryption dictionary"))?
            .bytes();
        let raw_permissions = dict
            .get::<i64>(P)
            .ok_or(Error::MalformedStructure("missing /P in encryption dictionary"))?;
        // `/P` is a signed 32-bit integer in the file.
        let permissions = raw_permissions as i32 as u32;

        let mut key = file_key(
            encrypt_metadata,
            revision,
            byte_length,
            &owner,
            permissions,
            file_id,
        );

        let expected = match revision {
            2 => user_password_rev2(&key),
            _ => user_password_rev34(&key, file_id),
        };
        let compared = if revision == 2 { 32 } else { 16 };

        if user.get(..compared) != expected.get(..compared) {
            bail!(Error::SecurityUnavailable("document requires a user password"));
        }

        // See pdf.js issue 19484.
        if version == 4 && key.len() < 16 {
            key.resize(16, 0);
        }

        Ok(Self {
            key,
            revision,
            permissions: Permissions::from_bits_truncate(permissions),
            string_method,
            stream_method,
        })
    }

    /// The revision of the handler.
    pub fn revision(&self) -> u8 {
        self.revision
    }

    /// The access permissions granted to the user.
    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// Encrypt string data for the given object.
    ///
    /// AES output uses an initialization vector derived from the object key
    /// instead of a random one.
    pub fn encrypt(&self, reference: ObjRef, data: &[u8]) -> Option<Vec<u8>> {
        match self.string_method {
            CryptMethod::Identity => Some(data.to_vec()),
            CryptMethod::Rc4 => Some(Rc4::new(&object_key(&self.key, reference, false)).apply(data)),
            CryptMethod::Aes128 => {
                let key = object_key(&self.key, reference, true);
                let iv = md5::compute(&key).0;

                encrypt_cbc(&key, &iv, data)
            }
        }
    }

    fn apply(
        &self,
        method: CryptMethod,
        reference: ObjRef,
        key: &[u8],
        data: &[u8],
    ) -> Option<Vec<u8>> {
        match method {
            CryptMethod::Identity => Some(data.to_vec()),
            CryptMethod::Rc4 => Some(Rc4::new(&object_key(key, reference, false)).apply(data)),
            CryptMethod::Aes128 => decrypt_cbc(&object_key(key, reference, true), data),
        }
    }
}

impl SecurityProvider for StandardSecurityHandler {
    fn decryption_key(&self) -> &[u8] {
        &self.key
    }

    fn decrypt(&self, reference: ObjRef, key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
        self.apply(self.string_method, reference, key, data)
    }

    fn decrypt_stream(&self, reference: ObjRef, key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
        self.apply(self.stream_method, reference, key, data)
    }
}

fn crypt_filter(dict: &Dict, entry: &[u8]) -> Result<CryptMethod> {
    let Some(name) = dict.get::<Name>(entry) else {
        return Ok(CryptMethod::Identity);
    };

    if &*name == IDENTITY {
        return Ok(CryptMethod::Identity);
    }

    let cfm = dict
        .get::<Dict>(CF)
        .and_then(|cf| cf.get::<Dict>(&name))
        .and_then(|filter| filter.get::<Name>(CFM))
        .ok_or(Error::MalformedStructure("missing crypt filter"))?;

    CryptMethod::from_name(&cfm).ok_or(Error::SecurityUnavailable("unsupported crypt filter method"))
}

/// Algorithm 2: computing the file encryption key.
fn file_key(
    encrypt_metadata: bool,
    revision: u8,
    byte_length: usize,
    owner: &[u8],
    permissions: u32,
    id: &[u8],
) -> Vec<u8> {
    let mut context = md5::Context::new();
    // The user password is empty, so it consists of the padding only.
    context.consume(PASSWORD_PADDING);
    context.consume(owner);
    context.consume(permissions.to_le_bytes());
    context.consume(id);

    if !encrypt_metadata && revision >= 4 {
        context.consume([0xff, 0xff, 0xff, 0xff]);
    }

    let mut hash = context.finalize().0;

    if revision >= 3 {
        for _ in 0..50 {
            hash = md5::compute(&hash[..byte_length]).0;
        }
    }

    hash[..byte_length].to_vec()
}

/// Algorithm 4: the `/U` value for revision 2.
fn user_password_rev2(key: &[u8]) -> Vec<u8> {
    Rc4::new(key).apply(&PASSWORD_PADDING)
}

/// Algorithm 5: the `/U` value for revisions 3 and 4.
fn user_password_rev34(key: &[u8], id: &[u8]) -> Vec<u8> {
    let mut context = md5::Context::new();
    context.consume(PASSWORD_PADDING);
    context.consume(id);
    let hash = context.finalize().0;

    let mut encrypted = Rc4::new(key).apply(&hash);

    for i in 1..=19_u8 {
        let round_key = key.iter().map(|b| b ^ i).collect::<Vec<_>>();
        encrypted = Rc4::new(&round_key).apply(&encrypted);
    }

    encrypted.resize(32, 0);
    encrypted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{HexString, Object};

    const OWNER: [u8; 32] = [0x5A; 32];
    const FILE_ID: &[u8] = b"0123456789abcdef";

    fn encrypt_dict(version: i32, revision: i32, length: i32) -> Dict {
        let byte_length = (length / 8) as usize;
        let key = file_key(true, revision as u8, byte_length, &OWNER, -4_i32 as u32, FILE_ID);
        let user = if revision == 2 {
            user_password_rev2(&key)
        } else {
            user_password_rev34(&key, FILE_ID)
        };

        let mut dict = Dict::from_iter([
            (b"Filter".as_slice(), Object::Name(Name::new(b"Standard"))),
            (V, version.into()),
            (R, revision.into()),
            (LENGTH, length.into()),
            (P, (-4).into()),
            (O, PdfString::from(HexString::from_bytes(&OWNER)).into()),
            (U, PdfString::from(HexString::from_bytes(&user)).into()),
        ]);

        if version == 4 {
            let std_cf = Dict::from_iter([(CFM, Name::new(AESV2))]);
            dict.insert(CF, Dict::from_iter([(b"StdCF".as_slice(), std_cf)]));
            dict.insert(STM_F, Name::new(b"StdCF"));
            dict.insert(STR_F, Name::new(b"StdCF"));
        }

        dict
    }

    #[test]
    fn rc4_revision_2() {
        let handler = StandardSecurityHandler::new(&encrypt_dict(1, 2, 40), FILE_ID).unwrap();
        assert_eq!(handler.decryption_key().len(), 5);
        assert!(handler.permissions().contains(Permissions::PRINT));

        let reference = ObjRef::new(7, 0);
        let encrypted = handler.encrypt(reference, b"Chapter 1").unwrap();
        assert_ne!(encrypted, b"Chapter 1");

        let key = handler.decryption_key().to_vec();
        assert_eq!(handler.decrypt(reference, &key, &encrypted).unwrap(), b"Chapter 1");
        // A different object gets a different key.
        assert_ne!(
            handler.decrypt(ObjRef::new(8, 0), &key, &encrypted).unwrap(),
            b"Chapter 1"
        );
    }

    #[test]
    fn rc4_revision_3() {
        let handler = StandardSecurityHandler::new(&encrypt_dict(2, 3, 128), FILE_ID).unwrap();
        assert_eq!(handler.revision(), 3);

        let reference = ObjRef::new(12, 0);
        let encrypted = handler.encrypt(reference, b"kiwi").unwrap();
        let key = handler.decryption_key().to_vec();
        assert_eq!(handler.decrypt(reference, &key, &encrypted).unwrap(), b"kiwi");
    }

    #[test]
    fn aes_revision_4() {
        let handler = StandardSecurityHandler::new(&encrypt_dict(4, 4, 128), FILE_ID).unwrap();

        let reference = ObjRef::new(3, 0);
        let encrypted = handler.encrypt(reference, b"embedded.txt").unwrap();
        assert_eq!(encrypted.len(), 32);

        let key = handler.decryption_key().to_vec();
        assert_eq!(handler.decrypt(reference, &key, &encrypted).unwrap(), b"embedded.txt");
        assert_eq!(
            handler.decrypt_stream(reference, &key, &encrypted).unwrap(),
            b"embedded.txt"
        );
    }

    #[test]
    fn wrong_user_entry_needs_password() {
        let mut dict = encrypt_dict(2, 3, 128);
        dict.insert(U, PdfString::from(HexString::from_bytes(&[0; 32])));

        assert_eq!(
            StandardSecurityHandler::new(&dict, FILE_ID).unwrap_err(),
            Error::SecurityUnavailable("document requires a user password")
        );
    }

    #[test]
    fn unsupported_version() {
        let mut dict = encrypt_dict(2, 3, 128);
        dict.insert(V, 5);

        assert!(matches!(
            StandardSecurityHandler::new(&dict, FILE_ID),
            Err(Error::SecurityUnavailable(_))
        ));
    }
}
