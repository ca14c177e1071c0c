//! Decryption of encrypted documents.
//!
//! A [`SecurityManager`] is attached to an [`XRef`](crate::XRef) when the
//! document has an `/Encrypt` dictionary. The actual algorithms live behind the
//! [`SecurityProvider`] trait; [`StandardSecurityHandler`] implements the
//! password-based standard handler.
//!
//! **Important note**: These implementations solely serve the purpose of reading
//! already encrypted documents and should not be used to protect new ones.

use crate::error::{Error, Result};
use crate::object::{Dict, Name, ObjRef};
use crate::object::dict::keys::{FILTER, STANDARD};
use log::warn;
use std::fmt;
use std::sync::Arc;

mod aes;
mod rc4;
mod standard;

pub use standard::{Permissions, StandardSecurityHandler};

/// A provider of decryption algorithms for one document.
pub trait SecurityProvider: Send + Sync {
    /// The file encryption key.
    fn decryption_key(&self) -> &[u8];

    /// Decrypt the bytes of a string that belongs to the given indirect object.
    ///
    /// Returns `None` if the data is not valid ciphertext.
    fn decrypt(&self, reference: ObjRef, key: &[u8], data: &[u8]) -> Option<Vec<u8>>;

    /// Decrypt the data of a stream that belongs to the given indirect object.
    fn decrypt_stream(&self, reference: ObjRef, key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
        self.decrypt(reference, key, data)
    }
}

/// The security context of an encrypted document.
///
/// A manager without a provider represents an encrypted document whose security
/// handler is not available; every decryption then fails with
/// [`Error::SecurityUnavailable`].
#[derive(Clone)]
pub struct SecurityManager {
    provider: Option<Arc<dyn SecurityProvider>>,
}

impl SecurityManager {
    /// Create a new security manager backed by the given provider.
    pub fn new(provider: Arc<dyn SecurityProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Create a security manager for an encrypted document without a usable provider.
    pub fn unavailable() -> Self {
        Self { provider: None }
    }

    /// Create a security manager for the given `/Encrypt` dictionary and the first
    /// element of the trailer's `/ID` array.
    ///
    /// Only the standard security handler with an empty user password is
    /// supported. For anything else the manager is created without a provider.
    pub fn from_encrypt_dict(encrypt: &Dict, file_id: &[u8]) -> Self {
        let filter = encrypt.get::<Name>(FILTER);

        if filter.as_deref() != Some(STANDARD) {
            warn!(
                "unsupported security handler {:?}",
                filter.map(|f| f.as_str().into_owned())
            );

            return Self::unavailable();
        }

        match StandardSecurityHandler::new(encrypt, file_id) {
            Ok(handler) => Self::new(Arc::new(handler)),
            Err(e) => {
                warn!("failed to set up the standard security handler: {e}");

                Self::unavailable()
            }
        }
    }

    /// Whether a provider is available.
    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// The file encryption key.
    pub fn decryption_key(&self) -> Result<&[u8]> {
        Ok(self.provider()?.decryption_key())
    }

    /// Decrypt string data that belongs to the given indirect object.
    pub fn decrypt(&self, reference: ObjRef, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        self.provider()?
            .decrypt(reference, key, data)
            .ok_or(Error::MalformedStructure("invalid encrypted string"))
    }

    /// Decrypt stream data that belongs to the given indirect object.
    pub fn decrypt_stream(&self, reference: ObjRef, data: &[u8]) -> Result<Vec<u8>> {
        let provider = self.provider()?;

        provider
            .decrypt_stream(reference, provider.decryption_key(), data)
            .ok_or(Error::MalformedStructure("invalid encrypted stream"))
    }

    fn provider(&self) -> Result<&dyn SecurityProvider> {
        self.provider
            .as_deref()
            .ok_or(Error::SecurityUnavailable("no security provider for encrypted document"))
    }
}

impl fmt::Debug for SecurityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityManager")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Algorithm 1: derive the key for one object from the file encryption key.
pub(crate) fn object_key(key: &[u8], reference: ObjRef, aes: bool) -> Vec<u8> {
    let n = key.len();
    let mut input = key.to_vec();

    // The low-order 3 bytes of the object number and the low-order 2 bytes of the
    // generation number, low-order byte first.
    input.extend(&reference.obj_num.to_le_bytes()[..3]);
    input.extend(&reference.gen_num.to_le_bytes()[..2]);

    if aes {
        input.extend(b"sAlT");
    }

    let hash = md5::compute(&input).0;

    hash[..n.saturating_add(5).min(16)].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reverse;

    impl SecurityProvider for Reverse {
        fn decryption_key(&self) -> &[u8] {
            b"k"
        }

        fn decrypt(&self, _: ObjRef, _: &[u8], data: &[u8]) -> Option<Vec<u8>> {
            Some(data.iter().rev().copied().collect())
        }
    }

    #[test]
    fn custom_provider() {
        let manager = SecurityManager::new(Arc::new(Reverse));
        let key = manager.decryption_key().unwrap().to_vec();

        assert_eq!(manager.decrypt(ObjRef::new(1, 0), &key, b"abc").unwrap(), b"cba");
        assert_eq!(manager.decrypt_stream(ObjRef::new(1, 0), b"xy").unwrap(), b"yx");
    }

    #[test]
    fn unavailable_manager_fails() {
        let manager = SecurityManager::unavailable();

        assert!(matches!(
            manager.decryption_key(),
            Err(Error::SecurityUnavailable(_))
        ));
        assert!(matches!(
            manager.decrypt(ObjRef::new(1, 0), &[], b"abc"),
            Err(Error::SecurityUnavailable(_))
        ));
    }

    #[test]
    fn public_key_handler_is_unavailable() {
        let dict = Dict::from_iter([(FILTER, Name::new(b"Adobe.PubSec"))]);
        assert!(!SecurityManager::from_encrypt_dict(&dict, b"id").is_available());
    }

    #[test]
    fn object_key_length() {
        assert_eq!(object_key(&[1; 5], ObjRef::new(1, 0), false).len(), 10);
        assert_eq!(object_key(&[1; 16], ObjRef::new(1, 0), true).len(), 16);
    }
}
