//! AES-128 in CBC mode, as used by the `AESV2` crypt filter.
//!
//! The first 16 bytes of every encrypted string or stream are the
//! initialization vector.

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

pub(crate) fn decrypt_cbc(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let (iv, data) = data.split_at_checked(16)?;

    if data.is_empty() {
        return Some(vec![]);
    }

    if !data.len().is_multiple_of(16) {
        return None;
    }

    let mut buf = data.to_vec();
    let decryptor = Aes128CbcDec::new_from_slices(key, iv).ok()?;
    let len = decryptor.decrypt_padded_mut::<NoPadding>(&mut buf).ok()?.len();
    buf.truncate(len);

    // Many writers get the padding wrong, so only strip it if it is valid.
    if let Some(&pad) = buf.last() {
        let pad = pad as usize;

        if (1..=16).contains(&pad)
            && pad <= buf.len()
            && buf[buf.len() - pad..].iter().all(|b| *b as usize == pad)
        {
            buf.truncate(buf.len() - pad);
        }
    }

    Some(buf)
}

pub(crate) fn encrypt_cbc(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Option<Vec<u8>> {
    let encryptor = Aes128CbcEnc::new_from_slices(key, iv).ok()?;
    let mut buf = vec![0; data.len() + 16 - data.len() % 16];
    buf[..data.len()].copy_from_slice(data);
    let encrypted = encryptor.encrypt_padded_mut::<Pkcs7>(&mut buf, data.len()).ok()?;

    let mut out = iv.to_vec();
    out.extend_from_slice(encrypted);

    Some(out)
}
