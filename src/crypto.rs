//! Cryptographic primitives.
//!
//! The session-key layer treats HMAC and AEAD as opaque collaborators and
//! reaches them only through the [`Hmac`] and [`Aead`] traits defined here.
//! [`RingCrypto`] is the production implementation; it is the only place in
//! the crate that touches `ring::aead` or `ring::hmac`.
//!
//! Primitive choices:
//! - **MAC**: HMAC-SHA256, 32-byte output
//! - **Cipher**: AES-128-GCM or AES-256-GCM, selected by key length
//! - **IV**: 96-bit (12 bytes), supplied by the caller
//! - **Tag**: 128-bit (16 bytes), detached from the ciphertext

use ring::aead::{self, Aad, LessSafeKey, Nonce, Tag, UnboundKey, AES_128_GCM, AES_256_GCM};
use ring::hmac;

use crate::error::SessionKeyError;

/// Output length of the HMAC primitive, and therefore of every derived
/// session key regardless of its key-length class.
pub const SESSION_KEY_MAX_SIZE: usize = 32;

/// Length of the detached AES-GCM authentication tag.
pub const AEAD_TAG_LEN: usize = 16;

/// Length of the AES-GCM initialization vector.
pub const AEAD_IV_LEN: usize = 12;

/// Direction of an AEAD transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadMode {
    /// Authenticate and encrypt; the tag is produced.
    Encrypt,
    /// Authenticate and decrypt; the tag is verified.
    Decrypt,
}

/// Keyed hash producing a session key.
pub trait Hmac {
    /// Compute HMAC-SHA256 of `data` under `key` into `out`.
    fn hmac_sha256(
        &self,
        key: &[u8],
        data: &[u8],
        out: &mut [u8; SESSION_KEY_MAX_SIZE],
    ) -> Result<(), SessionKeyError>;
}

/// Authenticated encryption with a detached tag, operating in place.
pub trait Aead {
    /// Transform `in_out` in place under `key` and `iv`.
    ///
    /// In [`AeadMode::Encrypt`] the tag is written to the front of `tag`;
    /// in [`AeadMode::Decrypt`] it is read from there and verified. Returns
    /// the number of tag bytes produced or consumed. On error the contents
    /// of `in_out` and `tag` are unspecified.
    fn transform(
        &self,
        mode: AeadMode,
        key: &[u8],
        iv: &[u8],
        in_out: &mut [u8],
        tag: &mut [u8],
    ) -> Result<usize, SessionKeyError>;
}

/// `ring`-backed HMAC and AEAD.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingCrypto;

impl Hmac for RingCrypto {
    fn hmac_sha256(
        &self,
        key: &[u8],
        data: &[u8],
        out: &mut [u8; SESSION_KEY_MAX_SIZE],
    ) -> Result<(), SessionKeyError> {
        let key = hmac::Key::new(hmac::HMAC_SHA256, key);
        let tag = hmac::sign(&key, data);
        let bytes = tag.as_ref();
        if bytes.len() != SESSION_KEY_MAX_SIZE {
            return Err(SessionKeyError::KeyDerivationFailure);
        }
        out.copy_from_slice(bytes);
        Ok(())
    }
}

impl Aead for RingCrypto {
    fn transform(
        &self,
        mode: AeadMode,
        key: &[u8],
        iv: &[u8],
        in_out: &mut [u8],
        tag: &mut [u8],
    ) -> Result<usize, SessionKeyError> {
        let failure = match mode {
            AeadMode::Encrypt => SessionKeyError::EncryptionFailure,
            AeadMode::Decrypt => SessionKeyError::DecryptionFailure,
        };

        let key = less_safe_key(key)?;
        let nonce = Nonce::try_assume_unique_for_key(iv).map_err(|_| failure.clone())?;
        let tag_out = tag.get_mut(..AEAD_TAG_LEN).ok_or_else(|| failure.clone())?;

        match mode {
            AeadMode::Encrypt => {
                let produced = key
                    .seal_in_place_separate_tag(nonce, Aad::empty(), in_out)
                    .map_err(|_| failure)?;
                tag_out.copy_from_slice(produced.as_ref());
            }
            AeadMode::Decrypt => {
                let received = Tag::try_from(&tag_out[..]).map_err(|_| failure.clone())?;
                key.open_in_place_separate_tag(nonce, Aad::empty(), received, in_out, 0..)
                    .map_err(|_| failure)?;
            }
        }

        Ok(AEAD_TAG_LEN)
    }
}

/// Pick AES-128-GCM or AES-256-GCM from the key length.
fn less_safe_key(key: &[u8]) -> Result<LessSafeKey, SessionKeyError> {
    let algorithm: &'static aead::Algorithm = match key.len() {
        16 => &AES_128_GCM,
        32 => &AES_256_GCM,
        _ => return Err(SessionKeyError::InvalidKey),
    };
    let unbound = UnboundKey::new(algorithm, key).map_err(|_| SessionKeyError::InvalidKey)?;
    Ok(LessSafeKey::new(unbound))
}
