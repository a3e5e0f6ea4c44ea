//! Key material and session-key derivation.
//!
//! This module owns two responsibilities:
//! 1. Holding the shared master key material in types that are opaque,
//!    non-cloneable, and zeroised on drop.
//! 2. Deriving session keys from that material as laid out by the DDS
//!    Security cryptographic transformation model.
//!
//! ## Derivation structure
//!
//! ```text
//! HMAC-SHA256(
//!     key  = master_sender_key[..key_len]            (sender)
//!          | master_receiver_specific_key[..key_len] (receiver specific),
//!     data = "SessionKey" | "SessionReceiverKey"
//!            || master_salt[..key_len]
//!            || session_id (4 bytes, native byte order)
//! )
//! ```
//!
//! `key_len` is 32 when `transformation_kind[3] >= 3` and 16 otherwise. The
//! output is always the full 32-byte HMAC, independent of `key_len`.

use std::collections::HashMap;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{Hmac, SESSION_KEY_MAX_SIZE};
use crate::error::SessionKeyError;

/// Identifier of a key-material entry owned by the key-material store.
pub type KeyMaterialHandle = i32;

/// Size of every master key and salt buffer.
pub const MASTER_KEY_MAX_SIZE: usize = 32;

/// Key length used by the 128-bit transformation kinds.
pub const KEY_LEN_128: usize = 16;

/// Key length used by the 256-bit transformation kinds.
pub const KEY_LEN_256: usize = 32;

/// Derivation literal for sender session keys.
pub(crate) const SESSION_KEY_LABEL: &[u8] = b"SessionKey";

/// Derivation literal for receiver-specific session keys.
pub(crate) const SESSION_RECEIVER_KEY_LABEL: &[u8] = b"SessionReceiverKey";

const SESSION_ID_LEN: usize = 4;
const MAX_DERIVATION_INPUT: usize =
    SESSION_RECEIVER_KEY_LABEL.len() + MASTER_KEY_MAX_SIZE + SESSION_ID_LEN;

// ---------------------------------------------------------------------------
// Transformation kind
// ---------------------------------------------------------------------------

/// The cryptographic transformation agreed for a piece of key material,
/// as carried in byte 3 of the 4-byte transformation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationKind {
    /// No cryptographic transformation.
    None,
    /// AES-128 GMAC (authentication only).
    Aes128Gmac,
    /// AES-128 GCM.
    Aes128Gcm,
    /// AES-256 GMAC (authentication only).
    Aes256Gmac,
    /// AES-256 GCM.
    Aes256Gcm,
    /// A value this crate does not name.
    Unknown(u8),
}

impl TransformationKind {
    /// Decode a 4-byte transformation kind.
    pub fn from_bytes(kind: [u8; 4]) -> Self {
        match kind[3] {
            0 => Self::None,
            1 => Self::Aes128Gmac,
            2 => Self::Aes128Gcm,
            3 => Self::Aes256Gmac,
            4 => Self::Aes256Gcm,
            other => Self::Unknown(other),
        }
    }

    /// Encode back into the 4-byte wire form.
    pub fn to_bytes(self) -> [u8; 4] {
        [0, 0, 0, self.id()]
    }

    fn id(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Aes128Gmac => 1,
            Self::Aes128Gcm => 2,
            Self::Aes256Gmac => 3,
            Self::Aes256Gcm => 4,
            Self::Unknown(id) => id,
        }
    }

    /// Key length class of this kind, or `None` for [`TransformationKind::None`].
    pub fn key_len(self) -> Option<usize> {
        match self.id() {
            0 => None,
            id if id >= 3 => Some(KEY_LEN_256),
            _ => Some(KEY_LEN_128),
        }
    }
}

// ---------------------------------------------------------------------------
// Key material
// ---------------------------------------------------------------------------

/// Master key material shared out-of-band between two endpoints.
///
/// - Not `Clone`.
/// - Zeroised on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    transformation_kind: [u8; 4],
    master_salt: [u8; MASTER_KEY_MAX_SIZE],
    master_sender_key: [u8; MASTER_KEY_MAX_SIZE],
    master_receiver_specific_key: [u8; MASTER_KEY_MAX_SIZE],
}

impl KeyMaterial {
    /// Construct key material from its raw parts.
    ///
    /// Buffers are always 32 bytes; 128-bit kinds only use the first 16.
    pub fn new(
        kind: TransformationKind,
        master_salt: [u8; MASTER_KEY_MAX_SIZE],
        master_sender_key: [u8; MASTER_KEY_MAX_SIZE],
        master_receiver_specific_key: [u8; MASTER_KEY_MAX_SIZE],
    ) -> Self {
        Self {
            transformation_kind: kind.to_bytes(),
            master_salt,
            master_sender_key,
            master_receiver_specific_key,
        }
    }

    /// The raw 4-byte transformation kind.
    pub fn transformation_kind(&self) -> [u8; 4] {
        self.transformation_kind
    }

    pub(crate) fn master_salt(&self) -> &[u8; MASTER_KEY_MAX_SIZE] {
        &self.master_salt
    }

    pub(crate) fn master_sender_key(&self) -> &[u8; MASTER_KEY_MAX_SIZE] {
        &self.master_sender_key
    }

    pub(crate) fn master_receiver_specific_key(&self) -> &[u8; MASTER_KEY_MAX_SIZE] {
        &self.master_receiver_specific_key
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("transformation_kind", &self.transformation_kind)
            .finish_non_exhaustive()
    }
}

/// Read-only access to key material by handle.
pub trait KeyMaterialLookup {
    /// Resolve a handle, or `None` if it names nothing.
    fn key_material(&self, handle: KeyMaterialHandle) -> Option<&KeyMaterial>;
}

/// An in-memory key-material store.
#[derive(Debug, Default)]
pub struct KeyMaterialStore {
    entries: HashMap<KeyMaterialHandle, KeyMaterial>,
}

impl KeyMaterialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register key material under `handle`, replacing any previous entry.
    pub fn insert(&mut self, handle: KeyMaterialHandle, material: KeyMaterial) {
        self.entries.insert(handle, material);
    }

    /// Drop the key material registered under `handle`.
    pub fn remove(&mut self, handle: KeyMaterialHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyMaterialLookup for KeyMaterialStore {
    fn key_material(&self, handle: KeyMaterialHandle) -> Option<&KeyMaterial> {
        self.entries.get(&handle)
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive a session key into `output`.
///
/// On error `output` may hold partial bytes and must not be used.
///
/// # Errors
/// - `NotFound` if `key_material_handle` does not resolve.
/// - `BadState` if the material's transformation kind is "none".
pub fn derive_session_key<K, H>(
    lookup: &K,
    hmac: &H,
    output: &mut [u8; SESSION_KEY_MAX_SIZE],
    receiver_specific: bool,
    key_material_handle: KeyMaterialHandle,
    session_id: u32,
) -> Result<(), SessionKeyError>
where
    K: KeyMaterialLookup + ?Sized,
    H: Hmac + ?Sized,
{
    let material = lookup.key_material(key_material_handle).ok_or_else(|| {
        tracing::error!(key_material_handle, "key material handle is invalid");
        SessionKeyError::NotFound
    })?;

    let kind = TransformationKind::from_bytes(material.transformation_kind());
    let key_len = kind.key_len().ok_or_else(|| {
        tracing::error!(key_material_handle, "transformation kind cannot be none");
        SessionKeyError::BadState
    })?;

    let (label, master_key) = if receiver_specific {
        (SESSION_RECEIVER_KEY_LABEL, material.master_receiver_specific_key())
    } else {
        (SESSION_KEY_LABEL, material.master_sender_key())
    };

    let id_bytes = session_id.to_ne_bytes();
    let mut source = [0u8; MAX_DERIVATION_INPUT];
    let mut len = 0;
    for part in [label, &material.master_salt()[..key_len], &id_bytes[..]] {
        source[len..len + part.len()].copy_from_slice(part);
        len += part.len();
    }

    let result = hmac.hmac_sha256(&master_key[..key_len], &source[..len], output);
    source.zeroize();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::RingCrypto;

    fn store_with(kind: TransformationKind) -> KeyMaterialStore {
        let mut store = KeyMaterialStore::new();
        store.insert(7, KeyMaterial::new(kind, [0xA5; 32], [0x11; 32], [0x22; 32]));
        store
    }

    #[test]
    fn test_key_len_classes() {
        assert_eq!(TransformationKind::None.key_len(), None);
        assert_eq!(TransformationKind::Aes128Gmac.key_len(), Some(16));
        assert_eq!(TransformationKind::Aes128Gcm.key_len(), Some(16));
        assert_eq!(TransformationKind::Aes256Gmac.key_len(), Some(32));
        assert_eq!(TransformationKind::Aes256Gcm.key_len(), Some(32));
        assert_eq!(TransformationKind::Unknown(9).key_len(), Some(32));
        assert_eq!(
            TransformationKind::from_bytes([0, 0, 0, 9]),
            TransformationKind::Unknown(9)
        );
    }

    #[test]
    fn test_derivation_layout_sender_256() {
        let store = store_with(TransformationKind::Aes256Gcm);
        let mut out = [0u8; SESSION_KEY_MAX_SIZE];
        derive_session_key(&store, &RingCrypto, &mut out, false, 7, 0x0102_0304).unwrap();

        let mut data = b"SessionKey".to_vec();
        data.extend_from_slice(&[0xA5; 32]);
        data.extend_from_slice(&0x0102_0304u32.to_ne_bytes());
        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, &[0x11; 32]);
        assert_eq!(&out[..], ring::hmac::sign(&key, &data).as_ref());
    }

    #[test]
    fn test_derivation_layout_receiver_128() {
        let store = store_with(TransformationKind::Aes128Gcm);
        let mut out = [0u8; SESSION_KEY_MAX_SIZE];
        derive_session_key(&store, &RingCrypto, &mut out, true, 7, 42).unwrap();

        let mut data = b"SessionReceiverKey".to_vec();
        data.extend_from_slice(&[0xA5; 16]);
        data.extend_from_slice(&42u32.to_ne_bytes());
        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, &[0x22; 16]);
        assert_eq!(&out[..], ring::hmac::sign(&key, &data).as_ref());
    }

    #[test]
    fn test_none_kind_is_bad_state() {
        let store = store_with(TransformationKind::None);
        let mut out = [0u8; SESSION_KEY_MAX_SIZE];
        let result = derive_session_key(&store, &RingCrypto, &mut out, false, 7, 1);
        assert_eq!(result, Err(SessionKeyError::BadState));
    }

    #[test]
    fn test_unknown_handle_is_not_found() {
        let store = store_with(TransformationKind::Aes256Gcm);
        let mut out = [0u8; SESSION_KEY_MAX_SIZE];
        let result = derive_session_key(&store, &RingCrypto, &mut out, false, 8, 1);
        assert_eq!(result, Err(SessionKeyError::NotFound));
    }
}
