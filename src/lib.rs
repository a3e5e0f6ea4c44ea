//! # ddskeys
//!
//! Session-key derivation and in-place AEAD transforms for DDS Security.
//!
//! Two endpoints that share master key material each derive the same
//! per-session key from a master key, a role-specific label, the master salt
//! and a session id, without ever exchanging the derived key. Derived keys
//! either go straight back to the caller or are retained in a bounded table
//! and referenced by handle for later encrypt/decrypt calls.
//!
//! ## Public API
//!
//! - [`SessionKeyStore`]: the context object holding the handle table.
//! - [`KeyMaterial`], [`KeyMaterialStore`], [`KeyMaterialLookup`]: master
//!   key material and how the store finds it.
//! - [`derive_session_key`]: the bare derivation, for callers that manage
//!   key lifetime themselves.
//! - [`boundary`]: the four-slot command surface used across the trust
//!   boundary.
//! - [`crypto`]: the HMAC and AEAD primitive traits and their `ring`
//!   implementation.

pub mod audit;
pub mod boundary;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod store;
pub(crate) mod table;

pub use config::{StoreConfig, AEAD_SHARED_OUTPUT_SIZE};
pub use crypto::{AeadMode, RingCrypto, AEAD_IV_LEN, AEAD_TAG_LEN, SESSION_KEY_MAX_SIZE};
pub use error::SessionKeyError;
pub use keys::{
    derive_session_key, KeyMaterial, KeyMaterialHandle, KeyMaterialLookup, KeyMaterialStore,
    TransformationKind,
};
pub use store::{SessionKeyStore, Transformed};
pub use table::{SessionKeyHandle, MAX_SESSION_KEY_HANDLES};
