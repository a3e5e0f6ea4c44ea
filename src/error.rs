//! Error types for ddskeys.
//!
//! Each variant is a distinct failure mode of the session-key component.
//! Messages say *what* failed and nothing more: no key bytes, salts or
//! buffer contents ever end up in an error.

use std::fmt;

/// The single error type for all ddskeys operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKeyError {
    /// The call was malformed: wrong parameter shape, empty or oversized
    /// buffers, or a session-key handle that is not live.
    BadParameters,

    /// The referenced key material or session-key handle does not exist.
    NotFound,

    /// The operation is invalid for the current data, e.g. deriving a
    /// session key from key material whose transformation kind is "none".
    BadState,

    /// A caller-supplied output buffer cannot hold the guaranteed output.
    ShortBuffer,

    /// Every slot of the session-key table is in use.
    ResourceExhausted,

    /// A key handed to a primitive had an unsupported length.
    InvalidKey,

    /// Authenticated encryption failed.
    EncryptionFailure,

    /// Authenticated decryption failed: wrong key, wrong IV, tampered
    /// ciphertext or tag.
    DecryptionFailure,

    /// The HMAC primitive failed to produce a session key.
    KeyDerivationFailure,

    /// Configuration could not be loaded or is out of range.
    Config(String),
}

impl SessionKeyError {
    /// The TEE-style result code reported across the trust boundary.
    pub fn code(&self) -> u32 {
        match self {
            Self::BadParameters => 0xFFFF_0006,
            Self::NotFound => 0xFFFF_0008,
            Self::BadState => 0xFFFF_0007,
            Self::ShortBuffer => 0xFFFF_0010,
            Self::ResourceExhausted => 0xFFFF_000B,
            Self::InvalidKey
            | Self::EncryptionFailure
            | Self::KeyDerivationFailure
            | Self::Config(_) => 0xFFFF_0000,
            Self::DecryptionFailure => 0xFFFF_3071,
        }
    }
}

impl fmt::Display for SessionKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadParameters => write!(f, "bad parameters"),
            Self::NotFound => write!(f, "not found"),
            Self::BadState => write!(f, "bad state"),
            Self::ShortBuffer => write!(f, "short buffer"),
            Self::ResourceExhausted => write!(f, "session key table exhausted"),
            Self::InvalidKey => write!(f, "invalid key"),
            Self::EncryptionFailure => write!(f, "encryption failed"),
            Self::DecryptionFailure => write!(f, "decryption failed"),
            Self::KeyDerivationFailure => write!(f, "key derivation failed"),
            Self::Config(reason) => write!(f, "invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for SessionKeyError {}
