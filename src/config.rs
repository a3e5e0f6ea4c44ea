//! Store configuration.
//!
//! Loaded from JSON. Every field has a default, so an empty object is a
//! valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SessionKeyError;

/// Default ceiling on the size of a buffer handed to encrypt/decrypt.
pub const AEAD_SHARED_OUTPUT_SIZE: usize = 4096;

/// Runtime settings for a [`crate::SessionKeyStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Largest buffer accepted by encrypt/decrypt.
    pub shared_output_size: usize,
    /// When set, lifecycle audit records are appended to this file as JSON lines.
    pub audit_log_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shared_output_size: AEAD_SHARED_OUTPUT_SIZE,
            audit_log_path: None,
        }
    }
}

impl StoreConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, SessionKeyError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SessionKeyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SessionKeyError> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SessionKeyError::Config(e.to_string()))?;
        Self::from_json_str(&json)
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<(), SessionKeyError> {
        if self.shared_output_size == 0 {
            return Err(SessionKeyError::Config(
                "shared_output_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
