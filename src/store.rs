//! The session-key context object.
//!
//! [`SessionKeyStore`] owns the handle table and threads it, the key-material
//! lookup and the crypto primitives through every operation. Each instance
//! is independent; nothing here is global.
//!
//! Every operation validates its arguments before touching the table or a
//! primitive. Failures wipe whatever partial output was written, so a caller
//! can never mistake it for a result.

use zeroize::Zeroize;

use crate::audit::{AuditLog, AuditRecord, AuditSink, FileAuditSink, KeyEvent};
use crate::config::StoreConfig;
use crate::crypto::{Aead, AeadMode, Hmac, RingCrypto, SESSION_KEY_MAX_SIZE};
use crate::error::SessionKeyError;
use crate::keys::{self, KeyMaterialHandle, KeyMaterialLookup};
use crate::table::{HandleTable, SessionKeyHandle, MAX_SESSION_KEY_HANDLES};

/// Lengths reported by a successful encrypt or decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transformed {
    /// Valid bytes in the transformed buffer. Always the input length.
    pub data_len: usize,
    /// Tag bytes produced (encrypt) or consumed (decrypt).
    pub tag_len: usize,
}

/// Derives, retains and uses session keys.
///
/// `K` resolves key material, `C` provides HMAC and AEAD, and `N` is the
/// fixed number of session-key slots.
///
/// Mutating operations take `&mut self`; callers sharing a store across
/// threads must wrap it in a lock.
pub struct SessionKeyStore<K, C = RingCrypto, const N: usize = MAX_SESSION_KEY_HANDLES> {
    key_material: K,
    crypto: C,
    table: HandleTable<N>,
    config: StoreConfig,
    audit: AuditLog,
}

impl<K: KeyMaterialLookup> SessionKeyStore<K> {
    /// A store with the default capacity, `ring` primitives and default config.
    pub fn new(key_material: K) -> Self {
        Self::with_crypto(key_material, RingCrypto)
    }
}

impl<K, C, const N: usize> SessionKeyStore<K, C, N>
where
    K: KeyMaterialLookup,
    C: Hmac + Aead,
{
    /// A store using the given primitives and default config.
    pub fn with_crypto(key_material: K, crypto: C) -> Self {
        Self {
            key_material,
            crypto,
            table: HandleTable::new(),
            config: StoreConfig::default(),
            audit: AuditLog::new(),
        }
    }

    /// A store using the given primitives and config.
    ///
    /// Attaches a [`FileAuditSink`] when `config.audit_log_path` is set.
    pub fn with_config(
        key_material: K,
        crypto: C,
        config: StoreConfig,
    ) -> Result<Self, SessionKeyError> {
        config.validate()?;

        let mut store = Self::with_crypto(key_material, crypto);
        if let Some(path) = &config.audit_log_path {
            let sink = FileAuditSink::new(path).map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "cannot open audit log");
                SessionKeyError::Config(e.to_string())
            })?;
            store.audit.add_forward_sink(Box::new(sink));
        }
        store.config = config;
        Ok(store)
    }

    /// The active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The key-material lookup.
    pub fn key_material(&self) -> &K {
        &self.key_material
    }

    /// Mutable access to the key-material lookup, e.g. to register material.
    pub fn key_material_mut(&mut self) -> &mut K {
        &mut self.key_material
    }

    /// The primitives in use.
    pub fn crypto(&self) -> &C {
        &self.crypto
    }

    /// The lifecycle audit log.
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Forward every future audit record to `sink`.
    pub fn add_audit_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.audit.add_forward_sink(sink);
    }

    /// Number of session-key slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Number of live session keys.
    pub fn live_handles(&self) -> usize {
        self.table.live()
    }

    /// True iff `handle` still names a live session key.
    pub fn is_valid(&self, handle: SessionKeyHandle) -> bool {
        self.table.is_valid(handle)
    }

    /// Resolve a raw slot index to its live handle.
    pub fn resolve(&self, raw_index: i32) -> Option<SessionKeyHandle> {
        self.table.resolve(raw_index)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Derive a session key straight into `output` without retaining it.
    ///
    /// Returns the number of bytes written, always [`SESSION_KEY_MAX_SIZE`].
    ///
    /// # Errors
    /// - `ShortBuffer` if `output` is smaller than [`SESSION_KEY_MAX_SIZE`].
    /// - Any derivation error; the output prefix is wiped in that case.
    pub fn create_and_get(
        &mut self,
        output: &mut [u8],
        key_material_handle: KeyMaterialHandle,
        session_id: u32,
        receiver_specific: bool,
    ) -> Result<usize, SessionKeyError> {
        if output.len() < SESSION_KEY_MAX_SIZE {
            tracing::error!(len = output.len(), "given buffer is too small");
            return Err(SessionKeyError::ShortBuffer);
        }

        let out: &mut [u8; SESSION_KEY_MAX_SIZE] = (&mut output[..SESSION_KEY_MAX_SIZE])
            .try_into()
            .map_err(|_| SessionKeyError::BadParameters)?;

        if let Err(e) = keys::derive_session_key(
            &self.key_material,
            &self.crypto,
            out,
            receiver_specific,
            key_material_handle,
            session_id,
        ) {
            out.zeroize();
            return Err(e);
        }

        tracing::debug!(key_material_handle, session_id, receiver_specific, "session key exported");
        self.audit.append(AuditRecord::derived(
            KeyEvent::Exported,
            None,
            key_material_handle,
            session_id,
            receiver_specific,
        ));
        Ok(SESSION_KEY_MAX_SIZE)
    }

    /// Derive a session key into a free table slot and return its handle.
    ///
    /// # Errors
    /// - `ResourceExhausted` if every slot is live.
    /// - Any derivation error; the slot stays free in that case.
    pub fn create(
        &mut self,
        key_material_handle: KeyMaterialHandle,
        session_id: u32,
        receiver_specific: bool,
    ) -> Result<SessionKeyHandle, SessionKeyError> {
        let index = self.table.allocate().ok_or_else(|| {
            tracing::warn!(capacity = N, "no free session key slot");
            SessionKeyError::ResourceExhausted
        })?;

        let lookup = &self.key_material;
        let hmac = &self.crypto;
        let handle = self.table.initialize(index, |slot| {
            keys::derive_session_key(
                lookup,
                hmac,
                slot,
                receiver_specific,
                key_material_handle,
                session_id,
            )
        })?;

        tracing::debug!(
            index = handle.index(),
            key_material_handle,
            session_id,
            receiver_specific,
            "session key created"
        );
        self.audit.append(AuditRecord::derived(
            KeyEvent::Created,
            Some(handle.index()),
            key_material_handle,
            session_id,
            receiver_specific,
        ));
        Ok(handle)
    }

    /// Wipe a session key and free its slot.
    ///
    /// The index may later be handed out again; `handle` itself never
    /// becomes valid again.
    ///
    /// # Errors
    /// - `NotFound` if `handle` is not live.
    pub fn delete(&mut self, handle: SessionKeyHandle) -> Result<(), SessionKeyError> {
        self.table.release(handle).map_err(|e| {
            tracing::error!(
                index = handle.index(),
                "requested handle is uninitialized or out-of-bounds"
            );
            e
        })?;

        tracing::debug!(index = handle.index(), "session key deleted");
        self.audit.append(AuditRecord::deleted(handle.index()));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transforms
    // -----------------------------------------------------------------------

    /// Authenticate and encrypt `buffer` in place, writing the tag to `tag`.
    ///
    /// Uses the first `key_len` bytes of the session key.
    pub fn encrypt(
        &self,
        handle: SessionKeyHandle,
        key_len: usize,
        iv: &[u8],
        buffer: &mut [u8],
        tag: &mut [u8],
    ) -> Result<Transformed, SessionKeyError> {
        self.transform(AeadMode::Encrypt, handle, key_len, iv, buffer, tag)
    }

    /// Authenticate and decrypt `buffer` in place, verifying `tag`.
    ///
    /// Uses the first `key_len` bytes of the session key.
    pub fn decrypt(
        &self,
        handle: SessionKeyHandle,
        key_len: usize,
        iv: &[u8],
        buffer: &mut [u8],
        tag: &mut [u8],
    ) -> Result<Transformed, SessionKeyError> {
        self.transform(AeadMode::Decrypt, handle, key_len, iv, buffer, tag)
    }

    /// Shared path for both directions; the mode only reaches the primitive.
    ///
    /// # Errors
    /// - `BadParameters` if the handle is not live, `key_len` is zero or
    ///   larger than the session key, `tag`, `iv` or `buffer` is empty, or
    ///   `buffer` exceeds the configured shared output size. No primitive is
    ///   invoked in these cases.
    /// - The primitive's error otherwise; `buffer` and `tag` are wiped.
    fn transform(
        &self,
        mode: AeadMode,
        handle: SessionKeyHandle,
        key_len: usize,
        iv: &[u8],
        buffer: &mut [u8],
        tag: &mut [u8],
    ) -> Result<Transformed, SessionKeyError> {
        let key = match self.table.key(handle) {
            Some(key)
                if !tag.is_empty()
                    && key_len > 0
                    && key_len <= SESSION_KEY_MAX_SIZE
                    && !buffer.is_empty()
                    && buffer.len() <= self.config.shared_output_size
                    && !iv.is_empty() =>
            {
                key
            }
            _ => {
                tracing::error!(
                    index = handle.index(),
                    key_len,
                    buffer_len = buffer.len(),
                    tag_len = tag.len(),
                    iv_len = iv.len(),
                    "session key handle or transform parameters are invalid"
                );
                return Err(SessionKeyError::BadParameters);
            }
        };

        match self.crypto.transform(mode, &key[..key_len], iv, buffer, tag) {
            Ok(tag_len) => Ok(Transformed {
                data_len: buffer.len(),
                tag_len,
            }),
            Err(e) => {
                tracing::error!(index = handle.index(), ?mode, error = %e, "transform failed");
                buffer.zeroize();
                tag.zeroize();
                Err(e)
            }
        }
    }
}
