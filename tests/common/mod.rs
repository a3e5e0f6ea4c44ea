//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use ddskeys::crypto::{Aead, AeadMode, Hmac, RingCrypto};
use ddskeys::{
    KeyMaterial, KeyMaterialHandle, KeyMaterialStore, SessionKeyError, SessionKeyStore,
    TransformationKind, SESSION_KEY_MAX_SIZE,
};

pub const KM_256: KeyMaterialHandle = 1;
pub const KM_128: KeyMaterialHandle = 2;
pub const KM_NONE: KeyMaterialHandle = 3;
pub const KM_SAME_KEYS: KeyMaterialHandle = 4;

/// Route library logs to the test harness output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Key material covering every transformation class.
pub fn key_material() -> KeyMaterialStore {
    let mut store = KeyMaterialStore::new();
    store.insert(
        KM_256,
        KeyMaterial::new(TransformationKind::Aes256Gcm, [0x10; 32], [0x20; 32], [0x30; 32]),
    );
    store.insert(
        KM_128,
        KeyMaterial::new(TransformationKind::Aes128Gcm, [0x11; 32], [0x21; 32], [0x31; 32]),
    );
    store.insert(
        KM_NONE,
        KeyMaterial::new(TransformationKind::None, [0x12; 32], [0x22; 32], [0x32; 32]),
    );
    store.insert(
        KM_SAME_KEYS,
        KeyMaterial::new(TransformationKind::Aes256Gcm, [0x13; 32], [0x44; 32], [0x44; 32]),
    );
    store
}

/// `ring` primitives that count how often each one is invoked.
#[derive(Default)]
pub struct CountingCrypto {
    pub hmac_calls: AtomicUsize,
    pub aead_calls: AtomicUsize,
}

impl CountingCrypto {
    pub fn aead_calls(&self) -> usize {
        self.aead_calls.load(Ordering::SeqCst)
    }

    pub fn hmac_calls(&self) -> usize {
        self.hmac_calls.load(Ordering::SeqCst)
    }
}

impl Hmac for CountingCrypto {
    fn hmac_sha256(
        &self,
        key: &[u8],
        data: &[u8],
        out: &mut [u8; SESSION_KEY_MAX_SIZE],
    ) -> Result<(), SessionKeyError> {
        self.hmac_calls.fetch_add(1, Ordering::SeqCst);
        RingCrypto.hmac_sha256(key, data, out)
    }
}

impl Aead for CountingCrypto {
    fn transform(
        &self,
        mode: AeadMode,
        key: &[u8],
        iv: &[u8],
        in_out: &mut [u8],
        tag: &mut [u8],
    ) -> Result<usize, SessionKeyError> {
        self.aead_calls.fetch_add(1, Ordering::SeqCst);
        RingCrypto.transform(mode, key, iv, in_out, tag)
    }
}

pub fn counting_store<const N: usize>() -> SessionKeyStore<KeyMaterialStore, CountingCrypto, N> {
    SessionKeyStore::with_crypto(key_material(), CountingCrypto::default())
}
