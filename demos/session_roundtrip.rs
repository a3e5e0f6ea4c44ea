//! Two participants sharing key material derive the same receiver-specific
//! session key and exchange one protected payload.

use ddskeys::{
    KeyMaterial, KeyMaterialStore, SessionKeyStore, TransformationKind, AEAD_IV_LEN, AEAD_TAG_LEN,
};

const KM: i32 = 1;

fn shared_key_material() -> KeyMaterialStore {
    // In a real deployment this arrives through the key exchange.
    let mut store = KeyMaterialStore::new();
    store.insert(
        KM,
        KeyMaterial::new(TransformationKind::Aes256Gcm, [0x42; 32], [0x17; 32], [0x99; 32]),
    );
    store
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut writer = SessionKeyStore::new(shared_key_material());
    let mut reader = SessionKeyStore::new(shared_key_material());

    let session_id = 1;
    let tx = writer.create(KM, session_id, true)?;
    let rx = reader.create(KM, session_id, true)?;
    println!("writer slot {}, reader slot {}", tx.index(), rx.index());

    let iv = [0x01; AEAD_IV_LEN];
    let mut tag = [0u8; AEAD_TAG_LEN];
    let mut payload = b"temperature=21.5".to_vec();

    writer.encrypt(tx, 32, &iv, &mut payload, &mut tag)?;
    println!("ciphertext: {:02x?}", payload);

    reader.decrypt(rx, 32, &iv, &mut payload, &mut tag)?;
    println!("plaintext:  {}", String::from_utf8_lossy(&payload));

    writer.delete(tx)?;
    reader.delete(rx)?;
    println!("audit records: {}", writer.audit_log().len());
    Ok(())
}
