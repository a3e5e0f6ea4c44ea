mod common;

use common::{counting_store, KM_256, KM_NONE};
use ddskeys::boundary::{Command, Memref, Param, INVALID_INDEX};
use ddskeys::{SessionKeyError, AEAD_IV_LEN, AEAD_TAG_LEN, SESSION_KEY_MAX_SIZE};

fn create(
    store: &mut ddskeys::SessionKeyStore<ddskeys::KeyMaterialStore, common::CountingCrypto, 2>,
    km: i32,
    session_id: u32,
) -> (Result<(), SessionKeyError>, i32) {
    let mut params = [
        Param::ValueOutput { a: 0, b: 0 },
        Param::ValueInput { a: km as u32, b: 0 },
        Param::ValueInput { a: session_id, b: 1 },
        Param::None,
    ];
    let result = store.invoke(Command::SessionKeyCreate, &mut params);
    let index = match params[0] {
        Param::ValueOutput { a, .. } => a as i32,
        _ => unreachable!(),
    };
    (result, index)
}

#[test]
fn test_shape_mismatch_is_rejected_without_side_effects() {
    let mut store = counting_store::<2>();
    let mut key = [0u8; SESSION_KEY_MAX_SIZE];

    // Value output where a memref output is expected.
    let mut params = [
        Param::ValueOutput { a: 0, b: 0 },
        Param::ValueInput { a: KM_256 as u32, b: 0 },
        Param::ValueInput { a: 1, b: 0 },
        Param::None,
    ];
    assert_eq!(
        store.invoke(Command::SessionKeyCreateAndGet, &mut params),
        Err(SessionKeyError::BadParameters)
    );

    // Extra trailing parameter.
    let mut params = [
        Param::ValueOutput { a: 0, b: 0 },
        Param::ValueInput { a: KM_256 as u32, b: 0 },
        Param::ValueInput { a: 1, b: 0 },
        Param::MemrefInput(Memref::new(&mut key)),
    ];
    assert_eq!(
        store.invoke(Command::SessionKeyCreate, &mut params),
        Err(SessionKeyError::BadParameters)
    );
    match &params[0] {
        Param::ValueOutput { a, .. } => assert_eq!(*a, 0),
        _ => unreachable!(),
    }

    assert_eq!(store.live_handles(), 0);
    assert_eq!(store.crypto().hmac_calls(), 0);
    assert!(store.audit_log().is_empty());
}

#[test]
fn test_create_and_get_reports_written_size() {
    let mut store = counting_store::<2>();
    let mut key = [0u8; 48];
    let mut params = [
        Param::MemrefOutput(Memref::new(&mut key)),
        Param::ValueInput { a: KM_256 as u32, b: 0 },
        Param::ValueInput { a: 9, b: 0 },
        Param::None,
    ];
    store.invoke(Command::SessionKeyCreateAndGet, &mut params).unwrap();
    match &params[0] {
        Param::MemrefOutput(out) => assert_eq!(out.size, SESSION_KEY_MAX_SIZE),
        _ => unreachable!(),
    }
}

#[test]
fn test_create_and_get_failures_report_zero() {
    let mut store = counting_store::<2>();

    let mut small = [0u8; SESSION_KEY_MAX_SIZE - 1];
    let mut params = [
        Param::MemrefOutput(Memref::new(&mut small)),
        Param::ValueInput { a: KM_256 as u32, b: 0 },
        Param::ValueInput { a: 9, b: 0 },
        Param::None,
    ];
    assert_eq!(
        store.invoke(Command::SessionKeyCreateAndGet, &mut params),
        Err(SessionKeyError::ShortBuffer)
    );
    match &params[0] {
        Param::MemrefOutput(out) => assert_eq!(out.size, 0),
        _ => unreachable!(),
    }

    let mut key = [0u8; SESSION_KEY_MAX_SIZE];
    let mut params = [
        Param::MemrefOutput(Memref::new(&mut key)),
        Param::ValueInput { a: KM_NONE as u32, b: 0 },
        Param::ValueInput { a: 9, b: 0 },
        Param::None,
    ];
    assert_eq!(
        store.invoke(Command::SessionKeyCreateAndGet, &mut params),
        Err(SessionKeyError::BadState)
    );
    match &params[0] {
        Param::MemrefOutput(out) => assert_eq!(out.size, 0),
        _ => unreachable!(),
    }
}

#[test]
fn test_create_reports_minus_one_on_failure() {
    let mut store = counting_store::<2>();
    assert_eq!(create(&mut store, KM_256, 1), (Ok(()), 0));
    assert_eq!(create(&mut store, KM_256, 2), (Ok(()), 1));
    assert_eq!(
        create(&mut store, KM_256, 3),
        (Err(SessionKeyError::ResourceExhausted), INVALID_INDEX)
    );
    assert_eq!(
        create(&mut store, 77, 3),
        (Err(SessionKeyError::ResourceExhausted), INVALID_INDEX)
    );
}

#[test]
fn test_delete_by_raw_index() {
    let mut store = counting_store::<2>();
    let (_, index) = create(&mut store, KM_256, 1);

    let mut params = [
        Param::ValueInput { a: index as u32, b: 0 },
        Param::None,
        Param::None,
        Param::None,
    ];
    store.invoke(Command::SessionKeyDelete, &mut params).unwrap();
    assert_eq!(store.live_handles(), 0);
    assert_eq!(
        store.invoke(Command::SessionKeyDelete, &mut params),
        Err(SessionKeyError::NotFound)
    );

    for raw in [-1i32, 2, i32::MAX] {
        let mut params = [
            Param::ValueInput { a: raw as u32, b: 0 },
            Param::None,
            Param::None,
            Param::None,
        ];
        assert_eq!(
            store.invoke(Command::SessionKeyDelete, &mut params),
            Err(SessionKeyError::NotFound)
        );
    }
}

#[test]
fn test_encrypt_decrypt_through_boundary() {
    let mut store = counting_store::<2>();
    let (_, index) = create(&mut store, KM_256, 1);

    let plaintext = b"boundary payload".to_vec();
    let mut data = plaintext.clone();
    let mut tag = [0u8; AEAD_TAG_LEN + 4];
    let mut iv = [3u8; AEAD_IV_LEN];

    let mut params = [
        Param::MemrefInout(Memref::new(&mut data)),
        Param::MemrefOutput(Memref::new(&mut tag)),
        Param::ValueInput { a: index as u32, b: 32 },
        Param::MemrefInput(Memref::new(&mut iv)),
    ];
    store.invoke(Command::SessionKeyEncrypt, &mut params).unwrap();
    match &params[1] {
        Param::MemrefOutput(out) => assert_eq!(out.size, AEAD_TAG_LEN),
        _ => unreachable!(),
    }
    drop(params);
    assert_ne!(data, plaintext);

    // Decrypt takes the tag as an input memref.
    let mut params = [
        Param::MemrefInout(Memref::new(&mut data)),
        Param::MemrefInput(Memref::new(&mut tag[..AEAD_TAG_LEN])),
        Param::ValueInput { a: index as u32, b: 32 },
        Param::MemrefInput(Memref::new(&mut iv)),
    ];
    store.invoke(Command::SessionKeyDecrypt, &mut params).unwrap();
    drop(params);
    assert_eq!(data, plaintext);
    assert_eq!(store.crypto().aead_calls(), 2);
}

#[test]
fn test_decrypt_rejects_encrypt_shape() {
    let mut store = counting_store::<2>();
    let (_, index) = create(&mut store, KM_256, 1);

    let mut data = [1u8; 8];
    let mut tag = [0u8; AEAD_TAG_LEN];
    let mut iv = [3u8; AEAD_IV_LEN];
    let mut params = [
        Param::MemrefInout(Memref::new(&mut data)),
        Param::MemrefOutput(Memref::new(&mut tag)),
        Param::ValueInput { a: index as u32, b: 32 },
        Param::MemrefInput(Memref::new(&mut iv)),
    ];
    assert_eq!(
        store.invoke(Command::SessionKeyDecrypt, &mut params),
        Err(SessionKeyError::BadParameters)
    );
    assert_eq!(store.crypto().aead_calls(), 0);
}

#[test]
fn test_transform_with_invalid_index_reports_zero_sizes() {
    let mut store = counting_store::<2>();

    let mut data = [1u8; 8];
    let mut tag = [0u8; AEAD_TAG_LEN];
    let mut iv = [3u8; AEAD_IV_LEN];
    let mut params = [
        Param::MemrefInout(Memref::new(&mut data)),
        Param::MemrefOutput(Memref::new(&mut tag)),
        Param::ValueInput { a: 1, b: 32 },
        Param::MemrefInput(Memref::new(&mut iv)),
    ];
    assert_eq!(
        store.invoke(Command::SessionKeyEncrypt, &mut params),
        Err(SessionKeyError::BadParameters)
    );
    match &params {
        [Param::MemrefInout(data), Param::MemrefOutput(tag), ..] => {
            assert_eq!((data.size, tag.size), (0, 0));
        }
        _ => unreachable!(),
    }
    assert_eq!(store.crypto().aead_calls(), 0);
}
