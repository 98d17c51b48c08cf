//! Backend lifecycle and content addressing through the by-name factory.

use crate::temp_dir;

use keel_services::{Backend, BackendError};

#[test]
fn disk_backend_survives_a_reopen() {
    let dir = temp_dir("reopen");

    let hash = {
        let backend = Backend::init_by_name("disk", &dir).unwrap();
        backend.put(b"persistent block").unwrap()
    };

    // A second process opening the same state dir sees the block.
    let backend = Backend::init_by_name("disk", &dir).unwrap();
    assert!(backend.has(&hash));
    assert_eq!(
        &backend.get(&hash).unwrap().unwrap()[..],
        b"persistent block"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn init_is_idempotent_over_existing_state() {
    let dir = temp_dir("idempotent");

    let backend = Backend::init_by_name("disk", &dir).unwrap();
    let hash = backend.put(b"kept").unwrap();

    // Re-running init must not disturb stored blocks.
    backend.init(&dir).unwrap();
    let again = Backend::init_by_name("disk", &dir).unwrap();
    assert!(again.has(&hash));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn blocks_are_content_addressed() {
    let backend = Backend::memory();

    let h1 = backend.put(b"same bytes").unwrap();
    let h2 = backend.put(b"same bytes").unwrap();
    let h3 = backend.put(b"other bytes").unwrap();

    assert_eq!(h1, h2);
    assert_ne!(h1, h3);
    assert_eq!(h1, <[u8; 32]>::from(blake3::hash(b"same bytes")));
}

#[test]
fn backend_names_resolve_like_config_values() {
    let dir = temp_dir("names");

    assert!(Backend::is_valid_name("disk"));
    assert!(Backend::is_valid_name("memory"));
    assert!(!Backend::is_valid_name("sqlite"));

    let err = Backend::by_name("sqlite", &dir).unwrap_err();
    assert_eq!(err, BackendError::NoSuchBackend("sqlite".to_string()));

    let _ = std::fs::remove_dir_all(&dir);
}
