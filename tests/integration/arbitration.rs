//! Record arbitration through the full registry + store stack.

use crate::pk_store;

use std::sync::Arc;

use bytes::Bytes;
use keel_core::identity::Keypair;
use keel_core::key::RecordKey;
use keel_core::pk::{self, pk_record_key};
use keel_core::record::{
    RecordSelector, RecordValidator, RegistryBuilder, SelectionError, ValidationError,
};
use keel_services::{RecordStore, StoreError};

#[test]
fn pk_records_arbitrate_end_to_end() {
    let store = pk_store();
    let kp = Keypair::generate();
    let key = pk_record_key(&kp.peer_id());

    let record = Bytes::copy_from_slice(&kp.public().to_bytes());
    let winner = store.best_record(&key, &[record.clone()]).unwrap();
    assert_eq!(winner, 0);

    // Identical replicas from several peers: first arrival wins.
    let winner = store
        .best_record(&key, &[record.clone(), record.clone(), record])
        .unwrap();
    assert_eq!(winner, 0);
}

#[test]
fn malformed_keys_never_reach_a_selector() {
    let store = pk_store();
    let record = Bytes::from_static(b"irrelevant");

    for bad in ["pk/abc", "/pk", "//pk/abc", "", "/", "pk"] {
        let err = store.best_record(bad, &[record.clone()]).unwrap_err();
        assert!(
            matches!(err, StoreError::MalformedKey(_)),
            "key {bad:?} should be malformed, got {err:?}"
        );
    }
}

#[test]
fn unknown_namespace_is_rejected() {
    let store = pk_store();
    let err = store
        .best_record("/ipns/whatever", &[Bytes::from_static(b"x")])
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownNamespace(_)));
}

#[test]
fn empty_candidate_list_is_rejected_before_lookup() {
    let store = pk_store();
    // Namespace is unknown too, but the empty list is checked first.
    let err = store.best_record("/ipns/whatever", &[]).unwrap_err();
    assert!(matches!(err, StoreError::NoRecords));
}

// A second namespace alongside `pk`, to exercise the extension point
// the registry exists for.

struct Utf8Validator;

impl RecordValidator for Utf8Validator {
    fn validate(&self, _key: &RecordKey, record: &[u8]) -> Result<(), ValidationError> {
        std::str::from_utf8(record)
            .map(|_| ())
            .map_err(|_| ValidationError::Invalid("not utf-8".to_string()))
    }
}

struct LongestWins;

impl RecordSelector for LongestWins {
    fn select(&self, _key: &RecordKey, candidates: &[Bytes]) -> Result<usize, SelectionError> {
        candidates
            .iter()
            .enumerate()
            .max_by_key(|(_, c)| c.len())
            .map(|(i, _)| i)
            .ok_or(SelectionError::NoCandidates)
    }
}

#[test]
fn registry_dispatches_per_namespace() {
    let builder = RegistryBuilder::new()
        .register(
            "note",
            Arc::new(Utf8Validator),
            Arc::new(LongestWins),
            "longest valid utf-8 record wins",
        )
        .unwrap();
    let registry = pk::register(builder).unwrap().build();
    let store = RecordStore::new(Arc::new(registry));

    // The note namespace picks by length...
    let winner = store
        .best_record(
            "/note/x",
            &[
                Bytes::from_static(b"short"),
                Bytes::from_static(b"much longer note"),
                Bytes::from_static(b"mid note"),
            ],
        )
        .unwrap();
    assert_eq!(winner, 1);

    // ...while pk still picks by order, through the same store.
    let kp = Keypair::generate();
    let record = Bytes::copy_from_slice(&kp.public().to_bytes());
    let winner = store
        .best_record(&pk_record_key(&kp.peer_id()), &[record])
        .unwrap();
    assert_eq!(winner, 0);
}

#[test]
fn verify_applies_the_namespace_validator() {
    let store = pk_store();
    let kp = Keypair::generate();
    let key = pk_record_key(&kp.peer_id());

    store.verify(&key, &kp.public().to_bytes()).unwrap();
    assert!(store.verify(&key, b"not a key").is_err());

    // Valid key material under the wrong id fails too.
    let other = Keypair::generate();
    assert!(store.verify(&key, &other.public().to_bytes()).is_err());
}
