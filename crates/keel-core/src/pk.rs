//! The `pk` namespace — public-key records bound to peer ids.
//!
//! A record under `/pk/<peer-id>` is valid exactly when its bytes
//! decode to a public key that the peer id certifies. Validity is
//! binary: there is no "newer" public key for a given id, only valid
//! or invalid. Arbitration is therefore order-based — the first
//! candidate of an already-validated list wins.

use std::sync::Arc;

use bytes::Bytes;

use crate::identity::{PeerId, PublicKey};
use crate::key::RecordKey;
use crate::record::{
    RecordSelector, RecordValidator, Registry, RegistryBuilder, RegistryError, SelectionError,
    ValidationError,
};

pub const PK_NAMESPACE: &str = "pk";

const PK_POLICY: &str =
    "any validated public-key record is equally authoritative; first in arrival order wins";

/// The DHT key under which a peer's public key is published.
pub fn pk_record_key(id: &PeerId) -> String {
    format!("/{PK_NAMESPACE}/{id}")
}

/// Validates that a record's bytes are the public key certified by the
/// peer id in the key remainder.
pub struct PublicKeyValidator;

impl RecordValidator for PublicKeyValidator {
    fn validate(&self, key: &RecordKey, record: &[u8]) -> Result<(), ValidationError> {
        let id: PeerId = key
            .remainder()
            .parse()
            .map_err(ValidationError::BadPeerId)?;
        let public = PublicKey::from_bytes(record).map_err(|_| ValidationError::BadKeyMaterial)?;
        if id.matches(&public) {
            Ok(())
        } else {
            Err(ValidationError::KeyMismatch)
        }
    }
}

/// Order-based arbitration: callers hand over candidates that each
/// passed [`PublicKeyValidator`], and all such records are equal in
/// authority, so the first one wins deterministically.
pub struct PublicKeySelector;

impl RecordSelector for PublicKeySelector {
    fn select(&self, _key: &RecordKey, candidates: &[Bytes]) -> Result<usize, SelectionError> {
        if candidates.is_empty() {
            return Err(SelectionError::NoCandidates);
        }
        Ok(0)
    }
}

/// Register the `pk` namespace on a builder.
pub fn register(builder: RegistryBuilder) -> Result<RegistryBuilder, RegistryError> {
    builder.register(
        PK_NAMESPACE,
        Arc::new(PublicKeyValidator),
        Arc::new(PublicKeySelector),
        PK_POLICY,
    )
}

/// The standard registry: every namespace keel ships, registered once.
pub fn default_registry() -> Registry {
    register(RegistryBuilder::new())
        .expect("fresh builder cannot hold duplicates")
        .build()
}
