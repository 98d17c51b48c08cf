//! The record store — the single point of conflict resolution.
//!
//! A DHT lookup legitimately returns several byte-strings for one key:
//! stale copies, duplicates, forgeries. Every caller that holds more
//! than one candidate routes through [`RecordStore::best_record`]
//! instead of inventing its own tie-breaking; the namespace named by
//! the key decides what "best" means.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use keel_core::key::{KeyError, RecordKey};
use keel_core::record::{Registry, RegistryError, SelectionError, ValidationError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    MalformedKey(#[from] KeyError),

    #[error("no candidate records")]
    NoRecords,

    #[error(transparent)]
    UnknownNamespace(#[from] RegistryError),

    #[error("selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Façade over the namespace registry.
#[derive(Clone)]
pub struct RecordStore {
    registry: Arc<Registry>,
}

impl RecordStore {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Pick the authoritative record among `candidates` for `key`.
    ///
    /// Step order is part of the contract: a malformed key fails before
    /// anything else; an empty candidate set fails before the registry
    /// is consulted; an unregistered namespace fails before the
    /// selector runs. On success the returned index is in bounds.
    pub fn best_record(&self, key: &str, candidates: &[Bytes]) -> Result<usize, StoreError> {
        let parsed = RecordKey::parse(key)?;
        if candidates.is_empty() {
            return Err(StoreError::NoRecords);
        }
        let namespace = self.registry.lookup(parsed.namespace())?;
        let winner = namespace.selector().select(&parsed, candidates)?;
        debug_assert!(winner < candidates.len());
        tracing::trace!(key, candidates = candidates.len(), winner, "record selected");
        Ok(winner)
    }

    /// Run the key's namespace validator over a single candidate.
    ///
    /// Callers gathering raw records from the network filter through
    /// this before selection — selectors are entitled to assume every
    /// candidate they see is individually plausible.
    pub fn verify(&self, key: &str, record: &[u8]) -> Result<(), StoreError> {
        let parsed = RecordKey::parse(key)?;
        let namespace = self.registry.lookup(parsed.namespace())?;
        namespace.validator().validate(&parsed, record)?;
        Ok(())
    }
}
