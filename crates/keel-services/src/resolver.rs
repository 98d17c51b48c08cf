//! Peer identity resolution — self-certifying fast path, DHT fallback.
//!
//! Resolution of a peer id proceeds in order:
//!
//!   1. embedded extraction — pure, no I/O, never touches the network;
//!   2. cache — keys for a given id are invariant, so a hit is final;
//!   3. DHT fan-out for `/pk/<id>`, gathered candidates filtered
//!      through the namespace validator, survivors arbitrated by the
//!      record store, the winner decoded and cached.
//!
//! Two concurrent lookups for the same id may both query the network;
//! the last insert wins in the cache, which is benign because every
//! valid record for one id decodes to the same key. Cached entries are
//! evicted only on explicit invalidation, never on a timer.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use thiserror::Error;

use keel_core::identity::{Keypair, PeerId, PublicKey};
use keel_core::pk::pk_record_key;

use crate::dht::{DhtClient, DhtError};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no records found for peer {0}")]
    NotFound(PeerId),

    #[error("every record gathered for peer {0} failed validation")]
    NoValidRecords(PeerId),

    #[error("peer id embeds invalid key material")]
    BadKeyMaterial,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct IdentityResolver {
    store: RecordStore,
    dht: Arc<DhtClient>,
    cache: DashMap<PeerId, PublicKey>,
    lookup_timeout: Duration,
}

impl IdentityResolver {
    pub fn new(store: RecordStore, dht: Arc<DhtClient>, lookup_timeout: Duration) -> Self {
        Self {
            store,
            dht,
            cache: DashMap::new(),
            lookup_timeout,
        }
    }

    /// Resolve the public key for a peer id.
    pub async fn public_key(&self, id: &PeerId) -> Result<PublicKey, ResolveError> {
        // Self-certifying ids resolve locally or not at all: a record
        // lookup could never produce a key the id itself contradicts.
        if let PeerId::Embedded(_) = id {
            return id
                .extract_public_key()
                .ok_or(ResolveError::BadKeyMaterial);
        }

        if let Some(hit) = self.cache.get(id) {
            tracing::trace!(peer = %id, "key cache hit");
            return Ok(*hit.value());
        }

        let key = pk_record_key(id);
        let gathered = self.dht.get_values(&key, self.lookup_timeout).await;
        if gathered.is_empty() {
            return Err(ResolveError::NotFound(*id));
        }

        // Selectors assume individually plausible candidates, so the
        // adversarial filtering happens here, in arrival order.
        let valid: Vec<Bytes> = gathered
            .into_iter()
            .filter(|record| match self.store.verify(&key, record) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(peer = %id, error = %e, "dropping invalid record");
                    false
                }
            })
            .collect();
        if valid.is_empty() {
            return Err(ResolveError::NoValidRecords(*id));
        }

        let winner = self.store.best_record(&key, &valid)?;
        let public =
            PublicKey::from_bytes(&valid[winner]).map_err(|_| ResolveError::BadKeyMaterial)?;

        self.cache.insert(*id, public);
        tracing::debug!(peer = %id, candidates = valid.len(), "peer key resolved and cached");
        Ok(public)
    }

    /// Publish our own public-key record under `/pk/<id>`.
    pub async fn publish(&self, keypair: &Keypair) -> Result<(), DhtError> {
        let key = pk_record_key(&keypair.peer_id());
        let record = Bytes::copy_from_slice(&keypair.public().to_bytes());
        self.dht.put_value(&key, record).await
    }

    /// Drop a cached key. Called by the surrounding system on an
    /// authenticated supersession (key rotation), nothing else.
    pub fn invalidate(&self, id: &PeerId) {
        if self.cache.remove(id).is_some() {
            tracing::info!(peer = %id, "cached key invalidated");
        }
    }

    pub fn is_cached(&self, id: &PeerId) -> bool {
        self.cache.contains_key(id)
    }
}
