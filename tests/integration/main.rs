//! Cross-crate integration tests.
//!
//! These wire the real components together — registry, record store,
//! DHT client over in-process sources, resolver, backends — and check
//! the end-to-end behavior a node relies on. No network, no daemon.

mod arbitration;
mod identity;
mod password;
mod resolution;
mod storage;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use keel_core::identity::{Keypair, PeerId, PublicKey};
use keel_core::pk::{default_registry, pk_record_key};
use keel_services::dht::MemorySource;
use keel_services::{DhtClient, IdentityResolver, RecordSource, RecordStore};

static DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh scratch directory under /tmp. Callers clean up themselves.
pub fn temp_dir(tag: &str) -> PathBuf {
    let id = DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "keel-integration-{}-{}-{}",
        tag,
        std::process::id(),
        id
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

pub fn pk_store() -> RecordStore {
    RecordStore::new(Arc::new(default_registry()))
}

/// Resolver over the given in-process sources, default-ish DHT tuning.
pub fn resolver_over(sources: Vec<Arc<MemorySource>>) -> IdentityResolver {
    let sources: Vec<Arc<dyn RecordSource>> = sources
        .into_iter()
        .map(|s| s as Arc<dyn RecordSource>)
        .collect();
    let dht = Arc::new(DhtClient::new(sources, 16, 8));
    IdentityResolver::new(pk_store(), dht, Duration::from_millis(500))
}

/// The non-self-certifying form of a key's peer id.
pub fn hashed_id(public: &PublicKey) -> PeerId {
    PeerId::Hashed(*blake3::hash(&public.to_bytes()).as_bytes())
}

/// Seed a source with the correct public-key record for a peer id.
pub fn seed_pk_record(source: &MemorySource, id: &PeerId, kp: &Keypair) {
    source.seed(
        &pk_record_key(id),
        Bytes::copy_from_slice(&kp.public().to_bytes()),
    );
}
