//! Hashed-id resolution across multiple sources, with adversaries,
//! caching, and deadlines.

use crate::{hashed_id, resolver_over, seed_pk_record};

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use keel_core::identity::Keypair;
use keel_core::pk::pk_record_key;
use keel_services::dht::MemorySource;
use keel_services::ResolveError;

#[tokio::test]
async fn honest_record_wins_over_forgeries() {
    let kp = Keypair::generate();
    let id = hashed_id(&kp.public());
    let key = pk_record_key(&id);

    let forger_a = Arc::new(MemorySource::new());
    forger_a.seed(&key, Bytes::from_static(b"i am definitely that peer"));
    let forger_b = Arc::new(MemorySource::new());
    forger_b.seed(&key, Bytes::copy_from_slice(&Keypair::generate().public().to_bytes()));
    let honest = Arc::new(MemorySource::new());
    seed_pk_record(&honest, &id, &kp);

    let resolver = resolver_over(vec![forger_a, forger_b, honest]);
    let resolved = resolver.public_key(&id).await.unwrap();
    assert_eq!(resolved.to_bytes(), kp.public().to_bytes());
}

#[tokio::test]
async fn cached_resolution_is_idempotent_and_fetch_free() {
    let kp = Keypair::generate();
    let id = hashed_id(&kp.public());

    let source = Arc::new(MemorySource::new());
    seed_pk_record(&source, &id, &kp);

    let resolver = resolver_over(vec![Arc::clone(&source)]);
    let first = resolver.public_key(&id).await.unwrap();
    let fetches = source.fetch_count();
    assert!(fetches > 0);

    for _ in 0..5 {
        let again = resolver.public_key(&id).await.unwrap();
        assert_eq!(again, first);
    }
    assert_eq!(source.fetch_count(), fetches);
}

#[tokio::test]
async fn unresponsive_network_fails_within_the_deadline() {
    // Every source is slower than the resolver's 500ms lookup window.
    let slow_a = Arc::new(MemorySource::with_delay(Duration::from_secs(5)));
    let slow_b = Arc::new(MemorySource::with_delay(Duration::from_secs(5)));
    let resolver = resolver_over(vec![slow_a, slow_b]);

    let id = hashed_id(&Keypair::generate().public());
    let start = Instant::now();
    let result = resolver.public_key(&id).await;

    assert!(matches!(result, Err(ResolveError::NotFound(_))));
    assert!(
        start.elapsed() < Duration::from_secs(3),
        "lookup must give up at the deadline, took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn slow_minority_does_not_block_resolution() {
    let kp = Keypair::generate();
    let id = hashed_id(&kp.public());

    let fast = Arc::new(MemorySource::new());
    seed_pk_record(&fast, &id, &kp);
    let stuck = Arc::new(MemorySource::with_delay(Duration::from_secs(30)));

    let resolver = resolver_over(vec![stuck, fast]);
    let resolved = resolver.public_key(&id).await.unwrap();
    assert_eq!(resolved.to_bytes(), kp.public().to_bytes());
}

#[tokio::test]
async fn published_record_resolves_from_a_fresh_resolver() {
    let kp = Keypair::generate();
    let source = Arc::new(MemorySource::new());

    // One node publishes...
    let publisher = resolver_over(vec![Arc::clone(&source)]);
    publisher.publish(&kp).await.unwrap();

    // ...then replicate under the hashed id and resolve from a node
    // with a cold cache.
    let id = hashed_id(&kp.public());
    seed_pk_record(&source, &id, &kp);

    let resolver = resolver_over(vec![source]);
    let resolved = resolver.public_key(&id).await.unwrap();
    assert_eq!(resolved.to_bytes(), kp.public().to_bytes());
}
