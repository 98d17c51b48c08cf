//! Self-certifying identity round trips.

use crate::resolver_over;

use std::sync::Arc;

use keel_core::identity::{Keypair, PeerId, PublicKey};
use keel_services::dht::MemorySource;

#[test]
fn key_to_id_to_key_is_byte_identical() {
    for _ in 0..16 {
        let kp = Keypair::generate();
        let id = kp.peer_id();

        let recovered = id.extract_public_key().expect("embedded id carries its key");
        assert_eq!(recovered.to_bytes(), kp.public().to_bytes());
    }
}

#[test]
fn id_survives_its_string_form() {
    let kp = Keypair::generate();
    let id = kp.peer_id();

    let parsed: PeerId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
    assert_eq!(
        parsed.extract_public_key().unwrap().to_bytes(),
        kp.public().to_bytes()
    );
}

#[test]
fn seed_reproduces_the_same_identity() {
    let kp = Keypair::generate();
    let again = Keypair::from_seed(*kp.seed());
    assert_eq!(again.peer_id(), kp.peer_id());
    assert_eq!(again.public().to_bytes(), kp.public().to_bytes());
}

#[tokio::test]
async fn round_trip_law_holds_with_zero_network_use() {
    let source = Arc::new(MemorySource::new());
    let resolver = resolver_over(vec![Arc::clone(&source)]);

    let kp = Keypair::generate();
    let resolved: PublicKey = resolver.public_key(&kp.peer_id()).await.unwrap();

    assert_eq!(resolved.to_bytes(), kp.public().to_bytes());
    assert_eq!(source.fetch_count(), 0);
}
