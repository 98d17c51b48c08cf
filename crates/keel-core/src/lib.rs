//! keel-core — record keys, namespace registry, identity, and config.
//! All other keel crates depend on this one.

pub mod config;
pub mod identity;
pub mod key;
pub mod pk;
pub mod record;
pub mod user;

pub use identity::{Keypair, PeerId, PublicKey};
pub use key::RecordKey;
pub use record::{Registry, RegistryBuilder};
