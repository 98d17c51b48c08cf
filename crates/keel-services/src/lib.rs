//! Record arbitration, DHT fan-out, and identity resolution services.
//!
//! This crate hosts the moving parts built on top of `keel-core`'s
//! types: the record store that arbitrates between conflicting DHT
//! records, the fan-out DHT client, the peer identity resolver, the
//! content-addressed block backends, and the external password helper.

pub mod backend;
pub mod dht;
pub mod helper;
pub mod resolver;
pub mod store;

pub use backend::{Backend, BackendError, BlockStore, Lifecycle};
pub use dht::{DhtClient, DhtError, MemorySource, RecordSource};
pub use helper::{read_password_from_helper, HelperError, HELPER_TIMEOUT};
pub use resolver::{IdentityResolver, ResolveError};
pub use store::{RecordStore, StoreError};
