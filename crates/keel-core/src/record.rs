//! Record arbitration contracts and the namespace registry.
//!
//! Records arrive as opaque byte sequences from untrusted peers. What
//! "well-formed" and "best" mean is decided per namespace by a
//! validator/selector pair, registered once at startup:
//!
//!   - [`RecordValidator`] — is this candidate authentic for this key?
//!   - [`RecordSelector`]  — which of several plausible candidates wins?
//!
//! The registry is built through [`RegistryBuilder`] before any lookup
//! happens and is immutable afterwards. There is no hidden global and
//! no default namespace: looking up an unregistered namespace is always
//! an error.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::identity::IdentityError;
use crate::key::RecordKey;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("key remainder is not a peer id")]
    BadPeerId(#[source] IdentityError),

    #[error("record is not valid public key material")]
    BadKeyMaterial,

    #[error("key material does not match the peer id in the key")]
    KeyMismatch,

    #[error("invalid record: {0}")]
    Invalid(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no candidate records to select from")]
    NoCandidates,

    #[error("selection failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no handler registered for namespace {0:?}")]
    Unknown(String),

    #[error("namespace {0:?} registered twice")]
    Duplicate(String),
}

// ── Contracts ─────────────────────────────────────────────────────────────────

/// Per-namespace validation predicate.
///
/// Pure: no I/O, no state. Must cope with arbitrary adversarial input.
pub trait RecordValidator: Send + Sync {
    fn validate(&self, key: &RecordKey, record: &[u8]) -> Result<(), ValidationError>;
}

/// Per-namespace arbitration function.
///
/// Given one key and an ordered list of candidates that each already
/// passed this namespace's validator, returns the index of the single
/// best record. Deterministic for a given ordered list; the returned
/// index is always in bounds; an empty list is
/// [`SelectionError::NoCandidates`], never a guess.
pub trait RecordSelector: Send + Sync {
    fn select(&self, key: &RecordKey, candidates: &[Bytes]) -> Result<usize, SelectionError>;
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// A registered namespace: its strategy pair plus a human-readable
/// statement of the arbitration policy, recorded at registration time.
pub struct Namespace {
    validator: Arc<dyn RecordValidator>,
    selector: Arc<dyn RecordSelector>,
    policy: &'static str,
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Namespace {
    pub fn validator(&self) -> &dyn RecordValidator {
        self.validator.as_ref()
    }

    pub fn selector(&self) -> &dyn RecordSelector {
        self.selector.as_ref()
    }

    pub fn policy(&self) -> &'static str {
        self.policy
    }
}

/// Builds the registry at process startup. Duplicate registration
/// fails fast — it is a programmer error, not a runtime condition.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: HashMap<String, Namespace>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        namespace: &str,
        validator: Arc<dyn RecordValidator>,
        selector: Arc<dyn RecordSelector>,
        policy: &'static str,
    ) -> Result<Self, RegistryError> {
        if self.entries.contains_key(namespace) {
            return Err(RegistryError::Duplicate(namespace.to_string()));
        }
        self.entries.insert(
            namespace.to_string(),
            Namespace {
                validator,
                selector,
                policy,
            },
        );
        Ok(self)
    }

    /// Freeze the registry. After this point the entry set never
    /// changes, so concurrent lookups need no locking.
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
        }
    }
}

/// The frozen namespace registry. Share via `Arc`.
pub struct Registry {
    entries: HashMap<String, Namespace>,
}

impl Registry {
    pub fn lookup(&self, namespace: &str) -> Result<&Namespace, RegistryError> {
        self.entries
            .get(namespace)
            .ok_or_else(|| RegistryError::Unknown(namespace.to_string()))
    }

    /// Registered namespace names, for diagnostics.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
