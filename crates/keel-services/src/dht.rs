//! DHT client — concurrent record gathering from remote peers.
//!
//! The wire transport lives behind [`RecordSource`]: one implementor
//! per reachable peer. [`DhtClient`] fans a lookup out across all known
//! sources with bounded concurrency, gathers whatever arrives before
//! the deadline in arrival order, and stops early once a quorum of
//! candidates is in. Deadline expiry is not an error — partial results
//! are still handed to selection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{timeout_at, Instant};

#[derive(Debug, Error)]
pub enum DhtError {
    #[error("peer is unreachable")]
    Unreachable,

    #[error("no peer accepted the record")]
    PutRejected,
}

/// One remote peer that can serve and accept records.
///
/// Implementations must be cancellation-safe: an in-flight request may
/// be abandoned at any point when the gatherer hits its deadline or
/// quorum.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn get_record(&self, key: &str) -> Result<Option<Bytes>, DhtError>;
    async fn put_record(&self, key: &str, record: Bytes) -> Result<(), DhtError>;
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct DhtClient {
    sources: Vec<Arc<dyn RecordSource>>,
    quorum: usize,
    parallelism: usize,
}

impl DhtClient {
    pub fn new(sources: Vec<Arc<dyn RecordSource>>, quorum: usize, parallelism: usize) -> Self {
        Self {
            sources,
            quorum: quorum.max(1),
            parallelism: parallelism.max(1),
        }
    }

    /// Gather candidate records for `key` from all known sources.
    ///
    /// Candidates come back in arrival order, which is explicitly not
    /// deterministic across runs; callers must not depend on it for
    /// correctness, only for tie-breaking. Returns early at quorum; at
    /// the deadline, whatever has arrived is returned and in-flight
    /// requests are abandoned best-effort.
    pub async fn get_values(&self, key: &str, deadline: Duration) -> Vec<Bytes> {
        let (tx, mut rx) = mpsc::channel(self.sources.len().max(1));
        let limiter = Arc::new(Semaphore::new(self.parallelism));
        let mut workers = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let source = Arc::clone(source);
            let tx = tx.clone();
            let limiter = Arc::clone(&limiter);
            let key = key.to_string();
            workers.push(tokio::spawn(async move {
                // The semaphore is never closed while workers run.
                let Ok(_permit) = limiter.acquire_owned().await else {
                    return;
                };
                match source.get_record(&key).await {
                    Ok(Some(record)) => {
                        let _ = tx.send(record).await;
                    }
                    Ok(None) => {}
                    Err(e) => tracing::debug!(key, error = %e, "record request failed"),
                }
            }));
        }
        // Workers hold the remaining senders; rx closes once all finish.
        drop(tx);

        let cutoff = Instant::now() + deadline;
        let mut gathered = Vec::new();
        loop {
            match timeout_at(cutoff, rx.recv()).await {
                Ok(Some(record)) => {
                    gathered.push(record);
                    if gathered.len() >= self.quorum {
                        tracing::trace!(key, n = gathered.len(), "quorum reached");
                        break;
                    }
                }
                // Every source answered or failed.
                Ok(None) => break,
                Err(_) => {
                    tracing::debug!(key, gathered = gathered.len(), "lookup deadline elapsed");
                    break;
                }
            }
        }

        for worker in workers {
            worker.abort();
        }
        gathered
    }

    /// Publish a record to every known source, best effort.
    /// Fails only if nobody accepted it.
    pub async fn put_value(&self, key: &str, record: Bytes) -> Result<(), DhtError> {
        let mut accepted = 0usize;
        for source in &self.sources {
            match source.put_record(key, record.clone()).await {
                Ok(()) => accepted += 1,
                Err(e) => tracing::debug!(key, error = %e, "record publish failed"),
            }
        }
        if accepted == 0 {
            return Err(DhtError::PutRejected);
        }
        tracing::trace!(key, accepted, "record published");
        Ok(())
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

// ── In-process source ─────────────────────────────────────────────────────────

/// An in-process [`RecordSource`] standing in for a remote peer.
///
/// Used for loopback wiring and tests: a seeded record map, an
/// optional artificial response delay, a failure switch, and a fetch
/// counter so callers can assert exactly how often the "network" was
/// touched.
#[derive(Default)]
pub struct MemorySource {
    records: DashMap<String, Bytes>,
    delay: Option<Duration>,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request to this source takes at least `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Seed a record as if a remote peer already stored it.
    pub fn seed(&self, key: &str, record: Bytes) {
        self.records.insert(key.to_string(), record);
    }

    /// Make every subsequent request fail with [`DhtError::Unreachable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// How many get requests this source has served.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn get_record(&self, key: &str) -> Result<Option<Bytes>, DhtError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::Relaxed) {
            return Err(DhtError::Unreachable);
        }
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn put_record(&self, key: &str, record: Bytes) -> Result<(), DhtError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(DhtError::Unreachable);
        }
        self.records.insert(key.to_string(), record);
        Ok(())
    }
}
