//! Bounded, deduplicated event stores.
//!
//! Each record variant lives in its own [`BoundedStore`]: an insertion-ordered
//! sequence that holds at most `capacity` records, never two with the same
//! transaction hash, and is written through to a [`SnapshotBackend`] on every
//! insertion.
//!
//! The read-modify-write of an append runs under the store's mutex, so the
//! backfill task and concurrent webhook deliveries cannot lose each other's
//! updates.

use oraclefeed_core::{DedupKey, TxHash};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod backend;

pub use backend::{JsonFileBackend, MemoryBackend, SnapshotBackend};

/// Persistence failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The snapshot could not be read.
    #[error("Failed to read {store} snapshot from {location}: {source}")]
    Read {
        /// Store name
        store: &'static str,
        /// Backend location
        location: String,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// The snapshot exists but is not a valid record array.
    #[error("Corrupt {store} snapshot at {location}: {source}")]
    Corrupt {
        /// Store name
        store: &'static str,
        /// Backend location
        location: String,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// Records could not be encoded.
    #[error("Failed to encode {store} snapshot: {source}")]
    Encode {
        /// Store name
        store: &'static str,
        /// Encoding error
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot could not be written.
    #[error("Failed to write {store} snapshot to {location}: {source}")]
    Write {
        /// Store name
        store: &'static str,
        /// Backend location
        location: String,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// A store must be able to hold at least one record.
    #[error("Store capacity must be > 0")]
    ZeroCapacity,
}

/// Result of an [`BoundedStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// False when the transaction hash was already stored
    pub inserted: bool,
    /// Store length after the call
    pub len: usize,
}

#[derive(Debug)]
struct StoreState<T> {
    records: Vec<T>,
    keys: HashSet<TxHash>,
}

/// Insertion-ordered, capacity-bounded, write-through record store.
pub struct BoundedStore<T> {
    name: &'static str,
    capacity: usize,
    backend: Arc<dyn SnapshotBackend>,
    state: Mutex<StoreState<T>>,
}

impl<T> BoundedStore<T>
where
    T: DedupKey + Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Load the store from `backend`, or start empty if it holds nothing.
    ///
    /// Snapshots written by other tools may hold duplicates or more than
    /// `capacity` records; the first occurrence of each hash and the newest
    /// `capacity` records are kept, and the cleaned snapshot is written back.
    pub async fn load(
        name: &'static str,
        backend: Arc<dyn SnapshotBackend>,
        capacity: usize,
    ) -> Result<Self, StoreError> {
        if capacity == 0 {
            return Err(StoreError::ZeroCapacity);
        }

        let location = backend.describe();
        let raw = backend.read().await.map_err(|source| StoreError::Read {
            store: name,
            location: location.clone(),
            source,
        })?;

        let loaded: Vec<T> = match raw {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                store: name,
                location: location.clone(),
                source,
            })?,
            None => Vec::new(),
        };
        let loaded_len = loaded.len();

        let mut keys = HashSet::with_capacity(loaded_len);
        let mut records: Vec<T> = loaded
            .into_iter()
            .filter(|record| keys.insert(record.txn_hash()))
            .collect();
        if records.len() > capacity {
            let overflow = records.len() - capacity;
            for evicted in records.drain(..overflow) {
                keys.remove(&evicted.txn_hash());
            }
        }

        let store = Self {
            name,
            capacity,
            backend,
            state: Mutex::new(StoreState { records, keys }),
        };

        {
            let state = store.state.lock().await;
            if state.records.len() != loaded_len {
                warn!(
                    store = name,
                    loaded = loaded_len,
                    kept = state.records.len(),
                    "Snapshot held duplicates or exceeded capacity, rewriting"
                );
                store.persist(&state.records).await?;
            }
            info!(
                store = name,
                location = %location,
                records = state.records.len(),
                capacity,
                "Store loaded"
            );
        }

        Ok(store)
    }

    /// Append `record` unless its transaction hash is already stored.
    ///
    /// On insertion the oldest records are evicted down to `capacity` and the
    /// full sequence is persisted before returning. If persisting fails the
    /// in-memory sequence is left exactly as it was.
    pub async fn append(&self, record: T) -> Result<AppendOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let key = record.txn_hash();

        if state.keys.contains(&key) {
            debug!(store = self.name, txn_hash = %key, "Duplicate record ignored");
            return Ok(AppendOutcome {
                inserted: false,
                len: state.records.len(),
            });
        }

        let overflow = (state.records.len() + 1).saturating_sub(self.capacity);
        let mut next = Vec::with_capacity(state.records.len() + 1 - overflow);
        next.extend_from_slice(&state.records[overflow..]);
        next.push(record);

        self.persist(&next).await?;

        let evicted: Vec<TxHash> = state.records[..overflow]
            .iter()
            .map(DedupKey::txn_hash)
            .collect();
        for hash in &evicted {
            state.keys.remove(hash);
        }
        state.keys.insert(key);
        state.records = next;

        debug!(
            store = self.name,
            txn_hash = %key,
            len = state.records.len(),
            evicted = evicted.len(),
            "Record appended"
        );

        Ok(AppendOutcome {
            inserted: true,
            len: state.records.len(),
        })
    }

    /// Snapshot of the current records, oldest first.
    pub async fn list(&self) -> Vec<T> {
        self.state.lock().await.records.clone()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a record with `txn_hash` is stored.
    pub async fn contains(&self, txn_hash: &TxHash) -> bool {
        self.state.lock().await.keys.contains(txn_hash)
    }

    async fn persist(&self, records: &[T]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(records).map_err(|source| StoreError::Encode {
            store: self.name,
            source,
        })?;

        self.backend
            .write(&bytes)
            .await
            .map_err(|source| StoreError::Write {
                store: self.name,
                location: self.backend.describe(),
                source,
            })
    }
}
