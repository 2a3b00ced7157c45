//! The shared ingest path: normalize, then append to the matching store.
//!
//! Backfill and webhook deliveries both end up in [`EventStores::ingest`], so
//! a transaction seen by both sources is stored once, by whichever got there
//! first.

use oraclefeed_core::{EventKind, EventRecord, TipAdded, ValueReport};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::StorageConfig;
use crate::normalizer::{normalize, DecodeError, RawPayload, WebhookDelivery};
use crate::storage::{
    AppendOutcome, BoundedStore, JsonFileBackend, MemoryBackend, SnapshotBackend, StoreError,
};

/// Why a payload did not make it into a store.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The payload was malformed; nothing was stored.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The record was valid but could not be persisted.
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// A successfully ingested record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    /// The normalized record
    pub record: EventRecord,
    /// What the store did with it
    pub outcome: AppendOutcome,
}

/// One store per record variant.
#[derive(Clone)]
pub struct EventStores {
    reports: Arc<BoundedStore<ValueReport>>,
    tips: Arc<BoundedStore<TipAdded>>,
}

impl EventStores {
    /// Wrap already-loaded stores.
    pub fn new(reports: Arc<BoundedStore<ValueReport>>, tips: Arc<BoundedStore<TipAdded>>) -> Self {
        Self { reports, tips }
    }

    /// Load both stores from their JSON snapshot files.
    pub async fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        Self::with_backends(
            Arc::new(JsonFileBackend::new(&config.new_report_path)),
            Arc::new(JsonFileBackend::new(&config.tip_added_path)),
            config.capacity,
        )
        .await
    }

    /// Empty stores held in memory only.
    pub async fn in_memory(capacity: usize) -> Result<Self, StoreError> {
        Self::with_backends(
            Arc::new(MemoryBackend::new()),
            Arc::new(MemoryBackend::new()),
            capacity,
        )
        .await
    }

    /// Load both stores from explicit backends.
    pub async fn with_backends(
        reports: Arc<dyn SnapshotBackend>,
        tips: Arc<dyn SnapshotBackend>,
        capacity: usize,
    ) -> Result<Self, StoreError> {
        let reports = BoundedStore::load("new_report", reports, capacity).await?;
        let tips = BoundedStore::load("tip_added", tips, capacity).await?;

        Ok(Self::new(Arc::new(reports), Arc::new(tips)))
    }

    /// Value report store.
    pub fn reports(&self) -> &BoundedStore<ValueReport> {
        &self.reports
    }

    /// Tip store.
    pub fn tips(&self) -> &BoundedStore<TipAdded> {
        &self.tips
    }

    /// Append a record to the store of its variant.
    pub async fn append(&self, record: EventRecord) -> Result<AppendOutcome, StoreError> {
        match record {
            EventRecord::ValueReport(report) => self.reports.append(report).await,
            EventRecord::TipAdded(tip) => self.tips.append(tip).await,
        }
    }

    /// Normalize `payload` as `kind` and append the result.
    pub async fn ingest(
        &self,
        kind: EventKind,
        payload: RawPayload<'_>,
    ) -> Result<Ingested, IngestError> {
        let record = normalize(kind, payload)?;
        let outcome = self.append(record.clone()).await?;

        debug!(
            kind = %kind,
            inserted = outcome.inserted,
            len = outcome.len,
            "Record ingested"
        );

        Ok(Ingested { record, outcome })
    }

    /// Parse a raw webhook body and ingest its first log as `kind`.
    pub async fn ingest_webhook(&self, kind: EventKind, body: &[u8]) -> Result<Ingested, IngestError> {
        let delivery = WebhookDelivery::from_slice(body)?;
        self.ingest(kind, RawPayload::Webhook(&delivery)).await
    }
}
