//! One-shot historical backfill.
//!
//! Walks `[start_block, end_block]` in windows of `batch_size` blocks, once per
//! event kind, and feeds every returned log through the shared ingest path.
//! Every RPC call is bounded by a timeout and retried with backoff; running
//! out of retries fails the backfill instead of reporting an empty range.

use std::future::Future;
use std::time::Duration;

use oraclefeed_core::EventKind;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::provider::LogSource;
use super::retry::RetryPolicy;
use crate::config::BackfillConfig;
use crate::normalizer::{unix_now, RawPayload};
use crate::pipeline::{EventStores, IngestError};
use crate::storage::StoreError;

/// Backfill failures.
#[derive(Error, Debug)]
pub enum BackfillError {
    /// The RPC endpoint kept failing.
    #[error("Upstream query '{operation}' failed after {attempts} attempts: {message}")]
    Upstream {
        /// What was being queried
        operation: String,
        /// Attempts made, including the first
        attempts: u32,
        /// Last error, with its context chain
        message: String,
    },

    /// A record could not be persisted.
    #[error(transparent)]
    Persistence(#[from] StoreError),

    /// The configured range is empty.
    #[error("Invalid backfill range: start block {from} is after end block {to}")]
    InvalidRange {
        /// First block
        from: u64,
        /// Last block
        to: u64,
    },
}

/// Upper end of a backfill range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockBound {
    /// Chain head, resolved once when the backfill starts
    Latest,
    /// Fixed block number
    Number(u64),
}

/// Per-kind counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KindStats {
    /// Logs returned by the RPC
    pub fetched: usize,
    /// Records newly stored
    pub inserted: usize,
    /// Records already present
    pub duplicates: usize,
    /// Logs that failed to decode
    pub rejected: usize,
}

/// Summary of a completed backfill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    /// First block queried
    pub from_block: u64,
    /// Last block queried (resolved head when the bound was `latest`)
    pub to_block: u64,
    /// `NewReport` counters
    pub reports: KindStats,
    /// `TipAdded` counters
    pub tips: KindStats,
}

/// Backfills both stores from a [`LogSource`].
pub struct ChainBackfill<S> {
    source: S,
    stores: EventStores,
    from_block: u64,
    to_block: BlockBound,
    batch_size: u64,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl<S: LogSource> ChainBackfill<S> {
    /// Create a backfill over the configured range.
    pub fn new(source: S, stores: EventStores, config: &BackfillConfig) -> Self {
        Self {
            source,
            stores,
            from_block: config.start_block,
            to_block: config
                .end_block
                .map(BlockBound::Number)
                .unwrap_or(BlockBound::Latest),
            batch_size: config.batch_size.max(1),
            retry: RetryPolicy::new(config.retry()),
            request_timeout: config.request_timeout(),
        }
    }

    /// Run the backfill to completion.
    pub async fn run(&self) -> Result<BackfillReport, BackfillError> {
        let to_block = match self.to_block {
            BlockBound::Number(n) => {
                if n < self.from_block {
                    return Err(BackfillError::InvalidRange {
                        from: self.from_block,
                        to: n,
                    });
                }
                n
            }
            BlockBound::Latest => {
                self.with_retry("eth_blockNumber".to_string(), || self.source.block_number())
                    .await?
            }
        };

        let mut report = BackfillReport {
            from_block: self.from_block,
            to_block,
            reports: KindStats::default(),
            tips: KindStats::default(),
        };

        if to_block < self.from_block {
            warn!(
                "Chain head {} is behind start block {}, nothing to backfill",
                to_block, self.from_block
            );
            return Ok(report);
        }

        info!(
            "Backfilling blocks {} to {} in windows of {} blocks",
            self.from_block, to_block, self.batch_size
        );

        for kind in EventKind::ALL {
            let stats = match kind {
                EventKind::ValueReport => &mut report.reports,
                EventKind::TipAdded => &mut report.tips,
            };
            self.backfill_kind(kind, to_block, stats).await?;

            info!(
                "{} backfill complete: {} fetched, {} inserted, {} duplicates, {} rejected",
                kind, stats.fetched, stats.inserted, stats.duplicates, stats.rejected
            );
        }

        Ok(report)
    }

    async fn backfill_kind(
        &self,
        kind: EventKind,
        to_block: u64,
        stats: &mut KindStats,
    ) -> Result<(), BackfillError> {
        let mut window_start = self.from_block;

        loop {
            let window_end = window_start
                .saturating_add(self.batch_size - 1)
                .min(to_block);

            let logs = self
                .with_retry(
                    format!("{} logs {}..={}", kind, window_start, window_end),
                    || self.source.logs(kind, window_start, window_end),
                )
                .await?;

            debug!(
                "{}: {} logs in blocks {} to {}",
                kind,
                logs.len(),
                window_start,
                window_end
            );
            stats.fetched += logs.len();

            for log in &logs {
                let payload = RawPayload::Chain {
                    log,
                    observed_at: unix_now(),
                };
                match self.stores.ingest(kind, payload).await {
                    Ok(ingested) if ingested.outcome.inserted => stats.inserted += 1,
                    Ok(_) => stats.duplicates += 1,
                    Err(IngestError::Decode(e)) => {
                        stats.rejected += 1;
                        warn!(
                            "Skipping undecodable {} log (tx {:?}): {}",
                            kind, log.transaction_hash, e
                        );
                    }
                    Err(IngestError::Persistence(e)) => return Err(e.into()),
                }
            }

            if window_end >= to_block {
                return Ok(());
            }
            window_start = window_end + 1;
        }
    }

    async fn with_retry<T, F, Fut>(&self, operation: String, mut call: F) -> Result<T, BackfillError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 0u32;

        loop {
            let result = match tokio::time::timeout(self.request_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!(
                    "timed out after {:?}",
                    self.request_timeout
                )),
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            attempt += 1;
            match self.retry.next_delay(attempt) {
                Some(delay) => {
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {:#}",
                        operation,
                        attempt,
                        self.retry.max_attempts(),
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(BackfillError::Upstream {
                        operation,
                        attempts: attempt,
                        message: format!("{:#}", err),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use crate::test_support::{report_delivery, report_event, rpc_log, tip_event};
    use alloy::primitives::{LogData, B256, U256};
    use alloy::rpc::types::Log;
    use alloy::sol_types::SolEvent;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockSource {
        head: u64,
        logs: HashMap<EventKind, Vec<Log>>,
        fail_first: AtomicU32,
        always_fail: bool,
        calls: Mutex<Vec<(EventKind, u64, u64)>>,
    }

    impl MockSource {
        fn with_logs(head: u64, reports: Vec<Log>, tips: Vec<Log>) -> Self {
            let mut logs = HashMap::new();
            logs.insert(EventKind::ValueReport, reports);
            logs.insert(EventKind::TipAdded, tips);
            Self {
                head,
                logs,
                ..Default::default()
            }
        }

        fn should_fail(&self) -> bool {
            if self.always_fail {
                return true;
            }
            self.fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }

        fn windows(&self, kind: EventKind) -> Vec<(u64, u64)> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _, _)| *k == kind)
                .map(|(_, from, to)| (*from, *to))
                .collect()
        }
    }

    #[async_trait]
    impl LogSource for MockSource {
        async fn block_number(&self) -> anyhow::Result<u64> {
            if self.should_fail() {
                anyhow::bail!("connection refused");
            }
            Ok(self.head)
        }

        async fn logs(&self, kind: EventKind, from: u64, to: u64) -> anyhow::Result<Vec<Log>> {
            if self.should_fail() {
                anyhow::bail!("connection refused");
            }
            self.calls.lock().unwrap().push((kind, from, to));
            Ok(self
                .logs
                .get(&kind)
                .into_iter()
                .flatten()
                .filter(|log| matches!(log.block_number, Some(n) if n >= from && n <= to))
                .cloned()
                .collect())
        }
    }

    fn config(start_block: u64, end_block: Option<u64>) -> BackfillConfig {
        BackfillConfig {
            enabled: true,
            start_block,
            end_block,
            batch_size: 10_000,
            max_retries: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            request_timeout_secs: 5,
        }
    }

    fn report_log(block: u64, txn: B256) -> Log {
        rpc_log(report_event(block).encode_log_data(), block, txn)
    }

    #[tokio::test]
    async fn test_backfill_fixed_range() {
        let source = MockSource::with_logs(
            500,
            vec![report_log(150, B256::repeat_byte(0xab)), report_log(250, B256::repeat_byte(0xac))],
            vec![rpc_log(
                tip_event(U256::from(7u64)).encode_log_data(),
                120,
                B256::repeat_byte(0xcd),
            )],
        );
        let stores = EventStores::in_memory(1000).await.unwrap();

        let report = ChainBackfill::new(source, stores.clone(), &config(100, Some(200)))
            .run()
            .await
            .unwrap();

        assert_eq!((report.from_block, report.to_block), (100, 200));
        assert_eq!(report.reports.inserted, 1);
        assert_eq!(report.tips.inserted, 1);
        let reports = stores.reports().list().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].txn_hash, B256::repeat_byte(0xab));
        assert_eq!(reports[0].block_number, 150);
    }

    #[tokio::test]
    async fn test_backfill_latest_walks_windows() {
        let source = MockSource::with_logs(125, vec![report_log(124, B256::repeat_byte(1))], vec![]);
        let stores = EventStores::in_memory(1000).await.unwrap();
        let mut cfg = config(100, None);
        cfg.batch_size = 10;

        let backfill = ChainBackfill::new(source, stores.clone(), &cfg);
        let report = backfill.run().await.unwrap();

        assert_eq!(report.to_block, 125);
        assert_eq!(
            backfill.source.windows(EventKind::ValueReport),
            vec![(100, 109), (110, 119), (120, 125)]
        );
        assert_eq!(stores.reports().len().await, 1);
    }

    #[tokio::test]
    async fn test_backfill_counts_duplicates_and_rejects() {
        let txn = B256::repeat_byte(0xab);
        let mut broken = report_log(160, B256::repeat_byte(0xee));
        broken.inner.data = LogData::new_unchecked(broken.inner.data.topics().to_vec(), vec![1, 2, 3].into());
        let source = MockSource::with_logs(
            500,
            vec![report_log(150, txn), report_log(150, txn), broken],
            vec![],
        );
        let stores = EventStores::in_memory(1000).await.unwrap();

        let report = ChainBackfill::new(source, stores.clone(), &config(100, Some(200)))
            .run()
            .await
            .unwrap();

        assert_eq!(
            report.reports,
            KindStats {
                fetched: 3,
                inserted: 1,
                duplicates: 1,
                rejected: 1
            }
        );
    }

    #[tokio::test]
    async fn test_backfill_retries_transient_failures() {
        let mut source = MockSource::with_logs(500, vec![report_log(150, B256::repeat_byte(1))], vec![]);
        source.fail_first = AtomicU32::new(2);
        let stores = EventStores::in_memory(1000).await.unwrap();

        let report = ChainBackfill::new(source, stores.clone(), &config(100, None))
            .run()
            .await
            .unwrap();

        assert_eq!(report.reports.inserted, 1);
    }

    #[tokio::test]
    async fn test_backfill_gives_up_after_retries() {
        let source = MockSource {
            always_fail: true,
            ..Default::default()
        };
        let stores = EventStores::in_memory(1000).await.unwrap();

        let err = ChainBackfill::new(source, stores.clone(), &config(100, Some(200)))
            .run()
            .await
            .unwrap_err();

        match err {
            BackfillError::Upstream {
                attempts, message, ..
            } => {
                assert_eq!(attempts, 4);
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(stores.reports().is_empty().await);
    }

    #[tokio::test]
    async fn test_backfill_aborts_on_persistence_failure() {
        let reports = Arc::new(MemoryBackend::new());
        let stores = EventStores::with_backends(reports.clone(), Arc::new(MemoryBackend::new()), 10)
            .await
            .unwrap();
        reports.set_fail_writes(true);
        let source = MockSource::with_logs(500, vec![report_log(150, B256::repeat_byte(1))], vec![]);

        let err = ChainBackfill::new(source, stores, &config(100, Some(200)))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, BackfillError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_webhook_after_backfill_is_a_duplicate() {
        let txn = B256::repeat_byte(0xab);
        let source = MockSource::with_logs(500, vec![report_log(150, txn)], vec![]);
        let stores = EventStores::in_memory(1000).await.unwrap();

        ChainBackfill::new(source, stores.clone(), &config(100, Some(200)))
            .run()
            .await
            .unwrap();

        let body = report_delivery(&report_event(999), txn, 150).to_string();
        let ingested = stores
            .ingest_webhook(EventKind::ValueReport, body.as_bytes())
            .await
            .unwrap();

        assert!(!ingested.outcome.inserted);
        let reports = stores.reports().list().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].nonce, 150);
    }

    #[tokio::test]
    async fn test_head_behind_start_is_empty() {
        let source = MockSource::with_logs(50, vec![], vec![]);
        let stores = EventStores::in_memory(1000).await.unwrap();

        let backfill = ChainBackfill::new(source, stores, &config(100, None));
        let report = backfill.run().await.unwrap();

        assert_eq!(report.reports, KindStats::default());
        assert!(backfill.source.windows(EventKind::ValueReport).is_empty());
    }
}
