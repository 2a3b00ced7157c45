//! Chain-side ingestion.
//!
//! - Event definitions for the oracle and autopay contracts
//! - RPC log source and its retry policy
//! - One-shot historical backfill into the event stores

pub mod backfill;
pub mod events;
pub mod provider;
pub mod retry;

pub use backfill::{BackfillError, BackfillReport, BlockBound, ChainBackfill, KindStats};
pub use provider::{LogSource, RpcProvider};
pub use retry::{RetryConfig, RetryPolicy};
