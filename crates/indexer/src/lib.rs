//! Oracle event ingestion for oraclefeed.
//!
//! Reports and tips reach the service two ways: a backfill that walks the
//! chain with `eth_getLogs`, and webhook deliveries pushed by an external
//! event stream. Both paths decode into the same canonical records and land
//! in the same two bounded stores.
//!
//! ```text
//!   Ethereum RPC ──► ChainBackfill ──┐
//!                                    ├──► Normalizer ──► EventStores ──► JSON snapshots
//!   Webhook POST ────────────────────┘                       │
//!                                                            ▼
//!                                                   oraclefeed-api (GET)
//! ```
//!
//! Records are deduplicated by transaction hash, so a log seen by both paths is
//! stored once.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod listener;
pub mod normalizer;
pub mod pipeline;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use pipeline::{EventStores, IngestError, Ingested};
pub use storage::{AppendOutcome, BoundedStore, StoreError};

pub use oraclefeed_core::*;
