//! # oraclefeed core
//!
//! Canonical records for the two oracle events that oraclefeed ingests:
//! value reports (`NewReport`) and tip fundings (`TipAdded`).
//!
//! Both variants are keyed by the hash of the transaction that emitted them,
//! which is what the stores deduplicate on.
//!
//! ## Modules
//!
//! - **types**: `ValueReport`, `TipAdded`, the `EventRecord` union, `EventKind`
//! - **quantity**: parsing of numeric chain quantities (decimal / `0x` hex)
//! - **entity**: the stored/served JSON layout (`_queryId`, `id`, `__typename`, ...)
//! - **amount**: serde helpers that keep tip amounts as decimal strings
//! - **constants**: retention defaults and entity names

#![warn(missing_docs)]

pub mod amount;
pub mod constants;
pub mod entity;
pub mod error;
pub mod quantity;
pub mod types;

pub use constants::*;
pub use error::{CoreError, Result};
pub use types::*;

// Re-export Alloy primitives for convenience
pub use alloy_primitives::{Address, Bytes, B256, U256};
