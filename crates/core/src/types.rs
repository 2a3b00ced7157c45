//! Canonical oracle event records.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{TIP_ADDED_ENTITY, VALUE_REPORT_ENTITY};
use crate::entity::{TipAddedEntity, ValueReportEntity};

/// Transaction hash, the deduplication key of every record.
pub type TxHash = B256;

/// Records that are deduplicated by the transaction that emitted them.
pub trait DedupKey {
    /// Hash of the emitting transaction.
    fn txn_hash(&self) -> TxHash;
}

/// The two event variants handled by oraclefeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `NewReport` from the oracle contract.
    ValueReport,
    /// `TipAdded` from the autopay contract.
    TipAdded,
}

impl EventKind {
    /// Both variants, in a stable order.
    pub const ALL: [EventKind; 2] = [EventKind::ValueReport, EventKind::TipAdded];

    /// `__typename` of the serialized entity.
    pub const fn entity_name(&self) -> &'static str {
        match self {
            EventKind::ValueReport => VALUE_REPORT_ENTITY,
            EventKind::TipAdded => TIP_ADDED_ENTITY,
        }
    }

    /// Solidity event name.
    pub const fn event_name(&self) -> &'static str {
        match self {
            EventKind::ValueReport => "NewReport",
            EventKind::TipAdded => "TipAdded",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// A value submitted by a reporter for an oracle query.
///
/// Serialized in the `NewReportEntity` layout described in [`crate::entity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ValueReportEntity", into = "ValueReportEntity")]
pub struct ValueReport {
    /// Query identifier (bytes32)
    pub query_id: B256,

    /// Report timestamp as emitted by the contract (unix seconds)
    pub report_time: u64,

    /// Raw reported value
    pub value: Bytes,

    /// Block that included the report
    pub block_number: u64,

    /// Report nonce for this query
    pub nonce: u64,

    /// ABI-encoded query descriptor
    pub query_data: Bytes,

    /// Reporter address
    pub reporter: Address,

    /// Emitting transaction
    pub txn_hash: TxHash,
}

/// A tip funding an oracle query.
///
/// Serialized in the `TipAddedEntity` layout; the amount is a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TipAddedEntity", into = "TipAddedEntity")]
pub struct TipAdded {
    /// Query identifier (bytes32)
    pub query_id: B256,

    /// Tip amount in token base units
    pub amount: U256,

    /// ABI-encoded query descriptor
    pub query_data: Bytes,

    /// Tipper address
    pub tipper: Address,

    /// Tip start time (unix seconds)
    pub start_time: u64,

    /// Emitting transaction
    pub txn_hash: TxHash,
}

impl DedupKey for ValueReport {
    fn txn_hash(&self) -> TxHash {
        self.txn_hash
    }
}

impl DedupKey for TipAdded {
    fn txn_hash(&self) -> TxHash {
        self.txn_hash
    }
}

/// Either record variant, as produced by the normalizer.
///
/// Serializes as the bare inner record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventRecord {
    /// A `NewReport` record.
    ValueReport(ValueReport),
    /// A `TipAdded` record.
    TipAdded(TipAdded),
}

impl EventRecord {
    /// Variant of this record.
    pub const fn kind(&self) -> EventKind {
        match self {
            EventRecord::ValueReport(_) => EventKind::ValueReport,
            EventRecord::TipAdded(_) => EventKind::TipAdded,
        }
    }
}

impl DedupKey for EventRecord {
    fn txn_hash(&self) -> TxHash {
        match self {
            EventRecord::ValueReport(r) => r.txn_hash,
            EventRecord::TipAdded(t) => t.txn_hash,
        }
    }
}

impl From<ValueReport> for EventRecord {
    fn from(report: ValueReport) -> Self {
        EventRecord::ValueReport(report)
    }
}

impl From<TipAdded> for EventRecord {
    fn from(tip: TipAdded) -> Self {
        EventRecord::TipAdded(tip)
    }
}
