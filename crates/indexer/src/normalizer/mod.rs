//! Conversion of raw chain logs and webhook deliveries into canonical records.
//!
//! Two decode paths feed one schema:
//! - [`RawPayload::Chain`]: an RPC log whose arguments are decoded with the
//!   compile-time event definitions
//! - [`RawPayload::Webhook`]: a provider push with an ABI-encoded `data` blob
//!   and indexed arguments spread over `topic1..topic3`
//!
//! Decoding never touches external state. Chain-sourced tips need a start
//! time that the log does not carry, so the caller passes the ingestion time
//! in with the payload.

use alloy::rpc::types::Log;
use oraclefeed_core::{CoreError, EventKind, EventRecord, TipAdded, ValueReport};
use thiserror::Error;

mod chain;
pub mod webhook;

pub use webhook::{Quantity, WebhookBlock, WebhookDelivery, WebhookLog};

/// Reasons a payload could not be turned into a record.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// ABI decoding of the log or its data blob failed.
    #[error("Failed to decode {event} payload: {source}")]
    Abi {
        /// Solidity event name
        event: &'static str,
        /// Underlying ABI error
        #[source]
        source: alloy::sol_types::Error,
    },

    /// A required field is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but malformed.
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        /// Field name as it appears in the payload
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// The webhook body is not a delivery at all.
    #[error("Malformed webhook body: {0}")]
    Body(#[from] serde_json::Error),

    /// A numeric quantity could not be coerced.
    #[error(transparent)]
    Quantity(#[from] CoreError),
}

/// A source-specific payload awaiting normalization.
#[derive(Debug, Clone, Copy)]
pub enum RawPayload<'a> {
    /// A log returned by `eth_getLogs`.
    Chain {
        /// The raw RPC log
        log: &'a Log,
        /// Ingestion time (unix seconds)
        observed_at: u64,
    },
    /// A single webhook delivery.
    Webhook(&'a WebhookDelivery),
}

/// Per-variant decoding from either source.
pub trait Normalize: Sized {
    /// Decode a typed chain log.
    fn from_chain_log(log: &Log, observed_at: u64) -> Result<Self, DecodeError>;

    /// Decode a webhook delivery.
    fn from_webhook(delivery: &WebhookDelivery) -> Result<Self, DecodeError>;

    /// Decode whichever payload was supplied.
    fn from_payload(payload: RawPayload<'_>) -> Result<Self, DecodeError> {
        match payload {
            RawPayload::Chain { log, observed_at } => Self::from_chain_log(log, observed_at),
            RawPayload::Webhook(delivery) => Self::from_webhook(delivery),
        }
    }
}

/// Normalize `payload` as the declared variant.
pub fn normalize(kind: EventKind, payload: RawPayload<'_>) -> Result<EventRecord, DecodeError> {
    match kind {
        EventKind::ValueReport => ValueReport::from_payload(payload).map(EventRecord::from),
        EventKind::TipAdded => TipAdded::from_payload(payload).map(EventRecord::from),
    }
}

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
