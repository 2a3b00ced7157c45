//! Webhook delivery decoding.
//!
//! A delivery carries one log whose indexed arguments arrive as separate
//! `topicN` strings and whose remaining arguments arrive ABI-encoded in
//! `data`, plus the block that included it:
//!
//! ```json
//! {
//!   "logs": [{ "data": "0x…", "topic1": "0x…", "topic2": "0x…", "topic3": "0x…",
//!              "transactionHash": "0x…" }],
//!   "block": { "number": 21238760, "timestamp": 1700000000 }
//! }
//! ```

use alloy::primitives::hex;
use alloy::primitives::{Address, B256};
use alloy::sol_types::SolEvent;
use oraclefeed_core::quantity::{parse_u256, parse_u64};
use oraclefeed_core::{CoreError, EventKind, TipAdded, ValueReport};
use serde::Deserialize;

use super::DecodeError;
use crate::listener::events::{self, signature_hash};

/// One push delivery from the webhook provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookDelivery {
    /// Logs in the delivery; only the first one is used
    #[serde(default)]
    pub logs: Vec<WebhookLog>,

    /// Block context
    #[serde(default)]
    pub block: WebhookBlock,
}

/// A log as rendered by the webhook provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookLog {
    /// ABI-encoded non-indexed arguments
    pub data: Option<String>,
    /// Event signature hash, when the provider includes it
    pub topic0: Option<String>,
    /// First indexed argument
    pub topic1: Option<String>,
    /// Second indexed argument
    pub topic2: Option<String>,
    /// Third indexed argument
    pub topic3: Option<String>,
    /// Emitting transaction
    pub transaction_hash: Option<String>,
}

/// Block context of a delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookBlock {
    /// Block number
    pub number: Option<Quantity>,
    /// Block timestamp (unix seconds)
    pub timestamp: Option<Quantity>,
}

/// An integer that providers send either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    /// Plain JSON number
    Number(u64),
    /// Decimal or `0x` hex string
    Text(String),
}

impl Quantity {
    /// Coerce to `u64`.
    pub fn to_u64(&self, field: &'static str) -> Result<u64, CoreError> {
        match self {
            Quantity::Number(n) => Ok(*n),
            Quantity::Text(s) => parse_u64(s, field),
        }
    }
}

impl WebhookDelivery {
    /// Parse a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn first_log(&self) -> Result<&WebhookLog, DecodeError> {
        self.logs.first().ok_or(DecodeError::MissingField("logs[0]"))
    }
}

impl WebhookLog {
    fn check_signature(&self, kind: EventKind) -> Result<(), DecodeError> {
        let Some(topic0) = self.topic0.as_deref() else {
            return Ok(());
        };
        let found = parse_b256("topic0", topic0)?;
        if found != signature_hash(kind) {
            return Err(DecodeError::InvalidField {
                field: "topic0",
                reason: format!("not a {} event", kind),
            });
        }
        Ok(())
    }

    fn data_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        let raw = required("data", self.data.as_deref())?;
        hex::decode(raw.trim()).map_err(|e| DecodeError::InvalidField {
            field: "data",
            reason: e.to_string(),
        })
    }
}

fn required<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, DecodeError> {
    value.ok_or(DecodeError::MissingField(field))
}

fn parse_b256(field: &'static str, raw: &str) -> Result<B256, DecodeError> {
    raw.trim()
        .parse::<B256>()
        .map_err(|e| DecodeError::InvalidField {
            field,
            reason: e.to_string(),
        })
}

/// Decode an address that is either 20 raw bytes or a left-padded 32-byte
/// topic word.
fn parse_address_topic(field: &'static str, raw: &str) -> Result<Address, DecodeError> {
    let bytes = hex::decode(raw.trim()).map_err(|e| DecodeError::InvalidField {
        field,
        reason: e.to_string(),
    })?;

    match bytes.len() {
        20 => Ok(Address::from_slice(&bytes)),
        32 if bytes[..12].iter().all(|b| *b == 0) => Ok(Address::from_slice(&bytes[12..])),
        32 => Err(DecodeError::InvalidField {
            field,
            reason: "topic word has non-zero high bytes".to_string(),
        }),
        n => Err(DecodeError::InvalidField {
            field,
            reason: format!("expected 20 or 32 bytes, got {}", n),
        }),
    }
}

pub(super) fn value_report_from_webhook(
    delivery: &WebhookDelivery,
) -> Result<ValueReport, DecodeError> {
    let log = delivery.first_log()?;
    log.check_signature(EventKind::ValueReport)?;

    let data = log.data_bytes()?;
    let (value, nonce, query_data) =
        events::NewReport::abi_decode_data(&data, true).map_err(|source| DecodeError::Abi {
            event: "NewReport",
            source,
        })?;

    let query_id = parse_b256("topic1", required("topic1", log.topic1.as_deref())?)?;
    let report_time = parse_u64(required("topic2", log.topic2.as_deref())?, "reportTime")?;
    let reporter = parse_address_topic("topic3", required("topic3", log.topic3.as_deref())?)?;
    let block_number = delivery
        .block
        .number
        .as_ref()
        .ok_or(DecodeError::MissingField("block.number"))?
        .to_u64("blockNumber")?;
    let txn_hash = parse_b256(
        "transactionHash",
        required("transactionHash", log.transaction_hash.as_deref())?,
    )?;

    Ok(ValueReport {
        query_id,
        report_time,
        value,
        block_number,
        nonce: oraclefeed_core::quantity::u256_to_u64(nonce, "nonce")?,
        query_data,
        reporter,
        txn_hash,
    })
}

pub(super) fn tip_added_from_webhook(delivery: &WebhookDelivery) -> Result<TipAdded, DecodeError> {
    let log = delivery.first_log()?;
    log.check_signature(EventKind::TipAdded)?;

    let data = log.data_bytes()?;
    let (query_data, tipper) =
        events::TipAdded::abi_decode_data(&data, true).map_err(|source| DecodeError::Abi {
            event: "TipAdded",
            source,
        })?;

    let query_id = parse_b256("topic1", required("topic1", log.topic1.as_deref())?)?;
    let amount = parse_u256(required("topic2", log.topic2.as_deref())?)?;
    let start_time = delivery
        .block
        .timestamp
        .as_ref()
        .ok_or(DecodeError::MissingField("block.timestamp"))?
        .to_u64("startTime")?;
    let txn_hash = parse_b256(
        "transactionHash",
        required("transactionHash", log.transaction_hash.as_deref())?,
    )?;

    Ok(TipAdded {
        query_id,
        amount,
        query_data,
        tipper,
        start_time,
        txn_hash,
    })
}
