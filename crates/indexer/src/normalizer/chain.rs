//! Chain log decoding.

use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use oraclefeed_core::quantity::u256_to_u64;
use oraclefeed_core::{TipAdded, TxHash, ValueReport};

use super::webhook::{tip_added_from_webhook, value_report_from_webhook};
use super::{DecodeError, Normalize, WebhookDelivery};
use crate::listener::events;

fn transaction_hash(log: &Log) -> Result<TxHash, DecodeError> {
    log.transaction_hash
        .ok_or(DecodeError::MissingField("transactionHash"))
}

impl Normalize for ValueReport {
    fn from_chain_log(log: &Log, _observed_at: u64) -> Result<Self, DecodeError> {
        let event = events::NewReport::decode_log(log.as_ref(), true)
            .map_err(|source| DecodeError::Abi {
                event: "NewReport",
                source,
            })?
            .data;

        let block_number = log
            .block_number
            .ok_or(DecodeError::MissingField("blockNumber"))?;
        let txn_hash = transaction_hash(log)?;

        Ok(ValueReport {
            query_id: event.queryId,
            report_time: u256_to_u64(event.time, "reportTime")?,
            value: event.value,
            block_number,
            nonce: u256_to_u64(event.nonce, "nonce")?,
            query_data: event.queryData,
            reporter: event.reporter,
            txn_hash,
        })
    }

    fn from_webhook(delivery: &WebhookDelivery) -> Result<Self, DecodeError> {
        value_report_from_webhook(delivery)
    }
}

impl Normalize for TipAdded {
    fn from_chain_log(log: &Log, observed_at: u64) -> Result<Self, DecodeError> {
        let event = events::TipAdded::decode_log(log.as_ref(), true)
            .map_err(|source| DecodeError::Abi {
                event: "TipAdded",
                source,
            })?
            .data;

        Ok(TipAdded {
            query_id: event.queryId,
            amount: event.amount,
            query_data: event.queryData,
            tipper: event.tipper,
            start_time: observed_at,
            txn_hash: transaction_hash(log)?,
        })
    }

    fn from_webhook(delivery: &WebhookDelivery) -> Result<Self, DecodeError> {
        tip_added_from_webhook(delivery)
    }
}
