//! Fixtures shared by the unit tests.

use alloy::primitives::{hex, Address, Bytes, LogData, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use oraclefeed_core::{TipAdded, ValueReport};
use serde_json::json;

use crate::listener::events;

pub(crate) fn report_event(nonce: u64) -> events::NewReport {
    events::NewReport {
        queryId: B256::repeat_byte(0x11),
        time: U256::from(1_700_000_000u64),
        value: Bytes::from(U256::from(2_500u64).to_be_bytes::<32>().to_vec()),
        nonce: U256::from(nonce),
        queryData: Bytes::from_static(b"SpotPrice(eth,usd)"),
        reporter: Address::repeat_byte(0x22),
    }
}

pub(crate) fn tip_event(amount: U256) -> events::TipAdded {
    events::TipAdded {
        queryId: B256::repeat_byte(0x33),
        amount,
        queryData: Bytes::from_static(b"SpotPrice(trb,usd)"),
        tipper: Address::repeat_byte(0x44),
    }
}

pub(crate) fn rpc_log(data: LogData, block: u64, txn_hash: B256) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: Address::repeat_byte(0x99),
            data,
        },
        block_number: Some(block),
        transaction_hash: Some(txn_hash),
        ..Default::default()
    }
}

pub(crate) fn report_delivery(
    event: &events::NewReport,
    txn_hash: B256,
    block_number: u64,
) -> serde_json::Value {
    json!({
        "logs": [{
            "data": hex::encode_prefixed(event.encode_data()),
            "topic1": hex::encode_prefixed(event.queryId),
            "topic2": hex::encode_prefixed(event.time.to_be_bytes::<32>()),
            "topic3": hex::encode_prefixed(event.reporter.into_word()),
            "transactionHash": hex::encode_prefixed(txn_hash),
        }],
        "block": { "number": block_number },
    })
}

pub(crate) fn tip_delivery(
    event: &events::TipAdded,
    txn_hash: B256,
    timestamp: u64,
) -> serde_json::Value {
    json!({
        "logs": [{
            "data": hex::encode_prefixed(event.encode_data()),
            "topic1": hex::encode_prefixed(event.queryId),
            "topic2": hex::encode_prefixed(event.amount.to_be_bytes::<32>()),
            "transactionHash": hex::encode_prefixed(txn_hash),
        }],
        "block": { "timestamp": timestamp },
    })
}

pub(crate) fn value_report(seed: u64) -> ValueReport {
    ValueReport {
        query_id: B256::repeat_byte(0x11),
        report_time: 1_700_000_000 + seed,
        value: Bytes::from(seed.to_be_bytes().to_vec()),
        block_number: 100 + seed,
        nonce: seed,
        query_data: Bytes::from_static(b"SpotPrice(eth,usd)"),
        reporter: Address::repeat_byte(0x22),
        txn_hash: B256::left_padding_from(&(seed + 1).to_be_bytes()),
    }
}

pub(crate) fn tip(seed: u64) -> TipAdded {
    TipAdded {
        query_id: B256::repeat_byte(0x33),
        amount: U256::from(seed) * U256::from(10u64).pow(U256::from(18u64)),
        query_data: Bytes::from_static(b"SpotPrice(trb,usd)"),
        tipper: Address::repeat_byte(0x44),
        start_time: 1_700_000_000 + seed,
        txn_hash: B256::left_padding_from(&(seed + 1).to_be_bytes()),
    }
}
