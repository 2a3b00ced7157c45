//! Wire form of the records.
//!
//! Snapshot files and the read API use the entity layout dashboard clients
//! already consume: underscore-prefixed event argument names, the transaction
//! hash repeated as `id`, and a `__typename` naming the entity.
//!
//! ```json
//! { "id": "0xab..", "_queryId": "0x83..", "_time": 1700000000, "_value": "0x..",
//!   "_blockNumber": 21238800, "_nonce": 7, "_queryData": "0x..",
//!   "_reporter": "0x..", "txnHash": "0xab..", "__typename": "NewReportEntity" }
//! ```
//!
//! On read, `id` stands in for a missing `txnHash` and a missing
//! `__typename` is accepted; a typename of the other variant is rejected.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EventKind, TipAdded, TxHash, ValueReport};

/// Stored and served layout of a [`ValueReport`].
#[derive(Serialize, Deserialize)]
pub struct ValueReportEntity {
    id: Option<TxHash>,
    #[serde(rename = "_queryId")]
    query_id: B256,
    #[serde(rename = "_time", with = "crate::quantity::lenient_u64")]
    time: u64,
    #[serde(rename = "_value")]
    value: Bytes,
    #[serde(rename = "_blockNumber", with = "crate::quantity::lenient_u64")]
    block_number: u64,
    #[serde(rename = "_nonce", with = "crate::quantity::lenient_u64")]
    nonce: u64,
    #[serde(rename = "_queryData")]
    query_data: Bytes,
    #[serde(rename = "_reporter")]
    reporter: Address,
    #[serde(rename = "txnHash")]
    txn_hash: Option<TxHash>,
    #[serde(rename = "__typename")]
    typename: Option<String>,
}

/// Stored and served layout of a [`TipAdded`].
#[derive(Serialize, Deserialize)]
pub struct TipAddedEntity {
    id: Option<TxHash>,
    #[serde(rename = "_queryId")]
    query_id: B256,
    #[serde(rename = "_amount", with = "crate::amount")]
    amount: U256,
    #[serde(rename = "_queryData")]
    query_data: Bytes,
    #[serde(rename = "_tipper")]
    tipper: Address,
    #[serde(rename = "_startTime", with = "crate::quantity::lenient_u64")]
    start_time: u64,
    #[serde(rename = "txnHash")]
    txn_hash: Option<TxHash>,
    #[serde(rename = "__typename")]
    typename: Option<String>,
}

fn check_typename(expected: &'static str, found: Option<String>) -> Result<(), CoreError> {
    match found {
        Some(found) if found != expected => Err(CoreError::EntityMismatch { expected, found }),
        _ => Ok(()),
    }
}

fn txn_hash_of(txn_hash: Option<TxHash>, id: Option<TxHash>) -> Result<TxHash, CoreError> {
    txn_hash.or(id).ok_or(CoreError::MissingTxnHash)
}

impl From<ValueReport> for ValueReportEntity {
    fn from(report: ValueReport) -> Self {
        Self {
            id: Some(report.txn_hash),
            query_id: report.query_id,
            time: report.report_time,
            value: report.value,
            block_number: report.block_number,
            nonce: report.nonce,
            query_data: report.query_data,
            reporter: report.reporter,
            txn_hash: Some(report.txn_hash),
            typename: Some(EventKind::ValueReport.entity_name().to_string()),
        }
    }
}

impl TryFrom<ValueReportEntity> for ValueReport {
    type Error = CoreError;

    fn try_from(entity: ValueReportEntity) -> Result<Self, Self::Error> {
        check_typename(EventKind::ValueReport.entity_name(), entity.typename)?;

        Ok(ValueReport {
            query_id: entity.query_id,
            report_time: entity.time,
            value: entity.value,
            block_number: entity.block_number,
            nonce: entity.nonce,
            query_data: entity.query_data,
            reporter: entity.reporter,
            txn_hash: txn_hash_of(entity.txn_hash, entity.id)?,
        })
    }
}

impl From<TipAdded> for TipAddedEntity {
    fn from(tip: TipAdded) -> Self {
        Self {
            id: Some(tip.txn_hash),
            query_id: tip.query_id,
            amount: tip.amount,
            query_data: tip.query_data,
            tipper: tip.tipper,
            start_time: tip.start_time,
            txn_hash: Some(tip.txn_hash),
            typename: Some(EventKind::TipAdded.entity_name().to_string()),
        }
    }
}

impl TryFrom<TipAddedEntity> for TipAdded {
    type Error = CoreError;

    fn try_from(entity: TipAddedEntity) -> Result<Self, Self::Error> {
        check_typename(EventKind::TipAdded.entity_name(), entity.typename)?;

        Ok(TipAdded {
            query_id: entity.query_id,
            amount: entity.amount,
            query_data: entity.query_data,
            tipper: entity.tipper,
            start_time: entity.start_time,
            txn_hash: txn_hash_of(entity.txn_hash, entity.id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{TipAdded, ValueReport};
    use alloy_primitives::{address, b256, B256, U256};
    use serde_json::json;

    // Records in the layout of existing eventData.json / eventData1.json files.
    fn stored_report() -> serde_json::Value {
        json!({
            "id": "0x1f0b4f3c0b4c7ae3a8d7f1e2d3c4b5a69788796a5b4c3d2e1f00112233445566",
            "_queryId": "0x83a7f3d48786ac2667503a61e8c415438ed2922eb86a2906e4ee66d9a2ce4992",
            "_time": 1732280000,
            "_value": "0x00000000000000000000000000000000000000000000007e5a4b8c3d2e1f0000",
            "_blockNumber": 21238800,
            "_nonce": 42,
            "_queryData": "0xdeadbeef",
            "_reporter": "0x5CBcA25A8CD90d7b80Ba40a67E40E4D027738743",
            "txnHash": "0x1f0b4f3c0b4c7ae3a8d7f1e2d3c4b5a69788796a5b4c3d2e1f00112233445566",
            "__typename": "NewReportEntity"
        })
    }

    fn stored_tip(amount: serde_json::Value, start_time: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "_queryId": "0x83a7f3d48786ac2667503a61e8c415438ed2922eb86a2906e4ee66d9a2ce4992",
            "_amount": amount,
            "_queryData": "0xdeadbeef",
            "_tipper": "0x25baEbFAc231836bd5AFd1F211f6E8306f2BCC1e",
            "_startTime": start_time,
            "txnHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "__typename": "TipAddedEntity"
        })
    }

    #[test]
    fn test_stored_report_round_trips() {
        let report: ValueReport = serde_json::from_value(stored_report()).unwrap();

        assert_eq!(
            report.query_id,
            b256!("83a7f3d48786ac2667503a61e8c415438ed2922eb86a2906e4ee66d9a2ce4992")
        );
        assert_eq!(report.report_time, 1_732_280_000);
        assert_eq!(report.block_number, 21_238_800);
        assert_eq!(report.nonce, 42);
        assert_eq!(report.reporter, address!("5CBcA25A8CD90d7b80Ba40a67E40E4D027738743"));
        assert_eq!(
            report.txn_hash,
            b256!("1f0b4f3c0b4c7ae3a8d7f1e2d3c4b5a69788796a5b4c3d2e1f00112233445566")
        );

        let written = serde_json::to_value(&report).unwrap();
        let keys = |v: &serde_json::Value| {
            let mut keys: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(keys(&written), keys(&stored_report()));
        assert_eq!(written["id"], stored_report()["txnHash"]);
        assert_eq!(written["__typename"], "NewReportEntity");
        assert_eq!(written["_value"], stored_report()["_value"]);
        assert_eq!(serde_json::from_value::<ValueReport>(written).unwrap(), report);
    }

    #[test]
    fn test_stored_tips_load_from_chain_and_webhook_shapes() {
        let from_chain: TipAdded =
            serde_json::from_value(stored_tip(json!("5000000000000000000"), json!(1732280000)))
                .unwrap();
        assert_eq!(from_chain.amount, U256::from(5_000_000_000_000_000_000u64));
        assert_eq!(from_chain.start_time, 1_732_280_000);

        let from_webhook: TipAdded =
            serde_json::from_value(stored_tip(json!(1e21), json!("1732280000"))).unwrap();
        assert_eq!(from_webhook.amount, U256::from(10u64).pow(U256::from(21u64)));
        assert_eq!(from_webhook.start_time, 1_732_280_000);
        assert_eq!(from_webhook.txn_hash, B256::repeat_byte(0x22));
    }

    #[test]
    fn test_id_stands_in_for_txn_hash() {
        let mut raw = stored_report();
        raw.as_object_mut().unwrap().remove("txnHash");
        raw.as_object_mut().unwrap().remove("__typename");

        let report: ValueReport = serde_json::from_value(raw).unwrap();
        assert_eq!(
            report.txn_hash,
            b256!("1f0b4f3c0b4c7ae3a8d7f1e2d3c4b5a69788796a5b4c3d2e1f00112233445566")
        );

        let mut raw = stored_report();
        raw.as_object_mut().unwrap().remove("txnHash");
        raw.as_object_mut().unwrap().remove("id");
        assert!(serde_json::from_value::<ValueReport>(raw).is_err());
    }

    #[test]
    fn test_wrong_typename_is_rejected() {
        let mut raw = stored_report();
        raw["__typename"] = json!("TipAddedEntity");

        let err = serde_json::from_value::<ValueReport>(raw).unwrap_err();
        assert!(err.to_string().contains("NewReportEntity"));
    }
}
