//! Solidity event definitions for the oracle and autopay contracts.

use alloy::primitives::B256;
use alloy::sol;
use alloy::sol_types::SolEvent;
use oraclefeed_core::EventKind;

sol! {
    /// Oracle value submission (oracle "flex" contract).
    #[derive(Debug, PartialEq, Eq)]
    event NewReport(
        bytes32 indexed queryId,
        uint256 indexed time,
        bytes value,
        uint256 nonce,
        bytes queryData,
        address indexed reporter
    );

    /// Tip funding an oracle query (autopay contract).
    #[derive(Debug, PartialEq, Eq)]
    event TipAdded(
        bytes32 indexed queryId,
        uint256 indexed amount,
        bytes queryData,
        address tipper
    );
}

/// topic0 of the event behind each record variant.
pub fn signature_hash(kind: EventKind) -> B256 {
    match kind {
        EventKind::ValueReport => NewReport::SIGNATURE_HASH,
        EventKind::TipAdded => TipAdded::SIGNATURE_HASH,
    }
}
