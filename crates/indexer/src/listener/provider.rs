//! RPC access for the backfill.

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::transports::http::{Client, Http};
use anyhow::{Context, Result};
use async_trait::async_trait;
use oraclefeed_core::EventKind;

use super::events::signature_hash;

/// Source of historical logs.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Current chain head.
    async fn block_number(&self) -> Result<u64>;

    /// Raw logs of `kind` in `[from_block, to_block]`.
    async fn logs(&self, kind: EventKind, from_block: u64, to_block: u64) -> Result<Vec<Log>>;
}

/// HTTP JSON-RPC provider bound to the two event-emitting contracts.
#[derive(Clone)]
pub struct RpcProvider {
    provider: RootProvider<Http<Client>>,
    flex_address: Address,
    autopay_address: Address,
}

impl RpcProvider {
    /// Create a new RPC provider.
    pub fn new(rpc_url: &str, flex_address: Address, autopay_address: Address) -> Result<Self> {
        let url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self {
            provider,
            flex_address,
            autopay_address,
        })
    }

    fn contract_for(&self, kind: EventKind) -> Address {
        match kind {
            EventKind::ValueReport => self.flex_address,
            EventKind::TipAdded => self.autopay_address,
        }
    }
}

#[async_trait]
impl LogSource for RpcProvider {
    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("Failed to get block number")
    }

    async fn logs(&self, kind: EventKind, from_block: u64, to_block: u64) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .address(self.contract_for(kind))
            .event_signature(signature_hash(kind))
            .from_block(from_block)
            .to_block(to_block);

        self.provider
            .get_logs(&filter)
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch {} logs for blocks {} to {}",
                    kind, from_block, to_block
                )
            })
    }
}
