use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{AccountAddress, Network, TransactionHash},
    protocol::{
        AccountAuthenticator, OwnedToken, RawTransaction, TransactionResult,
        UnsignedTransactionRequest, ViewRequest,
    },
};
use url::Url;

mod rest;
pub use rest::RestChainClient;

pub const DEFAULT_MAX_GAS_AMOUNT: u64 = 200_000;
pub const DEFAULT_GAS_UNIT_PRICE: u64 = 100;
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(600);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_POLLS: u32 = 60;

/// Everything a client needs to talk to one network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: Network,
    pub fullnode_url: Url,
    pub faucet_url: Option<Url>,
    pub indexer_url: Option<Url>,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration: Duration,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl NetworkConfig {
    pub fn custom(network: Network, fullnode_url: Url) -> Self {
        Self {
            network,
            fullnode_url,
            faucet_url: None,
            indexer_url: None,
            max_gas_amount: DEFAULT_MAX_GAS_AMOUNT,
            gas_unit_price: DEFAULT_GAS_UNIT_PRICE,
            expiration: DEFAULT_EXPIRATION,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Uses the well-known endpoints for `network`; networks without them need `custom`.
    pub fn for_network(network: Network) -> Result<Self> {
        let fullnode = network
            .default_fullnode_url()
            .ok_or_else(|| anyhow!("no default fullnode url for network {network}"))?;
        let mut config = Self::custom(
            network,
            Url::parse(fullnode).with_context(|| format!("invalid fullnode url '{fullnode}'"))?,
        );
        if let Some(faucet) = network.default_faucet_url() {
            config.faucet_url =
                Some(Url::parse(faucet).with_context(|| format!("invalid faucet url '{faucet}'"))?);
        }
        Ok(config)
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn network(&self) -> Network;
    async fn fund_account(&self, address: AccountAddress, amount: u64) -> Result<()>;
    async fn build_simple(&self, request: &UnsignedTransactionRequest) -> Result<RawTransaction>;
    async fn submit_simple(
        &self,
        transaction: &RawTransaction,
        sender_authenticator: &AccountAuthenticator,
    ) -> Result<TransactionHash>;
    /// Resolves once the transaction leaves the pending state, or fails when the client's own
    /// polling budget runs out.
    async fn wait_for_transaction(&self, hash: &TransactionHash) -> Result<TransactionResult>;
    async fn view(&self, request: &ViewRequest) -> Result<Vec<Value>>;
    async fn get_account_owned_tokens(&self, owner: AccountAddress) -> Result<Vec<OwnedToken>>;
    async fn get_balance(&self, address: AccountAddress) -> Result<u64>;
}

/// Move integers above u32 come back as JSON strings.
pub fn parse_u64_value(value: &Value) -> Result<u64> {
    match value {
        Value::String(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid u64 string '{raw}'")),
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| anyhow!("invalid u64 number {number}")),
        other => Err(anyhow!("expected u64, got {other}")),
    }
}

#[cfg(test)]
mod tests;
