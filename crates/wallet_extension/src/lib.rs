use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{AccountAddress, Ed25519PublicKey, Network, TransactionHash},
    protocol::RawTransaction,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub address: AccountAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
    pub address: AccountAddress,
    pub public_key: Ed25519PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: TransactionHash,
}

/// Output of a sign-only request: the transaction and the sender authenticator, each in the
/// chain's binary encoding. The caller is responsible for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransactionParts {
    pub transaction_bytes: Vec<u8>,
    pub authenticator_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignMessageRequest {
    pub message: Vec<u8>,
}

impl SignMessageRequest {
    pub fn text(message: &str) -> Self {
        Self {
            message: message.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignMessageResponse {
    pub signed_message: Vec<u8>,
}

/// Capability surface of an injected wallet. Implementations decide how keys are held and how
/// the user approves each request.
#[async_trait]
pub trait WalletExtension: Send + Sync {
    async fn connect(&self) -> anyhow::Result<ConnectResponse>;
    async fn disconnect(&self) -> anyhow::Result<()>;
    async fn is_connected(&self) -> anyhow::Result<bool>;
    async fn account(&self) -> anyhow::Result<WalletAccount>;
    async fn sign_and_submit_transaction(
        &self,
        transaction: &RawTransaction,
    ) -> anyhow::Result<PendingTransaction>;
    async fn sign_transaction(
        &self,
        transaction: &RawTransaction,
    ) -> anyhow::Result<SignedTransactionParts>;
    async fn sign_message(&self, request: SignMessageRequest)
        -> anyhow::Result<SignMessageResponse>;
    async fn get_balance(&self) -> anyhow::Result<u64>;
    async fn get_network(&self) -> anyhow::Result<Network>;
    async fn switch_network(&self, network: Network) -> anyhow::Result<()>;
}
