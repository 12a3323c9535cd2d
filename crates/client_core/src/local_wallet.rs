use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chain_client::ChainClient;
use shared::{codec, domain::Network, protocol::RawTransaction};
use tokio::sync::Mutex;
use tracing::{info, warn};
use wallet_extension::{
    ConnectResponse, PendingTransaction, SignMessageRequest, SignMessageResponse,
    SignedTransactionParts, WalletAccount, WalletExtension,
};

use crate::account::LocalAccount;

/// Software wallet for environments without a browser extension. It approves every request
/// while connected.
pub struct LocalWallet {
    account: LocalAccount,
    client: Arc<dyn ChainClient>,
    connected: AtomicBool,
    network: Mutex<Network>,
}

impl LocalWallet {
    pub fn new(account: LocalAccount, client: Arc<dyn ChainClient>) -> Self {
        let network = client.network();
        Self {
            account,
            client,
            connected: AtomicBool::new(false),
            network: Mutex::new(network),
        }
    }

    pub fn local_account(&self) -> &LocalAccount {
        &self.account
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            bail!("wallet is locked: connect before making requests");
        }
        Ok(())
    }

    fn ensure_sender(&self, transaction: &RawTransaction) -> Result<()> {
        if transaction.sender != self.account.address() {
            return Err(anyhow!(
                "transaction sender {} is not this wallet's account {}",
                transaction.sender,
                self.account.address()
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletExtension for LocalWallet {
    async fn connect(&self) -> Result<ConnectResponse> {
        self.connected.store(true, Ordering::SeqCst);
        info!(address = %self.account.address(), "wallet: connected");
        Ok(ConnectResponse {
            address: self.account.address(),
        })
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        info!(address = %self.account.address(), "wallet: disconnected");
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn account(&self) -> Result<WalletAccount> {
        self.ensure_connected()?;
        Ok(WalletAccount {
            address: self.account.address(),
            public_key: self.account.public_key(),
        })
    }

    async fn sign_and_submit_transaction(
        &self,
        transaction: &RawTransaction,
    ) -> Result<PendingTransaction> {
        self.ensure_connected()?;
        self.ensure_sender(transaction)?;
        let authenticator = self.account.sign_transaction(transaction)?;
        let hash = self
            .client
            .submit_simple(transaction, &authenticator)
            .await
            .context("wallet submit")?;
        Ok(PendingTransaction { hash })
    }

    async fn sign_transaction(&self, transaction: &RawTransaction) -> Result<SignedTransactionParts> {
        self.ensure_connected()?;
        self.ensure_sender(transaction)?;
        let authenticator = self.account.sign_transaction(transaction)?;
        Ok(SignedTransactionParts {
            transaction_bytes: codec::to_bytes(transaction)?,
            authenticator_bytes: codec::to_bytes(&authenticator)?,
        })
    }

    async fn sign_message(&self, request: SignMessageRequest) -> Result<SignMessageResponse> {
        self.ensure_connected()?;
        let text = String::from_utf8(request.message).context("message is not valid UTF-8")?;
        let signed = self.account.sign_message(&text);
        Ok(SignMessageResponse {
            signed_message: codec::to_bytes(&signed)?,
        })
    }

    async fn get_balance(&self) -> Result<u64> {
        self.ensure_connected()?;
        self.client.get_balance(self.account.address()).await
    }

    async fn get_network(&self) -> Result<Network> {
        Ok(*self.network.lock().await)
    }

    async fn switch_network(&self, network: Network) -> Result<()> {
        self.ensure_connected()?;
        let mut current = self.network.lock().await;
        if network != self.client.network() {
            warn!(
                requested = %network,
                bound = %self.client.network(),
                "wallet: chain client stays bound to its original network"
            );
        }
        *current = network;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/local_wallet_tests.rs"]
mod tests;
