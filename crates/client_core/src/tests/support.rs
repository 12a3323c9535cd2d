use std::{collections::VecDeque, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chain_client::ChainClient;
use serde_json::Value;
use shared::{
    codec,
    domain::{AccountAddress, Network, TransactionHash},
    protocol::{
        AccountAuthenticator, FinalityStatus, OwnedToken, RawTransaction, TransactionPayload,
        TransactionResult, UnsignedTransactionRequest, ViewRequest,
    },
};
use tokio::sync::Mutex;
use wallet_extension::{
    ConnectResponse, PendingTransaction, SignMessageRequest, SignMessageResponse,
    SignedTransactionParts, WalletAccount, WalletExtension,
};

use crate::{
    account::LocalAccount,
    dispatcher::{ActionDispatcher, DispatcherConfig, ExtensionSlot},
    payloads::CollectionModule,
    session::SessionState,
};

pub(crate) const SUBMITTED_HASH: TransactionHash = TransactionHash([0x5a; 32]);
pub(crate) const WALLET_SUBMITTED_HASH: TransactionHash = TransactionHash([0x5b; 32]);
pub(crate) const COLLECTION_ADDRESS: AccountAddress = AccountAddress([0xc0; 32]);

/// What the fake chain hands back from `build_simple`.
pub(crate) fn raw_for(request: &UnsignedTransactionRequest) -> RawTransaction {
    RawTransaction {
        sender: request.sender,
        sequence_number: 7,
        payload: TransactionPayload::EntryFunction(request.entry_function().expect("entry function")),
        max_gas_amount: 200_000,
        gas_unit_price: 100,
        expiration_timestamp_secs: 1_700_000_600,
        chain_id: 4,
    }
}

pub(crate) struct TestChainClient {
    pub network: Network,
    pub polls_before_final: u32,
    pub abort: bool,
    pub hang_finality: bool,
    pub fail_with: Option<String>,
    pub fail_fund_with: Option<String>,
    pub view_values: Vec<Value>,
    pub tokens: Vec<OwnedToken>,
    pub balance: u64,
    pub calls: Arc<Mutex<Vec<&'static str>>>,
    pub polls: Arc<Mutex<u32>>,
    pub built: Arc<Mutex<Vec<UnsignedTransactionRequest>>>,
    pub submitted: Arc<Mutex<Vec<(RawTransaction, AccountAuthenticator)>>>,
    pub funded: Arc<Mutex<Vec<(AccountAddress, u64)>>>,
    pub owners: Arc<Mutex<Vec<AccountAddress>>>,
}

impl TestChainClient {
    pub(crate) fn ok() -> Self {
        Self {
            network: Network::Devnet,
            polls_before_final: 0,
            abort: false,
            hang_finality: false,
            fail_with: None,
            fail_fund_with: None,
            view_values: Vec::new(),
            tokens: Vec::new(),
            balance: 0,
            calls: Arc::new(Mutex::new(Vec::new())),
            polls: Arc::new(Mutex::new(0)),
            built: Arc::new(Mutex::new(Vec::new())),
            submitted: Arc::new(Mutex::new(Vec::new())),
            funded: Arc::new(Mutex::new(Vec::new())),
            owners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn record(&self, call: &'static str) -> Result<()> {
        self.calls.lock().await.push(call);
        match &self.fail_with {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChainClient for TestChainClient {
    fn network(&self) -> Network {
        self.network
    }

    async fn fund_account(&self, address: AccountAddress, amount: u64) -> Result<()> {
        self.record("fund_account").await?;
        if let Some(message) = &self.fail_fund_with {
            return Err(anyhow!(message.clone()));
        }
        self.funded.lock().await.push((address, amount));
        Ok(())
    }

    async fn build_simple(&self, request: &UnsignedTransactionRequest) -> Result<RawTransaction> {
        self.record("build_simple").await?;
        self.built.lock().await.push(request.clone());
        Ok(raw_for(request))
    }

    async fn submit_simple(
        &self,
        transaction: &RawTransaction,
        sender_authenticator: &AccountAuthenticator,
    ) -> Result<TransactionHash> {
        self.record("submit_simple").await?;
        self.submitted
            .lock()
            .await
            .push((transaction.clone(), sender_authenticator.clone()));
        Ok(SUBMITTED_HASH)
    }

    async fn wait_for_transaction(&self, hash: &TransactionHash) -> Result<TransactionResult> {
        self.record("wait_for_transaction").await?;
        if self.hang_finality {
            std::future::pending::<()>().await;
        }

        let mut seen = 0;
        loop {
            seen += 1;
            *self.polls.lock().await += 1;
            if seen > self.polls_before_final {
                break;
            }
            tokio::task::yield_now().await;
        }

        let (status, vm_status) = if self.abort {
            (FinalityStatus::Aborted, "Move abort: EINSUFFICIENT_BALANCE")
        } else {
            (FinalityStatus::Committed, "Executed successfully")
        };
        Ok(TransactionResult {
            hash: *hash,
            status,
            version: Some(42),
            vm_status: vm_status.to_string(),
        })
    }

    async fn view(&self, _request: &ViewRequest) -> Result<Vec<Value>> {
        self.record("view").await?;
        Ok(self.view_values.clone())
    }

    async fn get_account_owned_tokens(&self, owner: AccountAddress) -> Result<Vec<OwnedToken>> {
        self.record("get_account_owned_tokens").await?;
        self.owners.lock().await.push(owner);
        Ok(self.tokens.clone())
    }

    async fn get_balance(&self, _address: AccountAddress) -> Result<u64> {
        self.record("get_balance").await?;
        Ok(self.balance)
    }
}

pub(crate) struct TestExtension {
    pub signer: LocalAccount,
    pub fail_with: Option<String>,
    pub hang: bool,
    pub connect_script: Mutex<VecDeque<(Duration, AccountAddress)>>,
    pub network: Mutex<Network>,
    pub transaction_bytes_override: Option<Vec<u8>>,
    pub signed_message_override: Option<Vec<u8>>,
    pub calls: Arc<Mutex<Vec<&'static str>>>,
    pub signed: Arc<Mutex<Vec<RawTransaction>>>,
}

impl TestExtension {
    pub(crate) fn ok() -> Self {
        Self {
            signer: LocalAccount::from_seed(&[7u8; 32]),
            fail_with: None,
            hang: false,
            connect_script: Mutex::new(VecDeque::new()),
            network: Mutex::new(Network::Devnet),
            transaction_bytes_override: None,
            signed_message_override: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            signed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::ok()
        }
    }

    pub(crate) fn address(&self) -> AccountAddress {
        self.signer.address()
    }

    async fn enter(&self, call: &'static str) -> Result<()> {
        self.calls.lock().await.push(call);
        if self.hang {
            std::future::pending::<()>().await;
        }
        match &self.fail_with {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WalletExtension for TestExtension {
    async fn connect(&self) -> Result<ConnectResponse> {
        self.enter("connect").await?;
        let scripted = self.connect_script.lock().await.pop_front();
        match scripted {
            Some((delay, address)) => {
                tokio::time::sleep(delay).await;
                Ok(ConnectResponse { address })
            }
            None => Ok(ConnectResponse {
                address: self.address(),
            }),
        }
    }

    async fn disconnect(&self) -> Result<()> {
        self.enter("disconnect").await
    }

    async fn is_connected(&self) -> Result<bool> {
        self.enter("is_connected").await?;
        Ok(true)
    }

    async fn account(&self) -> Result<WalletAccount> {
        self.enter("account").await?;
        Ok(WalletAccount {
            address: self.address(),
            public_key: self.signer.public_key(),
        })
    }

    async fn sign_and_submit_transaction(
        &self,
        transaction: &RawTransaction,
    ) -> Result<PendingTransaction> {
        self.enter("sign_and_submit_transaction").await?;
        self.signed.lock().await.push(transaction.clone());
        Ok(PendingTransaction {
            hash: WALLET_SUBMITTED_HASH,
        })
    }

    async fn sign_transaction(&self, transaction: &RawTransaction) -> Result<SignedTransactionParts> {
        self.enter("sign_transaction").await?;
        self.signed.lock().await.push(transaction.clone());
        let authenticator = self.signer.sign_transaction(transaction)?;
        let transaction_bytes = match &self.transaction_bytes_override {
            Some(bytes) => bytes.clone(),
            None => codec::to_bytes(transaction)?,
        };
        Ok(SignedTransactionParts {
            transaction_bytes,
            authenticator_bytes: codec::to_bytes(&authenticator)?,
        })
    }

    async fn sign_message(&self, request: SignMessageRequest) -> Result<SignMessageResponse> {
        self.enter("sign_message").await?;
        if let Some(bytes) = &self.signed_message_override {
            return Ok(SignMessageResponse {
                signed_message: bytes.clone(),
            });
        }
        let text = String::from_utf8(request.message)?;
        Ok(SignMessageResponse {
            signed_message: codec::to_bytes(&self.signer.sign_message(&text))?,
        })
    }

    async fn get_balance(&self) -> Result<u64> {
        self.enter("get_balance").await?;
        Ok(1_234)
    }

    async fn get_network(&self) -> Result<Network> {
        self.enter("get_network").await?;
        Ok(*self.network.lock().await)
    }

    async fn switch_network(&self, network: Network) -> Result<()> {
        self.enter("switch_network").await?;
        *self.network.lock().await = network;
        Ok(())
    }
}

pub(crate) fn test_config() -> DispatcherConfig {
    DispatcherConfig {
        call_timeout: Duration::from_millis(200),
        finality_timeout: Duration::from_millis(500),
        ..DispatcherConfig::new(CollectionModule::new(COLLECTION_ADDRESS, "ExpandNFT"))
    }
}

pub(crate) fn demo_counterpart() -> Arc<LocalAccount> {
    Arc::new(LocalAccount::from_seed(&[9u8; 32]))
}

pub(crate) fn dispatcher_with_config(
    extension: Option<Arc<TestExtension>>,
    chain: Arc<TestChainClient>,
    config: DispatcherConfig,
) -> ActionDispatcher {
    let slot = match extension {
        Some(extension) => ExtensionSlot::Available(extension as Arc<dyn WalletExtension>),
        None => ExtensionSlot::Absent,
    };
    let client: Arc<dyn ChainClient> = chain;
    let session = SessionState::with_parts(Some(client), Some(demo_counterpart()));
    ActionDispatcher::new(slot, Arc::new(session), config)
}

pub(crate) fn dispatcher_with(
    extension: Option<Arc<TestExtension>>,
    chain: Arc<TestChainClient>,
) -> ActionDispatcher {
    dispatcher_with_config(extension, chain, test_config())
}
