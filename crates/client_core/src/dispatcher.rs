use std::{fmt, future::Future, sync::Arc, time::Duration};

use chain_client::ChainClient;
use shared::{
    codec,
    domain::{AccountAddress, Network, TransactionHash},
    error::ReportError,
    protocol::{
        AccountAuthenticator, OwnedToken, RawTransaction, SignedMessage, TransactionResult,
        UnsignedTransactionRequest,
    },
};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use wallet_extension::{
    SignMessageRequest, SignedTransactionParts, WalletAccount, WalletExtension,
};

use crate::{
    account::LocalAccount,
    error::{DispatchError, Precondition, Step},
    payloads::{self, CollectionModule, NftMetadata},
    session::SessionState,
};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_FINALITY_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_TRANSFER_AMOUNT: u64 = 1_000;
const REPORT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub call_timeout: Duration,
    /// Deadline for calls that wait on chain finality, faucet funding included.
    pub finality_timeout: Duration,
    pub transfer_amount: u64,
    pub fund_amount: u64,
    pub fund_counterpart: bool,
    pub collection: CollectionModule,
}

impl DispatcherConfig {
    pub fn new(collection: CollectionModule) -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            finality_timeout: DEFAULT_FINALITY_TIMEOUT,
            transfer_amount: DEFAULT_TRANSFER_AMOUNT,
            fund_amount: payloads::OCTAS_PER_COIN,
            fund_counterpart: true,
            collection,
        }
    }
}

/// Whether a wallet extension was detected when the dispatcher was built.
#[derive(Clone)]
pub enum ExtensionSlot {
    Absent,
    Available(Arc<dyn WalletExtension>),
}

impl ExtensionSlot {
    pub fn is_available(&self) -> bool {
        matches!(self, ExtensionSlot::Available(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Connect,
    Disconnect,
    IsConnected,
    GetAccount,
    GetBalance,
    GetNetwork,
    SwitchNetwork,
    SignAndSubmit,
    SignOnly,
    SignMessage,
    MintNft,
    MintBatch,
    TransferNft,
    CollectionExists,
    OwnedTokens,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Connect => "connect",
            ActionKind::Disconnect => "disconnect",
            ActionKind::IsConnected => "is_connected",
            ActionKind::GetAccount => "get_account",
            ActionKind::GetBalance => "get_balance",
            ActionKind::GetNetwork => "get_network",
            ActionKind::SwitchNetwork => "switch_network",
            ActionKind::SignAndSubmit => "sign_and_submit",
            ActionKind::SignOnly => "sign_only",
            ActionKind::SignMessage => "sign_message",
            ActionKind::MintNft => "mint_nft",
            ActionKind::MintBatch => "mint_batch",
            ActionKind::TransferNft => "transfer_nft",
            ActionKind::CollectionExists => "collection_exists",
            ActionKind::OwnedTokens => "owned_tokens",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Connected(AccountAddress),
    Disconnected,
    ConnectionStatus(bool),
    Account(WalletAccount),
    Balance(u64),
    Network(Network),
    NetworkSwitched(Network),
    TransactionConfirmed(TransactionResult),
    MessageSigned(SignedMessage),
    CollectionExists(bool),
    OwnedTokens(Vec<OwnedToken>),
    /// The wallet answered after a newer connect, account or disconnect request had already
    /// settled the session, so the answer was dropped. `current` is the session's address.
    Superseded {
        current: Option<AccountAddress>,
    },
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Connected(address) => write!(f, "connected as {address}"),
            ActionOutcome::Disconnected => f.write_str("disconnected"),
            ActionOutcome::ConnectionStatus(connected) => write!(f, "connected: {connected}"),
            ActionOutcome::Account(account) => {
                write!(f, "account {} (public key {})", account.address, account.public_key)
            }
            ActionOutcome::Balance(octas) => write!(f, "balance: {octas} octas"),
            ActionOutcome::Network(network) => write!(f, "network: {network}"),
            ActionOutcome::NetworkSwitched(network) => write!(f, "switched to {network}"),
            ActionOutcome::TransactionConfirmed(result) => match result.version {
                Some(version) => write!(
                    f,
                    "transaction {} committed at version {version}",
                    result.hash
                ),
                None => write!(f, "transaction {} committed", result.hash),
            },
            ActionOutcome::MessageSigned(signed) => write!(
                f,
                "signed '{}' with {}: {}",
                signed.message, signed.public_key, signed.signature
            ),
            ActionOutcome::CollectionExists(exists) => write!(f, "collection exists: {exists}"),
            ActionOutcome::OwnedTokens(tokens) => {
                write!(f, "{} owned token(s)", tokens.len())?;
                for token in tokens {
                    write!(
                        f,
                        "\n  {} x{} ({})",
                        token.token_name, token.amount, token.token_data_id
                    )?;
                }
                Ok(())
            }
            ActionOutcome::Superseded { current } => {
                f.write_str("superseded by a newer request; ")?;
                match current {
                    Some(address) => write!(f, "session is connected as {address}"),
                    None => f.write_str("session is disconnected"),
                }
            }
        }
    }
}

/// What subscribers see once an action finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: ActionKind,
    pub outcome: Result<ActionOutcome, ReportError>,
}

/// Turns user actions into wallet and chain calls. Every handler checks its preconditions before
/// any call, bounds each call with a deadline and reports the result on the report channel.
pub struct ActionDispatcher {
    extension: ExtensionSlot,
    session: Arc<SessionState>,
    config: DispatcherConfig,
    reports: broadcast::Sender<ActionReport>,
}

impl ActionDispatcher {
    pub fn new(
        extension: ExtensionSlot,
        session: Arc<SessionState>,
        config: DispatcherConfig,
    ) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            extension,
            session,
            config,
            reports,
        }
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn subscribe_reports(&self) -> broadcast::Receiver<ActionReport> {
        self.reports.subscribe()
    }

    pub async fn connect(&self) -> Result<ActionOutcome, DispatchError> {
        let result = self.run_connect().await;
        self.finish(ActionKind::Connect, result)
    }

    pub async fn disconnect(&self) -> Result<ActionOutcome, DispatchError> {
        let result = self.run_disconnect().await;
        self.finish(ActionKind::Disconnect, result)
    }

    pub async fn is_connected(&self) -> Result<ActionOutcome, DispatchError> {
        let result: Result<ActionOutcome, DispatchError> = async {
            let extension = self.extension()?;
            let connected = self
                .call(Step::ExtensionIsConnected, extension.is_connected())
                .await?;
            Ok(ActionOutcome::ConnectionStatus(connected))
        }
        .await;
        self.finish(ActionKind::IsConnected, result)
    }

    pub async fn get_account(&self) -> Result<ActionOutcome, DispatchError> {
        let result = self.run_get_account().await;
        self.finish(ActionKind::GetAccount, result)
    }

    pub async fn get_balance(&self) -> Result<ActionOutcome, DispatchError> {
        let result: Result<ActionOutcome, DispatchError> = async {
            let extension = self.extension()?;
            let balance = self
                .call(Step::ExtensionBalance, extension.get_balance())
                .await?;
            Ok(ActionOutcome::Balance(balance))
        }
        .await;
        self.finish(ActionKind::GetBalance, result)
    }

    pub async fn get_network(&self) -> Result<ActionOutcome, DispatchError> {
        let result: Result<ActionOutcome, DispatchError> = async {
            let extension = self.extension()?;
            let network = self
                .call(Step::ExtensionNetwork, extension.get_network())
                .await?;
            Ok(ActionOutcome::Network(network))
        }
        .await;
        self.finish(ActionKind::GetNetwork, result)
    }

    /// Leaves the connected address untouched.
    pub async fn switch_network(&self, network: Network) -> Result<ActionOutcome, DispatchError> {
        let result: Result<ActionOutcome, DispatchError> = async {
            let extension = self.extension()?;
            self.call(
                Step::ExtensionSwitchNetwork,
                extension.switch_network(network),
            )
            .await?;
            Ok(ActionOutcome::NetworkSwitched(network))
        }
        .await;
        self.finish(ActionKind::SwitchNetwork, result)
    }

    /// Funds the demo counterpart from the faucet, then has the wallet sign and submit a coin
    /// transfer to it. A funding failure stops the saga before the transfer is requested.
    pub async fn sign_and_submit(&self) -> Result<ActionOutcome, DispatchError> {
        let result = self.run_sign_and_submit().await;
        self.finish(ActionKind::SignAndSubmit, result)
    }

    /// Has the wallet sign a coin transfer without submitting it, then submits the decoded
    /// transaction through the chain client.
    pub async fn sign_only(&self) -> Result<ActionOutcome, DispatchError> {
        let result = self.run_sign_only().await;
        self.finish(ActionKind::SignOnly, result)
    }

    pub async fn sign_message(&self, message: &str) -> Result<ActionOutcome, DispatchError> {
        let result = self.run_sign_message(message).await;
        self.finish(ActionKind::SignMessage, result)
    }

    /// Mints one token to the connected account.
    pub async fn mint_nft(&self, metadata: NftMetadata) -> Result<ActionOutcome, DispatchError> {
        let result: Result<ActionOutcome, DispatchError> = async {
            let extension = self.extension()?;
            let sender = self.require_connected().await?;
            let client = self.require_client().await?;
            let request = self.config.collection.mint_nft(sender, sender, &metadata);
            let confirmed = self
                .submit_through_extension(&extension, &client, &request)
                .await?;
            info!(name = %metadata.name, hash = %confirmed.hash, "dispatch: token minted");
            Ok(ActionOutcome::TransactionConfirmed(confirmed))
        }
        .await;
        self.finish(ActionKind::MintNft, result)
    }

    pub async fn mint_batch(&self) -> Result<ActionOutcome, DispatchError> {
        let result: Result<ActionOutcome, DispatchError> = async {
            let extension = self.extension()?;
            let sender = self.require_connected().await?;
            let client = self.require_client().await?;
            let items = payloads::demo_batch(chrono::Utc::now().timestamp_millis());
            let request = self.config.collection.mint_batch_nft(sender, sender, &items);
            let confirmed = self
                .submit_through_extension(&extension, &client, &request)
                .await?;
            Ok(ActionOutcome::TransactionConfirmed(confirmed))
        }
        .await;
        self.finish(ActionKind::MintBatch, result)
    }

    /// Moves the token object at `object` from the connected account to `to`.
    pub async fn transfer_nft(
        &self,
        object: AccountAddress,
        to: AccountAddress,
    ) -> Result<ActionOutcome, DispatchError> {
        let result: Result<ActionOutcome, DispatchError> = async {
            let extension = self.extension()?;
            let sender = self.require_connected().await?;
            let client = self.require_client().await?;
            let request = self.config.collection.transfer_nft(sender, object, to);
            let confirmed = self
                .submit_through_extension(&extension, &client, &request)
                .await?;
            Ok(ActionOutcome::TransactionConfirmed(confirmed))
        }
        .await;
        self.finish(ActionKind::TransferNft, result)
    }

    pub async fn collection_exists(
        &self,
        creator: AccountAddress,
    ) -> Result<ActionOutcome, DispatchError> {
        let result: Result<ActionOutcome, DispatchError> = async {
            let client = self.require_client().await?;
            let request = self.config.collection.collection_exists(creator);
            let values = self.call(Step::ChainView, client.view(&request)).await?;
            match values.first().and_then(|value| value.as_bool()) {
                Some(exists) => Ok(ActionOutcome::CollectionExists(exists)),
                None => Err(DispatchError::ExternalCall {
                    step: Step::ChainView,
                    message: format!("expected a single bool, got {values:?}"),
                }),
            }
        }
        .await;
        self.finish(ActionKind::CollectionExists, result)
    }

    /// Lists tokens held by `owner`, or by the connected account when `owner` is `None`.
    pub async fn owned_tokens(
        &self,
        owner: Option<AccountAddress>,
    ) -> Result<ActionOutcome, DispatchError> {
        let result: Result<ActionOutcome, DispatchError> = async {
            let client = self.require_client().await?;
            let owner = match owner {
                Some(owner) => owner,
                None => self.require_connected().await?,
            };
            let tokens = self
                .call(Step::ChainIndexer, client.get_account_owned_tokens(owner))
                .await?;
            Ok(ActionOutcome::OwnedTokens(tokens))
        }
        .await;
        self.finish(ActionKind::OwnedTokens, result)
    }

    async fn run_connect(&self) -> Result<ActionOutcome, DispatchError> {
        let extension = self.extension()?;
        let ticket = self.session.issue_ticket();
        let response = self
            .call(Step::ExtensionConnect, extension.connect())
            .await?;
        if !self.session.set_connected(ticket, response.address).await {
            return Ok(self.superseded().await);
        }
        Ok(ActionOutcome::Connected(response.address))
    }

    async fn run_disconnect(&self) -> Result<ActionOutcome, DispatchError> {
        let extension = self.extension()?;
        self.require_connected().await?;
        let ticket = self.session.issue_ticket();
        self.call(Step::ExtensionDisconnect, extension.disconnect())
            .await?;
        if !self.session.clear(ticket).await {
            return Ok(self.superseded().await);
        }
        Ok(ActionOutcome::Disconnected)
    }

    async fn run_get_account(&self) -> Result<ActionOutcome, DispatchError> {
        let extension = self.extension()?;
        let ticket = self.session.issue_ticket();
        let account = self
            .call(Step::ExtensionAccount, extension.account())
            .await?;
        if !self.session.set_connected(ticket, account.address).await {
            return Ok(self.superseded().await);
        }
        Ok(ActionOutcome::Account(account))
    }

    async fn superseded(&self) -> ActionOutcome {
        ActionOutcome::Superseded {
            current: self.session.connected_address().await,
        }
    }

    async fn run_sign_and_submit(&self) -> Result<ActionOutcome, DispatchError> {
        let extension = self.extension()?;
        let sender = self.require_connected().await?;
        let client = self.require_client().await?;
        let counterpart = self.require_counterpart().await?;

        if self.config.fund_counterpart {
            guarded(
                Step::ChainFund,
                self.config.finality_timeout,
                client.fund_account(counterpart.address(), self.config.fund_amount),
            )
            .await
            .map_err(|err| DispatchError::FundingFailed(Box::new(err)))?;
            info!(
                counterpart = %counterpart.address(),
                amount = self.config.fund_amount,
                "dispatch: demo counterpart funded"
            );
        }

        let request =
            payloads::coin_transfer(sender, counterpart.address(), self.config.transfer_amount);
        let confirmed = self
            .submit_through_extension(&extension, &client, &request)
            .await
            .map_err(|err| DispatchError::TransferFailed(Box::new(err)))?;
        Ok(ActionOutcome::TransactionConfirmed(confirmed))
    }

    async fn run_sign_only(&self) -> Result<ActionOutcome, DispatchError> {
        let extension = self.extension()?;
        let sender = self.require_connected().await?;
        let client = self.require_client().await?;
        let counterpart = self.require_counterpart().await?;

        let request =
            payloads::coin_transfer(sender, counterpart.address(), self.config.transfer_amount);
        let raw = self
            .call(Step::ChainBuild, client.build_simple(&request))
            .await?;
        let parts = self
            .call(
                Step::ExtensionSignTransaction,
                extension.sign_transaction(&raw),
            )
            .await?;

        let (transaction, authenticator) = decode_signed_parts(&parts)?;
        if transaction.sender != sender {
            return Err(DispatchError::Deserialization {
                what: "transaction",
                message: format!(
                    "signed sender {} does not match connected account {sender}",
                    transaction.sender
                ),
            });
        }

        let hash = self
            .call(
                Step::ChainSubmit,
                client.submit_simple(&transaction, &authenticator),
            )
            .await?;
        info!(%hash, %sender, "dispatch: wallet-signed transaction submitted");
        let confirmed = self.await_finality(&client, &hash).await?;
        Ok(ActionOutcome::TransactionConfirmed(confirmed))
    }

    async fn run_sign_message(&self, message: &str) -> Result<ActionOutcome, DispatchError> {
        let extension = self.extension()?;
        let response = self
            .call(
                Step::ExtensionSignMessage,
                extension.sign_message(SignMessageRequest::text(message)),
            )
            .await?;
        let signed: SignedMessage =
            codec::from_bytes(&response.signed_message).map_err(|err| {
                DispatchError::Deserialization {
                    what: "signed message",
                    message: err.to_string(),
                }
            })?;
        if signed.message != message {
            return Err(DispatchError::Deserialization {
                what: "signed message",
                message: format!("wallet signed '{}' instead of '{message}'", signed.message),
            });
        }
        Ok(ActionOutcome::MessageSigned(signed))
    }

    async fn submit_through_extension(
        &self,
        extension: &Arc<dyn WalletExtension>,
        client: &Arc<dyn ChainClient>,
        request: &UnsignedTransactionRequest,
    ) -> Result<TransactionResult, DispatchError> {
        let raw = self
            .call(Step::ChainBuild, client.build_simple(request))
            .await?;
        let pending = self
            .call(
                Step::ExtensionSignAndSubmit,
                extension.sign_and_submit_transaction(&raw),
            )
            .await?;
        info!(
            hash = %pending.hash,
            function = %request.function,
            "dispatch: wallet submitted transaction"
        );
        self.await_finality(client, &pending.hash).await
    }

    async fn await_finality(
        &self,
        client: &Arc<dyn ChainClient>,
        hash: &TransactionHash,
    ) -> Result<TransactionResult, DispatchError> {
        let result = guarded(
            Step::ChainFinality,
            self.config.finality_timeout,
            client.wait_for_transaction(hash),
        )
        .await?;
        if !result.is_committed() {
            return Err(DispatchError::ExternalCall {
                step: Step::ChainFinality,
                message: format!("transaction {} aborted: {}", result.hash, result.vm_status),
            });
        }
        Ok(result)
    }

    async fn call<T, F>(&self, step: Step, call: F) -> Result<T, DispatchError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        guarded(step, self.config.call_timeout, call).await
    }

    fn extension(&self) -> Result<Arc<dyn WalletExtension>, DispatchError> {
        match &self.extension {
            ExtensionSlot::Available(extension) => Ok(Arc::clone(extension)),
            ExtensionSlot::Absent => Err(DispatchError::ExtensionUnavailable),
        }
    }

    async fn require_connected(&self) -> Result<AccountAddress, DispatchError> {
        self.session
            .connected_address()
            .await
            .ok_or(DispatchError::PreconditionUnmet(Precondition::NotConnected))
    }

    async fn require_client(&self) -> Result<Arc<dyn ChainClient>, DispatchError> {
        self.session
            .client()
            .await
            .ok_or(DispatchError::PreconditionUnmet(
                Precondition::ClientUninitialized,
            ))
    }

    async fn require_counterpart(&self) -> Result<Arc<LocalAccount>, DispatchError> {
        self.session
            .demo_counterpart()
            .await
            .ok_or(DispatchError::PreconditionUnmet(
                Precondition::CounterpartUninitialized,
            ))
    }

    fn finish(
        &self,
        action: ActionKind,
        result: Result<ActionOutcome, DispatchError>,
    ) -> Result<ActionOutcome, DispatchError> {
        match &result {
            Ok(outcome @ ActionOutcome::Superseded { .. }) => {
                warn!(%action, %outcome, "dispatch: stale completion dropped")
            }
            Ok(outcome) => info!(%action, %outcome, "dispatch: action succeeded"),
            Err(err @ (DispatchError::ExtensionUnavailable | DispatchError::PreconditionUnmet(_))) => {
                warn!(%action, error = %err, "dispatch: action skipped")
            }
            Err(err) => error!(%action, code = ?err.code(), error = %err, "dispatch: action failed"),
        }
        let _ = self.reports.send(ActionReport {
            action,
            outcome: result.clone().map_err(|err| ReportError::from(&err)),
        });
        result
    }
}

/// Runs `call` under `limit`, mapping a rejection or an elapsed deadline to `step`.
pub async fn guarded<T, F>(step: Step, limit: Duration, call: F) -> Result<T, DispatchError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(DispatchError::external(step, err)),
        Err(_) => Err(DispatchError::Timeout { step, after: limit }),
    }
}

/// Decodes the two blobs a wallet returns for a sign-only request.
pub fn decode_signed_parts(
    parts: &SignedTransactionParts,
) -> Result<(RawTransaction, AccountAuthenticator), DispatchError> {
    let transaction: RawTransaction =
        codec::from_bytes(&parts.transaction_bytes).map_err(|err| {
            DispatchError::Deserialization {
                what: "transaction",
                message: err.to_string(),
            }
        })?;
    let authenticator: AccountAuthenticator =
        codec::from_bytes(&parts.authenticator_bytes).map_err(|err| {
            DispatchError::Deserialization {
                what: "authenticator",
                message: err.to_string(),
            }
        })?;
    Ok((transaction, authenticator))
}
