use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use shared::{
    codec,
    domain::{AccountAddress, Network, TransactionHash},
    protocol::{
        AccountAuthenticator, FinalityStatus, FunctionArgument, FunctionId, ModuleId, OwnedToken,
        RawTransaction, SignedTransaction, TransactionPayload, TransactionResult, TypeTag,
        UnsignedTransactionRequest, ViewRequest,
    },
};
use tracing::{debug, info};

use crate::{parse_u64_value, ChainClient, NetworkConfig};

const SIGNED_TRANSACTION_CONTENT_TYPE: &str = "application/x.cedra.signed_transaction+bcs";
const NATIVE_COIN_TYPE: &str = "0x1::cedra_coin::CedraCoin";
const PENDING_TRANSACTION_KIND: &str = "pending_transaction";

const OWNED_TOKENS_QUERY: &str = r#"
query OwnedTokens($owner: String!) {
  current_token_ownerships_v2(
    where: {owner_address: {_eq: $owner}, amount: {_gt: 0}, token_standard: {_eq: "v2"}}
  ) {
    token_data_id
    amount
    current_token_data {
      token_name
      token_uri
      collection_id
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct LedgerInfo {
    chain_id: u8,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    sequence_number: String,
}

#[derive(Debug, Deserialize)]
struct PendingTransactionResponse {
    hash: TransactionHash,
}

#[derive(Debug, Deserialize)]
struct TransactionView {
    #[serde(rename = "type")]
    kind: String,
    hash: TransactionHash,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    vm_status: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NodeErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OwnershipData {
    current_token_ownerships_v2: Vec<OwnershipRow>,
}

#[derive(Debug, Deserialize)]
struct OwnershipRow {
    token_data_id: String,
    amount: Value,
    current_token_data: Option<TokenDataRow>,
}

#[derive(Debug, Deserialize)]
struct TokenDataRow {
    token_name: String,
    token_uri: String,
    collection_id: String,
}

/// Chain client over a fullnode's REST API, with optional faucet and indexer endpoints.
pub struct RestChainClient {
    http: Client,
    config: NetworkConfig,
}

impl RestChainClient {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    fn fullnode(&self, path: &str) -> String {
        let base = self.config.fullnode_url.as_str().trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }

    async fn ledger_chain_id(&self) -> Result<u8> {
        let response = self.http.get(self.fullnode("")).send().await?;
        let ledger: LedgerInfo = read_json(response).await.context("ledger info")?;
        Ok(ledger.chain_id)
    }

    async fn sequence_number(&self, address: AccountAddress) -> Result<u64> {
        let response = self
            .http
            .get(self.fullnode(&format!("accounts/{address}")))
            .send()
            .await?;
        let account: AccountData = read_json(response)
            .await
            .with_context(|| format!("account {address}"))?;
        account
            .sequence_number
            .parse()
            .with_context(|| format!("invalid sequence number '{}'", account.sequence_number))
    }

    async fn fetch_transaction(&self, hash: &TransactionHash) -> Result<Option<TransactionView>> {
        let response = self
            .http
            .get(self.fullnode(&format!("transactions/by_hash/{hash}")))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response).await.map(Some)
    }
}

/// Decodes a JSON body, turning node error payloads into readable errors.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<NodeErrorBody>(&body)
        .map(|parsed| parsed.message)
        .unwrap_or(body);
    Err(anyhow!("request failed with status {status}: {message}"))
}

fn into_result(view: TransactionView) -> Result<TransactionResult> {
    let version = view
        .version
        .as_deref()
        .map(str::parse::<u64>)
        .transpose()
        .with_context(|| format!("invalid version for transaction {}", view.hash))?;
    let status = if view.success.unwrap_or(false) {
        FinalityStatus::Committed
    } else {
        FinalityStatus::Aborted
    };
    Ok(TransactionResult {
        hash: view.hash,
        status,
        version,
        vm_status: view.vm_status.unwrap_or_default(),
    })
}

#[async_trait]
impl ChainClient for RestChainClient {
    fn network(&self) -> Network {
        self.config.network
    }

    async fn fund_account(&self, address: AccountAddress, amount: u64) -> Result<()> {
        let faucet = self
            .config
            .faucet_url
            .as_ref()
            .ok_or_else(|| anyhow!("no faucet configured for network {}", self.config.network))?;
        let url = format!("{}/mint", faucet.as_str().trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .query(&[("amount", amount.to_string()), ("address", address.to_hex())])
            .send()
            .await?;
        let hashes: Vec<TransactionHash> = read_json(response).await.context("faucet mint")?;
        info!(%address, amount, transactions = hashes.len(), "chain: faucet mint submitted");

        let results =
            futures::future::try_join_all(hashes.iter().map(|hash| self.wait_for_transaction(hash)))
                .await?;
        if let Some(failed) = results.iter().find(|result| !result.is_committed()) {
            return Err(anyhow!(
                "faucet transaction {} aborted: {}",
                failed.hash,
                failed.vm_status
            ));
        }
        Ok(())
    }

    async fn build_simple(&self, request: &UnsignedTransactionRequest) -> Result<RawTransaction> {
        let chain_id = self.ledger_chain_id().await?;
        let sequence_number = self.sequence_number(request.sender).await?;
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        Ok(RawTransaction {
            sender: request.sender,
            sequence_number,
            payload: TransactionPayload::EntryFunction(request.entry_function()?),
            max_gas_amount: self.config.max_gas_amount,
            gas_unit_price: self.config.gas_unit_price,
            expiration_timestamp_secs: now + self.config.expiration.as_secs(),
            chain_id,
        })
    }

    async fn submit_simple(
        &self,
        transaction: &RawTransaction,
        sender_authenticator: &AccountAuthenticator,
    ) -> Result<TransactionHash> {
        let signed = SignedTransaction::new(transaction.clone(), sender_authenticator.clone());
        let response = self
            .http
            .post(self.fullnode("transactions"))
            .header(CONTENT_TYPE, SIGNED_TRANSACTION_CONTENT_TYPE)
            .body(codec::to_bytes(&signed)?)
            .send()
            .await?;
        let pending: PendingTransactionResponse =
            read_json(response).await.context("submit transaction")?;
        info!(hash = %pending.hash, sender = %transaction.sender, "chain: transaction submitted");
        Ok(pending.hash)
    }

    async fn wait_for_transaction(&self, hash: &TransactionHash) -> Result<TransactionResult> {
        let max_polls = self.config.max_polls.max(1);
        for attempt in 0..max_polls {
            match self.fetch_transaction(hash).await? {
                Some(view) if view.kind != PENDING_TRANSACTION_KIND => {
                    let result = into_result(view)?;
                    info!(
                        %hash,
                        status = ?result.status,
                        polls = attempt + 1,
                        "chain: transaction finalized"
                    );
                    return Ok(result);
                }
                _ => debug!(%hash, attempt = attempt + 1, max_polls, "chain: transaction pending"),
            }

            if attempt + 1 < max_polls {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
        Err(anyhow!(
            "transaction {hash} not finalized after {max_polls} polls"
        ))
    }

    async fn view(&self, request: &ViewRequest) -> Result<Vec<Value>> {
        let response = self
            .http
            .post(self.fullnode("view"))
            .json(&request.to_json_body())
            .send()
            .await?;
        read_json(response)
            .await
            .with_context(|| format!("view {}", request.function))
    }

    async fn get_account_owned_tokens(&self, owner: AccountAddress) -> Result<Vec<OwnedToken>> {
        let indexer = self
            .config
            .indexer_url
            .as_ref()
            .ok_or_else(|| anyhow!("no indexer configured for network {}", self.config.network))?;
        let response = self
            .http
            .post(indexer.as_str())
            .json(&json!({
                "query": OWNED_TOKENS_QUERY,
                "variables": { "owner": owner.to_hex() },
            }))
            .send()
            .await?;
        let body: GraphQlResponse<OwnershipData> =
            read_json(response).await.context("indexer owned tokens")?;
        if let Some(error) = body.errors.first() {
            return Err(anyhow!("indexer query failed: {}", error.message));
        }
        let data = body
            .data
            .ok_or_else(|| anyhow!("indexer returned no data"))?;

        data.current_token_ownerships_v2
            .into_iter()
            .map(|row| -> Result<OwnedToken> {
                let token = row.current_token_data;
                Ok(OwnedToken {
                    amount: parse_u64_value(&row.amount)?,
                    token_name: token
                        .as_ref()
                        .map(|t| t.token_name.clone())
                        .unwrap_or_default(),
                    token_uri: token
                        .as_ref()
                        .map(|t| t.token_uri.clone())
                        .unwrap_or_default(),
                    collection_id: token
                        .map(|t| t.collection_id)
                        .unwrap_or_default(),
                    token_data_id: row.token_data_id,
                })
            })
            .collect()
    }

    async fn get_balance(&self, address: AccountAddress) -> Result<u64> {
        let coin_type: TypeTag = NATIVE_COIN_TYPE.parse()?;
        let request = ViewRequest::new(
            FunctionId::new(ModuleId::new(AccountAddress::ONE, "coin"), "balance"),
            vec![FunctionArgument::Address(address)],
        )
        .with_type_arguments(vec![coin_type]);
        let values = self.view(&request).await?;
        let first = values
            .first()
            .ok_or_else(|| anyhow!("balance view returned no values"))?;
        parse_u64_value(first)
    }
}
