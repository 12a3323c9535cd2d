use std::{collections::HashMap, fmt, fs, path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use chain_client::NetworkConfig;
use client_core::{CollectionModule, DispatcherConfig};
use shared::domain::{AccountAddress, Network};
use url::Url;

pub const DEFAULT_MODULE_ADDRESS: &str =
    "0xfd73afb5be0cb876ac9dd0fe6deef6c0f5c8dd67ceddbcdb39661aaa4609b543";
pub const DEFAULT_MODULE_NAME: &str = "ExpandNFT";

const KEYS: &[&str] = &[
    "network",
    "fullnode_url",
    "faucet_url",
    "indexer_url",
    "module_address",
    "module_name",
    "transfer_amount",
    "fund_amount",
    "fund_counterpart",
    "call_timeout_secs",
    "finality_timeout_secs",
    "poll_interval_ms",
    "max_polls",
    "wallet_private_key",
];

pub struct Settings {
    pub network: Network,
    pub fullnode_url: Option<String>,
    pub faucet_url: Option<String>,
    pub indexer_url: Option<String>,
    pub module_address: AccountAddress,
    pub module_name: String,
    pub transfer_amount: u64,
    pub fund_amount: u64,
    pub fund_counterpart: bool,
    pub call_timeout_secs: u64,
    pub finality_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
    pub wallet_private_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network: Network::Devnet,
            fullnode_url: None,
            faucet_url: None,
            indexer_url: None,
            module_address: DEFAULT_MODULE_ADDRESS
                .parse()
                .unwrap_or(AccountAddress::ONE),
            module_name: DEFAULT_MODULE_NAME.into(),
            transfer_amount: 1_000,
            fund_amount: 100_000_000,
            fund_counterpart: true,
            call_timeout_secs: 30,
            finality_timeout_secs: 60,
            poll_interval_ms: 500,
            max_polls: 60,
            wallet_private_key: None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("network", &self.network)
            .field("fullnode_url", &self.fullnode_url)
            .field("faucet_url", &self.faucet_url)
            .field("indexer_url", &self.indexer_url)
            .field("module_address", &self.module_address)
            .field("module_name", &self.module_name)
            .field("transfer_amount", &self.transfer_amount)
            .field("fund_amount", &self.fund_amount)
            .field("fund_counterpart", &self.fund_counterpart)
            .field("call_timeout_secs", &self.call_timeout_secs)
            .field("finality_timeout_secs", &self.finality_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_polls", &self.max_polls)
            .field(
                "wallet_private_key",
                &self.wallet_private_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Defaults, then `path` when it exists, then `HARNESS_*` and `APP__*` environment variables.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        settings.apply_file(&raw);
    }
    settings.apply_env(|name| std::env::var(name).ok());

    settings
}

impl Settings {
    /// Flat `key = value` pairs; unknown keys and unparseable values are skipped.
    pub fn apply_file(&mut self, raw: &str) {
        let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
            return;
        };
        for key in KEYS {
            let value = match file_cfg.get(*key) {
                Some(toml::Value::String(v)) => v.clone(),
                Some(toml::Value::Integer(v)) => v.to_string(),
                Some(toml::Value::Boolean(v)) => v.to_string(),
                _ => continue,
            };
            self.apply(key, &value);
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in KEYS {
            let upper = key.to_ascii_uppercase();
            if let Some(v) = lookup(&format!("HARNESS_{upper}")) {
                self.apply(key, &v);
            }
            if let Some(v) = lookup(&format!("APP__{upper}")) {
                self.apply(key, &v);
            }
        }
    }

    fn apply(&mut self, key: &str, value: &str) {
        let value = value.trim();
        match key {
            "network" => {
                if let Ok(parsed) = value.parse() {
                    self.network = parsed;
                }
            }
            "fullnode_url" => self.fullnode_url = non_empty(value),
            "faucet_url" => self.faucet_url = non_empty(value),
            "indexer_url" => self.indexer_url = non_empty(value),
            "module_address" => {
                if let Ok(parsed) = value.parse() {
                    self.module_address = parsed;
                }
            }
            "module_name" => {
                if !value.is_empty() {
                    self.module_name = value.to_string();
                }
            }
            "transfer_amount" => parse_into(value, &mut self.transfer_amount),
            "fund_amount" => parse_into(value, &mut self.fund_amount),
            "fund_counterpart" => parse_into(value, &mut self.fund_counterpart),
            "call_timeout_secs" => parse_into(value, &mut self.call_timeout_secs),
            "finality_timeout_secs" => parse_into(value, &mut self.finality_timeout_secs),
            "poll_interval_ms" => parse_into(value, &mut self.poll_interval_ms),
            "max_polls" => parse_into(value, &mut self.max_polls),
            "wallet_private_key" => self.wallet_private_key = non_empty(value),
            _ => {}
        }
    }

    /// Endpoints for the configured network; explicit urls win over the network's defaults.
    pub fn network_config(&self) -> Result<NetworkConfig> {
        let mut config = match &self.fullnode_url {
            Some(fullnode) => {
                let mut config = NetworkConfig::custom(self.network, parse_url(fullnode)?);
                config.faucet_url = self
                    .network
                    .default_faucet_url()
                    .map(parse_url)
                    .transpose()?;
                config
            }
            None => NetworkConfig::for_network(self.network).map_err(|err| {
                anyhow!("{err}; set fullnode_url for network {}", self.network)
            })?,
        };

        if let Some(faucet) = &self.faucet_url {
            config.faucet_url = Some(parse_url(faucet)?);
        }
        if let Some(indexer) = &self.indexer_url {
            config.indexer_url = Some(parse_url(indexer)?);
        }
        config.poll_interval = Duration::from_millis(self.poll_interval_ms);
        config.max_polls = self.max_polls;
        Ok(config)
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            finality_timeout: Duration::from_secs(self.finality_timeout_secs),
            transfer_amount: self.transfer_amount,
            fund_amount: self.fund_amount,
            fund_counterpart: self.fund_counterpart,
            collection: CollectionModule::new(self.module_address, self.module_name.clone()),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_into<T: std::str::FromStr>(value: &str, slot: &mut T) {
    if let Ok(parsed) = value.parse::<T>() {
        *slot = parsed;
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("invalid url '{raw}'"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
