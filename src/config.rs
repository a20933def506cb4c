use serde::{Deserialize, Serialize};

use crate::error::BotError;

pub const DEFAULT_FLASHBOTS_RELAY: &str = "https://relay.flashbots.net";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub blockchain: BlockchainConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub opportunity: OpportunityConfig,
    #[serde(default)]
    pub bundle: BundleConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BlockchainConfig {
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_block_poll_interval_ms")]
    pub block_poll_interval_ms: u64,
}

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct WalletConfig {
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub relay_signing_key: Option<String>,
}

// Keys never reach the logs.
impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field("private_key", &"****")
            .field(
                "relay_signing_key",
                &self.relay_signing_key.as_ref().map(|_| "****"),
            )
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    pub url: String,
    pub request_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FLASHBOTS_RELAY.to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// The hard-coded arbitrage route handed to the executor contract.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OpportunityConfig {
    pub executor_address: String,
    pub token1: String,
    pub token2: String,
    /// Wei, decimal string.
    pub borrow_amount: String,
    pub router1: String,
    pub router2: String,
    /// Wei, decimal string. Informational only.
    pub coinbase_payment: String,
}

impl Default for OpportunityConfig {
    fn default() -> Self {
        Self {
            executor_address: "0x35ad48E5c15d5c2786CdE9b56C6483C85C4dd34D".to_string(),
            token1: "0x92B30dF9b169FAC44c86983B2aAAa465FDC2CDB8".to_string(),
            token2: "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984".to_string(),
            borrow_amount: "10000000000000000000".to_string(),
            router1: "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D".to_string(),
            router2: "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D".to_string(),
            coinbase_payment: "10000000000000000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BundleConfig {
    pub priority_fee_gwei: u64,
    pub blocks_in_the_future: u64,
    pub legacy_gas_price_gwei: u64,
    pub initial_gas_limit: u64,
    pub large_estimate_threshold: u64,
    /// Wei, decimal string. "0" submits every clean simulation.
    pub min_coinbase_diff_wei: String,
    pub max_in_flight: usize,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            priority_fee_gwei: 3,
            blocks_in_the_future: 2,
            legacy_gas_price_gwei: 12,
            initial_gas_limit: 1_000_000,
            large_estimate_threshold: 1_400_000,
            min_coinbase_diff_wei: "0".to_string(),
            max_in_flight: 3,
        }
    }
}

fn default_chain_id() -> u64 {
    1
}

fn default_block_poll_interval_ms() -> u64 {
    1_000
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mut settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("BUNDLER").separator("__"));

        let overrides = [
            ("PRIVATE_KEY", "wallet.private_key"),
            ("FLASHBOTS_RELAY_SIGNING_KEY", "wallet.relay_signing_key"),
            ("BUNDLE_EXECUTOR_ADDRESS", "opportunity.executor_address"),
            ("ETHEREUM_RPC_URL", "blockchain.rpc_url"),
            ("FLASHBOTS_RELAY_URL", "relay.url"),
        ];
        for (var, key) in overrides {
            if let Ok(value) = std::env::var(var) {
                settings = settings.set_override(key, value)?;
            }
        }

        let config: Config = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BotError> {
        if self.wallet.private_key.trim().is_empty() {
            return Err(BotError::Config(
                "Must provide PRIVATE_KEY environment variable".to_string(),
            ));
        }
        if self.blockchain.rpc_url.trim().is_empty() {
            return Err(BotError::Config("blockchain.rpc_url is empty".to_string()));
        }
        if self.bundle.blocks_in_the_future == 0 {
            return Err(BotError::Config(
                "bundle.blocks_in_the_future must be at least 1".to_string(),
            ));
        }
        if self.bundle.max_in_flight == 0 {
            return Err(BotError::Config(
                "bundle.max_in_flight must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
