use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::{
    prelude::*,
    providers::{Http, Provider},
    types::{transaction::eip2718::TypedTransaction, Address, H256, U256},
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    pub base_fee_per_gas: Option<U256>,
    pub transactions: Vec<H256>,
}

/// The chain reads the searcher needs.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn get_block_number(&self) -> Result<u64>;

    async fn get_transaction_count(&self, address: Address) -> Result<U256>;

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256>;

    async fn get_block(&self, block_number: u64) -> Result<Option<BlockInfo>>;
}

pub struct BlockchainClient {
    provider: Arc<Provider<Http>>,
    chain_id: u64,
}

impl BlockchainClient {
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Connecting to Ethereum RPC: {}", config.blockchain.rpc_url);

        let provider = Provider::<Http>::try_from(config.blockchain.rpc_url.as_str())
            .map_err(|e| anyhow!("Failed to create provider: {}", e))?;

        let provider = Arc::new(provider);

        // Verify chain ID
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| anyhow!("Failed to get chain ID: {}", e))?;

        if chain_id.as_u64() != config.blockchain.chain_id {
            return Err(anyhow!(
                "Chain ID mismatch: expected {}, got {}",
                config.blockchain.chain_id,
                chain_id.as_u64()
            ));
        }

        info!("Connected to Ethereum network (Chain ID: {})", chain_id);

        Ok(Self {
            provider,
            chain_id: chain_id.as_u64(),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub async fn health_check(&self) -> Result<()> {
        debug!("Performing blockchain health check");

        let block_number = ChainProvider::get_block_number(self).await?;
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| anyhow!("Failed to get gas price: {}", e))?;

        debug!(
            "Health check passed - Block: {}, Gas Price: {} wei",
            block_number, gas_price
        );

        Ok(())
    }
}

#[async_trait]
impl ChainProvider for BlockchainClient {
    async fn get_block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map(|number| number.as_u64())
            .map_err(|e| anyhow!("Failed to get block number: {}", e))
    }

    async fn get_transaction_count(&self, address: Address) -> Result<U256> {
        self.provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| anyhow!("Failed to get transaction count for {:?}: {}", address, e))
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256> {
        self.provider
            .estimate_gas(tx, None)
            .await
            .map_err(|e| anyhow!("{}", e))
    }

    async fn get_block(&self, block_number: u64) -> Result<Option<BlockInfo>> {
        let block = self
            .provider
            .get_block(BlockNumber::Number(block_number.into()))
            .await
            .map_err(|e| anyhow!("Failed to get block {}: {}", block_number, e))?;

        // Pending blocks carry no number yet
        Ok(block.map(|block| BlockInfo {
            number: block.number.map(|n| n.as_u64()).unwrap_or(block_number),
            base_fee_per_gas: block.base_fee_per_gas,
            transactions: block.transactions,
        }))
    }
}

pub fn parse_address(address_str: &str) -> Result<Address> {
    address_str
        .parse::<Address>()
        .map_err(|e| anyhow!("Invalid address format '{}': {}", address_str, e))
}

pub fn parse_wei(amount_str: &str) -> Result<U256> {
    U256::from_dec_str(amount_str.trim())
        .map_err(|e| anyhow!("Invalid wei amount '{}': {}", amount_str, e))
}

pub fn parse_wallet(private_key: &str, chain_id: u64) -> Result<LocalWallet> {
    let wallet = private_key
        .trim()
        .trim_start_matches("0x")
        .parse::<LocalWallet>()
        .map_err(|e| anyhow!("Invalid private key: {}", e))?;
    Ok(wallet.with_chain_id(chain_id))
}
