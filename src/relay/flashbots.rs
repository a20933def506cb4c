use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::{
    signers::{LocalWallet, Signer},
    types::{H256, U256},
    utils::keccak256,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::{
    blockchain::ChainProvider,
    error::BotError,
    relay::{sign_entries, PendingBundle, RelayClient},
    types::{
        BundleEntry, BundleStats, SignedBundle, SignedTransaction, SimulationResult,
        SubmissionOutcome, TransactionSimulation, UserStats,
    },
};

/// Blocks past the target after which an unavailable target block counts as passed.
const MAX_TARGET_BLOCK_LAG: u64 = 5;

/// Failed provider calls in a row before a wait gives up.
const MAX_CONSECUTIVE_POLL_ERRORS: u32 = 30;

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Error)]
enum RelayCallError {
    #[error("{0}")]
    Transport(String),

    #[error("relay error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallBundleResult {
    bundle_hash: H256,
    coinbase_diff: String,
    total_gas_used: u64,
    #[serde(default)]
    results: Vec<CallBundleTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallBundleTransaction {
    tx_hash: H256,
    #[serde(default)]
    gas_used: u64,
    error: Option<String>,
    revert: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendBundleResult {
    bundle_hash: Option<H256>,
}

impl TryFrom<CallBundleResult> for SimulationResult {
    type Error = BotError;

    fn try_from(raw: CallBundleResult) -> Result<Self, Self::Error> {
        let coinbase_diff = U256::from_dec_str(&raw.coinbase_diff).map_err(|e| {
            BotError::Relay(format!("Invalid coinbaseDiff '{}': {}", raw.coinbase_diff, e))
        })?;

        let results: Vec<TransactionSimulation> = raw
            .results
            .into_iter()
            .map(|tx| TransactionSimulation {
                tx_hash: tx.tx_hash,
                gas_used: tx.gas_used,
                error: tx.error,
                revert: tx.revert,
            })
            .collect();

        let first_revert = results
            .iter()
            .position(|tx| tx.error.is_some() || tx.revert.is_some());

        Ok(SimulationResult {
            bundle_hash: raw.bundle_hash,
            coinbase_diff,
            total_gas_used: raw.total_gas_used,
            first_revert,
            results,
        })
    }
}

/// Flashbots relay speaking JSON-RPC over HTTPS.
pub struct FlashbotsRelay {
    client: reqwest::Client,
    relay_url: String,
    auth_signer: LocalWallet,
    provider: Arc<dyn ChainProvider>,
    poll_interval: Duration,
}

impl FlashbotsRelay {
    pub fn new(
        relay_url: &str,
        auth_signer: LocalWallet,
        provider: Arc<dyn ChainProvider>,
        request_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build relay HTTP client: {}", e))?;

        info!(
            "Flashbots relay {} ready (auth signer {:?})",
            relay_url,
            auth_signer.address()
        );

        Ok(Self {
            client,
            relay_url: relay_url.to_string(),
            auth_signer,
            provider,
            poll_interval,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RelayCallError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let body = serde_json::to_vec(&payload)
            .map_err(|e| RelayCallError::Transport(format!("Failed to encode request: {}", e)))?;
        let signature = flashbots_signature(&self.auth_signer, &body)
            .await
            .map_err(|e| RelayCallError::Transport(e.to_string()))?;

        debug!("Relay request {} ({} bytes)", method, body.len());

        let response = self
            .client
            .post(&self.relay_url)
            .header("Content-Type", "application/json")
            .header("X-Flashbots-Signature", signature)
            .body(body)
            .send()
            .await
            .map_err(|e| RelayCallError::Transport(format!("Relay POST failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RelayCallError::Transport(format!("Failed to read relay response: {}", e)))?;

        parse_response(&text).map_err(|e| match e {
            RelayCallError::Transport(message) => {
                RelayCallError::Transport(format!("{} (HTTP {}): {}", method, status, message))
            }
            rpc => rpc,
        })
    }
}

fn parse_response<T: DeserializeOwned>(text: &str) -> Result<T, RelayCallError> {
    let response: JsonRpcResponse<T> = serde_json::from_str(text).map_err(|e| {
        RelayCallError::Transport(format!("Unexpected relay response {}: {}", text, e))
    })?;

    if let Some(error) = response.error {
        return Err(RelayCallError::Rpc(error));
    }

    response
        .result
        .ok_or_else(|| RelayCallError::Transport("Relay response had no result".to_string()))
}

/// `X-Flashbots-Signature` value: `<address>:<signature over hex(keccak256(body))>`.
pub async fn flashbots_signature(signer: &LocalWallet, body: &[u8]) -> Result<String, BotError> {
    let digest = format!("0x{}", hex::encode(keccak256(body)));
    let signature = signer
        .sign_message(digest)
        .await
        .map_err(|e| BotError::Signing(format!("Relay request signing failed: {}", e)))?;
    Ok(format!(
        "{:?}:0x{}",
        signer.address(),
        hex::encode(signature.to_vec())
    ))
}

fn block_tag(block_number: u64) -> String {
    format!("0x{:x}", block_number)
}

#[async_trait]
impl RelayClient for FlashbotsRelay {
    async fn sign_bundle(&self, entries: &[BundleEntry]) -> Result<SignedBundle, BotError> {
        sign_entries(entries)
    }

    async fn simulate(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
    ) -> Result<SimulationResult, BotError> {
        let params = json!([{
            "txs": bundle.raw_transactions(),
            "blockNumber": block_tag(target_block),
            "stateBlockNumber": "latest",
        }]);

        match self.call::<CallBundleResult>("eth_callBundle", params).await {
            Ok(raw) => SimulationResult::try_from(raw),
            Err(RelayCallError::Rpc(error)) => Err(BotError::Simulation {
                code: error.code,
                message: error.message,
            }),
            Err(RelayCallError::Transport(message)) => Err(BotError::Relay(message)),
        }
    }

    async fn send_raw_bundle(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
    ) -> Result<Box<dyn PendingBundle>, BotError> {
        let params = json!([{
            "txs": bundle.raw_transactions(),
            "blockNumber": block_tag(target_block),
        }]);

        let result = match self.call::<SendBundleResult>("eth_sendBundle", params).await {
            Ok(result) => result,
            Err(RelayCallError::Rpc(error)) => return Err(BotError::Submission(error.message)),
            Err(RelayCallError::Transport(message)) => return Err(BotError::Relay(message)),
        };

        Ok(Box::new(FlashbotsPendingBundle::new(
            self.provider.clone(),
            result.bundle_hash,
            target_block,
            bundle.transactions.clone(),
            self.poll_interval,
        )))
    }

    async fn get_bundle_stats(&self, bundle_hash: H256, block_number: u64) -> Result<BundleStats> {
        let params = json!([{
            "bundleHash": bundle_hash,
            "blockNumber": block_tag(block_number),
        }]);
        self.call("flashbots_getBundleStatsV2", params)
            .await
            .map_err(|e| anyhow!("getBundleStats failed: {}", e))
    }

    async fn get_user_stats(&self) -> Result<UserStats> {
        let block_number = self.provider.get_block_number().await?;
        let params = json!([{ "blockNumber": block_tag(block_number) }]);
        self.call("flashbots_getUserStatsV2", params)
            .await
            .map_err(|e| anyhow!("getUserStats failed: {}", e))
    }
}

/// Watches the chain until a submitted bundle resolves for its target block.
pub struct FlashbotsPendingBundle {
    provider: Arc<dyn ChainProvider>,
    bundle_hash: Option<H256>,
    target_block: u64,
    transactions: Vec<SignedTransaction>,
    poll_interval: Duration,
}

impl FlashbotsPendingBundle {
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        bundle_hash: Option<H256>,
        target_block: u64,
        transactions: Vec<SignedTransaction>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            bundle_hash,
            target_block,
            transactions,
            poll_interval,
        }
    }

    async fn signer_nonce_moved_on(&self) -> Result<bool> {
        for tx in &self.transactions {
            let account_nonce = self.provider.get_transaction_count(tx.signer).await?;
            if account_nonce > tx.nonce {
                debug!(
                    "Signer {:?} nonce {} is past bundle nonce {}",
                    tx.signer, account_nonce, tx.nonce
                );
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl PendingBundle for FlashbotsPendingBundle {
    fn bundle_hash(&self) -> Option<H256> {
        self.bundle_hash
    }

    fn target_block(&self) -> u64 {
        self.target_block
    }

    async fn wait(&self) -> Result<SubmissionOutcome> {
        let mut ticker = interval(self.poll_interval);
        let mut consecutive_errors = 0u32;

        loop {
            ticker.tick().await;

            if consecutive_errors >= MAX_CONSECUTIVE_POLL_ERRORS {
                return Err(anyhow!(
                    "Gave up waiting for bundle (target block {}) after {} failed polls",
                    self.target_block,
                    consecutive_errors
                ));
            }

            let head = match self.provider.get_block_number().await {
                Ok(head) => head,
                Err(e) => {
                    consecutive_errors += 1;
                    warn!("Failed to poll head for target block {}: {}", self.target_block, e);
                    continue;
                }
            };

            // Before the target: only a moved-on nonce can settle the bundle.
            if head < self.target_block {
                match self.signer_nonce_moved_on().await {
                    Ok(true) => return Ok(SubmissionOutcome::AccountNonceTooHigh),
                    Ok(false) => consecutive_errors = 0,
                    Err(e) => {
                        consecutive_errors += 1;
                        warn!("Failed to check signer nonces: {}", e);
                    }
                }
                continue;
            }

            match self.provider.get_block(self.target_block).await {
                Ok(Some(block)) => {
                    let included = self
                        .transactions
                        .iter()
                        .all(|tx| block.transactions.contains(&tx.hash));
                    return Ok(if included {
                        SubmissionOutcome::Included
                    } else {
                        SubmissionOutcome::BlockPassedWithoutInclusion
                    });
                }
                Ok(None) if head > self.target_block + MAX_TARGET_BLOCK_LAG => {
                    warn!(
                        "Target block {} still unavailable at head {}",
                        self.target_block, head
                    );
                    return Ok(SubmissionOutcome::BlockPassedWithoutInclusion);
                }
                Ok(None) => consecutive_errors = 0,
                Err(e) => {
                    consecutive_errors += 1;
                    warn!("Failed to fetch target block {}: {}", self.target_block, e);
                }
            }
        }
    }
}
