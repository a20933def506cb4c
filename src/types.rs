use ethers::{
    signers::LocalWallet,
    types::{Address, Bytes, H256, U256},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pricing inputs for one block. `base_fee` is read fresh for every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParameters {
    pub base_fee: U256,
    pub priority_fee: U256,
    pub horizon_blocks: u64,
}

/// The unpriced flash-loan call, built and estimated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTransaction {
    pub to: Address,
    pub data: Bytes,
    /// Legacy placeholder price, used only while estimating.
    pub gas_price: U256,
    pub gas_limit: U256,
}

/// An EIP-1559 transaction priced for a single block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedTransaction {
    pub to: Address,
    pub data: Bytes,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub gas_limit: U256,
    pub chain_id: u64,
}

#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub signer: LocalWallet,
    pub transaction: PricedTransaction,
    pub nonce: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: H256,
    pub signer: Address,
    pub nonce: U256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedBundle {
    pub transactions: Vec<SignedTransaction>,
}

impl SignedBundle {
    pub fn raw_transactions(&self) -> Vec<Bytes> {
        self.transactions.iter().map(|tx| tx.raw.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSimulation {
    pub tx_hash: H256,
    pub gas_used: u64,
    pub error: Option<String>,
    pub revert: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    pub bundle_hash: H256,
    pub coinbase_diff: U256,
    pub total_gas_used: u64,
    pub first_revert: Option<usize>,
    pub results: Vec<TransactionSimulation>,
}

impl SimulationResult {
    pub fn succeeded(&self) -> bool {
        self.first_revert.is_none()
    }

    /// Wei per gas paid to the proposer. Zero when no gas was used.
    pub fn effective_gas_price(&self) -> U256 {
        if self.total_gas_used == 0 {
            return U256::zero();
        }
        self.coinbase_diff / U256::from(self.total_gas_used)
    }

    pub fn revert_reason(&self) -> Option<String> {
        let result = self.results.get(self.first_revert?)?;
        result.revert.clone().or_else(|| result.error.clone())
    }
}

/// How a submitted bundle resolved for its target block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    Included,
    BlockPassedWithoutInclusion,
    AccountNonceTooHigh,
}

impl TryFrom<u8> for SubmissionOutcome {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SubmissionOutcome::Included),
            1 => Ok(SubmissionOutcome::BlockPassedWithoutInclusion),
            2 => Ok(SubmissionOutcome::AccountNonceTooHigh),
            other => Err(other),
        }
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionOutcome::Included => "BundleIncluded",
            SubmissionOutcome::BlockPassedWithoutInclusion => "BlockPassedWithoutInclusion",
            SubmissionOutcome::AccountNonceTooHigh => "AccountNonceTooHigh",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderTimestamp {
    pub pubkey: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundleStats {
    pub is_high_priority: bool,
    pub is_simulated: bool,
    pub simulated_at: Option<String>,
    pub received_at: Option<String>,
    pub considered_by_builders_at: Vec<BuilderTimestamp>,
    pub sealed_by_builders_at: Vec<BuilderTimestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub is_high_priority: bool,
    pub all_time_validator_payments: Option<String>,
    pub all_time_gas_simulated: Option<String>,
    pub last_7d_validator_payments: Option<String>,
    pub last_7d_gas_simulated: Option<String>,
    pub last_1d_validator_payments: Option<String>,
    pub last_1d_gas_simulated: Option<String>,
}
