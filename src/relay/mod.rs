pub mod flashbots;

pub use flashbots::{FlashbotsPendingBundle, FlashbotsRelay};

use anyhow::Result;
use async_trait::async_trait;
use ethers::{
    signers::Signer,
    types::H256,
    utils::keccak256,
};

use crate::{
    error::BotError,
    types::{
        BundleEntry, BundleStats, SignedBundle, SignedTransaction, SimulationResult,
        SubmissionOutcome, UserStats,
    },
};

/// A private bundle relay.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn sign_bundle(&self, entries: &[BundleEntry]) -> Result<SignedBundle, BotError>;

    /// `BotError::Simulation` carries an error reported by the relay itself.
    async fn simulate(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
    ) -> Result<SimulationResult, BotError>;

    /// `BotError::Submission` carries an error reported by the relay itself.
    async fn send_raw_bundle(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
    ) -> Result<Box<dyn PendingBundle>, BotError>;

    async fn get_bundle_stats(&self, bundle_hash: H256, block_number: u64) -> Result<BundleStats>;

    async fn get_user_stats(&self) -> Result<UserStats>;
}

/// Handle to a submitted bundle.
#[async_trait]
pub trait PendingBundle: Send + Sync {
    fn bundle_hash(&self) -> Option<H256>;

    fn target_block(&self) -> u64;

    /// Resolves once the bundle is included, the target block has passed, or
    /// one of its signers has moved past the bundle nonce.
    async fn wait(&self) -> Result<SubmissionOutcome>;
}

/// Signs every entry with its own signer, preserving order.
pub fn sign_entries(entries: &[BundleEntry]) -> Result<SignedBundle, BotError> {
    let mut transactions = Vec::with_capacity(entries.len());

    for entry in entries {
        let signer = entry.signer.address();
        let tx = entry.transaction.to_typed_transaction(signer, entry.nonce);
        let signature = entry
            .signer
            .sign_transaction_sync(&tx)
            .map_err(|e| BotError::Signing(e.to_string()))?;
        let raw = tx.rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));

        transactions.push(SignedTransaction {
            raw,
            hash,
            signer,
            nonce: entry.nonce,
        });
    }

    Ok(SignedBundle { transactions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fees::gwei, testing::test_wallet, types::PricedTransaction};
    use ethers::types::{Address, U256};

    fn create_test_entry(nonce: u64) -> BundleEntry {
        BundleEntry {
            signer: test_wallet(),
            transaction: PricedTransaction {
                to: Address::repeat_byte(0x22),
                data: vec![0xca, 0xfe].into(),
                max_fee_per_gas: gwei(40),
                max_priority_fee_per_gas: gwei(3),
                gas_limit: U256::from(400_000),
                chain_id: 1,
            },
            nonce: U256::from(nonce),
        }
    }

    #[test]
    fn test_sign_entries_produces_eip1559_envelopes() {
        let entry = create_test_entry(4);
        let bundle = sign_entries(&[entry.clone()]).unwrap();

        assert_eq!(bundle.len(), 1);
        let signed = &bundle.transactions[0];
        assert_eq!(signed.signer, entry.signer.address());
        assert_eq!(signed.nonce, U256::from(4));
        assert_eq!(signed.raw[0], 0x02);
        assert_eq!(signed.hash, H256::from(keccak256(&signed.raw)));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let first = sign_entries(&[create_test_entry(9)]).unwrap();
        let second = sign_entries(&[create_test_entry(9)]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sign_entries_preserves_order() {
        let bundle = sign_entries(&[create_test_entry(1), create_test_entry(2)]).unwrap();
        let nonces: Vec<U256> = bundle.transactions.iter().map(|tx| tx.nonce).collect();
        assert_eq!(nonces, vec![U256::from(1), U256::from(2)]);
    }
}
