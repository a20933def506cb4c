use ethers::{
    signers::{LocalWallet, Signer},
    types::{Address, U256},
};
use std::sync::Arc;

use crate::{
    blockchain::ChainProvider,
    relay::RelayClient,
    types::{BaseTransaction, FeeParameters},
};

/// Everything an iteration reads. Built once at startup and never mutated.
pub struct BotContext {
    pub provider: Arc<dyn ChainProvider>,
    pub relay: Arc<dyn RelayClient>,
    pub searcher: LocalWallet,
    pub base_transaction: BaseTransaction,
    pub chain_id: u64,
    pub priority_fee: U256,
    pub horizon_blocks: u64,
    /// Zero disables the gate.
    pub min_coinbase_diff: U256,
}

impl BotContext {
    pub fn searcher_address(&self) -> Address {
        self.searcher.address()
    }

    pub fn fee_parameters(&self, base_fee: U256) -> FeeParameters {
        FeeParameters {
            base_fee,
            priority_fee: self.priority_fee,
            horizon_blocks: self.horizon_blocks,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::{
        fees::gwei,
        testing::{test_wallet, MockChain, MockRelay},
    };
    use ethers::types::Bytes;

    pub fn create_test_context(chain: Arc<MockChain>, relay: Arc<MockRelay>) -> Arc<BotContext> {
        create_gated_test_context(chain, relay, U256::zero())
    }

    pub fn create_gated_test_context(
        chain: Arc<MockChain>,
        relay: Arc<MockRelay>,
        min_coinbase_diff: U256,
    ) -> Arc<BotContext> {
        Arc::new(BotContext {
            provider: chain,
            relay,
            searcher: test_wallet(),
            base_transaction: BaseTransaction {
                to: Address::repeat_byte(0x35),
                data: Bytes::from(vec![0x12, 0x34, 0x56, 0x78]),
                gas_price: gwei(12),
                gas_limit: U256::from(1_000_000),
            },
            chain_id: 1,
            priority_fee: gwei(3),
            horizon_blocks: 2,
            min_coinbase_diff,
        })
    }
}
