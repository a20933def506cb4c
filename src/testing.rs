//! Test doubles for the chain provider and the relay.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::{
    signers::LocalWallet,
    types::{transaction::eip2718::TypedTransaction, Address, H256, U256},
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use crate::{
    blockchain::{BlockInfo, ChainProvider},
    error::BotError,
    relay::{sign_entries, PendingBundle, RelayClient},
    types::{
        BundleEntry, BundleStats, SignedBundle, SimulationResult,
        SubmissionOutcome, TransactionSimulation, UserStats,
    },
};

pub const TEST_PRIVATE_KEY: &str =
    "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

pub fn test_wallet() -> LocalWallet {
    crate::blockchain::parse_wallet(TEST_PRIVATE_KEY, 1).unwrap()
}

pub fn block_with_base_fee(number: u64, base_fee: u64) -> BlockInfo {
    BlockInfo {
        number,
        base_fee_per_gas: Some(U256::from(base_fee)),
        transactions: Vec::new(),
    }
}

pub fn clean_simulation(coinbase_diff: u64, total_gas_used: u64) -> SimulationResult {
    SimulationResult {
        bundle_hash: H256::repeat_byte(0xbb),
        coinbase_diff: U256::from(coinbase_diff),
        total_gas_used,
        first_revert: None,
        results: vec![TransactionSimulation {
            tx_hash: H256::repeat_byte(0xaa),
            gas_used: total_gas_used,
            error: None,
            revert: None,
        }],
    }
}

pub fn reverted_simulation() -> SimulationResult {
    SimulationResult {
        bundle_hash: H256::repeat_byte(0xbb),
        coinbase_diff: U256::zero(),
        total_gas_used: 30_000,
        first_revert: Some(0),
        results: vec![TransactionSimulation {
            tx_hash: H256::repeat_byte(0xaa),
            gas_used: 30_000,
            error: Some("execution reverted".to_string()),
            revert: None,
        }],
    }
}

pub struct MockChain {
    head: AtomicU64,
    head_failures: AtomicUsize,
    transaction_count: Mutex<U256>,
    estimate: Mutex<std::result::Result<U256, String>>,
    blocks: Mutex<HashMap<u64, BlockInfo>>,
    pub estimate_calls: AtomicUsize,
    pub block_fetches: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            head: AtomicU64::new(0),
            head_failures: AtomicUsize::new(0),
            transaction_count: Mutex::new(U256::zero()),
            estimate: Mutex::new(Ok(U256::from(500_000))),
            blocks: Mutex::new(HashMap::new()),
            estimate_calls: AtomicUsize::new(0),
            block_fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_head(self, head: u64) -> Self {
        self.head.store(head, Ordering::SeqCst);
        self
    }

    /// The next `failures` head polls return an error.
    pub fn with_head_failures(self, failures: usize) -> Self {
        self.head_failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    pub fn with_estimate(self, gas: u64) -> Self {
        *self.estimate.lock().unwrap() = Ok(U256::from(gas));
        self
    }

    pub fn with_failing_estimate(self, reason: &str) -> Self {
        *self.estimate.lock().unwrap() = Err(reason.to_string());
        self
    }

    pub fn with_transaction_count(self, count: U256) -> Self {
        *self.transaction_count.lock().unwrap() = count;
        self
    }

    pub fn with_block(self, block: BlockInfo) -> Self {
        self.blocks.lock().unwrap().insert(block.number, block);
        self
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainProvider for MockChain {
    async fn get_block_number(&self) -> Result<u64> {
        let failing = self
            .head_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("connection reset"));
        }
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn get_transaction_count(&self, _address: Address) -> Result<U256> {
        Ok(*self.transaction_count.lock().unwrap())
    }

    async fn estimate_gas(&self, _tx: &TypedTransaction) -> Result<U256> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.estimate
            .lock()
            .unwrap()
            .clone()
            .map_err(|reason| anyhow!(reason))
    }

    async fn get_block(&self, block_number: u64) -> Result<Option<BlockInfo>> {
        self.block_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.blocks.lock().unwrap().get(&block_number).cloned())
    }
}

pub struct MockRelay {
    simulation: Mutex<std::result::Result<SimulationResult, (i64, String)>>,
    submission_error: Mutex<Option<String>>,
    outcomes: Mutex<VecDeque<std::result::Result<SubmissionOutcome, String>>>,
    wait_delay: Mutex<Duration>,
    pub signed: Mutex<Vec<BundleEntry>>,
    pub sign_calls: AtomicUsize,
    pub simulate_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub bundle_stats_calls: AtomicUsize,
    pub user_stats_calls: AtomicUsize,
}

impl MockRelay {
    pub fn new() -> Self {
        Self {
            simulation: Mutex::new(Ok(clean_simulation(10_000_000_000_000_000, 300_000))),
            submission_error: Mutex::new(None),
            outcomes: Mutex::new(VecDeque::new()),
            wait_delay: Mutex::new(Duration::ZERO),
            signed: Mutex::new(Vec::new()),
            sign_calls: AtomicUsize::new(0),
            simulate_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            bundle_stats_calls: AtomicUsize::new(0),
            user_stats_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_simulation(self, simulation: SimulationResult) -> Self {
        *self.simulation.lock().unwrap() = Ok(simulation);
        self
    }

    pub fn with_simulation_error(self, code: i64, message: &str) -> Self {
        *self.simulation.lock().unwrap() = Err((code, message.to_string()));
        self
    }

    pub fn with_submission_error(self, message: &str) -> Self {
        *self.submission_error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Outcomes handed out in submission order; later submissions see
    /// `BlockPassedWithoutInclusion`.
    pub fn with_outcomes(self, outcomes: Vec<SubmissionOutcome>) -> Self {
        *self.outcomes.lock().unwrap() = outcomes.into_iter().map(Ok).collect();
        self
    }

    pub fn with_failing_wait(self, message: &str) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn with_wait_delay(self, delay: Duration) -> Self {
        *self.wait_delay.lock().unwrap() = delay;
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl Default for MockRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayClient for MockRelay {
    async fn sign_bundle(&self, entries: &[BundleEntry]) -> Result<SignedBundle, BotError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.signed
            .lock()
            .unwrap()
            .extend(entries.iter().cloned());
        sign_entries(entries)
    }

    async fn simulate(
        &self,
        _bundle: &SignedBundle,
        _target_block: u64,
    ) -> Result<SimulationResult, BotError> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        self.simulation
            .lock()
            .unwrap()
            .clone()
            .map_err(|(code, message)| BotError::Simulation { code, message })
    }

    async fn send_raw_bundle(
        &self,
        _bundle: &SignedBundle,
        target_block: u64,
    ) -> Result<Box<dyn PendingBundle>, BotError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.submission_error.lock().unwrap().clone() {
            return Err(BotError::Submission(message));
        }
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(SubmissionOutcome::BlockPassedWithoutInclusion));
        let delay = *self.wait_delay.lock().unwrap();

        Ok(Box::new(MockPendingBundle {
            outcome,
            target_block,
            delay,
        }))
    }

    async fn get_bundle_stats(&self, _bundle_hash: H256, _block_number: u64) -> Result<BundleStats> {
        self.bundle_stats_calls.fetch_add(1, Ordering::SeqCst);
        Ok(BundleStats {
            is_simulated: true,
            ..BundleStats::default()
        })
    }

    async fn get_user_stats(&self) -> Result<UserStats> {
        self.user_stats_calls.fetch_add(1, Ordering::SeqCst);
        Ok(UserStats::default())
    }
}

struct MockPendingBundle {
    outcome: std::result::Result<SubmissionOutcome, String>,
    target_block: u64,
    delay: Duration,
}

#[async_trait]
impl PendingBundle for MockPendingBundle {
    fn bundle_hash(&self) -> Option<H256> {
        Some(H256::repeat_byte(0xbb))
    }

    fn target_block(&self) -> u64 {
        self.target_block
    }

    async fn wait(&self) -> Result<SubmissionOutcome> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone().map_err(|message| anyhow!(message))
    }
}
