use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    bot::{context::BotContext, outcome::handle_resolution},
    error::BotError,
    fees::scale_to_decimal,
    types::{BundleEntry, PricedTransaction, SimulationResult, SubmissionOutcome},
};

/// How a single block iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationResult {
    /// The relay rejected the simulation or a transaction reverted. Nothing was sent.
    SimulationFailed,
    BelowMinimumProfit,
    Resolved(SubmissionOutcome),
    /// Submitted, but the resolution could not be determined.
    Unresolved,
}

impl IterationResult {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IterationResult::Resolved(SubmissionOutcome::Included))
    }
}

/// Sign, simulate, submit and resolve one priced transaction.
pub struct BundlePipeline {
    ctx: Arc<BotContext>,
}

impl BundlePipeline {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        transaction: PricedTransaction,
        target_block: u64,
    ) -> Result<IterationResult, BotError> {
        let relay = self.ctx.relay.as_ref();

        let nonce = self
            .ctx
            .provider
            .get_transaction_count(self.ctx.searcher_address())
            .await
            .map_err(|e| BotError::Provider(e.to_string()))?;

        let entries = vec![BundleEntry {
            signer: self.ctx.searcher.clone(),
            transaction,
            nonce,
        }];
        let signed_bundle = relay.sign_bundle(&entries).await?;

        let simulation = match relay.simulate(&signed_bundle, target_block).await {
            Ok(simulation) => simulation,
            Err(e) => {
                warn!("Simulation for block {} failed: {}", target_block, e);
                return Ok(IterationResult::SimulationFailed);
            }
        };

        for tx in &simulation.results {
            debug!("Simulated {:?}: {} gas", tx.tx_hash, tx.gas_used);
        }

        if let Err(e) = check_simulation(&simulation) {
            warn!("{} (target block {}): {:?}", e, target_block, simulation);
            return Ok(IterationResult::SimulationFailed);
        }

        info!(
            "Submitting bundle, profit sent to miner: {}, effective gas price: {} GWEI",
            scale_to_decimal(simulation.coinbase_diff, 18),
            scale_to_decimal(simulation.effective_gas_price(), 9)
        );

        if simulation.coinbase_diff < self.ctx.min_coinbase_diff {
            info!(
                "Coinbase diff {} below minimum {}, not submitting for block {}",
                simulation.coinbase_diff, self.ctx.min_coinbase_diff, target_block
            );
            return Ok(IterationResult::BelowMinimumProfit);
        }

        let submission = relay.send_raw_bundle(&signed_bundle, target_block).await?;
        info!(
            "bundle submitted for block {}, waiting",
            submission.target_block()
        );

        let resolution = submission.wait().await;
        let bundle_hash = submission.bundle_hash().unwrap_or(simulation.bundle_hash);

        Ok(handle_resolution(relay, resolution, bundle_hash, target_block).await)
    }
}

fn check_simulation(simulation: &SimulationResult) -> Result<(), BotError> {
    match simulation.first_revert {
        Some(index) => Err(BotError::SimulationReverted {
            index,
            reason: simulation
                .revert_reason()
                .unwrap_or_else(|| "unknown".to_string()),
        }),
        None => Ok(()),
    }
}
