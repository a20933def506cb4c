use anyhow::Result;
use ethers::types::H256;
use tracing::{info, warn};

use crate::{bot::pipeline::IterationResult, relay::RelayClient, types::SubmissionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeDecision {
    Terminate,
    Continue,
}

/// Inclusion is the only outcome that stops the searcher.
pub fn decide(outcome: SubmissionOutcome) -> OutcomeDecision {
    match outcome {
        SubmissionOutcome::Included => OutcomeDecision::Terminate,
        SubmissionOutcome::BlockPassedWithoutInclusion => OutcomeDecision::Continue,
        SubmissionOutcome::AccountNonceTooHigh => OutcomeDecision::Continue,
    }
}

pub async fn handle_resolution(
    relay: &dyn RelayClient,
    resolution: Result<SubmissionOutcome>,
    bundle_hash: H256,
    target_block: u64,
) -> IterationResult {
    let outcome = match resolution {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(
                "Unrecognized resolution for bundle {:?} (block {}): {}",
                bundle_hash, target_block, e
            );
            return IterationResult::Unresolved;
        }
    };

    info!("Wait Response: {}", outcome);

    match decide(outcome) {
        OutcomeDecision::Terminate => {
            info!(
                "Bundle {:?} included in block {}, successfully done",
                bundle_hash, target_block
            );
        }
        OutcomeDecision::Continue => {
            log_relay_stats(relay, bundle_hash, target_block).await;
        }
    }

    IterationResult::Resolved(outcome)
}

async fn log_relay_stats(relay: &dyn RelayClient, bundle_hash: H256, target_block: u64) {
    match relay.get_bundle_stats(bundle_hash, target_block).await {
        Ok(stats) => info!("bundleStats for {:?}: {:?}", bundle_hash, stats),
        Err(e) => warn!("Failed to fetch bundle stats for {:?}: {}", bundle_hash, e),
    }

    match relay.get_user_stats().await {
        Ok(stats) => info!("userStats: {:?}", stats),
        Err(e) => warn!("Failed to fetch user stats: {}", e),
    }
}
