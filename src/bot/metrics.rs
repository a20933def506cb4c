use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{bot::pipeline::IterationResult, types::SubmissionOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactorMetrics {
    pub started_at: DateTime<Utc>,
    pub blocks_seen: u64,
    pub blocks_skipped: u64,
    pub iterations_completed: u64,
    pub simulation_failures: u64,
    pub below_min_profit: u64,
    pub bundles_submitted: u64,
    pub bundles_included: u64,
    pub blocks_passed: u64,
    pub nonce_too_high: u64,
    pub unresolved: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl ReactorMetrics {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            blocks_seen: 0,
            blocks_skipped: 0,
            iterations_completed: 0,
            simulation_failures: 0,
            below_min_profit: 0,
            bundles_submitted: 0,
            bundles_included: 0,
            blocks_passed: 0,
            nonce_too_high: 0,
            unresolved: 0,
            error_count: 0,
            last_error: None,
            last_updated: now,
        }
    }

    pub fn record_block(&mut self) {
        self.blocks_seen += 1;
        self.last_updated = Utc::now();
    }

    pub fn record_skipped_block(&mut self) {
        self.blocks_skipped += 1;
        self.last_updated = Utc::now();
    }

    pub fn record_result(&mut self, result: &IterationResult) {
        self.iterations_completed += 1;

        match result {
            IterationResult::SimulationFailed => self.simulation_failures += 1,
            IterationResult::BelowMinimumProfit => self.below_min_profit += 1,
            IterationResult::Resolved(outcome) => {
                self.bundles_submitted += 1;
                match outcome {
                    SubmissionOutcome::Included => self.bundles_included += 1,
                    SubmissionOutcome::BlockPassedWithoutInclusion => self.blocks_passed += 1,
                    SubmissionOutcome::AccountNonceTooHigh => self.nonce_too_high += 1,
                }
            }
            IterationResult::Unresolved => {
                self.bundles_submitted += 1;
                self.unresolved += 1;
            }
        }

        self.last_updated = Utc::now();
    }

    pub fn record_error(&mut self, error_message: &str) {
        self.iterations_completed += 1;
        self.error_count += 1;
        self.last_error = Some(error_message.to_string());
        self.last_updated = Utc::now();
    }

    pub fn inclusion_rate(&self) -> f64 {
        if self.bundles_submitted == 0 {
            return 0.0;
        }
        self.bundles_included as f64 / self.bundles_submitted as f64
    }

    pub fn uptime_seconds(&self) -> i64 {
        (self.last_updated - self.started_at).num_seconds()
    }

    pub fn log_summary(&self) {
        info!(
            "Reactor up {}s: {} blocks seen ({} skipped), {} submitted, {} included, {} passed, {} nonce too high, {} simulation failures, {} errors, inclusion rate {:.2}%",
            self.uptime_seconds(),
            self.blocks_seen,
            self.blocks_skipped,
            self.bundles_submitted,
            self.bundles_included,
            self.blocks_passed,
            self.nonce_too_high,
            self.simulation_failures,
            self.error_count,
            self.inclusion_rate() * 100.0
        );
    }

    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize metrics: {}", e))
    }
}

impl Default for ReactorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
