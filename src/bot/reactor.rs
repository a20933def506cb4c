use std::sync::Arc;
use tokio::{
    sync::{mpsc, Semaphore},
    task::{JoinError, JoinSet},
};
use tracing::{debug, error, info, warn};

use crate::{
    bot::{
        context::BotContext,
        metrics::ReactorMetrics,
        pipeline::{BundlePipeline, IterationResult},
    },
    error::BotError,
    transaction::price_for_block,
};

type IterationOutput = (u64, Result<IterationResult, BotError>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorExit {
    /// A bundle landed in `block_number`.
    BundleIncluded { block_number: u64 },
    StreamClosed,
}

/// Runs one bundle iteration per new block, at most `max_in_flight` at a time.
pub struct BlockReactor {
    ctx: Arc<BotContext>,
    permits: Arc<Semaphore>,
    metrics: ReactorMetrics,
}

impl BlockReactor {
    pub fn new(ctx: Arc<BotContext>, max_in_flight: usize) -> Self {
        Self {
            ctx,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            metrics: ReactorMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &ReactorMetrics {
        &self.metrics
    }

    pub async fn run(&mut self, mut blocks: mpsc::Receiver<u64>) -> ReactorExit {
        let mut in_flight: JoinSet<IterationOutput> = JoinSet::new();
        let mut stream_open = true;

        loop {
            tokio::select! {
                next = blocks.recv(), if stream_open => match next {
                    Some(block_number) => self.dispatch(&mut in_flight, block_number),
                    None => {
                        info!("Block stream closed, draining {} iterations", in_flight.len());
                        stream_open = false;
                    }
                },
                Some(joined) = in_flight.join_next() => {
                    if let Some(block_number) = self.complete(joined) {
                        in_flight.abort_all();
                        self.metrics.log_summary();
                        return ReactorExit::BundleIncluded { block_number };
                    }
                }
                else => break,
            }
        }

        self.metrics.log_summary();
        ReactorExit::StreamClosed
    }

    fn dispatch(&mut self, in_flight: &mut JoinSet<IterationOutput>, block_number: u64) {
        self.metrics.record_block();

        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    "All iteration slots busy, skipping block {}",
                    block_number
                );
                self.metrics.record_skipped_block();
                return;
            }
        };

        let ctx = self.ctx.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            (block_number, process_block(ctx, block_number).await)
        });
    }

    /// Records a finished iteration and returns the inclusion block if it was terminal.
    fn complete(&mut self, joined: Result<IterationOutput, JoinError>) -> Option<u64> {
        match joined {
            Ok((block_number, Ok(result))) => {
                debug!("Block {} iteration finished: {:?}", block_number, result);
                self.metrics.record_result(&result);
                if matches!(result, IterationResult::Resolved(_)) && !result.is_terminal() {
                    self.metrics.log_summary();
                }
                result.is_terminal().then_some(block_number + 1)
            }
            Ok((block_number, Err(e))) => {
                error!("Block {} iteration failed: {}", block_number, e);
                self.metrics.record_error(&e.to_string());
                None
            }
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                error!("Block iteration panicked: {}", e);
                self.metrics.record_error(&e.to_string());
                None
            }
        }
    }
}

/// Prices the base transaction against `block_number` and targets the next block.
pub async fn process_block(
    ctx: Arc<BotContext>,
    block_number: u64,
) -> Result<IterationResult, BotError> {
    info!("============= blockNumber is {} =============", block_number);

    let block = ctx
        .provider
        .get_block(block_number)
        .await
        .map_err(|e| BotError::Provider(e.to_string()))?
        .ok_or_else(|| BotError::Provider(format!("Block {} not available", block_number)))?;

    let base_fee = block.base_fee_per_gas.ok_or_else(|| {
        BotError::Provider(format!("Block {} has no base fee", block_number))
    })?;

    let fees = ctx.fee_parameters(base_fee);
    let priced = price_for_block(&ctx.base_transaction, &fees, ctx.chain_id);
    debug!(
        "Block {} base fee {}, max fee per gas {}",
        block_number, base_fee, priced.max_fee_per_gas
    );

    BundlePipeline::new(ctx).run(priced, block_number + 1).await
}
