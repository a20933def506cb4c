use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle, time::interval};
use tracing::{debug, info, warn};

use crate::blockchain::ChainProvider;

/// Turns head polling into an ordered stream of new block numbers.
pub struct BlockListener {
    provider: Arc<dyn ChainProvider>,
    poll_interval: Duration,
}

impl BlockListener {
    pub fn new(provider: Arc<dyn ChainProvider>, poll_interval: Duration) -> Self {
        Self {
            provider,
            poll_interval,
        }
    }

    pub fn spawn(self, sender: mpsc::Sender<u64>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(sender).await })
    }

    /// Emits every block after the first observed head, filling gaps in order.
    /// Returns when the receiving side is dropped.
    pub async fn run(self, sender: mpsc::Sender<u64>) {
        let mut ticker = interval(self.poll_interval);
        let mut last_seen: Option<u64> = None;

        info!("Block listener started ({:?} poll interval)", self.poll_interval);

        loop {
            ticker.tick().await;

            let head = match self.provider.get_block_number().await {
                Ok(head) => head,
                Err(e) => {
                    warn!("Failed to fetch block number: {}", e);
                    continue;
                }
            };

            let first = match last_seen {
                Some(previous) if head <= previous => continue,
                Some(previous) => previous + 1,
                None => head,
            };

            if head > first {
                debug!("Catching up blocks {}..={}", first, head);
            }

            for block_number in first..=head {
                if sender.send(block_number).await.is_err() {
                    info!("Block stream receiver dropped, stopping listener");
                    return;
                }
            }
            last_seen = Some(head);
        }
    }
}
