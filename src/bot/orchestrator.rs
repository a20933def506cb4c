use anyhow::{anyhow, Result};
use ethers::{
    core::rand::thread_rng,
    signers::{LocalWallet, Signer},
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};

use crate::{
    blockchain::{parse_address, parse_wallet, parse_wei, BlockchainClient, ChainProvider},
    bot::{
        context::BotContext,
        listener::BlockListener,
        reactor::{BlockReactor, ReactorExit},
    },
    config::Config,
    fees::gwei,
    relay::{FlashbotsRelay, RelayClient},
    transaction::{FlashloanParams, TransactionBuilder},
};

const BLOCK_CHANNEL_CAPACITY: usize = 64;

/// Wires the chain, the relay and the prepared transaction into a block reactor.
pub struct BundleBot {
    config: Config,
    blockchain_client: Arc<BlockchainClient>,
    ctx: Arc<BotContext>,
    listener: Option<JoinHandle<()>>,
}

impl BundleBot {
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing Flashbots bundler");

        // Initialize blockchain client
        let blockchain_client = Arc::new(BlockchainClient::new(&config).await?);
        blockchain_client.health_check().await?;
        let chain_id = blockchain_client.chain_id();
        let provider: Arc<dyn ChainProvider> = blockchain_client.clone();

        // Load wallets
        let searcher = parse_wallet(&config.wallet.private_key, chain_id)?;
        let relay_signer = match config.wallet.relay_signing_key.as_deref() {
            Some(key) if !key.trim().is_empty() => parse_wallet(key, chain_id)?,
            _ => {
                warn!(
                    "No FLASHBOTS_RELAY_SIGNING_KEY set, using a random key. \
                     Searcher reputation will not carry over between runs"
                );
                LocalWallet::new(&mut thread_rng())
            }
        };

        info!("Searcher Wallet Address: {:?}", searcher.address());
        info!(
            "Flashbots Relay Signing Wallet Address: {:?}",
            relay_signer.address()
        );

        // Initialize relay client
        let poll_interval = Duration::from_millis(config.blockchain.block_poll_interval_ms);
        let relay: Arc<dyn RelayClient> = Arc::new(FlashbotsRelay::new(
            &config.relay.url,
            relay_signer,
            provider.clone(),
            Duration::from_secs(config.relay.request_timeout_secs),
            poll_interval,
        )?);

        // Build and size the flash-loan call once
        let executor_address = parse_address(&config.opportunity.executor_address)?;
        let builder = TransactionBuilder::new(executor_address, &config.bundle)?;
        let params = FlashloanParams::from_config(&config.opportunity)?;
        info!(
            "Executor {:?}, borrowing {} of {:?} via {:?} / {:?}, coinbase payment {} wei",
            builder.executor_address(),
            params.borrow_amount,
            params.token1,
            params.router1,
            params.router2,
            config.opportunity.coinbase_payment
        );

        let base_transaction = builder.build_base_transaction(&params)?;
        let base_transaction = builder
            .estimate_and_size(provider.as_ref(), base_transaction, searcher.address())
            .await?;

        let min_coinbase_diff = parse_wei(&config.bundle.min_coinbase_diff_wei)?;
        if !min_coinbase_diff.is_zero() {
            info!("Minimum coinbase diff: {} wei", min_coinbase_diff);
        }

        let ctx = Arc::new(BotContext {
            provider,
            relay,
            searcher,
            base_transaction,
            chain_id,
            priority_fee: gwei(config.bundle.priority_fee_gwei),
            horizon_blocks: config.bundle.blocks_in_the_future,
            min_coinbase_diff,
        });

        info!("Flashbots bundler initialized");

        Ok(Self {
            config,
            blockchain_client,
            ctx,
            listener: None,
        })
    }

    /// Runs until a bundle is included or the block stream ends.
    pub async fn start(&mut self) -> Result<ReactorExit> {
        if self.listener.is_some() {
            return Err(anyhow!("Bundler is already running"));
        }

        // Start block listener
        let (sender, receiver) = mpsc::channel(BLOCK_CHANNEL_CAPACITY);
        let listener = BlockListener::new(
            self.blockchain_client.clone(),
            Duration::from_millis(self.config.blockchain.block_poll_interval_ms),
        );
        self.listener = Some(listener.spawn(sender));

        info!(
            "Listening for blocks, up to {} iterations in flight",
            self.config.bundle.max_in_flight
        );

        let mut reactor = BlockReactor::new(self.ctx.clone(), self.config.bundle.max_in_flight);
        let exit = reactor.run(receiver).await;

        self.stop().await;
        Ok(exit)
    }

    pub async fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            info!("Stopping block listener");
            listener.abort();
        }
    }
}
