pub mod context;
pub mod listener;
pub mod metrics;
pub mod orchestrator;
pub mod outcome;
pub mod pipeline;
pub mod reactor;

pub use context::BotContext;
pub use listener::BlockListener;
pub use metrics::ReactorMetrics;
pub use orchestrator::BundleBot;
pub use outcome::{decide, OutcomeDecision};
pub use pipeline::{BundlePipeline, IterationResult};
pub use reactor::{BlockReactor, ReactorExit};
