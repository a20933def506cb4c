pub mod blockchain;
pub mod bot;
pub mod config;
pub mod error;
pub mod fees;
pub mod relay;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::BotError;
pub use types::*;
