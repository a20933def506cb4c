use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Estimate gas failure: {0}")]
    Estimation(String),

    #[error("Bundle signing failed: {0}")]
    Signing(String),

    #[error("Simulation error {code}: {message}")]
    Simulation { code: i64, message: String },

    #[error("Simulation reverted at transaction {index}: {reason}")]
    SimulationReverted { index: usize, reason: String },

    #[error("Relay request failed: {0}")]
    Relay(String),

    #[error("Bundle submission rejected: {0}")]
    Submission(String),

    #[error("Chain provider error: {0}")]
    Provider(String),

    #[error("ABI encoding error: {0}")]
    Abi(String),
}
