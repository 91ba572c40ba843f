//! Error types for GenAuth

use thiserror::Error;

/// Failures surfaced by the ledger engine and its collaborators.
///
/// Admission rejections and mining an empty queue are reported through
/// [`crate::blockchain::Admission`] and [`crate::blockchain::MineOutcome`],
/// not through this type.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid block #{index}: {reason}")]
    InvalidBlock { index: u64, reason: String },

    #[error("Chain is empty")]
    EmptyChain,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
