use thiserror::Error;

use crate::models::order::OrderId;

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Strategy interrupted: {0}")]
    Interrupted(String),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TradingError {
    /// A user-requested stop is a normal terminal state, not a failure.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, TradingError::Interrupted(_))
    }
}
