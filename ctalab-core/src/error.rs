//! Error taxonomy for the strategy runtime.
//!
//! Configuration errors are rejected synchronously before any state
//! mutation. Strategy runtime errors are caught at the engine boundary and
//! degrade only the offending host. Execution rejections come back as
//! order-status events and are not modeled as engine errors.

use crate::domain::OrderId;
use thiserror::Error;

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("strategy name '{0}' is already in use")]
    DuplicateName(String),

    #[error("no strategy named '{0}'")]
    UnknownStrategy(String),

    #[error("invalid parameter '{name}' for strategy '{strategy}': {reason}")]
    InvalidParameter {
        strategy: String,
        name: String,
        reason: String,
    },

    #[error("strategy '{strategy}' is {actual}, operation requires {expected}")]
    InvalidState {
        strategy: String,
        expected: &'static str,
        actual: String,
    },

    #[error("execution client error: {0}")]
    Execution(#[from] ExecError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistError),
}

/// Errors from the execution collaborator (live gateway or backtest matcher).
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),
}

/// Errors from the strategy state store.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// An error raised inside a strategy callback.
///
/// The Rust rendition of a caught exception: callbacks return
/// `Result<(), StrategyError>` and the engine logs the error, marks the
/// host `Faulted`, and keeps dispatching to other strategies.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StrategyError(pub String);

impl From<String> for StrategyError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}

impl From<&str> for StrategyError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

/// Result type for strategy callbacks.
pub type StrategyResult = Result<(), StrategyError>;
