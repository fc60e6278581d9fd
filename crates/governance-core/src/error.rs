//! Error types for the trade governance engine.
//!
//! Ordinary gate and check failures are never errors; they are reported as
//! values on the decision types. Errors are reserved for configuration
//! problems, routing defects, and collaborator failures.

use crate::types::{Direction, ExecutionEngine};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(
        "Routing integrity violation: {direction} routed to {engine} (pair {pair}, agent {agent_id})"
    )]
    RoutingIntegrity {
        direction: Direction,
        engine: ExecutionEngine,
        pair: String,
        agent_id: String,
    },

    #[error("Trade history error: {message}")]
    TradeHistory { message: String },
}

impl GovernanceError {
    /// Whether this error signals a programming or configuration defect that
    /// must halt the caller's pipeline rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GovernanceError::RoutingIntegrity { .. } | GovernanceError::Config { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
