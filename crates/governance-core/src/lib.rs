//! Governance Core Library
//!
//! Shared domain types, engine configuration, and error types for the trade
//! governance engine.

pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{GovernanceError, Result};
