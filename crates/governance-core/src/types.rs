//! Core domain types for the trade governance engine.

pub mod agent;
pub mod market;
pub mod proposal;
pub mod trade;

pub use agent::*;
pub use market::*;
pub use proposal::*;
pub use trade::*;
