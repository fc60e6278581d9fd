//! Trade Governance & Risk Adaptation Engine
//!
//! Decides whether a proposed trade may proceed, how large it may be, and
//! how an open position is governed afterwards. The work is split across
//! the workspace crates:
//!
//! - `governance-core`: shared types, configuration, errors
//! - `risk-manager`: admission gates, trade health, trailing stops, rollback
//! - `trading-engine`: directional routing, entry validation, sizing
//! - `agent-tracker`: agent metrics, tier resolution, state store
//!
//! This crate wires them into a [`GovernancePipeline`].

pub mod pipeline;

pub use pipeline::{GovernancePipeline, GovernanceState, ProposalOutcome};
