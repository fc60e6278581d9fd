//! Risk Manager
//!
//! Admission gates, post-entry health governance, trailing stops, and
//! ensemble rollback for the trade governance engine.

pub mod admission;
pub mod rollback;
pub mod trade_health;
pub mod trailing_stop;

pub use admission::{
    AdmissionGate, CompositeMultiplier, ExitLatencyGrade, GateDecision, GateId, GateResult,
    TradeMode, TriggeredGate,
};
pub use rollback::{RollbackDecision, RollbackEvaluator, RollbackState, RollbackTransition};
pub use trade_health::{
    GovernanceAction, GovernanceActionKind, HealthBand, HealthComponents, HealthMonitor,
    PositionHealthTracker, TradeHealthInput, TradeHealthResult,
};
pub use trailing_stop::{TrailingStopGovernor, TrailingStopRule, TriggeredStop};
