//! Trading Engine
//!
//! Directional routing, entry validation, stop geometry and sizing for
//! admitted trade proposals.

pub mod entry;
pub mod execution;
pub mod router;
pub mod sizing;
pub mod stop_geometry;

pub use entry::{validate_entry, CheckSeverity, EntryCheck, EntryValidation};
pub use execution::{
    DecisionMetrics, ExecutionDecision, ExecutionRequest, ExecutionRouter, SafetyCheck,
};
pub use router::{
    validate_router_integrity, verify_route, DirectionPermissions, DirectionalRouter,
    RouteDecision, RouterConfig,
};
pub use sizing::{capital_multiplier, session_multiplier, survivorship_step};
pub use stop_geometry::{compute_stop_geometry, StopGeometry};
