//! Error types for simulator accessors.
//!
//! Only host-facing misuse is reported here. Infeasible velocity constraints
//! and degenerate geometry are resolved inside the solver and never surface
//! as errors.

/// Errors reported by [`Simulator`](crate::Simulator) accessors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SimulatorError {
    #[error("agent id {id} out of range (simulator has {count} agents)")]
    AgentOutOfRange { id: usize, count: usize },

    #[error("obstacle vertex id {id} out of range (simulator has {count} obstacle vertices)")]
    ObstacleOutOfRange { id: usize, count: usize },

    #[error("invalid time step {0}: must be positive and finite")]
    InvalidTimeStep(f64),

    #[error("invalid time horizon {0}: must be positive and finite")]
    InvalidTimeHorizon(f64),
}

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimulatorError>;
