//! Simulator and per-agent configuration.

use crate::error::{Result, SimulatorError};
use crate::structs::Vector2D;

/// Per-agent parameters.
///
/// The simulator keeps one set as defaults for agents added through
/// [`Simulator::add_agent`](crate::Simulator::add_agent); explicit overrides go
/// through [`Simulator::add_agent_with_params`](crate::Simulator::add_agent_with_params).
#[derive(Debug, Clone, PartialEq)]
pub struct AgentParams {
    /// Maximum center distance at which other agents are considered.
    pub neighbor_dist: f64,
    /// Maximum number of agent neighbors taken into account.
    pub max_neighbors: usize,
    /// Time horizon for avoiding other agents. Larger values react earlier
    /// but restrict the velocity choice more.
    pub time_horizon: f64,
    /// Time horizon for avoiding static obstacles.
    pub time_horizon_obst: f64,
    pub radius: f64,
    pub max_speed: f64,
    /// Initial velocity.
    pub velocity: Vector2D,
}

impl Default for AgentParams {
    fn default() -> Self {
        AgentParams {
            neighbor_dist: 15.0,
            max_neighbors: 10,
            time_horizon: 5.0,
            time_horizon_obst: 5.0,
            radius: 2.0,
            max_speed: 2.0,
            velocity: Vector2D::ZERO,
        }
    }
}

impl AgentParams {
    pub fn new(
        neighbor_dist: f64,
        max_neighbors: usize,
        time_horizon: f64,
        time_horizon_obst: f64,
        radius: f64,
        max_speed: f64,
        velocity: Vector2D,
    ) -> Self {
        AgentParams {
            neighbor_dist,
            max_neighbors,
            time_horizon,
            time_horizon_obst,
            radius,
            max_speed,
            velocity,
        }
    }

    /// Both time horizons must be positive and finite; the ORCA lines divide
    /// by them.
    pub fn validate(&self) -> Result<()> {
        validate_time_horizon(self.time_horizon)?;
        validate_time_horizon(self.time_horizon_obst)
    }
}

pub(crate) fn validate_time_horizon(time_horizon: f64) -> Result<()> {
    if !time_horizon.is_finite() || time_horizon <= 0.0 {
        return Err(SimulatorError::InvalidTimeHorizon(time_horizon));
    }
    Ok(())
}

/// Global simulation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Duration of one step.
    pub time_step: f64,
    /// Distance under which an agent counts as having reached its goal.
    pub goal_tolerance: f64,
    /// Solve agents on the rayon thread pool.
    pub parallel: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            time_step: 0.25,
            goal_tolerance: 0.05,
            parallel: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_params_default() {
        let params = AgentParams::default();
        assert_eq!(params.neighbor_dist, 15.0);
        assert_eq!(params.max_neighbors, 10);
        assert_eq!(params.radius, 2.0);
        assert_eq!(params.velocity, Vector2D::ZERO);
    }

    #[test]
    fn test_agent_params_new() {
        let params = AgentParams::new(5.0, 10, 10.0, 5.0, 1.0, 2.0, Vector2D::new(1.0, 0.0));
        assert_eq!(params.neighbor_dist, 5.0);
        assert_eq!(params.time_horizon, 10.0);
        assert_eq!(params.time_horizon_obst, 5.0);
        assert_eq!(params.max_speed, 2.0);
        assert_eq!(params.velocity.x, 1.0);
    }

    #[test]
    fn test_simulator_config_default() {
        let config = SimulatorConfig::default();
        assert_eq!(config.time_step, 0.25);
        assert!(config.goal_tolerance < 0.1);
        assert!(config.parallel);
    }
}
