//! # RVO Core
//!
//! Decentralized local collision avoidance for disk-shaped agents among
//! static polygonal obstacles, with optional Python bindings.
//!
//! ## Algorithms
//!
//! - **ORCA (Optimal Reciprocal Collision Avoidance)**: each agent turns its
//!   neighbors and nearby obstacle edges into half-plane constraints in
//!   velocity space and picks the allowed velocity closest to its preferred
//!   one with an incremental linear program.
//! - **Kd-trees**: one over agent positions, rebuilt every step, and one
//!   binary space partition over obstacle edges, built once. Both answer
//!   bounded nearest-neighbor queries; the obstacle tree also answers
//!   line-of-sight queries.
//!
//! ## Usage
//!
//! ```
//! use rvo_core::{Simulator, Vector2D};
//!
//! let mut sim = Simulator::new();
//! let a = sim.add_agent(Vector2D::new(-8.0, 0.0));
//! let b = sim.add_agent(Vector2D::new(8.0, 1.0));
//! sim.set_agent_goal(a, Vector2D::new(8.0, 0.0)).unwrap();
//! sim.set_agent_goal(b, Vector2D::new(-8.0, 1.0)).unwrap();
//!
//! while !sim.reached_goal() && sim.global_time() < 60.0 {
//!     sim.step();
//! }
//! ```
//!
//! From Python, build with the `python` feature and use the `Simulator`
//! class of the `rvo_core` module.

mod agent;
mod config;
mod error;
pub mod geometry;
mod kd_tree;
mod linear_program;
mod neighbors;
mod obstacle;
mod orca;
mod simulator;
mod structs;

#[cfg(feature = "python")]
mod python;

pub use agent::{Agent, AgentSolution, StepContext};
pub use config::{AgentParams, SimulatorConfig};
pub use error::{Result, SimulatorError};
pub use kd_tree::{AgentTree, ObstacleTree, MAX_LEAF_SIZE};
pub use linear_program::solve_velocity;
pub use neighbors::NeighborCache;
pub use obstacle::{ObstacleEdge, ObstacleSet};
pub use orca::{agent_line, obstacle_lines};
pub use simulator::Simulator;
pub use structs::{Line, Vector2D};

#[cfg(feature = "python")]
pub use python::PySimulator;

#[cfg(test)]
mod tests {
    use super::*;

    // --- Test helper functions (internal only) ---

    fn crossing_scenario(sim: &mut Simulator) {
        let a = sim.add_agent(Vector2D::new(-6.0, 0.0));
        let b = sim.add_agent(Vector2D::new(0.3, -5.0));
        sim.set_agent_goal(a, Vector2D::new(6.0, 0.0)).unwrap();
        sim.set_agent_goal(b, Vector2D::new(0.3, 7.0)).unwrap();
    }

    #[test]
    fn test_crossing_agents_reach_goals() {
        let mut sim = Simulator::new();
        sim.set_agent_defaults(AgentParams {
            radius: 0.5,
            max_speed: 1.0,
            ..AgentParams::default()
        })
        .unwrap();
        crossing_scenario(&mut sim);

        let mut steps = 0;
        while !sim.reached_goal() && steps < 2000 {
            sim.step();
            steps += 1;

            let gap = sim.agents()[0].position.distance(&sim.agents()[1].position);
            assert!(gap > 0.9, "Agents collided: distance {}", gap);
        }

        for agent in sim.agents() {
            let goal = agent.goal.unwrap();
            assert!(
                agent.position.distance(&goal) < 0.1,
                "Agent {} ended at {}, goal {}",
                agent.id(),
                agent.position,
                goal
            );
        }
    }

    #[test]
    fn test_public_geometry_helpers() {
        let v = Vector2D::new(3.0, 4.0);
        assert_eq!(geometry::abs(v), 5.0);
        assert_eq!(geometry::abs_sq(v), 25.0);
        assert!(geometry::left_of(Vector2D::ZERO, Vector2D::new(4.0, 0.0), Vector2D::new(2.0, 2.0)) > 0.0);
    }
}
