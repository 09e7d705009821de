//! # Simulator
//!
//! Owns the agents, the obstacle set and both spatial trees, and advances
//! them in two phases per step:
//!
//! 1. **Solve**: every agent is solved against one snapshot of the committed
//!    state, producing an [`AgentSolution`] each. Agents are independent in
//!    this phase, so it runs on the rayon pool when
//!    [`SimulatorConfig::parallel`] is set.
//! 2. **Commit**: only once every solution exists are velocities and
//!    positions updated.
//!
//! Results therefore do not depend on the order in which agents are solved.

use log::{debug, trace, warn};
use rayon::prelude::*;

use crate::agent::{Agent, AgentSolution, StepContext};
use crate::config::{validate_time_horizon, AgentParams, SimulatorConfig};
use crate::error::{Result, SimulatorError};
use crate::kd_tree::{AgentTree, ObstacleTree};
use crate::obstacle::{ObstacleEdge, ObstacleSet};
use crate::structs::Vector2D;

#[derive(Debug, Clone, Default)]
pub struct Simulator {
    agents: Vec<Agent>,
    agent_defaults: AgentParams,
    config: SimulatorConfig,
    obstacles: ObstacleSet,
    agent_tree: AgentTree,
    obstacle_tree: ObstacleTree,
    global_time: f64,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SimulatorConfig) -> Self {
        Simulator {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Parameters used by [`add_agent`](Self::add_agent). Rejected unless
    /// both time horizons are positive.
    pub fn set_agent_defaults(&mut self, params: AgentParams) -> Result<()> {
        params.validate()?;
        self.agent_defaults = params;
        Ok(())
    }

    pub fn agent_defaults(&self) -> &AgentParams {
        &self.agent_defaults
    }

    /// Adds an agent with the default parameters and returns its id.
    pub fn add_agent(&mut self, position: Vector2D) -> usize {
        let id = self.agents.len();
        self.agents.push(Agent::new(id, position, &self.agent_defaults));
        id
    }

    pub fn add_agent_with_params(&mut self, position: Vector2D, params: &AgentParams) -> Result<usize> {
        params.validate()?;
        let id = self.agents.len();
        self.agents.push(Agent::new(id, position, params));
        Ok(id)
    }

    /// Stages an obstacle polygon, vertices in counter-clockwise order.
    ///
    /// Returns the id of its first vertex, or `None` for fewer than two
    /// vertices. The obstacle has no effect until
    /// [`process_obstacles`](Self::process_obstacles) runs.
    pub fn add_obstacle(&mut self, vertices: &[Vector2D]) -> Option<usize> {
        self.obstacles.add_obstacle(vertices)
    }

    /// Finalizes staged obstacles and rebuilds the obstacle tree. Returns the
    /// number of obstacle vertices added.
    pub fn process_obstacles(&mut self) -> usize {
        let created = self.obstacles.process_obstacles();
        self.obstacle_tree = ObstacleTree::build(&self.obstacles);
        debug!(
            "obstacle tree rebuilt over {} obstacle vertices",
            self.obstacles.len()
        );
        created
    }

    /// Advances the simulation by one time step.
    pub fn step(&mut self) {
        if self.obstacles.has_staged() {
            warn!("stepping with unprocessed obstacles; call process_obstacles first");
        }

        self.rebuild_agent_tree();
        let solutions = self.solve_all();

        let time_step = self.config.time_step;
        for (agent, solution) in self.agents.iter_mut().zip(solutions) {
            agent.update(solution.velocity, time_step);
        }

        self.global_time += time_step;
        trace!(
            "step done: t={:.3}, {} agents",
            self.global_time,
            self.agents.len()
        );
    }

    fn rebuild_agent_tree(&mut self) {
        self.agent_tree
            .build(self.agents.iter().map(|agent| (agent.id(), agent.position)));
    }

    fn context(&self) -> StepContext<'_> {
        StepContext {
            agents: &self.agents,
            agent_tree: &self.agent_tree,
            obstacles: &self.obstacles,
            obstacle_tree: &self.obstacle_tree,
            time_step: self.config.time_step,
        }
    }

    fn solve_all(&self) -> Vec<AgentSolution> {
        let ctx = self.context();
        if self.config.parallel {
            self.agents.par_iter().map(|agent| agent.solve(&ctx)).collect()
        } else {
            self.agents.iter().map(|agent| agent.solve(&ctx)).collect()
        }
    }

    /// Solves one agent against the current state without committing
    /// anything.
    pub fn solve_agent(&mut self, id: usize) -> Result<AgentSolution> {
        self.check_agent(id)?;
        self.rebuild_agent_tree();
        let ctx = self.context();
        Ok(self.agents[id].solve(&ctx))
    }

    /// Whether every agent with a goal is within the goal tolerance of it.
    pub fn reached_goal(&self) -> bool {
        let tolerance_sq = self.config.goal_tolerance * self.config.goal_tolerance;
        self.agents.iter().all(|agent| match agent.goal {
            Some(goal) => (goal - agent.position).magnitude_sq() < tolerance_sq,
            None => true,
        })
    }

    /// Whether a disk of `radius` can travel from `q1` to `q2` without
    /// touching a processed obstacle.
    pub fn query_visibility(&self, q1: Vector2D, q2: Vector2D, radius: f64) -> bool {
        self.obstacle_tree.query_visibility(q1, q2, radius)
    }

    pub fn global_time(&self) -> f64 {
        self.global_time
    }

    pub fn time_step(&self) -> f64 {
        self.config.time_step
    }

    pub fn set_time_step(&mut self, time_step: f64) -> Result<()> {
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(SimulatorError::InvalidTimeStep(time_step));
        }
        self.config.time_step = time_step;
        Ok(())
    }

    // --- Agent accessors ---

    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    fn check_agent(&self, id: usize) -> Result<()> {
        if id < self.agents.len() {
            Ok(())
        } else {
            Err(SimulatorError::AgentOutOfRange {
                id,
                count: self.agents.len(),
            })
        }
    }

    pub fn agent(&self, id: usize) -> Result<&Agent> {
        let count = self.agents.len();
        self.agents
            .get(id)
            .ok_or(SimulatorError::AgentOutOfRange { id, count })
    }

    pub fn agent_mut(&mut self, id: usize) -> Result<&mut Agent> {
        let count = self.agents.len();
        self.agents
            .get_mut(id)
            .ok_or(SimulatorError::AgentOutOfRange { id, count })
    }

    pub fn agent_position(&self, id: usize) -> Result<Vector2D> {
        Ok(self.agent(id)?.position)
    }

    pub fn agent_velocity(&self, id: usize) -> Result<Vector2D> {
        Ok(self.agent(id)?.velocity)
    }

    pub fn agent_pref_velocity(&self, id: usize) -> Result<Vector2D> {
        Ok(self.agent(id)?.pref_velocity)
    }

    pub fn agent_goal(&self, id: usize) -> Result<Option<Vector2D>> {
        Ok(self.agent(id)?.goal)
    }

    pub fn agent_radius(&self, id: usize) -> Result<f64> {
        Ok(self.agent(id)?.radius)
    }

    pub fn agent_max_speed(&self, id: usize) -> Result<f64> {
        Ok(self.agent(id)?.max_speed)
    }

    pub fn set_agent_position(&mut self, id: usize, position: Vector2D) -> Result<()> {
        self.agent_mut(id)?.position = position;
        Ok(())
    }

    pub fn set_agent_velocity(&mut self, id: usize, velocity: Vector2D) -> Result<()> {
        self.agent_mut(id)?.velocity = velocity;
        Ok(())
    }

    pub fn set_agent_pref_velocity(&mut self, id: usize, pref_velocity: Vector2D) -> Result<()> {
        self.agent_mut(id)?.pref_velocity = pref_velocity;
        Ok(())
    }

    /// Sets the goal and immediately aims the preferred velocity at it.
    pub fn set_agent_goal(&mut self, id: usize, goal: Vector2D) -> Result<()> {
        let time_step = self.config.time_step;
        let agent = self.agent_mut(id)?;
        agent.goal = Some(goal);
        agent.steer_to_goal(time_step);
        Ok(())
    }

    /// Removes the goal; the preferred velocity is left as it is.
    pub fn clear_agent_goal(&mut self, id: usize) -> Result<()> {
        self.agent_mut(id)?.goal = None;
        Ok(())
    }

    pub fn set_agent_radius(&mut self, id: usize, radius: f64) -> Result<()> {
        self.agent_mut(id)?.radius = radius;
        Ok(())
    }

    pub fn set_agent_max_speed(&mut self, id: usize, max_speed: f64) -> Result<()> {
        self.agent_mut(id)?.max_speed = max_speed;
        Ok(())
    }

    pub fn set_agent_time_horizon(&mut self, id: usize, time_horizon: f64) -> Result<()> {
        validate_time_horizon(time_horizon)?;
        self.agent_mut(id)?.time_horizon = time_horizon;
        Ok(())
    }

    pub fn set_agent_time_horizon_obst(&mut self, id: usize, time_horizon_obst: f64) -> Result<()> {
        validate_time_horizon(time_horizon_obst)?;
        self.agent_mut(id)?.time_horizon_obst = time_horizon_obst;
        Ok(())
    }

    // --- Obstacle accessors ---

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    /// Number of processed obstacle vertices.
    pub fn num_obstacle_vertices(&self) -> usize {
        self.obstacles.len()
    }

    fn obstacle_edge(&self, id: usize) -> Result<&ObstacleEdge> {
        self.obstacles
            .edge(id)
            .ok_or(SimulatorError::ObstacleOutOfRange {
                id,
                count: self.obstacles.len(),
            })
    }

    pub fn obstacle_vertex(&self, id: usize) -> Result<Vector2D> {
        Ok(self.obstacle_edge(id)?.point)
    }

    pub fn next_obstacle_vertex_no(&self, id: usize) -> Result<usize> {
        Ok(self.obstacle_edge(id)?.next)
    }

    pub fn prev_obstacle_vertex_no(&self, id: usize) -> Result<usize> {
        Ok(self.obstacle_edge(id)?.previous)
    }
}
