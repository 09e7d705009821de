//! # Agent
//!
//! Per-agent state and the solve step. Solving is a pure function of the
//! committed state captured in a [`StepContext`]; it produces an immutable
//! [`AgentSolution`] that the simulator applies with [`Agent::update`] once
//! every agent has been solved.

use crate::config::AgentParams;
use crate::geometry::sqr;
use crate::kd_tree::{AgentTree, ObstacleTree};
use crate::linear_program::solve_velocity;
use crate::neighbors::NeighborCache;
use crate::obstacle::ObstacleSet;
use crate::orca::{agent_line, obstacle_lines};
use crate::structs::{Line, Vector2D};

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    id: usize,
    pub position: Vector2D,
    pub velocity: Vector2D,
    pub pref_velocity: Vector2D,
    /// When set, the preferred velocity is re-aimed at the goal after every step.
    pub goal: Option<Vector2D>,
    pub radius: f64,
    pub max_speed: f64,
    pub neighbor_dist: f64,
    pub max_neighbors: usize,
    pub time_horizon: f64,
    pub time_horizon_obst: f64,
}

/// Read-only view of the committed simulation state shared by every solve in
/// one step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Agents indexed by id
    pub agents: &'a [Agent],
    pub agent_tree: &'a AgentTree,
    pub obstacles: &'a ObstacleSet,
    pub obstacle_tree: &'a ObstacleTree,
    pub time_step: f64,
}

/// Result of solving one agent: the new velocity plus the neighbor sets and
/// constraints that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSolution {
    pub agent_id: usize,
    pub velocity: Vector2D,
    /// Agent neighbor ids, nearest first
    pub agent_neighbors: Vec<usize>,
    /// Obstacle edge ids, nearest first
    pub obstacle_neighbors: Vec<usize>,
    /// Obstacle lines followed by agent lines
    pub orca_lines: Vec<Line>,
    pub num_obstacle_lines: usize,
}

impl Agent {
    pub fn new(id: usize, position: Vector2D, params: &AgentParams) -> Self {
        Agent {
            id,
            position,
            velocity: params.velocity,
            pref_velocity: Vector2D::ZERO,
            goal: None,
            radius: params.radius,
            max_speed: params.max_speed,
            neighbor_dist: params.neighbor_dist,
            max_neighbors: params.max_neighbors,
            time_horizon: params.time_horizon,
            time_horizon_obst: params.time_horizon_obst,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Range within which obstacle edges are considered. Obstacles cannot
    /// move out of the way, so this covers everything reachable within the
    /// obstacle horizon.
    pub fn obstacle_range_sq(&self) -> f64 {
        sqr(self.time_horizon_obst * self.max_speed + self.radius)
    }

    /// Queries both trees. Returns `(agent neighbors, obstacle neighbors)`,
    /// each nearest first.
    pub fn compute_neighbors(&self, ctx: &StepContext<'_>) -> (Vec<usize>, Vec<usize>) {
        let mut obstacle_cache = NeighborCache::unbounded(self.obstacle_range_sq());
        ctx.obstacle_tree
            .compute_obstacle_neighbors(ctx.obstacles, self.position, &mut obstacle_cache);

        let mut agent_cache = NeighborCache::new(self.max_neighbors, sqr(self.neighbor_dist));
        if self.max_neighbors > 0 {
            ctx.agent_tree
                .compute_agent_neighbors(self.id, self.position, &mut agent_cache);
        }

        (agent_cache.ids(), obstacle_cache.ids())
    }

    /// Builds the ORCA lines against the given neighbors and picks the new
    /// velocity.
    pub fn compute_new_velocity(
        &self,
        ctx: &StepContext<'_>,
        agent_neighbors: Vec<usize>,
        obstacle_neighbors: Vec<usize>,
    ) -> AgentSolution {
        let mut orca_lines = obstacle_lines(self, &obstacle_neighbors, ctx.obstacles);
        let num_obstacle_lines = orca_lines.len();

        orca_lines.extend(
            agent_neighbors
                .iter()
                .filter_map(|&other| ctx.agents.get(other))
                .filter_map(|other| agent_line(self, other, ctx.time_step)),
        );

        let velocity = solve_velocity(
            &orca_lines,
            num_obstacle_lines,
            self.max_speed,
            self.pref_velocity,
        );

        AgentSolution {
            agent_id: self.id,
            velocity,
            agent_neighbors,
            obstacle_neighbors,
            orca_lines,
            num_obstacle_lines,
        }
    }

    /// Neighbor query followed by the velocity solve.
    pub fn solve(&self, ctx: &StepContext<'_>) -> AgentSolution {
        let (agent_neighbors, obstacle_neighbors) = self.compute_neighbors(ctx);
        self.compute_new_velocity(ctx, agent_neighbors, obstacle_neighbors)
    }

    /// Commits a solved velocity and advances the position by one step.
    pub fn update(&mut self, velocity: Vector2D, time_step: f64) {
        self.velocity = velocity;
        self.position += velocity * time_step;
        self.steer_to_goal(time_step);
    }

    /// Aims the preferred velocity at the goal, slowing down so the agent
    /// lands on it instead of overshooting. No-op without a goal.
    pub fn steer_to_goal(&mut self, time_step: f64) {
        let Some(goal) = self.goal else {
            return;
        };

        let to_goal = goal - self.position;
        let speed = self.max_speed.min(to_goal.magnitude() / time_step);
        self.pref_velocity = to_goal.normalize() * speed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct World {
        agents: Vec<Agent>,
        agent_tree: AgentTree,
        obstacles: ObstacleSet,
        obstacle_tree: ObstacleTree,
    }

    impl World {
        fn new(agents: Vec<Agent>, obstacles: ObstacleSet) -> Self {
            let mut agent_tree = AgentTree::new();
            agent_tree.build(agents.iter().map(|a| (a.id(), a.position)));
            let obstacle_tree = ObstacleTree::build(&obstacles);
            World {
                agents,
                agent_tree,
                obstacles,
                obstacle_tree,
            }
        }

        fn ctx(&self) -> StepContext<'_> {
            StepContext {
                agents: &self.agents,
                agent_tree: &self.agent_tree,
                obstacles: &self.obstacles,
                obstacle_tree: &self.obstacle_tree,
                time_step: 0.25,
            }
        }
    }

    fn params(radius: f64, max_speed: f64) -> AgentParams {
        AgentParams {
            radius,
            max_speed,
            ..AgentParams::default()
        }
    }

    #[test]
    fn test_new_agent_takes_params() {
        let agent = Agent::new(3, Vector2D::new(1.0, 2.0), &AgentParams::default());
        assert_eq!(agent.id(), 3);
        assert_eq!(agent.position, Vector2D::new(1.0, 2.0));
        assert_eq!(agent.radius, 2.0);
        assert_eq!(agent.max_neighbors, 10);
        assert_eq!(agent.goal, None);
        assert_eq!(agent.pref_velocity, Vector2D::ZERO);
    }

    #[test]
    fn test_no_neighbors() {
        let mut agent = Agent::new(0, Vector2D::ZERO, &params(0.5, 1.0));
        agent.pref_velocity = Vector2D::new(0.5, 0.0);
        let world = World::new(vec![agent.clone()], ObstacleSet::new());

        let solution = agent.solve(&world.ctx());
        assert!(solution.agent_neighbors.is_empty());
        assert!(solution.orca_lines.is_empty());
        assert!((solution.velocity - agent.pref_velocity).magnitude() < 1e-12);
    }

    #[test]
    fn test_neighbors_respect_distance_and_cap() {
        let mut p = params(0.5, 1.0);
        p.neighbor_dist = 5.0;
        p.max_neighbors = 2;
        let agents: Vec<Agent> = [0.0, 1.0, 2.0, 3.0, 10.0]
            .iter()
            .enumerate()
            .map(|(id, &x)| Agent::new(id, Vector2D::new(x, 0.0), &p))
            .collect();
        let world = World::new(agents, ObstacleSet::new());

        let (agent_neighbors, obstacle_neighbors) = world.agents[0].compute_neighbors(&world.ctx());
        assert_eq!(agent_neighbors, vec![1, 2]);
        assert!(obstacle_neighbors.is_empty());
    }

    #[test]
    fn test_solution_lists_obstacle_lines_first() {
        let mut obstacles = ObstacleSet::new();
        obstacles.add_obstacle(&[Vector2D::new(-5.0, 0.0), Vector2D::new(5.0, 0.0)]);
        obstacles.process_obstacles();

        let p = params(0.5, 1.0);
        let mut agent = Agent::new(0, Vector2D::new(0.0, -2.0), &p);
        agent.pref_velocity = Vector2D::new(0.0, 1.0);
        let other = Agent::new(1, Vector2D::new(3.0, -2.0), &p);
        let world = World::new(vec![agent.clone(), other], obstacles);

        let solution = agent.solve(&world.ctx());
        assert_eq!(solution.obstacle_neighbors, vec![0]);
        assert_eq!(solution.agent_neighbors, vec![1]);
        assert_eq!(solution.num_obstacle_lines, 1);
        assert_eq!(solution.orca_lines.len(), 2);
        assert!(solution.orca_lines[0].is_satisfied_by(solution.velocity));
    }

    #[test]
    fn test_update_moves_agent() {
        let mut agent = Agent::new(0, Vector2D::ZERO, &params(0.5, 1.0));
        agent.update(Vector2D::new(1.0, 0.5), 0.5);

        assert_eq!(agent.velocity, Vector2D::new(1.0, 0.5));
        assert_abs_diff_eq!(agent.position.x, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(agent.position.y, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_update_steers_to_goal() {
        let mut agent = Agent::new(0, Vector2D::ZERO, &params(0.5, 1.0));
        agent.goal = Some(Vector2D::new(10.0, 0.0));
        agent.update(Vector2D::ZERO, 0.25);

        assert_abs_diff_eq!(agent.pref_velocity.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(agent.pref_velocity.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_goal_steering_slows_on_arrival() {
        let mut agent = Agent::new(0, Vector2D::new(9.9, 0.0), &params(0.5, 1.0));
        agent.goal = Some(Vector2D::new(10.0, 0.0));
        agent.steer_to_goal(0.25);

        // 0.1 away with a 0.25 step: arrive in exactly one step
        assert_abs_diff_eq!(agent.pref_velocity.x, 0.4, epsilon = 1e-9);

        agent.position = Vector2D::new(10.0, 0.0);
        agent.steer_to_goal(0.25);
        assert_eq!(agent.pref_velocity, Vector2D::ZERO);
    }

    #[test]
    fn test_update_without_goal_keeps_pref_velocity() {
        let mut agent = Agent::new(0, Vector2D::ZERO, &params(0.5, 1.0));
        agent.pref_velocity = Vector2D::new(0.0, 0.3);
        agent.update(Vector2D::ZERO, 0.25);
        assert_eq!(agent.pref_velocity, Vector2D::new(0.0, 0.3));
    }
}
