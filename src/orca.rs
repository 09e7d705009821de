//! # ORCA - Optimal Reciprocal Collision Avoidance
//!
//! Builds the half-plane constraints ("ORCA lines") an agent must respect in
//! velocity space, following "Reciprocal n-body Collision Avoidance" by
//! van den Berg et al. (ISRR 2011).
//!
//! ## Agent lines
//!
//! For each neighbor the truncated velocity obstacle is a cone from the
//! origin, capped by a circle of radius `combined_radius / time_horizon`
//! around `relative_position / time_horizon`. `u` is the smallest change to
//! the relative velocity that leaves the obstacle. Each agent takes half of
//! it, so the line passes through `velocity + u / 2` perpendicular to `u`.
//!
//! Agents that already overlap use the time step instead of the horizon, so
//! the line resolves the overlap within one step.
//!
//! ## Obstacle lines
//!
//! Static edges take no share of the responsibility, so the agent takes all
//! of it. Each edge yields at most one line. The velocity obstacle of an edge
//! is bounded by two legs tangent to the radius-inflated endpoints and by a
//! cutoff segment at `time_horizon_obst`. Legs at reflex vertices are
//! replaced by the neighboring edge direction ("foreign" legs) and never
//! produce a line themselves.
//!
//! Obstacle lines are hard constraints for the solver, while agent lines may
//! be relaxed together when they cannot all be met.

use crate::agent::Agent;
use crate::geometry::{abs, abs_sq, det, normalize, sqr, RVO_EPSILON};
use crate::obstacle::ObstacleSet;
use crate::structs::{Line, Vector2D};

/// Lines for the obstacle edges `obstacle_neighbors`, nearest first.
///
/// Edges whose velocity obstacle is already covered by an earlier line are
/// skipped, so the result may be shorter than the neighbor list.
pub fn obstacle_lines(
    agent: &Agent,
    obstacle_neighbors: &[usize],
    obstacles: &ObstacleSet,
) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::with_capacity(obstacle_neighbors.len());
    let inv_time_horizon_obst = 1.0 / agent.time_horizon_obst;
    let radius = agent.radius;
    let radius_sq = sqr(radius);

    for &edge_id in obstacle_neighbors {
        let Some(first) = obstacles.edge(edge_id) else {
            continue;
        };
        let mut obstacle1 = first;
        let mut obstacle2 = obstacles.next_of(first);

        let relative_position1 = obstacle1.point - agent.position;
        let relative_position2 = obstacle2.point - agent.position;

        // Skip edges whose cutoff points already lie beyond an earlier line
        let already_covered = lines.iter().any(|line| {
            det(relative_position1 * inv_time_horizon_obst - line.point, line.direction)
                - inv_time_horizon_obst * radius
                >= -RVO_EPSILON
                && det(relative_position2 * inv_time_horizon_obst - line.point, line.direction)
                    - inv_time_horizon_obst * radius
                    >= -RVO_EPSILON
        });
        if already_covered {
            continue;
        }

        let obstacle_vector = obstacle2.point - obstacle1.point;
        let edge_length_sq = abs_sq(obstacle_vector);
        if edge_length_sq <= 0.0 {
            continue;
        }

        let dist_sq1 = abs_sq(relative_position1);
        let dist_sq2 = abs_sq(relative_position2);
        let s = (-relative_position1).dot(&obstacle_vector) / edge_length_sq;
        let dist_sq_line = abs_sq(-relative_position1 - obstacle_vector * s);

        // Collision with the left vertex, the right vertex, or the edge itself
        if s < 0.0 && dist_sq1 <= radius_sq {
            if obstacle1.is_convex {
                lines.push(Line::new(
                    Vector2D::ZERO,
                    normalize(Vector2D::new(-relative_position1.y, relative_position1.x)),
                ));
            }
            continue;
        } else if s > 1.0 && dist_sq2 <= radius_sq {
            // Only if the next edge does not take care of this vertex
            if obstacle2.is_convex && det(relative_position2, obstacle2.unit_dir) >= 0.0 {
                lines.push(Line::new(
                    Vector2D::ZERO,
                    normalize(Vector2D::new(-relative_position2.y, relative_position2.x)),
                ));
            }
            continue;
        } else if (0.0..1.0).contains(&s) && dist_sq_line <= radius_sq {
            lines.push(Line::new(Vector2D::ZERO, -obstacle1.unit_dir));
            continue;
        }

        // No collision: compute the legs. An oblique view collapses the
        // velocity obstacle onto a single vertex.
        let (mut left_leg_direction, mut right_leg_direction) =
            if s < 0.0 && dist_sq_line <= radius_sq {
                if !obstacle1.is_convex {
                    continue;
                }
                obstacle2 = obstacle1;
                (
                    left_tangent(relative_position1, dist_sq1, radius),
                    right_tangent(relative_position1, dist_sq1, radius),
                )
            } else if s > 1.0 && dist_sq_line <= radius_sq {
                if !obstacle2.is_convex {
                    continue;
                }
                obstacle1 = obstacle2;
                (
                    left_tangent(relative_position2, dist_sq2, radius),
                    right_tangent(relative_position2, dist_sq2, radius),
                )
            } else {
                let left = if obstacle1.is_convex {
                    left_tangent(relative_position1, dist_sq1, radius)
                } else {
                    -obstacle1.unit_dir
                };
                let right = if obstacle2.is_convex {
                    right_tangent(relative_position2, dist_sq2, radius)
                } else {
                    obstacle1.unit_dir
                };
                (left, right)
            };

        // A leg pointing into the neighboring edge is cut off by it
        let left_neighbor = obstacles.previous_of(obstacle1);
        let mut is_left_leg_foreign = false;
        let mut is_right_leg_foreign = false;

        if obstacle1.is_convex && det(left_leg_direction, -left_neighbor.unit_dir) >= 0.0 {
            left_leg_direction = -left_neighbor.unit_dir;
            is_left_leg_foreign = true;
        }
        if obstacle2.is_convex && det(right_leg_direction, obstacle2.unit_dir) <= 0.0 {
            right_leg_direction = obstacle2.unit_dir;
            is_right_leg_foreign = true;
        }

        let single_vertex = obstacle1.id == obstacle2.id;
        let left_cutoff = (obstacle1.point - agent.position) * inv_time_horizon_obst;
        let right_cutoff = (obstacle2.point - agent.position) * inv_time_horizon_obst;
        let cutoff_vector = right_cutoff - left_cutoff;

        let velocity = agent.velocity;
        let t = if single_vertex {
            0.5
        } else {
            (velocity - left_cutoff).dot(&cutoff_vector) / abs_sq(cutoff_vector)
        };
        let t_left = (velocity - left_cutoff).dot(&left_leg_direction);
        let t_right = (velocity - right_cutoff).dot(&right_leg_direction);

        // Project the current velocity on the nearest part of the obstacle
        if (t < 0.0 && t_left < 0.0) || (single_vertex && t_left < 0.0 && t_right < 0.0) {
            // Left cutoff circle
            lines.push(cutoff_circle_line(velocity, left_cutoff, radius * inv_time_horizon_obst));
            continue;
        } else if t > 1.0 && t_right < 0.0 {
            // Right cutoff circle
            lines.push(cutoff_circle_line(velocity, right_cutoff, radius * inv_time_horizon_obst));
            continue;
        }

        let dist_sq_cutoff = if t < 0.0 || t > 1.0 || single_vertex {
            f64::INFINITY
        } else {
            abs_sq(velocity - (left_cutoff + cutoff_vector * t))
        };
        let dist_sq_left = if t_left < 0.0 {
            f64::INFINITY
        } else {
            abs_sq(velocity - (left_cutoff + left_leg_direction * t_left))
        };
        let dist_sq_right = if t_right < 0.0 {
            f64::INFINITY
        } else {
            abs_sq(velocity - (right_cutoff + right_leg_direction * t_right))
        };

        let offset = radius * inv_time_horizon_obst;
        if dist_sq_cutoff <= dist_sq_left && dist_sq_cutoff <= dist_sq_right {
            // Cutoff line
            let direction = -obstacle1.unit_dir;
            let point = left_cutoff + Vector2D::new(-direction.y, direction.x) * offset;
            lines.push(Line::new(point, direction));
        } else if dist_sq_left <= dist_sq_right {
            // Left leg
            if is_left_leg_foreign {
                continue;
            }
            let direction = left_leg_direction;
            let point = left_cutoff + Vector2D::new(-direction.y, direction.x) * offset;
            lines.push(Line::new(point, direction));
        } else {
            // Right leg
            if is_right_leg_foreign {
                continue;
            }
            let direction = -right_leg_direction;
            let point = right_cutoff + Vector2D::new(-direction.y, direction.x) * offset;
            lines.push(Line::new(point, direction));
        }
    }

    lines
}

/// Left tangent direction from the agent to a vertex at `relative_position`
/// inflated by `radius`.
fn left_tangent(relative_position: Vector2D, dist_sq: f64, radius: f64) -> Vector2D {
    let leg = (dist_sq - sqr(radius)).max(0.0).sqrt();
    Vector2D::new(
        relative_position.x * leg - relative_position.y * radius,
        relative_position.x * radius + relative_position.y * leg,
    ) / dist_sq
}

/// Right tangent direction, mirror of [`left_tangent`].
fn right_tangent(relative_position: Vector2D, dist_sq: f64, radius: f64) -> Vector2D {
    let leg = (dist_sq - sqr(radius)).max(0.0).sqrt();
    Vector2D::new(
        relative_position.x * leg + relative_position.y * radius,
        -relative_position.x * radius + relative_position.y * leg,
    ) / dist_sq
}

fn cutoff_circle_line(velocity: Vector2D, cutoff_center: Vector2D, cutoff_radius: f64) -> Line {
    let unit_w = normalize(velocity - cutoff_center);
    Line::new(
        cutoff_center + unit_w * cutoff_radius,
        Vector2D::new(unit_w.y, -unit_w.x),
    )
}

/// Line for `agent` against neighbor `other`, each taking half of the
/// avoidance effort.
///
/// Returns `None` in the degenerate case where the agents coincide and move
/// so that no avoidance direction is defined.
pub fn agent_line(agent: &Agent, other: &Agent, time_step: f64) -> Option<Line> {
    let inv_time_horizon = 1.0 / agent.time_horizon;

    let relative_position = other.position - agent.position;
    let relative_velocity = agent.velocity - other.velocity;
    let dist_sq = abs_sq(relative_position);
    let combined_radius = agent.radius + other.radius;
    let combined_radius_sq = sqr(combined_radius);

    let direction;
    let u;

    if dist_sq > combined_radius_sq {
        // No collision
        let w = relative_velocity - relative_position * inv_time_horizon;
        let w_length_sq = abs_sq(w);
        let dot_product1 = w.dot(&relative_position);

        if dot_product1 < 0.0 && sqr(dot_product1) > combined_radius_sq * w_length_sq {
            // Project on cutoff circle
            let w_length = w_length_sq.sqrt();
            let unit_w = w / w_length;

            direction = Vector2D::new(unit_w.y, -unit_w.x);
            u = unit_w * (combined_radius * inv_time_horizon - w_length);
        } else {
            // Project on legs
            let leg = (dist_sq - combined_radius_sq).sqrt();

            direction = if det(relative_position, w) > 0.0 {
                // Left leg
                Vector2D::new(
                    relative_position.x * leg - relative_position.y * combined_radius,
                    relative_position.x * combined_radius + relative_position.y * leg,
                ) / dist_sq
            } else {
                // Right leg
                -Vector2D::new(
                    relative_position.x * leg + relative_position.y * combined_radius,
                    -relative_position.x * combined_radius + relative_position.y * leg,
                ) / dist_sq
            };

            let dot_product2 = relative_velocity.dot(&direction);
            u = direction * dot_product2 - relative_velocity;
        }
    } else {
        // Collision: resolve it within one time step
        let inv_time_step = 1.0 / time_step;
        let w = relative_velocity - relative_position * inv_time_step;
        let w_length = abs(w);
        if w_length <= f64::EPSILON {
            return None;
        }
        let unit_w = w / w_length;

        direction = Vector2D::new(unit_w.y, -unit_w.x);
        u = unit_w * (combined_radius * inv_time_step - w_length);
    }

    Some(Line::new(agent.velocity + u * 0.5, direction))
}
