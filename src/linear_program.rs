//! # Velocity Selection
//!
//! Picks the velocity closest to the preferred velocity that satisfies every
//! ORCA line and the speed limit, using the randomized-incremental 2-D linear
//! program from van den Berg et al. Lines are added one at a time; when a
//! new line is violated by the current optimum, the optimum is re-solved on
//! that line alone (a 1-D problem bounded by the speed circle and by every
//! earlier line).
//!
//! When no velocity satisfies all lines, the relaxation pass minimizes the
//! largest violation of the agent lines while keeping obstacle lines hard,
//! then moves the result as close to the preferred velocity as that minimal
//! violation allows.

use log::trace;

use crate::geometry::{abs_sq, det, normalize, sqr, RVO_EPSILON};
use crate::structs::{Line, Vector2D};

/// Slack added to the minimal violation before the final pull towards the
/// preferred velocity, so the relaxation optimum stays feasible.
const RELAXATION_SLACK: f64 = 1e-9;

/// Solves the 1-D problem on `lines[line_no]`, constrained by the circle of
/// `radius` and by `lines[..line_no]`.
///
/// Returns `None` when that part of the line is empty.
pub fn linear_program1(
    lines: &[Line],
    line_no: usize,
    radius: f64,
    opt_velocity: Vector2D,
    direction_opt: bool,
) -> Option<Vector2D> {
    let line = &lines[line_no];
    let dot_product = line.point.dot(&line.direction);
    let discriminant = sqr(dot_product) + sqr(radius) - abs_sq(line.point);

    if discriminant < 0.0 {
        // Max speed circle fully invalidates this line
        return None;
    }

    let sqrt_discriminant = discriminant.sqrt();
    let mut t_left = -dot_product - sqrt_discriminant;
    let mut t_right = -dot_product + sqrt_discriminant;

    for other in &lines[..line_no] {
        let denominator = det(line.direction, other.direction);
        let numerator = det(other.direction, line.point - other.point);

        if denominator.abs() <= RVO_EPSILON {
            // Lines are (nearly) parallel
            if numerator < 0.0 {
                return None;
            }
            continue;
        }

        let t = numerator / denominator;
        if denominator >= 0.0 {
            t_right = t_right.min(t);
        } else {
            t_left = t_left.max(t);
        }

        if t_left > t_right {
            return None;
        }
    }

    let t = if direction_opt {
        if opt_velocity.dot(&line.direction) > 0.0 {
            t_right
        } else {
            t_left
        }
    } else {
        line.direction
            .dot(&(opt_velocity - line.point))
            .clamp(t_left, t_right)
    };

    Some(line.point + line.direction * t)
}

/// Solves the 2-D problem over all `lines` within the circle of `radius`.
///
/// With `direction_opt` set, `opt_velocity` is a unit direction to go as far
/// as possible along; otherwise it is the point to stay closest to.
///
/// Returns the index of the first line that could not be satisfied (or
/// `lines.len()` on success) together with the optimum over the lines before
/// it.
pub fn linear_program2(
    lines: &[Line],
    radius: f64,
    opt_velocity: Vector2D,
    direction_opt: bool,
) -> (usize, Vector2D) {
    let mut result = if direction_opt {
        opt_velocity * radius
    } else if abs_sq(opt_velocity) > sqr(radius) {
        normalize(opt_velocity) * radius
    } else {
        opt_velocity
    };

    for (i, line) in lines.iter().enumerate() {
        if line.violation(result) > 0.0 {
            match linear_program1(lines, i, radius, opt_velocity, direction_opt) {
                Some(velocity) => result = velocity,
                None => return (i, result),
            }
        }
    }

    (lines.len(), result)
}

/// Relaxation pass. Starting at `begin_line`, finds the velocity within
/// `radius` that satisfies `lines[..num_hard]` and minimizes the largest
/// violation among the remaining lines.
pub fn linear_program3(
    lines: &[Line],
    num_hard: usize,
    begin_line: usize,
    radius: f64,
    mut result: Vector2D,
) -> Vector2D {
    let mut distance = 0.0;

    for i in begin_line..lines.len() {
        let line = &lines[i];
        if line.violation(result) <= distance {
            continue;
        }

        // Result does not satisfy this line by more than the current distance
        let mut projected: Vec<Line> = lines[..num_hard].to_vec();

        for other in &lines[num_hard..i] {
            let determinant = det(line.direction, other.direction);

            let point = if determinant.abs() <= RVO_EPSILON {
                if line.direction.dot(&other.direction) > 0.0 {
                    // Same direction
                    continue;
                }
                // Opposite direction
                (line.point + other.point) * 0.5
            } else {
                line.point
                    + line.direction
                        * (det(other.direction, line.point - other.point) / determinant)
            };

            let direction = normalize(other.direction - line.direction);
            projected.push(Line::new(point, direction));
        }

        let opt = Vector2D::new(-line.direction.y, line.direction.x);
        let (failed, candidate) = linear_program2(&projected, radius, opt, true);
        // Failure here is a floating point artifact; keep the previous result.
        if failed >= projected.len() {
            result = candidate;
        }

        distance = line.violation(result);
    }

    result
}

/// Largest violation of `lines` at `v`, clamped at zero.
pub fn max_violation(lines: &[Line], v: Vector2D) -> f64 {
    lines
        .iter()
        .map(|line| line.violation(v))
        .fold(0.0, f64::max)
}

/// Runs the relaxation pass, then pulls the result towards `pref_velocity`
/// without increasing the largest violation of the soft lines.
fn relax(
    lines: &[Line],
    num_hard: usize,
    begin_line: usize,
    radius: f64,
    pref_velocity: Vector2D,
    result: Vector2D,
) -> Vector2D {
    let relaxed = linear_program3(lines, num_hard, begin_line, radius, result);
    let slack = max_violation(&lines[num_hard..], relaxed) + RELAXATION_SLACK;

    // Shift every soft line right by the minimal violation
    let shifted: Vec<Line> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i < num_hard {
                *line
            } else {
                let right = Vector2D::new(line.direction.y, -line.direction.x);
                Line::new(line.point + right * slack, line.direction)
            }
        })
        .collect();

    match linear_program2(&shifted, radius, pref_velocity, false) {
        (failed, velocity) if failed == shifted.len() => velocity,
        _ => relaxed,
    }
}

/// Velocity closest to `pref_velocity` with speed at most `max_speed` that
/// satisfies `lines`, of which the first `num_obstacle_lines` are hard.
///
/// Never fails: infeasible agent lines are relaxed as a group, and if the
/// obstacle lines alone are infeasible the velocity that least penetrates
/// them is returned, ignoring agent lines.
pub fn solve_velocity(
    lines: &[Line],
    num_obstacle_lines: usize,
    max_speed: f64,
    pref_velocity: Vector2D,
) -> Vector2D {
    let num_obstacle_lines = num_obstacle_lines.min(lines.len());
    let (line_fail, result) = linear_program2(lines, max_speed, pref_velocity, false);

    if line_fail == lines.len() {
        return result;
    }

    if line_fail < num_obstacle_lines {
        trace!(
            "obstacle line {} infeasible, relaxing {} obstacle lines",
            line_fail,
            num_obstacle_lines
        );
        return relax(
            &lines[..num_obstacle_lines],
            0,
            line_fail,
            max_speed,
            pref_velocity,
            result,
        );
    }

    trace!(
        "agent line {} infeasible, relaxing {} agent lines",
        line_fail,
        lines.len() - num_obstacle_lines
    );
    relax(
        lines,
        num_obstacle_lines,
        line_fail,
        max_speed,
        pref_velocity,
        result,
    )
}
