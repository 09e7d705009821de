//! # Geometry Primitives
//!
//! Scalar helpers over [`Vector2D`] used by the spatial index and the ORCA
//! solver. Orientation follows the usual convention: a positive
//! [`left_of`] means the point lies to the left of the directed line.

use crate::structs::Vector2D;

/// Threshold for every near-zero and near-parallel decision.
pub const RVO_EPSILON: f64 = 0.01;

pub fn sqr(value: f64) -> f64 {
    value * value
}

pub fn abs_sq(v: Vector2D) -> f64 {
    v.dot(&v)
}

pub fn abs(v: Vector2D) -> f64 {
    abs_sq(v).sqrt()
}

/// Unit vector along `v`; the zero vector when `v` has no direction.
pub fn normalize(v: Vector2D) -> Vector2D {
    v.normalize()
}

/// Cross-product scalar `v1.x * v2.y - v1.y * v2.x`.
pub fn det(v1: Vector2D, v2: Vector2D) -> f64 {
    v1.x * v2.y - v1.y * v2.x
}

/// Twice the signed area of triangle `(a, b, c)`.
///
/// Positive when `c` is left of the directed line `a -> b`, negative when it
/// is right, zero when collinear.
pub fn left_of(a: Vector2D, b: Vector2D, c: Vector2D) -> f64 {
    det(a - c, b - a)
}

/// Squared distance from `c` to the segment `ab`, RVO2 flavour.
///
/// Before `a` this is the distance to `a`; past `b` it is `|b - a|²`, not the
/// distance to `b`. Use [`dist_sq_point_segment`] for the true distance.
/// A degenerate segment (`a == b`) is treated as the point `a`.
pub fn dist_sq_point_line_segment(a: Vector2D, b: Vector2D, c: Vector2D) -> f64 {
    let ab = b - a;
    let len_sq = abs_sq(ab);
    if len_sq <= 0.0 {
        return abs_sq(c - a);
    }

    let r = (c - a).dot(&ab) / len_sq;
    if r < 0.0 {
        abs_sq(c - a)
    } else if r > 1.0 {
        len_sq
    } else {
        abs_sq(c - (a + ab * r))
    }
}

/// True squared distance from `c` to the closest point of the segment `ab`.
pub fn dist_sq_point_segment(a: Vector2D, b: Vector2D, c: Vector2D) -> f64 {
    let ab = b - a;
    let len_sq = abs_sq(ab);
    if len_sq <= 0.0 {
        return abs_sq(c - a);
    }

    let r = ((c - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    abs_sq(c - (a + ab * r))
}

/// Squared distance from `c` to the infinite line through `a` and `b`.
///
/// Falls back to the distance to `a` when the line has no direction.
pub fn dist_sq_point_line(a: Vector2D, b: Vector2D, c: Vector2D) -> f64 {
    let len_sq = abs_sq(b - a);
    if len_sq <= 0.0 {
        return abs_sq(c - a);
    }
    sqr(left_of(a, b, c)) / len_sq
}

/// True when the closed segments `ab` and `cd` share at least one point.
pub fn segments_intersect(a: Vector2D, b: Vector2D, c: Vector2D, d: Vector2D) -> bool {
    let d1 = left_of(c, d, a);
    let d2 = left_of(c, d, b);
    let d3 = left_of(a, b, c);
    let d4 = left_of(a, b, d);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(c, d, a))
        || (d2 == 0.0 && on_segment(c, d, b))
        || (d3 == 0.0 && on_segment(a, b, c))
        || (d4 == 0.0 && on_segment(a, b, d))
}

// Assumes `p` is collinear with `ab`.
fn on_segment(a: Vector2D, b: Vector2D, p: Vector2D) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Squared distance between the segments `ab` and `cd`.
pub fn dist_sq_segment_segment(a: Vector2D, b: Vector2D, c: Vector2D, d: Vector2D) -> f64 {
    if segments_intersect(a, b, c, d) {
        return 0.0;
    }

    dist_sq_point_segment(c, d, a)
        .min(dist_sq_point_segment(c, d, b))
        .min(dist_sq_point_segment(a, b, c))
        .min(dist_sq_point_segment(a, b, d))
}
