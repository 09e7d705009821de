//! # Spatial Index
//!
//! Two independent binary space partitions, both stored as flat arenas with
//! children addressed by index:
//!
//! - [`AgentTree`]: rebuilt from a snapshot of agent positions every step.
//!   Nodes split at the median along the axis with the larger spread and
//!   stop at [`MAX_LEAF_SIZE`] agents, which are scanned directly.
//! - [`ObstacleTree`]: built once from the finalized obstacle edges. Every
//!   node splits along the line through one edge; edges straddling that line
//!   are clipped into two sub-segments, one per side. Sub-segments keep the
//!   id of the edge they came from, so obstacle edges themselves are never
//!   copied.
//!
//! Range queries feed a [`NeighborCache`] and re-read its bound after every
//! insertion, so subtrees are pruned against the tightest bound known so far.

use log::{trace, warn};

use crate::geometry::{
    abs, abs_sq, det, dist_sq_point_line, dist_sq_point_segment, dist_sq_segment_segment,
    left_of, segments_intersect, sqr, RVO_EPSILON,
};
use crate::neighbors::NeighborCache;
use crate::obstacle::ObstacleSet;
use crate::structs::Vector2D;

/// Largest number of agents kept in an agent-tree leaf.
pub const MAX_LEAF_SIZE: usize = 10;

#[derive(Debug, Clone)]
struct AgentTreeNode {
    begin: usize,
    end: usize,
    min: Vector2D,
    max: Vector2D,
    children: Option<(usize, usize)>,
}

impl AgentTreeNode {
    /// Squared distance from `p` to this node's bounding box.
    fn dist_sq_to(&self, p: Vector2D) -> f64 {
        sqr((self.min.x - p.x).max(0.0))
            + sqr((p.x - self.max.x).max(0.0))
            + sqr((self.min.y - p.y).max(0.0))
            + sqr((p.y - self.max.y).max(0.0))
    }
}

/// Kd-tree over a snapshot of agent positions.
#[derive(Debug, Clone, Default)]
pub struct AgentTree {
    items: Vec<(usize, Vector2D)>,
    nodes: Vec<AgentTreeNode>,
}

impl AgentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the tree from `(agent id, position)` pairs, discarding the
    /// previous snapshot.
    pub fn build<I>(&mut self, agents: I)
    where
        I: IntoIterator<Item = (usize, Vector2D)>,
    {
        self.items.clear();
        self.items.extend(agents);
        self.nodes.clear();

        if !self.items.is_empty() {
            self.build_recursive(0, self.items.len());
        }
        trace!(
            "agent tree rebuilt: {} agents, {} nodes",
            self.items.len(),
            self.nodes.len()
        );
    }

    fn build_recursive(&mut self, begin: usize, end: usize) -> usize {
        let mut min = self.items[begin].1;
        let mut max = min;
        for &(_, p) in &self.items[begin + 1..end] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }

        let node = self.nodes.len();
        self.nodes.push(AgentTreeNode {
            begin,
            end,
            min,
            max,
            children: None,
        });

        if end - begin > MAX_LEAF_SIZE {
            let split_on_x = max.x - min.x > max.y - min.y;
            let mid = begin + (end - begin) / 2;

            self.items[begin..end].select_nth_unstable_by(mid - begin, |a, b| {
                if split_on_x {
                    a.1.x.total_cmp(&b.1.x)
                } else {
                    a.1.y.total_cmp(&b.1.y)
                }
            });

            let left = self.build_recursive(begin, mid);
            let right = self.build_recursive(mid, end);
            self.nodes[node].children = Some((left, right));
        }

        node
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Offers every agent other than `agent_id` that lies within the cache's
    /// range of `position`.
    pub fn compute_agent_neighbors(
        &self,
        agent_id: usize,
        position: Vector2D,
        cache: &mut NeighborCache,
    ) {
        if !self.nodes.is_empty() {
            self.query_recursive(0, agent_id, position, cache);
        }
    }

    fn query_recursive(
        &self,
        node: usize,
        agent_id: usize,
        position: Vector2D,
        cache: &mut NeighborCache,
    ) {
        let current = &self.nodes[node];
        let Some((left, right)) = current.children else {
            for &(other, p) in &self.items[current.begin..current.end] {
                if other != agent_id {
                    cache.insert(other, abs_sq(p - position));
                }
            }
            return;
        };

        let dist_sq_left = self.nodes[left].dist_sq_to(position);
        let dist_sq_right = self.nodes[right].dist_sq_to(position);

        let (near, near_sq, far, far_sq) = if dist_sq_left < dist_sq_right {
            (left, dist_sq_left, right, dist_sq_right)
        } else {
            (right, dist_sq_right, left, dist_sq_left)
        };

        if near_sq < cache.range_sq() {
            self.query_recursive(near, agent_id, position, cache);
            if far_sq < cache.range_sq() {
                self.query_recursive(far, agent_id, position, cache);
            }
        }
    }
}

/// A piece of an obstacle edge, clipped to the half-planes of its ancestors.
#[derive(Debug, Clone, Copy)]
struct Segment {
    edge: usize,
    start: Vector2D,
    end: Vector2D,
}

#[derive(Debug, Clone)]
struct ObstacleTreeNode {
    segment: Segment,
    left: Option<usize>,
    right: Option<usize>,
}

/// Binary space partition over obstacle edges. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ObstacleTree {
    nodes: Vec<ObstacleTreeNode>,
    root: Option<usize>,
}

impl ObstacleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the tree over every finalized edge of `obstacles`.
    pub fn build(obstacles: &ObstacleSet) -> Self {
        let mut segments = Vec::with_capacity(obstacles.len());
        for edge in obstacles.edges() {
            let next = obstacles.next_of(edge);
            if abs_sq(next.point - edge.point) <= 0.0 {
                warn!("skipping zero-length obstacle edge {}", edge.id);
                continue;
            }
            segments.push(Segment {
                edge: edge.id,
                start: edge.point,
                end: next.point,
            });
        }

        let mut tree = ObstacleTree::new();
        tree.root = tree.build_recursive(segments);
        trace!(
            "obstacle tree built: {} edges, {} nodes",
            obstacles.len(),
            tree.nodes.len()
        );
        tree
    }

    fn build_recursive(&mut self, segments: Vec<Segment>) -> Option<usize> {
        if segments.is_empty() {
            return None;
        }

        let split_index = choose_split(&segments);
        let split = segments[split_index];

        let mut left = Vec::new();
        let mut right = Vec::new();
        for (j, other) in segments.iter().enumerate() {
            if j == split_index {
                continue;
            }

            match classify(&split, other) {
                Side::Left => left.push(*other),
                Side::Right => right.push(*other),
                Side::Both => {
                    let j1_left_of_i = left_of(split.start, split.end, other.start);
                    let t = det(split.end - split.start, other.start - split.start)
                        / det(split.end - split.start, other.start - other.end);
                    let split_point = other.start + (other.end - other.start) * t;

                    let first = Segment {
                        end: split_point,
                        ..*other
                    };
                    let second = Segment {
                        start: split_point,
                        ..*other
                    };
                    if j1_left_of_i > 0.0 {
                        left.push(first);
                        right.push(second);
                    } else {
                        right.push(first);
                        left.push(second);
                    }
                }
            }
        }

        let node = self.nodes.len();
        self.nodes.push(ObstacleTreeNode {
            segment: split,
            left: None,
            right: None,
        });

        let left = self.build_recursive(left);
        let right = self.build_recursive(right);
        self.nodes[node].left = left;
        self.nodes[node].right = right;

        Some(node)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Offers every edge within the cache's range of `position` that faces
    /// `position`, i.e. whose line has `position` on its right.
    pub fn compute_obstacle_neighbors(
        &self,
        obstacles: &ObstacleSet,
        position: Vector2D,
        cache: &mut NeighborCache,
    ) {
        self.query_recursive(self.root, obstacles, position, cache);
    }

    fn query_recursive(
        &self,
        node: Option<usize>,
        obstacles: &ObstacleSet,
        position: Vector2D,
        cache: &mut NeighborCache,
    ) {
        let Some(index) = node else {
            return;
        };
        let current = &self.nodes[index];
        let segment = current.segment;

        let agent_left_of_line = left_of(segment.start, segment.end, position);
        let (near, far) = if agent_left_of_line >= 0.0 {
            (current.left, current.right)
        } else {
            (current.right, current.left)
        };

        self.query_recursive(near, obstacles, position, cache);

        let dist_sq_line = dist_sq_point_line(segment.start, segment.end, position);
        if dist_sq_line < cache.range_sq() && agent_left_of_line < 0.0 {
            if let Some(edge) = obstacles.edge(segment.edge) {
                let next = obstacles.next_of(edge);
                let dist_sq = dist_sq_point_segment(edge.point, next.point, position);
                cache.insert(segment.edge, dist_sq);
            }
        }

        // Far-side sub-segments may reach RVO_EPSILON across the line.
        let length = abs(segment.end - segment.start);
        let far_dist = ((agent_left_of_line.abs() - RVO_EPSILON) / length).max(0.0);
        if sqr(far_dist) < cache.range_sq() {
            self.query_recursive(far, obstacles, position, cache);
        }
    }

    /// Whether the segment `q1 -> q2`, thickened by `radius`, clears every
    /// obstacle edge.
    pub fn query_visibility(&self, q1: Vector2D, q2: Vector2D, radius: f64) -> bool {
        self.visibility_recursive(self.root, q1, q2, radius)
    }

    fn visibility_recursive(
        &self,
        node: Option<usize>,
        q1: Vector2D,
        q2: Vector2D,
        radius: f64,
    ) -> bool {
        let Some(index) = node else {
            return true;
        };
        let current = &self.nodes[index];
        let segment = current.segment;

        let q1_left_of_i = left_of(segment.start, segment.end, q1);
        let q2_left_of_i = left_of(segment.start, segment.end, q2);
        // Sub-segments on one side may reach RVO_EPSILON across the line.
        let clearance = radius * abs(segment.end - segment.start) + RVO_EPSILON;

        if q1_left_of_i > clearance && q2_left_of_i > clearance {
            return self.visibility_recursive(current.left, q1, q2, radius);
        }
        if q1_left_of_i < -clearance && q2_left_of_i < -clearance {
            return self.visibility_recursive(current.right, q1, q2, radius);
        }

        !segment_blocks(segment.start, segment.end, q1, q2, radius)
            && self.visibility_recursive(current.left, q1, q2, radius)
            && self.visibility_recursive(current.right, q1, q2, radius)
    }
}

/// Whether the edge `a -> b` touches the segment `q1 -> q2` thickened by `radius`.
pub fn segment_blocks(a: Vector2D, b: Vector2D, q1: Vector2D, q2: Vector2D, radius: f64) -> bool {
    segments_intersect(a, b, q1, q2) || dist_sq_segment_segment(a, b, q1, q2) < sqr(radius)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Both,
}

fn classify(split: &Segment, other: &Segment) -> Side {
    let j1 = left_of(split.start, split.end, other.start);
    let j2 = left_of(split.start, split.end, other.end);

    if j1 >= -RVO_EPSILON && j2 >= -RVO_EPSILON {
        Side::Left
    } else if j1 <= RVO_EPSILON && j2 <= RVO_EPSILON {
        Side::Right
    } else {
        Side::Both
    }
}

/// Picks the segment whose line gives the most balanced partition, counting
/// a straddling segment on both sides.
fn choose_split(segments: &[Segment]) -> usize {
    let mut optimal = 0;
    let mut best = (usize::MAX, usize::MAX);

    for (i, split) in segments.iter().enumerate() {
        let mut left_size = 0;
        let mut right_size = 0;

        for (j, other) in segments.iter().enumerate() {
            if i == j {
                continue;
            }
            match classify(split, other) {
                Side::Left => left_size += 1,
                Side::Right => right_size += 1,
                Side::Both => {
                    left_size += 1;
                    right_size += 1;
                }
            }

            let score = (left_size.max(right_size), left_size.min(right_size));
            if score >= best {
                break;
            }
        }

        let score = (left_size.max(right_size), left_size.min(right_size));
        if score < best {
            best = score;
            optimal = i;
        }
    }

    optimal
}
