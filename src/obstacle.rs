//! # Obstacle Model
//!
//! Static polygonal obstacles stored as an arena of edges. Each polygon is a
//! circular doubly linked list whose `next`/`previous` links are edge ids into
//! the same arena, so traversal is O(1) without owning cycles.
//!
//! Polygons are first *staged* with [`ObstacleSet::add_obstacle`] and only
//! become edges once [`ObstacleSet::process_obstacles`] runs. Vertices must be
//! listed counter-clockwise; the convexity flags depend on it.

use log::debug;

use crate::geometry::left_of;
use crate::structs::Vector2D;

/// One edge of an obstacle polygon, running from `point` to the point of the
/// `next` edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleEdge {
    /// Globally unique id, equal to this edge's index in the arena
    pub id: usize,
    pub point: Vector2D,
    /// Unit direction towards the next vertex (zero for a zero-length edge)
    pub unit_dir: Vector2D,
    /// Interior angle at `point` is at most 180 degrees
    pub is_convex: bool,
    pub next: usize,
    pub previous: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    edges: Vec<ObstacleEdge>,
    staged: Vec<Vec<Vector2D>>,
    staged_vertices: usize,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages one polygon.
    ///
    /// Returns the id reserved for the polygon's first edge, or `None` when
    /// fewer than two vertices are given.
    pub fn add_obstacle(&mut self, vertices: &[Vector2D]) -> Option<usize> {
        if vertices.len() < 2 {
            return None;
        }

        let first_id = self.edges.len() + self.staged_vertices;
        self.staged_vertices += vertices.len();
        self.staged.push(vertices.to_vec());
        Some(first_id)
    }

    /// Finalizes every staged polygon into linked edges, assigning ids in the
    /// order the polygons were staged. Returns the number of edges created.
    pub fn process_obstacles(&mut self) -> usize {
        let staged = std::mem::take(&mut self.staged);
        self.staged_vertices = 0;

        let before = self.edges.len();
        for vertices in &staged {
            self.push_polygon(vertices);
        }

        let created = self.edges.len() - before;
        debug!(
            "processed {} obstacle polygons into {} edges ({} total)",
            staged.len(),
            created,
            self.edges.len()
        );
        created
    }

    fn push_polygon(&mut self, vertices: &[Vector2D]) {
        let base = self.edges.len();
        let n = vertices.len();

        for i in 0..n {
            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;

            let is_convex = if n == 2 {
                true
            } else {
                left_of(vertices[prev], vertices[i], vertices[next]) >= 0.0
            };

            self.edges.push(ObstacleEdge {
                id: base + i,
                point: vertices[i],
                unit_dir: (vertices[next] - vertices[i]).normalize(),
                is_convex,
                next: base + next,
                previous: base + prev,
            });
        }
    }

    pub fn edges(&self) -> &[ObstacleEdge] {
        &self.edges
    }

    pub fn edge(&self, id: usize) -> Option<&ObstacleEdge> {
        self.edges.get(id)
    }

    /// The edge following `edge` in its polygon.
    pub fn next_of(&self, edge: &ObstacleEdge) -> &ObstacleEdge {
        &self.edges[edge.next]
    }

    /// The edge preceding `edge` in its polygon.
    pub fn previous_of(&self, edge: &ObstacleEdge) -> &ObstacleEdge {
        &self.edges[edge.previous]
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Polygons added since the last [`process_obstacles`](Self::process_obstacles).
    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }
}
