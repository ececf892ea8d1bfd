// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerance-snapped planar graph over axis-aligned walls
//!
//! Endpoints are quantized onto a grid whose step is the snapping
//! tolerance. Every wall is then split at each node lying on its constant
//! axis inside its span, so a wall touching the middle of another one
//! (a T-junction) or crossing a guide line shares a node with it.

use crate::plan::GuideLine;
use crate::types::{Point2D, WallId, WallSegment};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Quantized grid cell of a snapped point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridKey(pub i64, pub i64);

impl GridKey {
    pub fn from_point(p: &Point2D, tol: f64) -> Self {
        GridKey(grid_index(p.x, tol), grid_index(p.y, tol))
    }

    pub fn to_point(self, tol: f64) -> Point2D {
        Point2D::new(self.0 as f64 * tol, self.1 as f64 * tol)
    }
}

/// Grid index of a coordinate
pub fn grid_index(v: f64, tol: f64) -> i64 {
    (v / tol).round() as i64
}

/// Coordinate snapped to the grid
pub fn snap_coord(v: f64, tol: f64) -> f64 {
    grid_index(v, tol) as f64 * tol
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Constant y
    Horizontal,
    /// Constant x
    Vertical,
}

/// An axis-aligned wall reduced to grid indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnappedWall {
    pub wall: WallId,
    pub axis: Axis,
    /// Grid index of the constant coordinate
    pub line: i64,
    /// Grid span along the varying coordinate, `lo < hi`
    pub lo: i64,
    pub hi: i64,
}

impl SnappedWall {
    /// Snap an axis-aligned wall; `None` for diagonal or grid-degenerate walls
    pub fn from_wall(wall: &WallSegment, tol: f64) -> Option<Self> {
        let (axis, line, a, b) = if wall.is_horizontal(tol) {
            (
                Axis::Horizontal,
                grid_index((wall.start.y + wall.end.y) / 2.0, tol),
                grid_index(wall.start.x, tol),
                grid_index(wall.end.x, tol),
            )
        } else if wall.is_vertical(tol) {
            (
                Axis::Vertical,
                grid_index((wall.start.x + wall.end.x) / 2.0, tol),
                grid_index(wall.start.y, tol),
                grid_index(wall.end.y, tol),
            )
        } else {
            return None;
        };
        if a == b {
            return None;
        }
        Some(Self {
            wall: wall.id,
            axis,
            line,
            lo: a.min(b),
            hi: a.max(b),
        })
    }

    pub fn key_at(&self, along: i64) -> GridKey {
        match self.axis {
            Axis::Horizontal => GridKey(along, self.line),
            Axis::Vertical => GridKey(self.line, along),
        }
    }
}

/// Running mean of raw coordinates per grid line
#[derive(Debug, Clone, Default)]
struct MeanMap(FxHashMap<i64, (f64, usize)>);

impl MeanMap {
    fn add(&mut self, key: i64, value: f64) {
        let entry = self.0.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    fn get(&self, key: i64) -> Option<f64> {
        self.0.get(&key).map(|&(sum, n)| sum / n as f64)
    }
}

/// Node coordinates come from the walls running along a grid line when
/// there are any, otherwise from the endpoints landing on it, so a wall
/// drawn at 4.0 stays at 4.0 instead of the 3.99 grid value.
#[derive(Debug, Clone, Default)]
struct LineMeans {
    rows: MeanMap,
    cols: MeanMap,
    row_ends: MeanMap,
    col_ends: MeanMap,
}

impl LineMeans {
    fn x(&self, col: i64) -> Option<f64> {
        self.cols.get(col).or_else(|| self.col_ends.get(col))
    }

    fn y(&self, row: i64) -> Option<f64> {
        self.rows.get(row).or_else(|| self.row_ends.get(row))
    }
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub key: GridKey,
    pub pos: Point2D,
    /// Incident edge indices
    pub edges: SmallVec<[usize; 4]>,
}

#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub a: usize,
    pub b: usize,
    /// Walls this sub-segment came from (overlapping walls share an edge)
    pub walls: SmallVec<[WallId; 2]>,
}

impl GraphEdge {
    pub fn other(&self, node: usize) -> usize {
        if node == self.a {
            self.b
        } else {
            self.a
        }
    }
}

/// Connected set of edges
#[derive(Debug, Clone, Default)]
pub struct Component {
    pub edges: Vec<usize>,
    pub nodes: Vec<usize>,
}

/// Node table plus split edge list with back-references to walls
#[derive(Debug, Clone, Default)]
pub struct SnapGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    index: FxHashMap<GridKey, usize>,
    /// Ordered node chain of every split wall
    wall_nodes: FxHashMap<WallId, Vec<usize>>,
    tolerance: f64,
}

impl SnapGraph {
    /// Build the graph for the axis-aligned subset of `walls`
    pub fn build<'a, I>(walls: I, guides: &[GuideLine], tol: f64) -> Self
    where
        I: IntoIterator<Item = &'a WallSegment>,
    {
        let snapped: Vec<(SnappedWall, &WallSegment)> = walls
            .into_iter()
            .filter_map(|w| SnappedWall::from_wall(w, tol).map(|s| (s, w)))
            .collect();

        let mut graph = SnapGraph {
            tolerance: tol,
            ..Default::default()
        };
        let mut lines = LineMeans::default();

        for (s, w) in &snapped {
            graph.intern(s.key_at(s.lo));
            graph.intern(s.key_at(s.hi));
            match s.axis {
                Axis::Horizontal => {
                    lines.rows.add(s.line, (w.start.y + w.end.y) / 2.0);
                    lines.col_ends.add(s.lo, w.start.x.min(w.end.x));
                    lines.col_ends.add(s.hi, w.start.x.max(w.end.x));
                }
                Axis::Vertical => {
                    lines.cols.add(s.line, (w.start.x + w.end.x) / 2.0);
                    lines.row_ends.add(s.lo, w.start.y.min(w.end.y));
                    lines.row_ends.add(s.hi, w.start.y.max(w.end.y));
                }
            }
        }
        for g in guides {
            for (s, _) in &snapped {
                let hit = match (g, s.axis) {
                    (GuideLine::Horizontal { y }, Axis::Vertical) => {
                        Some((grid_index(*y, tol), *y))
                    }
                    (GuideLine::Vertical { x }, Axis::Horizontal) => {
                        Some((grid_index(*x, tol), *x))
                    }
                    _ => None,
                };
                if let Some((along, coord)) = hit {
                    if along > s.lo && along < s.hi {
                        graph.intern(s.key_at(along));
                        match s.axis {
                            Axis::Horizontal => lines.col_ends.add(along, coord),
                            Axis::Vertical => lines.row_ends.add(along, coord),
                        }
                    }
                }
            }
        }
        for node in graph.nodes.iter_mut() {
            node.pos = Point2D::new(
                lines.x(node.key.0).unwrap_or(node.pos.x),
                lines.y(node.key.1).unwrap_or(node.pos.y),
            );
        }

        // Nodes by row (constant y) and column (constant x)
        let mut rows: FxHashMap<i64, Vec<i64>> = FxHashMap::default();
        let mut cols: FxHashMap<i64, Vec<i64>> = FxHashMap::default();
        for node in &graph.nodes {
            rows.entry(node.key.1).or_default().push(node.key.0);
            cols.entry(node.key.0).or_default().push(node.key.1);
        }

        let mut edge_index: FxHashMap<(usize, usize), usize> = FxHashMap::default();
        for (s, _) in &snapped {
            let line_nodes = match s.axis {
                Axis::Horizontal => rows.get(&s.line),
                Axis::Vertical => cols.get(&s.line),
            };
            let mut stops: Vec<i64> = line_nodes
                .map(|v| v.iter().copied().filter(|&c| c >= s.lo && c <= s.hi).collect())
                .unwrap_or_default();
            stops.sort_unstable();
            stops.dedup();

            let chain: Vec<usize> = stops
                .iter()
                .filter_map(|&c| graph.index.get(&s.key_at(c)).copied())
                .collect();
            for pair in chain.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let key = (a.min(b), a.max(b));
                match edge_index.get(&key) {
                    Some(&e) => {
                        if !graph.edges[e].walls.contains(&s.wall) {
                            graph.edges[e].walls.push(s.wall);
                        }
                    }
                    None => {
                        let e = graph.edges.len();
                        let mut walls = SmallVec::new();
                        walls.push(s.wall);
                        graph.edges.push(GraphEdge { a, b, walls });
                        graph.nodes[a].edges.push(e);
                        graph.nodes[b].edges.push(e);
                        edge_index.insert(key, e);
                    }
                }
            }
            graph.wall_nodes.insert(s.wall, chain);
        }

        graph
    }

    fn intern(&mut self, key: GridKey) -> usize {
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(GraphNode {
            key,
            pos: key.to_point(self.tolerance),
            edges: SmallVec::new(),
        });
        self.index.insert(key, i);
        i
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn node_at(&self, key: GridKey) -> Option<usize> {
        self.index.get(&key).copied()
    }

    pub fn degree(&self, node: usize) -> usize {
        self.nodes[node].edges.len()
    }

    /// Ordered node chain a wall was split into; empty for walls not in the graph
    pub fn wall_chain(&self, wall: WallId) -> &[usize] {
        self.wall_nodes.get(&wall).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Connected components over edge adjacency, in edge order
    pub fn components(&self) -> Vec<Component> {
        let mut visited = vec![false; self.edges.len()];
        let mut components = Vec::new();
        for start in 0..self.edges.len() {
            if visited[start] {
                continue;
            }
            let mut comp = Component::default();
            let mut seen_nodes = vec![false; self.nodes.len()];
            let mut stack = vec![start];
            while let Some(e) = stack.pop() {
                if visited[e] {
                    continue;
                }
                visited[e] = true;
                comp.edges.push(e);
                for n in [self.edges[e].a, self.edges[e].b] {
                    if !seen_nodes[n] {
                        seen_nodes[n] = true;
                        comp.nodes.push(n);
                    }
                    stack.extend(self.nodes[n].edges.iter().copied().filter(|&x| !visited[x]));
                }
            }
            components.push(comp);
        }
        components
    }
}
