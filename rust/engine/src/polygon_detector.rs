// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon room detection over the snapped wall graph
//!
//! The fast path handles components where every node has degree two: a
//! single unbranched loop is walked once from its bottom-left node. The
//! permissive pass builds two half-edges per graph edge, sorts them by
//! angle around each node and traces every face of the planar
//! subdivision; bounded faces come out clockwise and the unbounded one
//! counter-clockwise, which is how the outer boundary is rejected.
//!
//! A walk visits every edge of a loop, or every half-edge of a face, at most
//! once, so the graph size bounds it. Callers may cap it further; a walk
//! exceeding the bound fails with [`Error::TraversalLimit`].

use crate::error::{Error, Result};
use crate::line_ops::{bounding_box, point_to_segment_distance, signed_area, simplify_ring};
use crate::plan::GuideLine;
use crate::snap::SnapGraph;
use crate::types::{Point2D, WallId, WallSegment};

/// How a polygon was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonSource {
    SimpleLoop,
    Face,
}

/// Closed polygon in plan space, counter-clockwise
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonCandidate {
    pub points: Vec<Point2D>,
    /// Walls bounding the polygon
    pub walls: Vec<WallId>,
    pub area: f64,
    pub source: PolygonSource,
}

impl PolygonCandidate {
    /// `(min_x, max_x, min_y, max_y)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        bounding_box(&self.points).unwrap_or((0.0, 0.0, 0.0, 0.0))
    }

    /// Four vertices, each on a side of the bounding box
    pub fn is_rect_like(&self, eps: f64) -> bool {
        if self.points.len() != 4 {
            return false;
        }
        let (x0, x1, y0, y1) = self.bounds();
        self.points.iter().all(|p| {
            ((p.x - x0).abs() <= eps || (p.x - x1).abs() <= eps)
                && ((p.y - y0).abs() <= eps || (p.y - y1).abs() <= eps)
        })
    }
}

/// Output of the polygon passes
#[derive(Debug, Clone, Default)]
pub struct PolygonDetection {
    pub polygons: Vec<PolygonCandidate>,
    /// Walls lying on a detected outline, to be marked as room walls
    pub claimed: Vec<WallId>,
}

/// Detect polygon rooms among `walls`
///
/// `walls` should be the axis-aligned walls not already claimed by the
/// rectangle pass. With `strict` set only the simple-loop fast path runs.
/// `max_steps` caps a single loop or face walk.
pub fn detect_polygons(
    walls: &[&WallSegment],
    guides: &[GuideLine],
    tol: f64,
    strict: bool,
    min_face_area: f64,
    max_steps: Option<usize>,
) -> Result<PolygonDetection> {
    let graph = SnapGraph::build(walls.iter().copied(), guides, tol);
    let mut detection = PolygonDetection::default();

    for poly in simple_loops(&graph, max_steps)? {
        for &w in &poly.walls {
            if !detection.claimed.contains(&w) {
                detection.claimed.push(w);
            }
        }
        detection.polygons.push(poly);
    }

    if !strict {
        let remaining: Vec<&WallSegment> = walls
            .iter()
            .copied()
            .filter(|w| !detection.claimed.contains(&w.id))
            .collect();
        let graph = SnapGraph::build(remaining.iter().copied(), guides, tol);
        let faces = trace_faces(&graph, min_face_area, max_steps)?;
        tracing::debug!(faces = faces.len(), "Permissive face pass finished");
        for face in &faces {
            for w in walls_on_outline(&remaining, &face.points, tol) {
                if !detection.claimed.contains(&w) {
                    detection.claimed.push(w);
                }
            }
        }
        detection.polygons.extend(faces);
    }

    tracing::debug!(
        polygons = detection.polygons.len(),
        claimed = detection.claimed.len(),
        "Polygon detection finished"
    );
    Ok(detection)
}

/// Walls lying entirely on one side of a closed outline
///
/// Walls that cross the outline's interior or run past a vertex are left
/// out, so partitions and overhangs stay available as strips.
pub fn walls_on_outline(walls: &[&WallSegment], outline: &[Point2D], tol: f64) -> Vec<WallId> {
    let n = outline.len();
    if n < 2 {
        return Vec::new();
    }
    walls
        .iter()
        .filter(|w| {
            (0..n).any(|i| {
                let (p, q) = (&outline[i], &outline[(i + 1) % n]);
                point_to_segment_distance(&w.start, p, q) <= tol
                    && point_to_segment_distance(&w.end, p, q) <= tol
            })
        })
        .map(|w| w.id)
        .collect()
}

/// Effective bound on a walk of at most `natural` steps
fn step_limit(natural: usize, max_steps: Option<usize>) -> usize {
    max_steps.map_or(natural, |cap| cap.min(natural))
}

/// One polygon per component whose nodes all have degree two
pub fn simple_loops(graph: &SnapGraph, max_steps: Option<usize>) -> Result<Vec<PolygonCandidate>> {
    let tol = graph.tolerance();
    let mut polygons = Vec::new();

    for comp in graph.components() {
        if comp.edges.len() < 4 || comp.nodes.iter().any(|&n| graph.degree(n) != 2) {
            continue;
        }

        // Bottom-left node
        let mut start = comp.nodes[0];
        for &n in &comp.nodes[1..] {
            let (p, s) = (graph.nodes[n].pos, graph.nodes[start].pos);
            if p.y < s.y - 1e-9 || ((p.y - s.y).abs() <= 1e-9 && p.x < s.x - 1e-9) {
                start = n;
            }
        }
        let origin = graph.nodes[start].pos;
        let angle_to = |n: usize| {
            let p = graph.nodes[n].pos;
            (p.y - origin.y).atan2(p.x - origin.x)
        };

        let neighbours: Vec<usize> = graph.nodes[start]
            .edges
            .iter()
            .map(|&e| graph.edges[e].other(start))
            .collect();
        let Some(&first) = neighbours
            .iter()
            .min_by(|&&a, &&b| angle_to(a).total_cmp(&angle_to(b)))
        else {
            continue;
        };

        let limit = step_limit(comp.edges.len(), max_steps);
        let mut ring = vec![origin];
        let (mut prev, mut cur) = (start, first);
        while cur != start {
            if ring.len() >= limit {
                return Err(Error::TraversalLimit { steps: ring.len() });
            }
            ring.push(graph.nodes[cur].pos);
            let next = graph.nodes[cur]
                .edges
                .iter()
                .map(|&e| graph.edges[e].other(cur))
                .find(|&n| n != prev);
            match next {
                Some(n) => {
                    prev = cur;
                    cur = n;
                }
                None => break,
            }
        }
        if cur != start {
            continue;
        }

        let mut walls = Vec::new();
        for &e in &comp.edges {
            for &w in &graph.edges[e].walls {
                if !walls.contains(&w) {
                    walls.push(w);
                }
            }
        }
        if let Some(poly) = finish_ring(&ring, walls, tol, PolygonSource::SimpleLoop) {
            polygons.push(poly);
        }
    }
    Ok(polygons)
}

struct HalfEdge {
    tail: usize,
    head: usize,
    angle: f64,
    edge: usize,
}

/// Trace every bounded face of the planar subdivision
pub fn trace_faces(
    graph: &SnapGraph,
    min_face_area: f64,
    max_steps: Option<usize>,
) -> Result<Vec<PolygonCandidate>> {
    let tol = graph.tolerance();
    let mut half_edges: Vec<HalfEdge> = Vec::with_capacity(graph.edges.len() * 2);
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];

    for (e, edge) in graph.edges.iter().enumerate() {
        for (tail, head) in [(edge.a, edge.b), (edge.b, edge.a)] {
            let (t, h) = (graph.nodes[tail].pos, graph.nodes[head].pos);
            outgoing[tail].push(half_edges.len());
            half_edges.push(HalfEdge {
                tail,
                head,
                angle: (h.y - t.y).atan2(h.x - t.x),
                edge: e,
            });
        }
    }
    for out in outgoing.iter_mut() {
        out.sort_by(|&a, &b| {
            half_edges[a]
                .angle
                .total_cmp(&half_edges[b].angle)
                .then(a.cmp(&b))
        });
    }

    // Next half-edge around the face: at the head node, the first outgoing
    // half-edge counter-clockwise from the reversed incoming direction.
    let next_ccw = |he: usize| -> usize {
        let h = &half_edges[he];
        let twin = he ^ 1;
        let reference = half_edges[twin].angle;
        let out = &outgoing[h.head];
        out.iter()
            .copied()
            .find(|&o| half_edges[o].angle - reference > 1e-9)
            .unwrap_or(out[0])
    };

    let limit = step_limit(half_edges.len(), max_steps);
    let mut visited = vec![false; half_edges.len()];
    let mut faces = Vec::new();
    for start in 0..half_edges.len() {
        if visited[start] {
            continue;
        }
        let mut cycle = Vec::new();
        let mut cur = start;
        loop {
            if cycle.len() >= limit {
                return Err(Error::TraversalLimit { steps: cycle.len() });
            }
            visited[cur] = true;
            cycle.push(cur);
            cur = next_ccw(cur);
            if cur == start {
                break;
            }
        }
        if cycle.len() < 3 {
            continue;
        }

        let ring: Vec<Point2D> = cycle
            .iter()
            .map(|&he| graph.nodes[half_edges[he].tail].pos)
            .collect();
        // Unbounded face
        if signed_area(&ring) >= 0.0 {
            continue;
        }
        let mut walls = Vec::new();
        for &he in &cycle {
            for &w in &graph.edges[half_edges[he].edge].walls {
                if !walls.contains(&w) {
                    walls.push(w);
                }
            }
        }
        if let Some(poly) = finish_ring(&ring, walls, tol, PolygonSource::Face) {
            if poly.area >= min_face_area {
                faces.push(poly);
            }
        }
    }
    Ok(faces)
}

/// Simplify, filter slivers and orient counter-clockwise
fn finish_ring(
    ring: &[Point2D],
    walls: Vec<WallId>,
    tol: f64,
    source: PolygonSource,
) -> Option<PolygonCandidate> {
    let mut points = simplify_ring(ring, 1e-6);
    if points.len() < 4 {
        return None;
    }
    let area = signed_area(&points);
    if area.abs() <= tol * tol {
        return None;
    }
    if area < 0.0 {
        points.reverse();
    }
    Some(PolygonCandidate {
        points,
        walls,
        area: area.abs(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WallRole;
    use approx::assert_relative_eq;

    fn wall(id: WallId, x0: f64, y0: f64, x1: f64, y1: f64) -> WallSegment {
        WallSegment {
            id,
            start: Point2D::new(x0, y0),
            end: Point2D::new(x1, y1),
            thickness: 0.3,
            level: 0,
            group_id: None,
            manual: true,
            declared_role: WallRole::Unassigned,
        }
    }

    fn l_shape() -> Vec<WallSegment> {
        vec![
            wall(0, 0.0, 0.0, 4.0, 0.0),
            wall(1, 4.0, 0.0, 4.0, 2.0),
            wall(2, 4.0, 2.0, 2.0, 2.0),
            wall(3, 2.0, 2.0, 2.0, 4.0),
            wall(4, 2.0, 4.0, 0.0, 4.0),
            wall(5, 0.0, 4.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_simple_loop_l_shape() {
        let walls = l_shape();
        let refs: Vec<&WallSegment> = walls.iter().collect();
        let detection = detect_polygons(&refs, &[], 0.03, true, 0.25, None).unwrap();

        assert_eq!(detection.polygons.len(), 1);
        let poly = &detection.polygons[0];
        assert_eq!(poly.source, PolygonSource::SimpleLoop);
        assert_eq!(poly.points.len(), 6);
        assert_relative_eq!(poly.area, 12.0, epsilon = 0.03 * 0.03);
        assert!(signed_area(&poly.points) > 0.0);
        assert_eq!(poly.points[0], Point2D::new(0.0, 0.0));
        assert_eq!(detection.claimed.len(), 6);
        assert!(!poly.is_rect_like(1e-6));
    }

    #[test]
    fn test_branching_component_needs_permissive_pass() {
        // Two rooms sharing a wall: nodes of degree three
        let walls = vec![
            wall(0, 0.0, 0.0, 6.0, 0.0),
            wall(1, 6.0, 0.0, 6.0, 3.0),
            wall(2, 6.0, 3.0, 0.0, 3.0),
            wall(3, 0.0, 3.0, 0.0, 0.0),
            wall(4, 3.0, 0.0, 3.0, 3.0),
        ];
        let refs: Vec<&WallSegment> = walls.iter().collect();

        let strict = detect_polygons(&refs, &[], 0.03, true, 0.25, None).unwrap();
        assert!(strict.polygons.is_empty());

        let permissive = detect_polygons(&refs, &[], 0.03, false, 0.25, None).unwrap();
        assert_eq!(permissive.polygons.len(), 2);
        for poly in &permissive.polygons {
            assert_eq!(poly.source, PolygonSource::Face);
            assert!(poly.is_rect_like(1e-6));
            assert_relative_eq!(poly.area, 9.0, epsilon = 1e-9);
            assert!(poly.walls.contains(&4));
        }
        // The long top and bottom walls span both rooms and stay unclaimed
        let mut claimed = permissive.claimed.clone();
        claimed.sort_unstable();
        assert_eq!(claimed, vec![1, 3, 4]);
    }

    #[test]
    fn test_dangling_wall_does_not_split_face() {
        let mut walls = vec![
            wall(0, 0.0, 0.0, 4.0, 0.0),
            wall(1, 4.0, 0.0, 4.0, 3.0),
            wall(2, 4.0, 3.0, 0.0, 3.0),
            wall(3, 0.0, 3.0, 0.0, 0.0),
        ];
        // stub from the bottom wall into the room
        walls.push(wall(4, 2.0, 0.0, 2.0, 1.0));
        let refs: Vec<&WallSegment> = walls.iter().collect();

        let detection = detect_polygons(&refs, &[], 0.03, false, 0.25, None).unwrap();
        assert_eq!(detection.polygons.len(), 1);
        let poly = &detection.polygons[0];
        assert_eq!(poly.points.len(), 4);
        assert_relative_eq!(poly.area, 12.0, epsilon = 1e-9);
        // the stub is not part of the outline
        let mut claimed = detection.claimed.clone();
        claimed.sort_unstable();
        assert_eq!(claimed, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_tiny_faces_are_dropped() {
        let walls = vec![
            wall(0, 0.0, 0.0, 0.3, 0.0),
            wall(1, 0.3, 0.0, 0.3, 0.3),
            wall(2, 0.3, 0.3, 0.0, 0.3),
            wall(3, 0.0, 0.3, 0.0, 0.0),
            // a lone segment only forms a two-step face
            wall(4, 5.0, 5.0, 6.0, 5.0),
        ];
        let refs: Vec<&WallSegment> = walls.iter().collect();
        let graph = SnapGraph::build(refs.iter().copied(), &[], 0.03);
        let faces = trace_faces(&graph, 0.25, None).unwrap();
        assert!(faces.is_empty());
        let faces = trace_faces(&graph, 0.01, None).unwrap();
        assert_eq!(faces.len(), 1);
    }

    #[test]
    fn test_long_outer_face_closes() {
        // 6000 collinear pieces: the outer face walks 12000 half-edges
        let walls: Vec<WallSegment> = (0..6000)
            .map(|i| wall(i, i as f64 * 0.1, 0.0, (i + 1) as f64 * 0.1, 0.0))
            .collect();
        let refs: Vec<&WallSegment> = walls.iter().collect();
        let graph = SnapGraph::build(refs.iter().copied(), &[], 0.03);
        let faces = trace_faces(&graph, 0.25, None).unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn test_step_cap_fails_the_walk() {
        let walls = l_shape();
        let refs: Vec<&WallSegment> = walls.iter().collect();
        let graph = SnapGraph::build(refs.iter().copied(), &[], 0.03);

        assert!(matches!(
            simple_loops(&graph, Some(3)),
            Err(Error::TraversalLimit { steps: 3 })
        ));
        assert!(matches!(
            trace_faces(&graph, 0.25, Some(5)),
            Err(Error::TraversalLimit { steps: 5 })
        ));
        // a cap at the loop size is enough
        assert_eq!(simple_loops(&graph, Some(6)).unwrap().len(), 1);
    }
}
