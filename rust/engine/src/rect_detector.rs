// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned rectangle detection
//!
//! Two passes run over the same walls:
//!
//! 1. Loop stitching: connected components whose edges run along exactly
//!    two vertical and two horizontal lines are closed rectangles, however
//!    many collinear pieces each side was drawn with. Their walls are
//!    claimed as room walls.
//! 2. Track scan: walls are grouped into horizontal and vertical tracks,
//!    spans merged per track, and every pair of horizontal tracks is tested
//!    against every pair of vertical tracks for four fully covered sides.
//!
//! Candidates from both passes are returned in discovery order; duplicates
//! and unions of smaller rooms are removed by [`crate::dedup`].

use crate::line_ops::{merge_intervals, single_span_covers, spans_cover};
use crate::snap::{grid_index, GridKey, SnapGraph};
use crate::types::{Point2D, WallId, WallSegment};
use std::collections::BTreeMap;

/// How a rectangle was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectSource {
    LoopStitch,
    TrackScan,
}

/// Rectangle candidate in plan space
#[derive(Debug, Clone, PartialEq)]
pub struct RectCandidate {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub source: RectSource,
}

impl RectCandidate {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn depth(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Same box within `tol` on every side
    pub fn same_box(&self, min_x: f64, max_x: f64, min_y: f64, max_y: f64, tol: f64) -> bool {
        (self.min_x - min_x).abs() < tol
            && (self.max_x - max_x).abs() < tol
            && (self.min_y - min_y).abs() < tol
            && (self.max_y - max_y).abs() < tol
    }
}

/// Walls sharing one grid line
#[derive(Debug, Clone, Default)]
pub struct Track {
    /// Mean constant coordinate of the walls on this line
    pub coord: f64,
    /// Merged spans along the line
    pub spans: Vec<(f64, f64)>,
}

/// Horizontal and vertical tracks keyed by grid index
#[derive(Debug, Clone, Default)]
pub struct Tracks {
    /// y grid index -> x spans
    pub horizontal: BTreeMap<i64, Track>,
    /// x grid index -> y spans
    pub vertical: BTreeMap<i64, Track>,
    pub tolerance: f64,
}

impl Tracks {
    pub fn build(walls: &[&WallSegment], tol: f64) -> Self {
        let mut horizontal: BTreeMap<i64, (f64, Vec<(f64, f64)>)> = BTreeMap::new();
        let mut vertical: BTreeMap<i64, (f64, Vec<(f64, f64)>)> = BTreeMap::new();
        for w in walls {
            if w.is_horizontal(tol) {
                let y = (w.start.y + w.end.y) / 2.0;
                let entry = horizontal.entry(grid_index(y, tol)).or_default();
                entry.0 += y;
                entry.1.push((w.start.x.min(w.end.x), w.start.x.max(w.end.x)));
            } else if w.is_vertical(tol) {
                let x = (w.start.x + w.end.x) / 2.0;
                let entry = vertical.entry(grid_index(x, tol)).or_default();
                entry.0 += x;
                entry.1.push((w.start.y.min(w.end.y), w.start.y.max(w.end.y)));
            }
        }
        let finish = |(sum, spans): (f64, Vec<(f64, f64)>)| Track {
            coord: sum / spans.len() as f64,
            spans: merge_intervals(&spans, tol),
        };
        Self {
            horizontal: horizontal.into_iter().map(|(k, v)| (k, finish(v))).collect(),
            vertical: vertical.into_iter().map(|(k, v)| (k, finish(v))).collect(),
            tolerance: tol,
        }
    }

    /// Horizontal track `key` covers `[x0, x1]` with a single merged span
    pub fn h_covers(&self, key: i64, x0: f64, x1: f64) -> bool {
        self.horizontal
            .get(&key)
            .is_some_and(|t| single_span_covers(&t.spans, x0, x1, self.tolerance))
    }

    pub fn v_covers(&self, key: i64, y0: f64, y1: f64) -> bool {
        self.vertical
            .get(&key)
            .is_some_and(|t| single_span_covers(&t.spans, y0, y1, self.tolerance))
    }
}

/// Output of both rectangle passes
#[derive(Debug, Clone, Default)]
pub struct RectDetection {
    pub rects: Vec<RectCandidate>,
    /// Walls of stitched loops, to be marked as room walls
    pub claimed: Vec<WallId>,
    pub tracks: Tracks,
}

/// Run loop stitching and the track scan over `walls`
///
/// Callers pass only walls eligible for detection (not grouped, not
/// declared non-room).
pub fn detect_rectangles(walls: &[&WallSegment], tol: f64) -> RectDetection {
    let (mut rects, claimed) = stitch_loops(walls, tol);
    let tracks = Tracks::build(walls, tol);
    rects.extend(scan_tracks(&tracks));

    tracing::debug!(
        stitched = claimed.len(),
        candidates = rects.len(),
        "Rectangle detection finished"
    );

    RectDetection {
        rects,
        claimed,
        tracks,
    }
}

/// Components forming a closed rectangle on two x and two y lines
pub fn stitch_loops(walls: &[&WallSegment], tol: f64) -> (Vec<RectCandidate>, Vec<WallId>) {
    let graph = SnapGraph::build(walls.iter().copied(), &[], tol);
    let mut rects = Vec::new();
    let mut claimed = Vec::new();

    for comp in graph.components() {
        if comp.edges.len() < 4 {
            continue;
        }
        // Side coordinates come from the edges running along them, so a
        // side drawn in several pieces does not add extra x or y values.
        let mut xs: Vec<i64> = Vec::new();
        let mut ys: Vec<i64> = Vec::new();
        for &e in &comp.edges {
            let edge = &graph.edges[e];
            let (a, b) = (&graph.nodes[edge.a], &graph.nodes[edge.b]);
            if a.key.1 == b.key.1 {
                ys.push(a.key.1);
            } else {
                xs.push(a.key.0);
            }
        }
        xs.sort_unstable();
        xs.dedup();
        ys.sort_unstable();
        ys.dedup();
        if xs.len() != 2 || ys.len() != 2 {
            continue;
        }
        let on_boundary = comp.nodes.iter().all(|&n| {
            let key = graph.nodes[n].key;
            xs.contains(&key.0) || ys.contains(&key.1)
        });
        if !on_boundary {
            continue;
        }

        let corner = |kx: i64, ky: i64| {
            graph
                .node_at(GridKey(kx, ky))
                .map(|n| graph.nodes[n].pos)
                .unwrap_or_else(|| GridKey(kx, ky).to_point(tol))
        };
        let low = corner(xs[0], ys[0]);
        let high = corner(xs[1], ys[1]);
        let (x_left, x_right, y_top, y_bot) = (low.x, high.x, low.y, high.y);

        let mut top = Vec::new();
        let mut bottom = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &e in &comp.edges {
            let edge = &graph.edges[e];
            let (a, b) = (&graph.nodes[edge.a], &graph.nodes[edge.b]);
            if a.key.1 == b.key.1 {
                let span = (a.pos.x.min(b.pos.x), a.pos.x.max(b.pos.x));
                if a.key.1 == ys[0] {
                    top.push(span);
                } else {
                    bottom.push(span);
                }
            } else {
                let span = (a.pos.y.min(b.pos.y), a.pos.y.max(b.pos.y));
                if a.key.0 == xs[0] {
                    left.push(span);
                } else {
                    right.push(span);
                }
            }
        }

        let closed = spans_cover(&top, x_left, x_right, tol)
            && spans_cover(&bottom, x_left, x_right, tol)
            && spans_cover(&left, y_top, y_bot, tol)
            && spans_cover(&right, y_top, y_bot, tol);
        if !closed {
            continue;
        }

        rects.push(RectCandidate {
            min_x: x_left,
            max_x: x_right,
            min_y: y_top,
            max_y: y_bot,
            source: RectSource::LoopStitch,
        });
        // Walls running past a corner stay unclaimed so their overhang is
        // still extruded as a strip.
        let inside = |p: &Point2D| {
            p.x >= x_left - tol && p.x <= x_right + tol && p.y >= y_top - tol && p.y <= y_bot + tol
        };
        let mut overhang: Vec<WallId> = Vec::new();
        for &e in &comp.edges {
            let edge = &graph.edges[e];
            if !inside(&graph.nodes[edge.a].pos) || !inside(&graph.nodes[edge.b].pos) {
                overhang.extend(edge.walls.iter().copied());
            }
        }
        for &e in &comp.edges {
            for &w in &graph.edges[e].walls {
                if !overhang.contains(&w) && !claimed.contains(&w) {
                    claimed.push(w);
                }
            }
        }
    }

    (rects, claimed)
}

/// Pair every two horizontal tracks with every two vertical tracks
pub fn scan_tracks(tracks: &Tracks) -> Vec<RectCandidate> {
    let ys: Vec<(i64, f64)> = tracks.horizontal.iter().map(|(&k, t)| (k, t.coord)).collect();
    let xs: Vec<(i64, f64)> = tracks.vertical.iter().map(|(&k, t)| (k, t.coord)).collect();
    let mut rects = Vec::new();

    for (i, &(yi, y_top)) in ys.iter().enumerate() {
        for &(yj, y_bot) in &ys[i + 1..] {
            for (k, &(xi, x_left)) in xs.iter().enumerate() {
                for &(xj, x_right) in &xs[k + 1..] {
                    if tracks.h_covers(yi, x_left, x_right)
                        && tracks.h_covers(yj, x_left, x_right)
                        && tracks.v_covers(xi, y_top, y_bot)
                        && tracks.v_covers(xj, y_top, y_bot)
                    {
                        rects.push(RectCandidate {
                            min_x: x_left,
                            max_x: x_right,
                            min_y: y_top,
                            max_y: y_bot,
                            source: RectSource::TrackScan,
                        });
                    }
                }
            }
        }
    }
    rects
}
