// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Segment, interval and polygon helpers shared by the detection passes

use crate::types::Point2D;
use nalgebra::Vector2;

/// Result of projecting a point onto a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Parameter along the segment, clamped to [0, 1]
    pub t: f64,
    /// Distance from the point to the clamped foot point
    pub distance: f64,
}

/// Project a point onto segment `a -> b`
///
/// A zero-length segment projects everything onto `a`.
pub fn project_onto_segment(point: &Point2D, a: &Point2D, b: &Point2D) -> Projection {
    let ab: Vector2<f64> = b.to_nalgebra() - a.to_nalgebra();
    let ap: Vector2<f64> = point.to_nalgebra() - a.to_nalgebra();
    let len_sq = ab.norm_squared();
    let t = if len_sq > 0.0 {
        (ap.dot(&ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let foot = a.to_nalgebra() + ab * t;
    Projection {
        t,
        distance: (point.to_nalgebra() - foot).norm(),
    }
}

/// Distance from a point to a segment
pub fn point_to_segment_distance(point: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    project_onto_segment(point, a, b).distance
}

/// Round to a fixed number of decimals, nudged to stabilise `.005` boundaries
pub fn quantize_meters(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(6) as i32);
    ((value + 1e-9) * factor).round() / factor
}

/// Merge closed intervals whose gap is at most `gap`
///
/// Input order does not matter; the output is sorted and disjoint.
pub fn merge_intervals(spans: &[(f64, f64)], gap: f64) -> Vec<(f64, f64)> {
    let mut sorted: Vec<(f64, f64)> = spans
        .iter()
        .map(|&(a, b)| if a <= b { (a, b) } else { (b, a) })
        .collect();
    sorted.sort_by(|l, r| l.0.total_cmp(&r.0));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    for (start, end) in sorted {
        match merged.last_mut() {
            Some(last) if start <= last.1 + gap => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Whether a set of spans covers `[from, to]`, bridging gaps up to `gap`
pub fn spans_cover(spans: &[(f64, f64)], from: f64, to: f64, gap: f64) -> bool {
    let merged = merge_intervals(spans, gap);
    if merged.is_empty() {
        return false;
    }
    let mut covered = from;
    for (start, end) in merged {
        if start > covered + gap {
            return false;
        }
        covered = covered.max(end);
        if covered >= to - gap {
            return true;
        }
    }
    covered >= to - gap
}

/// Whether a single span of an already merged track covers `[from, to]`
pub fn single_span_covers(spans: &[(f64, f64)], from: f64, to: f64, tol: f64) -> bool {
    spans
        .iter()
        .any(|&(start, end)| start <= from + tol && end >= to - tol)
}

/// Signed polygon area (shoelace); positive when counter-clockwise
pub fn signed_area(points: &[Point2D]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        acc += points[j].x * points[i].y - points[i].x * points[j].y;
        j = i;
    }
    acc / 2.0
}

/// Drop duplicate and collinear middle vertices until the ring is stable
///
/// Spikes (a vertex whose neighbours coincide) are removed as well, so a
/// face traced along a dangling wall collapses back to its real outline.
pub fn simplify_ring(points: &[Point2D], eps: f64) -> Vec<Point2D> {
    let mut ring: Vec<Point2D> = points.to_vec();
    loop {
        let mut deduped: Vec<Point2D> = Vec::with_capacity(ring.len());
        for p in ring {
            if deduped.last().map_or(true, |last| last.distance_to(&p) > eps) {
                deduped.push(p);
            }
        }
        while deduped.len() > 1 && deduped[0].distance_to(&deduped[deduped.len() - 1]) <= eps {
            deduped.pop();
        }
        ring = deduped;
        if ring.len() < 3 {
            return ring;
        }

        let n = ring.len();
        let mut out: Vec<Point2D> = Vec::with_capacity(n);
        for i in 0..n {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let v1 = cur.to_nalgebra() - prev.to_nalgebra();
            let v2 = next.to_nalgebra() - cur.to_nalgebra();
            let cross = v1.x * v2.y - v1.y * v2.x;
            if cross.abs() <= eps * (v1.norm() + v2.norm()) {
                continue;
            }
            out.push(cur);
        }
        if out.len() == n {
            return out;
        }
        ring = out;
    }
}

/// Axis-aligned bounding box `(min_x, max_x, min_y, max_y)`
pub fn bounding_box(points: &[Point2D]) -> Option<(f64, f64, f64, f64)> {
    let first = points.first()?;
    let mut bb = (first.x, first.x, first.y, first.y);
    for p in &points[1..] {
        bb.0 = bb.0.min(p.x);
        bb.1 = bb.1.max(p.x);
        bb.2 = bb.2.min(p.y);
        bb.3 = bb.3.max(p.y);
    }
    Some(bb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_project_onto_segment() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(4.0, 0.0);

        let p = project_onto_segment(&Point2D::new(1.0, 0.02), &a, &b);
        assert_relative_eq!(p.t, 0.25);
        assert_relative_eq!(p.distance, 0.02, epsilon = 1e-12);

        // Beyond the end clamps to b
        let p = project_onto_segment(&Point2D::new(5.0, 0.0), &a, &b);
        assert_relative_eq!(p.t, 1.0);
        assert_relative_eq!(p.distance, 1.0);
    }

    #[test]
    fn test_quantize_meters() {
        assert_relative_eq!(quantize_meters(1.005, 2), 1.01);
        assert_relative_eq!(quantize_meters(3.999999, 2), 4.0);
        assert_relative_eq!(quantize_meters(2.2049, 2), 2.2);
    }

    #[test]
    fn test_merge_intervals_with_gap() {
        let merged = merge_intervals(&[(1.48, 2.5), (0.5, 1.5), (3.0, 3.5)], 0.002);
        assert_eq!(merged.len(), 2);
        assert_relative_eq!(merged[0].0, 0.5);
        assert_relative_eq!(merged[0].1, 2.5);

        // Touching within the gap merges, a wider gap does not
        assert_eq!(merge_intervals(&[(0.0, 1.0), (1.0015, 2.0)], 0.002).len(), 1);
        assert_eq!(merge_intervals(&[(0.0, 1.0), (1.01, 2.0)], 0.002).len(), 2);
    }

    #[test]
    fn test_spans_cover_bridges_small_gaps() {
        let spans = [(0.0, 2.0), (2.02, 4.0)];
        assert!(spans_cover(&spans, 0.0, 4.0, 0.03));
        assert!(!spans_cover(&[(0.0, 2.0), (2.5, 4.0)], 0.0, 4.0, 0.03));
        assert!(!spans_cover(&[], 0.0, 1.0, 0.03));
    }

    #[test]
    fn test_signed_area_orientation() {
        let ccw = [
            Point2D::new(0.0, 0.0),
            Point2D::new(2.0, 0.0),
            Point2D::new(2.0, 1.0),
            Point2D::new(0.0, 1.0),
        ];
        assert_relative_eq!(signed_area(&ccw), 2.0);

        let mut cw = ccw.to_vec();
        cw.reverse();
        assert_relative_eq!(signed_area(&cw), -2.0);
    }

    #[test]
    fn test_simplify_ring_drops_collinear_and_spikes() {
        let ring = [
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(2.0, 0.0),
            Point2D::new(2.0, 1.0),
            // spike out to (3,1) and back
            Point2D::new(3.0, 1.0),
            Point2D::new(2.0, 1.0),
            Point2D::new(2.0, 2.0),
            Point2D::new(0.0, 2.0),
        ];
        let simplified = simplify_ring(&ring, 1e-6);
        assert_eq!(simplified.len(), 4);
        assert_relative_eq!(signed_area(&simplified), 4.0);
    }
}
