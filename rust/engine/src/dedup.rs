// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Removal of duplicate rooms, rectangle candidates and wall strips

use crate::polygon_detector::PolygonCandidate;
use crate::rect_detector::{RectCandidate, Tracks};
use crate::types::{OpeningKind, Room, RoomShape, StripOpening, WallStrip};
use rustc_hash::FxHashMap;

/// Keep the first of every group of candidates describing the same box
pub fn dedupe_rects(rects: Vec<RectCandidate>, tol: f64) -> Vec<RectCandidate> {
    let mut kept: Vec<RectCandidate> = Vec::with_capacity(rects.len());
    for r in rects {
        if !kept
            .iter()
            .any(|k| k.same_box(r.min_x, r.max_x, r.min_y, r.max_y, tol))
        {
            kept.push(r);
        }
    }
    kept
}

/// Drop rectangles split in two by a wall crossing their whole interior
///
/// Such a rectangle is the union of two rooms the scan also reports.
pub fn drop_partitioned(rects: Vec<RectCandidate>, tracks: &Tracks) -> Vec<RectCandidate> {
    let tol = tracks.tolerance;
    rects
        .into_iter()
        .filter(|r| {
            let split_h = tracks.horizontal.iter().any(|(&key, t)| {
                t.coord > r.min_y + tol
                    && t.coord < r.max_y - tol
                    && tracks.h_covers(key, r.min_x, r.max_x)
            });
            let split_v = tracks.vertical.iter().any(|(&key, t)| {
                t.coord > r.min_x + tol
                    && t.coord < r.max_x - tol
                    && tracks.v_covers(key, r.min_y, r.max_y)
            });
            if split_h || split_v {
                tracing::debug!(
                    min_x = r.min_x,
                    min_y = r.min_y,
                    "Dropping partitioned rectangle"
                );
            }
            !(split_h || split_v)
        })
        .collect()
}

/// Discard rectangles whose box coincides with an accepted polygon's box
pub fn drop_rects_matching_polygons(
    rects: Vec<RectCandidate>,
    polygons: &[PolygonCandidate],
    tol: f64,
) -> Vec<RectCandidate> {
    rects
        .into_iter()
        .filter(|r| {
            !polygons.iter().any(|p| {
                let (x0, x1, y0, y1) = p.bounds();
                r.same_box(x0, x1, y0, y1, tol)
            })
        })
        .collect()
}

fn same_geometry(a: &Room, b: &Room, eps: f64) -> bool {
    if a.level != b.level {
        return false;
    }
    match (&a.shape, &b.shape) {
        (
            RoomShape::Rectangle {
                center: ca,
                width: wa,
                depth: da,
            },
            RoomShape::Rectangle {
                center: cb,
                width: wb,
                depth: db,
            },
        ) => {
            (ca.x - cb.x).abs() <= eps
                && (ca.z - cb.z).abs() <= eps
                && (wa - wb).abs() <= eps
                && (da - db).abs() <= eps
        }
        (RoomShape::Polygon { footprint: fa }, RoomShape::Polygon { footprint: fb }) => {
            fa.len() == fb.len()
                && fa
                    .iter()
                    .all(|p| fb.iter().any(|q| p.distance_to(q) <= eps))
        }
        _ => false,
    }
}

/// Collapse rooms with identical geometry on the same level, first wins
pub fn dedupe_rooms(rooms: Vec<Room>, eps: f64) -> Vec<Room> {
    let mut kept: Vec<Room> = Vec::with_capacity(rooms.len());
    for room in rooms {
        if !kept.iter().any(|k| same_geometry(k, &room, eps)) {
            kept.push(room);
        }
    }
    kept
}

/// Order-independent strip identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StripKey {
    a: (i64, i64),
    b: (i64, i64),
    level: i32,
}

impl StripKey {
    pub fn of(strip: &WallStrip, round_m: f64) -> Self {
        let a = (round_to(strip.x0, round_m), round_to(strip.z0, round_m));
        let b = (round_to(strip.x1, round_m), round_to(strip.z1, round_m));
        Self {
            a: a.min(b),
            b: a.max(b),
            level: strip.level,
        }
    }
}

fn round_to(v: f64, step: f64) -> i64 {
    (v / step).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct OpeningKey {
    kind: OpeningKind,
    a: (i64, i64),
    b: (i64, i64),
    sill_mm: i64,
    height_mm: i64,
}

impl OpeningKey {
    fn of(o: &StripOpening, round_m: f64) -> Self {
        let a = (round_to(o.x0, round_m), round_to(o.z0, round_m));
        let b = (round_to(o.x1, round_m), round_to(o.z1, round_m));
        Self {
            kind: o.kind,
            a: a.min(b),
            b: a.max(b),
            sill_mm: round_to(o.sill_m, 0.001),
            height_mm: round_to(o.height_m, 0.001),
        }
    }
}

/// Merge strips sharing an endpoint pair (either order) within `round_m`
///
/// The survivor keeps the first strip's position, the larger thickness and
/// height, and the union of both opening lists.
pub fn dedupe_strips(strips: Vec<WallStrip>, round_m: f64) -> Vec<WallStrip> {
    let mut index: FxHashMap<StripKey, usize> = FxHashMap::default();
    let mut out: Vec<WallStrip> = Vec::with_capacity(strips.len());

    for strip in strips {
        let key = StripKey::of(&strip, round_m);
        match index.get(&key) {
            Some(&i) => {
                let kept = &mut out[i];
                kept.thickness = kept.thickness.max(strip.thickness);
                kept.height = kept.height.max(strip.height);
                for o in strip.openings {
                    let k = OpeningKey::of(&o, round_m);
                    if !kept.openings.iter().any(|e| OpeningKey::of(e, round_m) == k) {
                        kept.openings.push(o);
                    }
                }
            }
            None => {
                index.insert(key, out.len());
                out.push(strip);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect_detector::RectSource;
    use crate::polygon_detector::PolygonSource;
    use crate::types::{Point2D, WallRole, WallSegment, WorldPoint};

    fn rect(x0: f64, x1: f64, y0: f64, y1: f64) -> RectCandidate {
        RectCandidate {
            min_x: x0,
            max_x: x1,
            min_y: y0,
            max_y: y1,
            source: RectSource::TrackScan,
        }
    }

    fn strip(x0: f64, z0: f64, x1: f64, z1: f64, thickness: f64) -> WallStrip {
        WallStrip {
            x0,
            z0,
            x1,
            z1,
            thickness,
            height: 3.0,
            base_height: 0.0,
            level: 0,
            openings: Vec::new(),
        }
    }

    fn window(x0: f64, x1: f64) -> StripOpening {
        StripOpening {
            kind: OpeningKind::Window,
            x0,
            z0: 0.0,
            x1,
            z1: 0.0,
            sill_m: 1.0,
            height_m: 1.5,
            manual: false,
            meta: None,
        }
    }

    #[test]
    fn test_reversed_strips_collapse() {
        let mut a = strip(0.0, 0.0, 4.0, 0.0, 0.2);
        a.openings.push(window(1.0, 2.0));
        let mut b = strip(4.0004, 0.0, 0.0, 0.0, 0.3);
        b.openings.push(window(2.0, 1.0));
        b.openings.push(window(3.0, 3.5));

        let merged = dedupe_strips(vec![a, b], 0.001);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].thickness, 0.3);
        assert_eq!(merged[0].x0, 0.0);
        assert_eq!(merged[0].openings.len(), 2);
    }

    #[test]
    fn test_strips_on_other_levels_stay_apart() {
        let a = strip(0.0, 0.0, 4.0, 0.0, 0.2);
        let mut b = a.clone();
        b.level = 1;
        assert_eq!(dedupe_strips(vec![a, b], 0.001).len(), 2);
    }

    #[test]
    fn test_union_of_two_rooms_is_dropped() {
        let walls: Vec<WallSegment> = [
            (0.0, 0.0, 6.0, 0.0),
            (0.0, 3.0, 6.0, 3.0),
            (0.0, 0.0, 0.0, 3.0),
            (3.0, 0.0, 3.0, 3.0),
            (6.0, 0.0, 6.0, 3.0),
        ]
        .iter()
        .enumerate()
        .map(|(id, &(x0, y0, x1, y1))| WallSegment {
            id,
            start: Point2D::new(x0, y0),
            end: Point2D::new(x1, y1),
            thickness: 0.3,
            level: 0,
            group_id: None,
            manual: false,
            declared_role: WallRole::Unassigned,
        })
        .collect();
        let refs: Vec<&WallSegment> = walls.iter().collect();
        let tracks = Tracks::build(&refs, 0.03);

        let kept = drop_partitioned(
            vec![rect(0.0, 3.0, 0.0, 3.0), rect(0.0, 6.0, 0.0, 3.0)],
            &tracks,
        );
        assert_eq!(kept, vec![rect(0.0, 3.0, 0.0, 3.0)]);
    }

    #[test]
    fn test_duplicate_rects_and_polygon_boxes() {
        let rects = dedupe_rects(
            vec![rect(0.0, 4.0, 0.0, 3.0), rect(0.01, 4.0, 0.0, 3.0)],
            0.03,
        );
        assert_eq!(rects.len(), 1);

        let square = PolygonCandidate {
            points: vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(4.0, 0.0),
                Point2D::new(4.0, 3.0),
                Point2D::new(0.0, 3.0),
            ],
            walls: vec![],
            area: 12.0,
            source: PolygonSource::SimpleLoop,
        };
        assert!(drop_rects_matching_polygons(rects, &[square], 0.03).is_empty());
    }

    #[test]
    fn test_rooms_with_same_geometry_collapse() {
        let room = |id: &str, x: f64| Room {
            id: id.into(),
            name: "Room".into(),
            level: 0,
            group_id: None,
            height: 3.0,
            shape: RoomShape::Rectangle {
                center: WorldPoint::new(x, 0.0),
                width: 2.0,
                depth: 2.0,
            },
            openings: Vec::new(),
        };
        let kept = dedupe_rooms(vec![room("a", 1.0), room("b", 1.00001), room("c", 5.0)], 1e-4);
        let ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
