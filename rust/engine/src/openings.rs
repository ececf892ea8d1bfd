// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping of windows and doors onto room edges and wall strips
//!
//! Openings are compared in world space. An opening lands on an edge when
//! both of its endpoints project onto that edge within the edge tolerance;
//! its span is then expressed as start/end offsets from the edge origin.
//! Same-profile windows on one edge are merged by interval union, doors
//! always stay discrete, and zero-width clicks are widened to a default
//! width centred on the click.

use crate::config::EngineConfig;
use crate::line_ops::{merge_intervals, project_onto_segment, quantize_meters};
use crate::plan::{PlanTransform, ResolvedOpening};
use crate::types::{
    DoorMeta, OpeningKind, Room, RoomEdge, RoomOpening, StripOpening, WallId, WallStrip,
    WorldPoint,
};

/// Opening resolved to world coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct WorldOpening {
    pub kind: OpeningKind,
    pub start: WorldPoint,
    pub end: WorldPoint,
    pub host: Option<WallId>,
    pub sill_m: f64,
    pub height_m: f64,
    pub manual: bool,
    pub meta: Option<DoorMeta>,
}

impl WorldOpening {
    pub fn from_resolved(o: &ResolvedOpening, transform: &PlanTransform) -> Self {
        Self {
            kind: o.kind,
            start: transform.to_world(&o.start),
            end: transform.to_world(&o.end),
            host: o.host,
            sill_m: o.sill_m,
            height_m: o.height_m,
            manual: o.manual,
            meta: o.meta,
        }
    }
}

/// Opening placed on one edge, offsets in meters from the edge origin
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeOpening {
    pub edge: RoomEdge,
    pub kind: OpeningKind,
    pub start_m: f64,
    pub end_m: f64,
    pub sill_m: f64,
    pub height_m: f64,
    pub manual: bool,
    pub meta: Option<DoorMeta>,
}

/// Offsets of an opening along segment `a -> b`, if it lies on it
pub fn classify_on_segment(
    opening: &WorldOpening,
    a: &WorldPoint,
    b: &WorldPoint,
    tol: f64,
) -> Option<(f64, f64)> {
    let len = a.distance_to(b);
    if len <= 1e-9 {
        return None;
    }
    let (pa, pb) = (a.as_plane(), b.as_plane());
    let h0 = project_onto_segment(&opening.start.as_plane(), &pa, &pb);
    let h1 = project_onto_segment(&opening.end.as_plane(), &pa, &pb);
    if h0.distance > tol || h1.distance > tol {
        return None;
    }
    let (s0, s1) = (h0.t * len, h1.t * len);
    Some(if s0 <= s1 { (s0, s1) } else { (s1, s0) })
}

/// Part of an opening running along segment `a -> b`, clipped to it
///
/// Both opening endpoints must lie within `tol` of the segment's line. An
/// opening crossing a split point is shared by the pieces on either side;
/// overlaps no longer than `tol` are dropped when the opening was clipped.
/// Zero-width clicks are returned unclipped when they fall on the segment.
pub fn clip_to_segment(
    opening: &WorldOpening,
    a: &WorldPoint,
    b: &WorldPoint,
    tol: f64,
) -> Option<WorldOpening> {
    let len = a.distance_to(b);
    if len <= 1e-9 {
        return None;
    }
    let origin = a.as_plane().to_nalgebra();
    let dir = (b.as_plane().to_nalgebra() - origin) / len;
    let local = |p: &WorldPoint| {
        let v = p.as_plane().to_nalgebra() - origin;
        (v.dot(&dir), (v.x * dir.y - v.y * dir.x).abs())
    };
    let (u0, d0) = local(&opening.start);
    let (u1, d1) = local(&opening.end);
    if d0 > tol || d1 > tol {
        return None;
    }
    let (s0, s1) = if u0 <= u1 { (u0, u1) } else { (u1, u0) };
    if s1 - s0 < 1e-3 {
        return (s0 >= -tol && s0 <= len + tol).then(|| opening.clone());
    }

    let (lo, hi) = (s0.max(0.0), s1.min(len));
    let kept = hi - lo;
    if kept < 1e-3 || (kept < s1 - s0 - 1e-9 && kept <= tol) {
        return None;
    }
    Some(WorldOpening {
        start: a.lerp(b, lo / len),
        end: a.lerp(b, hi / len),
        ..opening.clone()
    })
}

/// Widen a zero-width span to `width`, centred and kept inside `[0, len]`
pub fn expand_zero_width(start: f64, end: f64, len: f64, width: f64) -> (f64, f64) {
    if end - start >= 1e-3 {
        return (start, end);
    }
    if width >= len {
        return (0.0, len);
    }
    let center = (start + end) / 2.0;
    let lo = (center - width / 2.0).clamp(0.0, len - width);
    (lo, lo + width)
}

/// Sill/height key at millimetre resolution
fn profile_key(sill_m: f64, height_m: f64) -> (i64, i64) {
    (
        (sill_m * 1000.0).round() as i64,
        (height_m * 1000.0).round() as i64,
    )
}

struct WindowGroup {
    edge: RoomEdge,
    sill_m: f64,
    height_m: f64,
    spans: Vec<(f64, f64)>,
    manual: bool,
}

/// Place openings on a list of edges; the first matching edge wins
pub fn place_on_edges(
    edges: &[(RoomEdge, WorldPoint, WorldPoint)],
    openings: &[WorldOpening],
    config: &EngineConfig,
) -> Vec<EdgeOpening> {
    let mut windows: Vec<WindowGroup> = Vec::new();
    let mut doors: Vec<EdgeOpening> = Vec::new();

    for o in openings {
        let hit = edges.iter().find_map(|(edge, a, b)| {
            classify_on_segment(o, a, b, config.opening_edge_tol_m)
                .map(|span| (*edge, span, a.distance_to(b)))
        });
        let Some((edge, (s0, s1), len)) = hit else {
            continue;
        };
        let default_width = match o.kind {
            OpeningKind::Window => config.default_window_width_m,
            OpeningKind::Door => config.default_door_width_m,
        };
        let (s0, s1) = expand_zero_width(s0, s1, len, default_width);

        match o.kind {
            OpeningKind::Door => doors.push(EdgeOpening {
                edge,
                kind: OpeningKind::Door,
                start_m: s0,
                end_m: s1,
                sill_m: o.sill_m,
                height_m: o.height_m,
                manual: o.manual,
                meta: o.meta,
            }),
            OpeningKind::Window => {
                let key = profile_key(o.sill_m, o.height_m);
                match windows
                    .iter_mut()
                    .find(|g| g.edge == edge && profile_key(g.sill_m, g.height_m) == key)
                {
                    Some(group) => {
                        group.spans.push((s0, s1));
                        group.manual |= o.manual;
                    }
                    None => windows.push(WindowGroup {
                        edge,
                        sill_m: o.sill_m,
                        height_m: o.height_m,
                        spans: vec![(s0, s1)],
                        manual: o.manual,
                    }),
                }
            }
        }
    }

    let mut placed = Vec::with_capacity(windows.len() + doors.len());
    for group in windows {
        for (start_m, end_m) in merge_intervals(&group.spans, config.window_merge_gap_m) {
            placed.push(EdgeOpening {
                edge: group.edge,
                kind: OpeningKind::Window,
                start_m,
                end_m,
                sill_m: group.sill_m,
                height_m: group.height_m,
                manual: group.manual,
                meta: None,
            });
        }
    }
    placed.extend(doors);
    placed
}

/// Openings of a room, offsets quantized to centimetres; ids left empty
pub fn map_room_openings(
    room: &Room,
    openings: &[WorldOpening],
    config: &EngineConfig,
) -> Vec<RoomOpening> {
    let edges = room.edges();
    place_on_edges(&edges, openings, config)
        .into_iter()
        .map(|p| {
            let len = edges
                .iter()
                .find(|(e, _, _)| *e == p.edge)
                .map(|(_, a, b)| a.distance_to(b))
                .unwrap_or(0.0);
            let start_m = quantize_meters(p.start_m, 2).clamp(0.0, len);
            let end_m = quantize_meters(p.end_m, 2).clamp(start_m, len);
            RoomOpening {
                id: String::new(),
                kind: p.kind,
                edge: p.edge,
                start_m,
                end_m,
                sill_m: p.sill_m,
                height_m: p.height_m,
                manual: p.manual,
                meta: p.meta,
            }
        })
        .collect()
}

/// Openings overlapping a strip, in world coordinates
///
/// A strip may be one piece of a split wall; openings crossing the split
/// are clipped to the piece.
pub fn map_strip_openings(
    strip: &WallStrip,
    openings: &[WorldOpening],
    config: &EngineConfig,
) -> Vec<StripOpening> {
    let (a, b) = (strip.start(), strip.end());
    let len = strip.length();
    if len <= 1e-9 {
        return Vec::new();
    }
    let clipped: Vec<WorldOpening> = openings
        .iter()
        .filter_map(|o| clip_to_segment(o, &a, &b, config.opening_edge_tol_m))
        .collect();
    let edges = [(RoomEdge::Index(0), a, b)];
    place_on_edges(&edges, &clipped, config)
        .into_iter()
        .map(|p| {
            let p0 = a.lerp(&b, p.start_m / len);
            let p1 = a.lerp(&b, p.end_m / len);
            StripOpening {
                kind: p.kind,
                x0: p0.x,
                z0: p0.z,
                x1: p1.x,
                z1: p1.z,
                sill_m: p.sill_m,
                height_m: p.height_m,
                manual: p.manual,
                meta: p.meta,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoomShape;
    use approx::assert_relative_eq;

    fn opening(kind: OpeningKind, x0: f64, x1: f64, z: f64) -> WorldOpening {
        WorldOpening {
            kind,
            start: WorldPoint::new(x0, z),
            end: WorldPoint::new(x1, z),
            host: None,
            sill_m: if kind == OpeningKind::Window { 1.0 } else { 0.0 },
            height_m: if kind == OpeningKind::Window { 1.5 } else { 2.04 },
            manual: false,
            meta: None,
        }
    }

    fn room_4x3() -> Room {
        Room {
            id: String::new(),
            name: "Room".into(),
            level: 0,
            group_id: None,
            height: 3.0,
            shape: RoomShape::Rectangle {
                center: WorldPoint::new(2.0, 1.5),
                width: 4.0,
                depth: 3.0,
            },
            openings: Vec::new(),
        }
    }

    #[test]
    fn test_window_offsets_on_rectangle_side() {
        let config = EngineConfig::default();
        let mapped = map_room_openings(
            &room_4x3(),
            &[opening(OpeningKind::Window, 1.0, 2.2, 0.02)],
            &config,
        );
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].edge, RoomEdge::MinZ);
        assert_relative_eq!(mapped[0].start_m, 1.0);
        assert_relative_eq!(mapped[0].end_m, 2.2);
    }

    #[test]
    fn test_overlapping_windows_merge_but_doors_do_not() {
        let config = EngineConfig::default();
        let windows = [
            opening(OpeningKind::Window, 0.5, 1.5, 3.0),
            opening(OpeningKind::Window, 1.48, 2.5, 3.0),
        ];
        let mapped = map_room_openings(&room_4x3(), &windows, &config);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].edge, RoomEdge::MaxZ);
        assert_relative_eq!(mapped[0].start_m, 0.5);
        assert_relative_eq!(mapped[0].end_m, 2.5);

        let doors = [
            opening(OpeningKind::Door, 0.5, 1.5, 3.0),
            opening(OpeningKind::Door, 1.48, 2.5, 3.0),
        ];
        assert_eq!(map_room_openings(&room_4x3(), &doors, &config).len(), 2);
    }

    #[test]
    fn test_different_profiles_do_not_merge() {
        let config = EngineConfig::default();
        let mut tall = opening(OpeningKind::Window, 1.0, 2.0, 0.0);
        tall.height_m = 2.1;
        let windows = [opening(OpeningKind::Window, 0.2, 1.2, 0.0), tall];
        assert_eq!(map_room_openings(&room_4x3(), &windows, &config).len(), 2);
    }

    #[test]
    fn test_zero_width_click_is_expanded() {
        let config = EngineConfig::default();
        let click = opening(OpeningKind::Door, 0.0, 0.0, 1.0);
        // a click at (0, 1) lies on the minX side
        let mapped = map_room_openings(&room_4x3(), &[click], &config);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].edge, RoomEdge::MinX);
        assert_relative_eq!(mapped[0].start_m, 0.55);
        assert_relative_eq!(mapped[0].end_m, 1.45);

        // near the corner the default width is shifted inside the edge
        assert_eq!(expand_zero_width(0.1, 0.1, 3.0, 1.2), (0.0, 1.2));
        assert_eq!(expand_zero_width(0.0, 0.0, 0.5, 1.2), (0.0, 0.5));
    }

    #[test]
    fn test_opening_off_the_room_is_ignored() {
        let config = EngineConfig::default();
        let away = opening(OpeningKind::Window, 1.0, 2.0, 0.2);
        assert!(map_room_openings(&room_4x3(), &[away], &config).is_empty());
    }

    #[test]
    fn test_strip_openings_in_world_coordinates() {
        let config = EngineConfig::default();
        let strip = WallStrip {
            x0: 5.0,
            z0: 0.0,
            x1: 0.0,
            z1: 0.0,
            thickness: 0.3,
            height: 3.0,
            base_height: 0.0,
            level: 0,
            openings: Vec::new(),
        };
        let mapped = map_strip_openings(
            &strip,
            &[opening(OpeningKind::Window, 1.0, 2.0, 0.0)],
            &config,
        );
        assert_eq!(mapped.len(), 1);
        let xs = [mapped[0].x0, mapped[0].x1];
        assert_relative_eq!(xs[0].min(xs[1]), 1.0, epsilon = 1e-9);
        assert_relative_eq!(xs[0].max(xs[1]), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_opening_across_split_is_clipped_to_each_piece() {
        let window = opening(OpeningKind::Window, 1.5, 2.5, 0.0);
        let (a, split, b) = (
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(2.0, 0.0),
            WorldPoint::new(6.0, 0.0),
        );

        let left = clip_to_segment(&window, &a, &split, 0.05).unwrap();
        assert_relative_eq!(left.start.x, 1.5, epsilon = 1e-9);
        assert_relative_eq!(left.end.x, 2.0, epsilon = 1e-9);
        let right = clip_to_segment(&window, &split, &b, 0.05).unwrap();
        assert_relative_eq!(right.start.x, 2.0, epsilon = 1e-9);
        assert_relative_eq!(right.end.x, 2.5, epsilon = 1e-9);

        // a window ending 2 cm past the split leaves no sliver behind
        let short = opening(OpeningKind::Window, 0.5, 2.02, 0.0);
        assert!(clip_to_segment(&short, &split, &b, 0.05).is_none());
        // a narrow window is kept whole
        let narrow = opening(OpeningKind::Window, 3.0, 3.04, 0.0);
        assert!(clip_to_segment(&narrow, &split, &b, 0.05).is_some());
        // parallel but off the line
        let off = opening(OpeningKind::Window, 3.0, 4.0, 0.3);
        assert!(clip_to_segment(&off, &split, &b, 0.05).is_none());
    }

    #[test]
    fn test_split_strips_share_a_crossing_door() {
        let config = EngineConfig::default();
        let piece = |x0: f64, x1: f64| WallStrip {
            x0,
            z0: 0.0,
            x1,
            z1: 0.0,
            thickness: 0.3,
            height: 3.0,
            base_height: 0.0,
            level: 0,
            openings: Vec::new(),
        };
        let door = [opening(OpeningKind::Door, 1.6, 2.4, 0.0)];
        let left = map_strip_openings(&piece(0.0, 2.0), &door, &config);
        let right = map_strip_openings(&piece(2.0, 6.0), &door, &config);
        assert_eq!(left.len(), 1);
        assert_eq!(right.len(), 1);
        assert_relative_eq!(left[0].x0.min(left[0].x1), 1.6, epsilon = 1e-9);
        assert_relative_eq!(right[0].x0.max(right[0].x1), 2.4, epsilon = 1e-9);
    }
}
