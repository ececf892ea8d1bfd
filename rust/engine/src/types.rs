// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for plan conversion: plan-space geometry, rooms, wall strips
//! and the per-floor state that a conversion pass reads and replaces

use crate::error::{Error, Result};
use crate::line_ops::signed_area;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A 2D point in plan space (meters)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn from_nalgebra(p: &Point2<f64>) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn lerp(&self, other: &Point2D, t: f64) -> Point2D {
        Point2D::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A point on the ground plane of the 3D scene (meters)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub z: f64,
}

impl WorldPoint {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn distance_to(&self, other: &WorldPoint) -> f64 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn lerp(&self, other: &WorldPoint, t: f64) -> WorldPoint {
        WorldPoint::new(
            self.x + (other.x - self.x) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    /// Ground-plane coordinates as a plan-style point, for reusing 2D helpers
    pub fn as_plane(&self) -> Point2D {
        Point2D::new(self.x, self.z)
    }

    pub fn from_plane(p: &Point2D) -> Self {
        Self { x: p.x, z: p.y }
    }
}

/// Index of a wall element inside the submitted plan
pub type WallId = usize;

/// Per-pass classification of a wall
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WallRole {
    #[default]
    Unassigned,
    /// Claimed by a detected room perimeter
    Room,
    /// Excluded from room detection
    NonRoom,
}

/// Validated wall segment in plan space
#[derive(Debug, Clone, PartialEq)]
pub struct WallSegment {
    pub id: WallId,
    pub start: Point2D,
    pub end: Point2D,
    pub thickness: f64,
    pub level: i32,
    pub group_id: Option<String>,
    pub manual: bool,
    /// Role requested by the drawing UI; only `NonRoom` has an effect
    pub declared_role: WallRole,
}

impl WallSegment {
    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    pub fn is_horizontal(&self, tol: f64) -> bool {
        (self.start.y - self.end.y).abs() < tol
    }

    pub fn is_vertical(&self, tol: f64) -> bool {
        (self.start.x - self.end.x).abs() < tol
    }

    pub fn is_axis_aligned(&self, tol: f64) -> bool {
        self.is_horizontal(tol) || self.is_vertical(tol)
    }

    pub fn point_at(&self, t: f64) -> Point2D {
        self.start.lerp(&self.end, t)
    }
}

/// Opening variant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OpeningKind {
    Window,
    Door,
}

/// Which end of the door leaf carries the hinge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Hinge {
    T0,
    T1,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Swing {
    In,
    Out,
}

/// Door metadata, carried through untouched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DoorMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hinge: Option<Hinge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing: Option<Swing>,
}

/// Named side of a rectangular room, or an edge index of a polygon room
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RoomEdge {
    MinZ,
    MaxZ,
    MinX,
    MaxX,
    Index(usize),
}

/// Room footprint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RoomShape {
    Rectangle {
        center: WorldPoint,
        width: f64,
        depth: f64,
    },
    /// Footprint vertices in world space, without a closing duplicate
    Polygon { footprint: Vec<WorldPoint> },
}

/// Opening stored relative to one edge of its room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomOpening {
    pub id: String,
    pub kind: OpeningKind,
    pub edge: RoomEdge,
    /// Distance from the edge origin to the opening start (meters)
    pub start_m: f64,
    pub end_m: f64,
    pub sill_m: f64,
    pub height_m: f64,
    #[serde(default)]
    pub manual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DoorMeta>,
}

/// A room volume on one floor level
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub level: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub height: f64,
    pub shape: RoomShape,
    #[serde(default)]
    pub openings: Vec<RoomOpening>,
}

impl Room {
    pub fn is_rectangle(&self) -> bool {
        matches!(self.shape, RoomShape::Rectangle { .. })
    }

    /// World bounding box `(min_x, max_x, min_z, max_z)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match &self.shape {
            RoomShape::Rectangle {
                center,
                width,
                depth,
            } => (
                center.x - width / 2.0,
                center.x + width / 2.0,
                center.z - depth / 2.0,
                center.z + depth / 2.0,
            ),
            RoomShape::Polygon { footprint } => {
                let mut bb = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
                for p in footprint {
                    bb.0 = bb.0.min(p.x);
                    bb.1 = bb.1.max(p.x);
                    bb.2 = bb.2.min(p.z);
                    bb.3 = bb.3.max(p.z);
                }
                bb
            }
        }
    }

    /// Width (x extent) and depth (z extent); the bounding box for polygons
    pub fn size(&self) -> (f64, f64) {
        match &self.shape {
            RoomShape::Rectangle { width, depth, .. } => (*width, *depth),
            RoomShape::Polygon { .. } => {
                let (x0, x1, z0, z1) = self.bounds();
                (x1 - x0, z1 - z0)
            }
        }
    }

    pub fn center(&self) -> WorldPoint {
        match &self.shape {
            RoomShape::Rectangle { center, .. } => *center,
            RoomShape::Polygon { .. } => {
                let (x0, x1, z0, z1) = self.bounds();
                WorldPoint::new((x0 + x1) / 2.0, (z0 + z1) / 2.0)
            }
        }
    }

    /// Footprint area in square meters
    pub fn area(&self) -> f64 {
        match &self.shape {
            RoomShape::Rectangle { width, depth, .. } => width * depth,
            RoomShape::Polygon { footprint } => {
                let pts: Vec<Point2D> = footprint.iter().map(|p| p.as_plane()).collect();
                signed_area(&pts).abs()
            }
        }
    }

    /// Perimeter edges with their world start and end points
    ///
    /// Offsets of a [`RoomOpening`] are measured from the returned start.
    pub fn edges(&self) -> Vec<(RoomEdge, WorldPoint, WorldPoint)> {
        match &self.shape {
            RoomShape::Rectangle { .. } => {
                let (x0, x1, z0, z1) = self.bounds();
                vec![
                    (
                        RoomEdge::MinZ,
                        WorldPoint::new(x0, z0),
                        WorldPoint::new(x1, z0),
                    ),
                    (
                        RoomEdge::MaxZ,
                        WorldPoint::new(x0, z1),
                        WorldPoint::new(x1, z1),
                    ),
                    (
                        RoomEdge::MinX,
                        WorldPoint::new(x0, z0),
                        WorldPoint::new(x0, z1),
                    ),
                    (
                        RoomEdge::MaxX,
                        WorldPoint::new(x1, z0),
                        WorldPoint::new(x1, z1),
                    ),
                ]
            }
            RoomShape::Polygon { footprint } => {
                let n = footprint.len();
                (0..n)
                    .map(|i| (RoomEdge::Index(i), footprint[i], footprint[(i + 1) % n]))
                    .collect()
            }
        }
    }

    pub fn edge_segment(&self, edge: RoomEdge) -> Option<(WorldPoint, WorldPoint)> {
        self.edges()
            .into_iter()
            .find(|(e, _, _)| *e == edge)
            .map(|(_, a, b)| (a, b))
    }

    /// World endpoints of one of this room's openings
    pub fn opening_world(&self, opening: &RoomOpening) -> Option<(WorldPoint, WorldPoint)> {
        let (a, b) = self.edge_segment(opening.edge)?;
        let len = a.distance_to(&b);
        if len <= 0.0 {
            return None;
        }
        Some((
            a.lerp(&b, opening.start_m / len),
            a.lerp(&b, opening.end_m / len),
        ))
    }

    pub fn translate(&mut self, dx: f64, dz: f64) {
        match &mut self.shape {
            RoomShape::Rectangle { center, .. } => {
                center.x += dx;
                center.z += dz;
            }
            RoomShape::Polygon { footprint } => {
                for p in footprint.iter_mut() {
                    p.x += dx;
                    p.z += dz;
                }
            }
        }
    }

    /// Check the footprint invariant: at least three vertices, non-zero area
    pub fn validate(&self) -> Result<()> {
        match &self.shape {
            RoomShape::Rectangle { width, depth, .. } => {
                if !(width.is_finite() && depth.is_finite() && *width > 0.0 && *depth > 0.0) {
                    return Err(Error::degenerate_room(format!(
                        "room {} has size {}x{}",
                        self.id, width, depth
                    )));
                }
            }
            RoomShape::Polygon { footprint } => {
                if footprint.len() < 3 {
                    return Err(Error::degenerate_room(format!(
                        "room {} has {} footprint vertices",
                        self.id,
                        footprint.len()
                    )));
                }
                if self.area() <= f64::EPSILON {
                    return Err(Error::degenerate_room(format!(
                        "room {} has zero footprint area",
                        self.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Wall strips along this room's perimeter, openings in world coordinates
    ///
    /// Used by the viewer to render room walls with the same code path as
    /// freestanding strips.
    pub fn perimeter_strips(&self, thickness: f64, base_height: f64) -> Vec<WallStrip> {
        self.edges()
            .into_iter()
            .map(|(edge, a, b)| {
                let openings = self
                    .openings
                    .iter()
                    .filter(|o| o.edge == edge)
                    .filter_map(|o| {
                        let (p0, p1) = self.opening_world(o)?;
                        Some(StripOpening {
                            kind: o.kind,
                            x0: p0.x,
                            z0: p0.z,
                            x1: p1.x,
                            z1: p1.z,
                            sill_m: o.sill_m,
                            height_m: o.height_m,
                            manual: o.manual,
                            meta: o.meta,
                        })
                    })
                    .collect();
                WallStrip {
                    x0: a.x,
                    z0: a.z,
                    x1: b.x,
                    z1: b.z,
                    thickness,
                    height: self.height,
                    base_height,
                    level: self.level,
                    openings,
                }
            })
            .collect()
    }
}

/// Opening on a wall strip, in absolute world coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StripOpening {
    pub kind: OpeningKind,
    pub x0: f64,
    pub z0: f64,
    pub x1: f64,
    pub z1: f64,
    pub sill_m: f64,
    pub height_m: f64,
    #[serde(default)]
    pub manual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DoorMeta>,
}

/// Freestanding wall not enclosed by any room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WallStrip {
    pub x0: f64,
    pub z0: f64,
    pub x1: f64,
    pub z1: f64,
    pub thickness: f64,
    pub height: f64,
    pub base_height: f64,
    pub level: i32,
    #[serde(default)]
    pub openings: Vec<StripOpening>,
}

impl WallStrip {
    pub fn start(&self) -> WorldPoint {
        WorldPoint::new(self.x0, self.z0)
    }

    pub fn end(&self) -> WorldPoint {
        WorldPoint::new(self.x1, self.z1)
    }

    pub fn length(&self) -> f64 {
        self.start().distance_to(&self.end())
    }
}

/// Rooms and wall strips of every floor, as produced by the last pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlanState {
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub strips: Vec<WallStrip>,
    /// Counter behind freshly generated room and opening ids
    #[serde(default)]
    pub next_id: u64,
}

impl FloorPlanState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooms_on_level(&self, level: i32) -> impl Iterator<Item = &Room> {
        self.rooms.iter().filter(move |r| r.level == level)
    }

    pub fn strips_on_level(&self, level: i32) -> impl Iterator<Item = &WallStrip> {
        self.strips.iter().filter(move |s| s.level == level)
    }

    /// Replace rooms and strips of one level, leaving other levels untouched
    pub fn replace_level(&mut self, level: i32, rooms: Vec<Room>, strips: Vec<WallStrip>) {
        self.rooms.retain(|r| r.level != level);
        self.rooms.extend(rooms);
        self.strips.retain(|s| s.level != level);
        self.strips.extend(strips);
    }

    pub fn replace_level_strips(&mut self, level: i32, strips: Vec<WallStrip>) {
        self.strips.retain(|s| s.level != level);
        self.strips.extend(strips);
    }

    /// Generate an id of the form `{prefix}_{n}` not used by any room or opening
    pub fn fresh_id(&mut self, prefix: &str) -> String {
        loop {
            self.next_id += 1;
            let candidate = format!("{}_{}", prefix, self.next_id);
            let taken = self.rooms.iter().any(|r| {
                r.id == candidate || r.openings.iter().any(|o| o.id == candidate)
            });
            if !taken {
                return candidate;
            }
        }
    }
}

/// What a conversion pass did
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyAction {
    /// Empty plan in non-destructive mode; state untouched
    #[serde(rename = "skip-no-walls")]
    SkippedNoWalls,
    /// Empty plan; the level was cleared
    ClearedNoWalls,
    /// Only wall strips were rebuilt
    StripsOnly,
    RoomsApplied,
    /// A 3D drag gesture was in progress; state untouched
    #[serde(rename = "skip-drag")]
    SkippedDragInProgress,
    /// Internal failure; state untouched
    Failed,
}

/// Observability record emitted once per pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplySummary {
    pub action: ApplyAction,
    pub rooms_rect: usize,
    pub rooms_poly: usize,
    pub strips_count: usize,
    /// Openings as placed on rooms and strips; one on a wall shared by two
    /// rooms is placed, and counted, on each
    pub openings_count: usize,
    pub level: i32,
    /// Plan elements dropped as malformed
    pub skipped_elements: usize,
    /// User-facing status line, absent in quiet mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ApplySummary {
    pub fn new(action: ApplyAction, level: i32) -> Self {
        Self {
            action,
            rooms_rect: 0,
            rooms_poly: 0,
            strips_count: 0,
            openings_count: 0,
            level,
            skipped_elements: 0,
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect_room(cx: f64, cz: f64, width: f64, depth: f64) -> Room {
        Room {
            id: "r1".into(),
            name: "Room".into(),
            level: 0,
            group_id: None,
            height: 3.0,
            shape: RoomShape::Rectangle {
                center: WorldPoint::new(cx, cz),
                width,
                depth,
            },
            openings: Vec::new(),
        }
    }

    #[test]
    fn test_rectangle_edges_and_bounds() {
        let room = rect_room(2.0, 1.5, 4.0, 3.0);
        assert_eq!(room.bounds(), (0.0, 4.0, 0.0, 3.0));

        let (a, b) = room.edge_segment(RoomEdge::MaxX).unwrap();
        assert_eq!(a, WorldPoint::new(4.0, 0.0));
        assert_eq!(b, WorldPoint::new(4.0, 3.0));
        assert_relative_eq!(room.area(), 12.0);
    }

    #[test]
    fn test_opening_world_position() {
        let mut room = rect_room(2.0, 1.5, 4.0, 3.0);
        room.openings.push(RoomOpening {
            id: "o1".into(),
            kind: OpeningKind::Window,
            edge: RoomEdge::MinZ,
            start_m: 1.0,
            end_m: 2.2,
            sill_m: 1.0,
            height_m: 1.5,
            manual: false,
            meta: None,
        });
        let (p0, p1) = room.opening_world(&room.openings[0]).unwrap();
        assert_relative_eq!(p0.x, 1.0);
        assert_relative_eq!(p1.x, 2.2);
        assert_relative_eq!(p0.z, 0.0);

        let strips = room.perimeter_strips(0.2, 0.0);
        assert_eq!(strips.len(), 4);
        assert_eq!(strips[0].openings.len(), 1);
        assert!(strips[1].openings.is_empty());
    }

    #[test]
    fn test_validate_rejects_degenerate_polygon() {
        let mut room = rect_room(0.0, 0.0, 1.0, 1.0);
        room.shape = RoomShape::Polygon {
            footprint: vec![
                WorldPoint::new(0.0, 0.0),
                WorldPoint::new(1.0, 0.0),
                WorldPoint::new(2.0, 0.0),
            ],
        };
        assert!(matches!(room.validate(), Err(Error::DegenerateRoom(_))));
        assert!(rect_room(0.0, 0.0, 2.0, 2.0).validate().is_ok());
    }

    #[test]
    fn test_replace_level_keeps_other_floors() {
        let mut state = FloorPlanState::new();
        let mut upstairs = rect_room(0.0, 0.0, 3.0, 3.0);
        upstairs.level = 1;
        state.rooms.push(upstairs);
        state.rooms.push(rect_room(5.0, 5.0, 2.0, 2.0));

        state.replace_level(0, Vec::new(), Vec::new());
        assert_eq!(state.rooms.len(), 1);
        assert_eq!(state.rooms[0].level, 1);
    }

    #[test]
    fn test_fresh_id_skips_taken_ids() {
        let mut state = FloorPlanState::new();
        let mut room = rect_room(0.0, 0.0, 1.0, 1.0);
        room.id = "room_1".into();
        state.rooms.push(room);

        assert_eq!(state.fresh_id("room"), "room_2");
        assert_eq!(state.fresh_id("opening"), "opening_3");
    }

    #[test]
    fn test_summary_action_serialization() {
        let json = serde_json::to_string(&ApplyAction::SkippedNoWalls).unwrap();
        assert_eq!(json, "\"skip-no-walls\"");
        let json = serde_json::to_string(&ApplyAction::RoomsApplied).unwrap();
        assert_eq!(json, "\"rooms-applied\"");
        let edge = serde_json::to_string(&RoomEdge::Index(2)).unwrap();
        assert_eq!(edge, "{\"index\":2}");
        assert_eq!(serde_json::to_string(&RoomEdge::MinZ).unwrap(), "\"minZ\"");
    }
}
