// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall-strip extrusion
//!
//! Walls not absorbed into a room become freestanding strips, one per
//! sub-segment after T-junction and guide splitting. Sub-segments that run
//! along an accepted room's perimeter are skipped since the room already
//! renders that wall.

use crate::config::EngineConfig;
use crate::line_ops::{point_to_segment_distance, project_onto_segment};
use crate::openings::{map_strip_openings, WorldOpening};
use crate::plan::{GuideLine, PlanTransform};
use crate::snap::SnapGraph;
use crate::types::{Point2D, Room, WallSegment, WallStrip, WorldPoint};

/// Shortest sub-segment turned into a strip
const MIN_STRIP_LENGTH: f64 = 1e-6;

/// Turns plan walls into world-space strips for one level
pub struct StripExtruder<'a> {
    graph: SnapGraph,
    perimeter: Vec<(WorldPoint, WorldPoint)>,
    transform: PlanTransform,
    config: &'a EngineConfig,
    level: i32,
}

impl<'a> StripExtruder<'a> {
    /// `walls` are all valid walls of the level; they define the split points
    pub fn new(
        walls: &[WallSegment],
        guides: &[GuideLine],
        rooms: &[Room],
        transform: PlanTransform,
        level: i32,
        config: &'a EngineConfig,
    ) -> Self {
        let graph = SnapGraph::build(walls, guides, config.snap_tolerance());
        let perimeter = rooms
            .iter()
            .flat_map(|r| r.edges().into_iter().map(|(_, a, b)| (a, b)))
            .collect();
        Self {
            graph,
            perimeter,
            transform,
            config,
            level,
        }
    }

    /// Plan points a wall is split at, from start to end
    ///
    /// Raw endpoints are kept; interior split nodes are projected onto the
    /// wall so the pieces stay collinear with what was drawn.
    pub fn split_points(&self, wall: &WallSegment) -> Vec<Point2D> {
        let chain = self.graph.wall_chain(wall.id);
        let mut interior: Vec<(f64, Point2D)> = Vec::new();
        if chain.len() > 2 {
            for &node in &chain[1..chain.len() - 1] {
                let pos = self.graph.nodes[node].pos;
                let hit = project_onto_segment(&pos, &wall.start, &wall.end);
                if hit.t > 0.0 && hit.t < 1.0 {
                    interior.push((hit.t, wall.point_at(hit.t)));
                }
            }
        }
        interior.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut points = Vec::with_capacity(interior.len() + 2);
        points.push(wall.start);
        points.extend(interior.into_iter().map(|(_, p)| p));
        points.push(wall.end);
        points
    }

    fn on_room_perimeter(&self, a: &WorldPoint, b: &WorldPoint) -> bool {
        let tol = self.config.snap_tolerance() * self.transform.scale();
        self.perimeter.iter().any(|(p, q)| {
            let (p, q) = (p.as_plane(), q.as_plane());
            point_to_segment_distance(&a.as_plane(), &p, &q) <= tol
                && point_to_segment_distance(&b.as_plane(), &p, &q) <= tol
        })
    }

    /// Strips for one wall, with the openings lying on each piece
    pub fn extrude(&self, wall: &WallSegment, openings: &[WorldOpening]) -> Vec<WallStrip> {
        let points = self.split_points(wall);
        let base_height = self.config.level_base(self.level);
        let mut strips = Vec::new();

        for pair in points.windows(2) {
            let a = self.transform.to_world(&pair[0]);
            let b = self.transform.to_world(&pair[1]);
            if a.distance_to(&b) < MIN_STRIP_LENGTH {
                continue;
            }
            if self.on_room_perimeter(&a, &b) {
                continue;
            }
            let mut strip = WallStrip {
                x0: a.x,
                z0: a.z,
                x1: b.x,
                z1: b.z,
                thickness: wall.thickness,
                height: self.config.wall_height_m,
                base_height,
                level: self.level,
                openings: Vec::new(),
            };
            strip.openings = map_strip_openings(&strip, openings, self.config);
            strips.push(strip);
        }
        strips
    }

    pub fn extrude_all<'w, I>(&self, walls: I, openings: &[WorldOpening]) -> Vec<WallStrip>
    where
        I: IntoIterator<Item = &'w WallSegment>,
    {
        walls
            .into_iter()
            .flat_map(|w| self.extrude(w, openings))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OpeningKind, RoomShape, WallRole};
    use approx::assert_relative_eq;

    fn wall(id: usize, x0: f64, y0: f64, x1: f64, y1: f64) -> WallSegment {
        WallSegment {
            id,
            start: Point2D::new(x0, y0),
            end: Point2D::new(x1, y1),
            thickness: 0.2,
            level: 0,
            group_id: None,
            manual: false,
            declared_role: WallRole::Unassigned,
        }
    }

    #[test]
    fn test_t_junction_splits_wall_into_two_strips() {
        let config = EngineConfig::default();
        let walls = vec![wall(0, 0.0, 0.0, 6.0, 0.0), wall(1, 2.0, 0.0, 2.0, 3.0)];
        let extruder =
            StripExtruder::new(&walls, &[], &[], PlanTransform::default(), 0, &config);

        let strips = extruder.extrude(&walls[0], &[]);
        assert_eq!(strips.len(), 2);
        assert_relative_eq!(strips[0].x1, 2.0);
        assert_relative_eq!(strips[1].x0, 2.0);
        assert_relative_eq!(strips[1].x1, 6.0);
        assert_relative_eq!(strips[0].thickness, 0.2);

        // the stem ends on the wall and is not split
        assert_eq!(extruder.extrude(&walls[1], &[]).len(), 1);
    }

    #[test]
    fn test_reversed_wall_keeps_direction_and_guides_split() {
        let config = EngineConfig::default();
        let walls = vec![wall(0, 5.0, 1.0, 0.0, 1.0)];
        let guides = [GuideLine::Vertical { x: 3.0 }];
        let extruder =
            StripExtruder::new(&walls, &guides, &[], PlanTransform::default(), 1, &config);

        let strips = extruder.extrude(&walls[0], &[]);
        assert_eq!(strips.len(), 2);
        assert_relative_eq!(strips[0].x0, 5.0);
        assert_relative_eq!(strips[0].x1, 3.0);
        assert_relative_eq!(strips[0].base_height, 3.5);
        assert_eq!(strips[0].level, 1);
    }

    #[test]
    fn test_diagonal_wall_is_one_strip_with_transform() {
        let config = EngineConfig::default();
        let walls = vec![wall(0, 0.0, 0.0, 3.0, 4.0)];
        let transform = PlanTransform {
            center_x: 10.0,
            center_z: -2.0,
            axis_sign: -1.0,
            scale: 1.0,
        };
        let extruder = StripExtruder::new(&walls, &[], &[], transform, 0, &config);
        let strips = extruder.extrude(&walls[0], &[]);
        assert_eq!(strips.len(), 1);
        assert_relative_eq!(strips[0].x1, 13.0);
        assert_relative_eq!(strips[0].z1, -6.0);
        assert_relative_eq!(strips[0].length(), 5.0);
    }

    #[test]
    fn test_pieces_on_room_perimeter_are_skipped() {
        let config = EngineConfig::default();
        let room = Room {
            id: "r".into(),
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
        };
        // a wall extending the room's bottom side past its corner
        let walls = vec![
            wall(0, 0.0, 0.0, 7.0, 0.0),
            wall(1, 4.0, 0.0, 4.0, 3.0),
        ];
        let extruder =
            StripExtruder::new(&walls, &[], &[room], PlanTransform::default(), 0, &config);
        let opening = WorldOpening {
            kind: OpeningKind::Window,
            start: WorldPoint::new(5.0, 0.0),
            end: WorldPoint::new(6.0, 0.0),
            host: Some(0),
            sill_m: 1.0,
            height_m: 1.5,
            manual: false,
            meta: None,
        };
        let strips = extruder.extrude(&walls[0], &[opening]);
        assert_eq!(strips.len(), 1);
        assert_relative_eq!(strips[0].x0, 4.0);
        assert_eq!(strips[0].openings.len(), 1);
        assert!(extruder.extrude(&walls[1], &[]).is_empty());
    }
}
