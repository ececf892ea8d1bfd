// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One conversion pass: previous state + plan + options -> new state + summary
//!
//! The pass works on a copy of the previous state and only hands it back
//! once every stage has succeeded, so a failure leaves the caller's state
//! exactly as it was. Stage order:
//!
//! 1. resolve plan elements into walls and world-space openings
//! 2. rebuild intact wall groups as rooms
//! 3. rectangle detection (loop stitching, then track scan)
//! 4. polygon detection over the remaining axis-aligned walls
//! 5. candidate deduplication and room construction with openings
//! 6. identity reconciliation against the previous rooms of the level
//! 7. strip extrusion for every wall not claimed by a room

use crate::config::{ApplyOptions, EngineConfig};
use crate::dedup::{
    dedupe_rects, dedupe_rooms, dedupe_strips, drop_partitioned, drop_rects_matching_polygons,
};
use crate::error::Result;
use crate::grouped::preserve_grouped_rooms;
use crate::line_ops::quantize_meters;
use crate::openings::{map_room_openings, WorldOpening};
use crate::plan::{PlanInput, PlanTransform, ResolvedPlan};
use crate::polygon_detector::{detect_polygons, walls_on_outline, PolygonCandidate};
use crate::reconcile::{reconcile_openings, reconcile_rooms};
use crate::rect_detector::{detect_rectangles, RectCandidate};
use crate::strips::StripExtruder;
use crate::types::{
    ApplyAction, ApplySummary, FloorPlanState, Point2D, Room, RoomShape, WallId, WallRole,
    WallSegment, WallStrip, WorldPoint,
};
use rustc_hash::FxHashMap;

pub const STATUS_SKIPPED_NO_WALLS: &str = "Skipped apply: no room walls on current floor";
pub const STATUS_STRIPS_APPLIED: &str = "Applied 2D plan to 3D (standalone walls)";
pub const STATUS_KEPT_ROOMS: &str = "Kept existing rooms; updated wall strips";
pub const STATUS_ROOMS_APPLIED: &str = "Applied 2D plan to 3D (rooms + openings)";
pub const STATUS_SKIPPED_DRAG: &str = "Skipped apply: 3D drag in progress";
pub const STATUS_FAILED: &str = "Apply to 3D failed";

/// Rooms whose geometry agrees this closely are the same room
const ROOM_DEDUP_EPS: f64 = 1e-4;

/// Result of a pass
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub state: FloorPlanState,
    pub summary: ApplySummary,
}

/// Run a pass, turning internal failures into a `Failed` summary
///
/// On failure the returned state is a copy of `previous`.
pub fn apply_plan(
    previous: &FloorPlanState,
    plan: &PlanInput,
    options: &ApplyOptions,
    config: &EngineConfig,
) -> ApplyOutcome {
    match try_apply_plan(previous, plan, options, config) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, level = options.level, "Plan conversion failed");
            let mut summary = ApplySummary::new(ApplyAction::Failed, options.level);
            if !options.quiet {
                summary.status = Some(STATUS_FAILED.to_string());
            }
            ApplyOutcome {
                state: previous.clone(),
                summary,
            }
        }
    }
}

/// Run a pass, returning internal failures as errors
pub fn try_apply_plan(
    previous: &FloorPlanState,
    plan: &PlanInput,
    options: &ApplyOptions,
    config: &EngineConfig,
) -> Result<ApplyOutcome> {
    let level = options.level;

    if options.drag_in_progress {
        tracing::debug!(level, "Drag in progress, declining to apply");
        let summary = summarize(
            ApplySummary::new(ApplyAction::SkippedDragInProgress, level),
            STATUS_SKIPPED_DRAG.to_string(),
            options,
        );
        return Ok(ApplyOutcome {
            state: previous.clone(),
            summary,
        });
    }

    let resolved = plan.resolve(level, config);
    let openings: Vec<WorldOpening> = resolved
        .openings
        .iter()
        .map(|o| WorldOpening::from_resolved(o, &plan.transform))
        .collect();

    let pass = Pass {
        previous,
        resolved: &resolved,
        openings: &openings,
        transform: plan.transform,
        options,
        config,
    };

    let outcome = if resolved.walls.is_empty() {
        pass.no_walls()
    } else if !options.allow_rooms {
        pass.strips_only(false)
    } else if options.strips_only {
        pass.strips_only(true)
    } else {
        pass.with_rooms()?
    };

    let s = &outcome.summary;
    tracing::info!(
        action = ?s.action,
        level = s.level,
        rooms_rect = s.rooms_rect,
        rooms_poly = s.rooms_poly,
        strips = s.strips_count,
        openings = s.openings_count,
        skipped = s.skipped_elements,
        "Plan applied"
    );
    Ok(outcome)
}

fn summarize(mut summary: ApplySummary, status: String, options: &ApplyOptions) -> ApplySummary {
    if !options.quiet {
        summary.status = Some(status);
    }
    summary
}

/// Inputs shared by the stages of one pass
struct Pass<'a> {
    previous: &'a FloorPlanState,
    resolved: &'a ResolvedPlan,
    openings: &'a [WorldOpening],
    transform: PlanTransform,
    options: &'a ApplyOptions,
    config: &'a EngineConfig,
}

impl Pass<'_> {
    fn level(&self) -> i32 {
        self.options.level
    }

    fn summary(&self, action: ApplyAction) -> ApplySummary {
        let mut summary = ApplySummary::new(action, self.level());
        summary.skipped_elements = self.resolved.skipped;
        summary
    }

    fn no_walls(&self) -> ApplyOutcome {
        let level = self.level();
        if self.options.non_destructive {
            let summary = summarize(
                self.summary(ApplyAction::SkippedNoWalls),
                STATUS_SKIPPED_NO_WALLS.to_string(),
                self.options,
            );
            return ApplyOutcome {
                state: self.previous.clone(),
                summary,
            };
        }
        let mut state = self.previous.clone();
        state.replace_level(level, Vec::new(), Vec::new());
        let summary = summarize(
            self.summary(ApplyAction::ClearedNoWalls),
            format!("Cleared floor {} rooms (no walls in 2D)", level),
            self.options,
        );
        ApplyOutcome { state, summary }
    }

    /// Every wall becomes strips
    ///
    /// `rebuild_rooms` clears or refreshes the level's rooms; otherwise they
    /// are left as they were.
    fn strips_only(&self, rebuild_rooms: bool) -> ApplyOutcome {
        let level = self.level();
        let mut state = self.previous.clone();
        let keep_rooms =
            rebuild_rooms && self.options.non_destructive && !self.options.strips_only;
        let mut refreshed_openings = 0;

        if keep_rooms {
            refreshed_openings = self.refresh_room_openings(&mut state);
        } else if rebuild_rooms {
            state.rooms.retain(|r| r.level != level);
        }

        let strips = self.extrude(self.resolved.walls.iter(), &[]);
        let mut summary = self.summary(ApplyAction::StripsOnly);
        summary.strips_count = strips.len();
        summary.openings_count =
            refreshed_openings + strips.iter().map(|s| s.openings.len()).sum::<usize>();
        state.replace_level_strips(level, strips);

        let status = if keep_rooms {
            STATUS_KEPT_ROOMS
        } else {
            STATUS_STRIPS_APPLIED
        };
        ApplyOutcome {
            state,
            summary: summarize(summary, status.to_string(), self.options),
        }
    }

    /// Recompute openings of the level's rectangular rooms from the plan
    fn refresh_room_openings(&self, state: &mut FloorPlanState) -> usize {
        let level = self.level();
        let targets: Vec<usize> = state
            .rooms
            .iter()
            .enumerate()
            .filter(|(_, r)| r.level == level && r.is_rectangle())
            .map(|(i, _)| i)
            .collect();
        let mut count = 0;
        for i in targets {
            let before = state.rooms[i].clone();
            let mut room = before.clone();
            room.openings = map_room_openings(&room, self.openings, self.config);
            reconcile_openings(&mut room, Some(&before), state, self.config);
            count += room.openings.len();
            state.rooms[i] = room;
        }
        count
    }

    fn extrude<'w, I>(&self, walls: I, rooms: &[Room]) -> Vec<WallStrip>
    where
        I: IntoIterator<Item = &'w WallSegment>,
    {
        let extruder = StripExtruder::new(
            &self.resolved.walls,
            &self.resolved.guides,
            rooms,
            self.transform,
            self.level(),
            self.config,
        );
        dedupe_strips(
            extruder.extrude_all(walls, self.openings),
            self.config.strip_dedup_round_m,
        )
    }

    fn with_rooms(&self) -> Result<ApplyOutcome> {
        let level = self.level();
        let tol = self.config.snap_tolerance();
        let walls = &self.resolved.walls;
        let mut roles: FxHashMap<WallId, WallRole> = FxHashMap::default();

        let grouped = preserve_grouped_rooms(walls, tol);
        for g in &grouped {
            for &w in &g.walls {
                roles.insert(w, WallRole::NonRoom);
            }
        }
        for w in walls {
            if w.declared_role == WallRole::NonRoom {
                roles.insert(w.id, WallRole::NonRoom);
            }
        }

        let eligible: Vec<&WallSegment> = walls
            .iter()
            .filter(|w| !roles.contains_key(&w.id))
            .collect();
        let rects = detect_rectangles(&eligible, tol);
        for &w in &rects.claimed {
            roles.insert(w, WallRole::Room);
        }

        let poly_input: Vec<&WallSegment> = eligible
            .iter()
            .copied()
            .filter(|w| w.is_axis_aligned(tol) && !roles.contains_key(&w.id))
            .collect();
        let polys = detect_polygons(
            &poly_input,
            &self.resolved.guides,
            tol,
            self.options.strict_closed_loops_only,
            self.config.min_polygon_face_area_m2,
            self.config.max_traversal_steps,
        )?;
        for &w in &polys.claimed {
            roles.insert(w, WallRole::Room);
        }

        let candidates = dedupe_rects(rects.rects, tol);
        let candidates = drop_partitioned(candidates, &rects.tracks);
        let candidates = drop_rects_matching_polygons(candidates, &polys.polygons, tol);
        for r in &candidates {
            let outline = [
                Point2D::new(r.min_x, r.min_y),
                Point2D::new(r.max_x, r.min_y),
                Point2D::new(r.max_x, r.max_y),
                Point2D::new(r.min_x, r.max_y),
            ];
            for w in walls_on_outline(&eligible, &outline, tol) {
                roles.insert(w, WallRole::Room);
            }
        }
        let (rect_like, polygons): (Vec<PolygonCandidate>, Vec<PolygonCandidate>) = polys
            .polygons
            .into_iter()
            .partition(|p| p.is_rect_like(tol));

        let mut rooms: Vec<Room> = Vec::new();
        for g in &grouped {
            let mut room = self.rect_room(g.min_x, g.max_x, g.min_y, g.max_y);
            room.group_id = Some(g.group_id.clone());
            rooms.push(room);
        }
        rooms.extend(
            candidates
                .iter()
                .map(|r: &RectCandidate| self.rect_room(r.min_x, r.max_x, r.min_y, r.max_y)),
        );
        rooms.extend(rect_like.iter().map(|p| {
            let (x0, x1, y0, y1) = p.bounds();
            self.rect_room(x0, x1, y0, y1)
        }));
        rooms.extend(polygons.iter().map(|p| self.polygon_room(&p.points)));

        if rooms.is_empty() {
            tracing::debug!(level, "No closed geometry, falling back to wall strips");
            return Ok(self.strips_only(true));
        }

        let mut rooms = dedupe_rooms(rooms, ROOM_DEDUP_EPS);
        for room in rooms.iter_mut() {
            room.openings = map_room_openings(room, self.openings, self.config);
        }
        // Strips are cut against the rooms where the walls are, before
        // reconciliation may move them back to a previous position.
        let footprints = rooms.clone();

        let mut state = self.previous.clone();
        let prev_level: Vec<Room> = self.previous.rooms_on_level(level).cloned().collect();
        let rooms = reconcile_rooms(
            &prev_level,
            rooms,
            &mut state,
            self.options.preserve_positions,
            self.config,
        );
        for room in &rooms {
            room.validate()?;
        }

        let loose = walls.iter().filter(|w| !roles.contains_key(&w.id));
        let strips = self.extrude(loose, &footprints);

        let mut summary = self.summary(ApplyAction::RoomsApplied);
        summary.rooms_rect = rooms.iter().filter(|r| r.is_rectangle()).count();
        summary.rooms_poly = rooms.len() - summary.rooms_rect;
        summary.strips_count = strips.len();
        summary.openings_count = rooms.iter().map(|r| r.openings.len()).sum::<usize>()
            + strips.iter().map(|s| s.openings.len()).sum::<usize>();

        state.replace_level(level, rooms, strips);
        Ok(ApplyOutcome {
            state,
            summary: summarize(summary, STATUS_ROOMS_APPLIED.to_string(), self.options),
        })
    }

    /// Rectangle room from a plan-space box; size in whole centimetres
    fn rect_room(&self, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Room {
        let a = self.transform.to_world(&Point2D::new(min_x, min_y));
        let b = self.transform.to_world(&Point2D::new(max_x, max_y));
        let min_side = self.config.min_room_side_m;
        Room {
            id: String::new(),
            name: String::new(),
            level: self.level(),
            group_id: None,
            height: self.config.room_height_m,
            shape: RoomShape::Rectangle {
                center: WorldPoint::new((a.x + b.x) / 2.0, (a.z + b.z) / 2.0),
                width: quantize_meters((b.x - a.x).abs(), 2).max(min_side),
                depth: quantize_meters((b.z - a.z).abs(), 2).max(min_side),
            },
            openings: Vec::new(),
        }
    }

    fn polygon_room(&self, points: &[Point2D]) -> Room {
        Room {
            id: String::new(),
            name: String::new(),
            level: self.level(),
            group_id: None,
            height: self.config.room_height_m,
            shape: RoomShape::Polygon {
                footprint: points.iter().map(|p| self.transform.to_world(p)).collect(),
            },
            openings: Vec::new(),
        }
    }
}
