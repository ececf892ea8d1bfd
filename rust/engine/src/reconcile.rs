// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identity reconciliation against the previous pass
//!
//! Rooms are rebuilt from scratch on every pass, so ids, user-assigned
//! names and manually adjusted openings survive only through matching:
//!
//! - a room rebuilt from a wall group takes the previous room that group
//!   was exported from;
//! - every other room takes the nearest unused previous room of the same
//!   shape kind whose width and depth agree within the size tolerance
//!   (greedy, in room order, ties to the earlier previous room);
//! - openings of a matched room take the nearest unused previous opening of
//!   the same kind, measured from the room centre so a moved room keeps
//!   its openings.
//!
//! Matching is best-effort; unmatched rooms and openings get fresh ids.

use crate::config::EngineConfig;
use crate::grouped::ROOM_GROUP_PREFIX;
use crate::types::{FloorPlanState, Room, RoomOpening, WorldPoint};

/// Name given to rooms without a previous counterpart
pub const DEFAULT_ROOM_NAME: &str = "Room";

/// Assign ids and names to freshly built rooms
///
/// `previous` are the rooms of the target level before the pass; `ids` is
/// the state fresh identifiers are drawn from.
pub fn reconcile_rooms(
    previous: &[Room],
    rooms: Vec<Room>,
    ids: &mut FloorPlanState,
    preserve_positions: bool,
    config: &EngineConfig,
) -> Vec<Room> {
    let matches = match_rooms(previous, &rooms, config.room_size_match_m);

    rooms
        .into_iter()
        .zip(matches)
        .map(|(mut room, matched)| {
            match matched.map(|j| &previous[j]) {
                Some(prev) => {
                    tracing::debug!(id = %prev.id, "Reusing room identity");
                    room.id = prev.id.clone();
                    room.name = prev.name.clone();
                    if preserve_positions {
                        let (from, to) = (room.center(), prev.center());
                        room.translate(to.x - from.x, to.z - from.z);
                    }
                    reconcile_openings(&mut room, Some(prev), ids, config);
                }
                None => {
                    room.id = ids.fresh_id("room");
                    if room.name.is_empty() {
                        room.name = DEFAULT_ROOM_NAME.to_string();
                    }
                    reconcile_openings(&mut room, None, ids, config);
                }
            }
            room
        })
        .collect()
}

fn group_matches(prev: &Room, group_id: &str) -> bool {
    prev.group_id.as_deref() == Some(group_id)
        || group_id
            .strip_prefix(ROOM_GROUP_PREFIX)
            .is_some_and(|id| id == prev.id)
}

/// Index of the previous room each new room inherits from
pub fn match_rooms(previous: &[Room], rooms: &[Room], size_tol: f64) -> Vec<Option<usize>> {
    let mut used = vec![false; previous.len()];
    let mut matches: Vec<Option<usize>> = vec![None; rooms.len()];

    for (i, room) in rooms.iter().enumerate() {
        let Some(gid) = room.group_id.as_deref() else {
            continue;
        };
        if let Some(j) = (0..previous.len()).find(|&j| !used[j] && group_matches(&previous[j], gid))
        {
            used[j] = true;
            matches[i] = Some(j);
        }
    }

    for (i, room) in rooms.iter().enumerate() {
        if matches[i].is_some() {
            continue;
        }
        let (w, d) = room.size();
        let center = room.center();
        let mut best: Option<(usize, f64)> = None;
        for (j, prev) in previous.iter().enumerate() {
            if used[j] || prev.is_rectangle() != room.is_rectangle() {
                continue;
            }
            let (pw, pd) = prev.size();
            if (pw - w).abs() > size_tol || (pd - d).abs() > size_tol {
                continue;
            }
            let dist = prev.center().distance_to(&center);
            if best.map_or(true, |(_, b)| dist < b) {
                best = Some((j, dist));
            }
        }
        if let Some((j, _)) = best {
            used[j] = true;
            matches[i] = Some(j);
        }
    }
    matches
}

/// Opening midpoint relative to the room centre
fn local_midpoint(room: &Room, opening: &RoomOpening) -> Option<WorldPoint> {
    let (a, b) = room.opening_world(opening)?;
    let c = room.center();
    Some(WorldPoint::new(
        (a.x + b.x) / 2.0 - c.x,
        (a.z + b.z) / 2.0 - c.z,
    ))
}

fn edge_accepts(room: &Room, opening: &RoomOpening) -> bool {
    room.edge_segment(opening.edge)
        .is_some_and(|(a, b)| opening.end_m <= a.distance_to(&b) + 1e-6)
}

/// Reuse previous opening ids; manually placed openings are kept as they were
pub fn reconcile_openings(
    room: &mut Room,
    previous: Option<&Room>,
    ids: &mut FloorPlanState,
    config: &EngineConfig,
) {
    let prev_openings: Vec<(&RoomOpening, Option<WorldPoint>)> = previous
        .map(|p| {
            p.openings
                .iter()
                .map(|o| (o, local_midpoint(p, o)))
                .collect()
        })
        .unwrap_or_default();
    let mut used = vec![false; prev_openings.len()];

    let mut out = Vec::with_capacity(room.openings.len());
    for mut opening in std::mem::take(&mut room.openings) {
        let here = local_midpoint(room, &opening);
        let mut best: Option<(usize, f64)> = None;
        if let Some(here) = here {
            for (j, (prev, mid)) in prev_openings.iter().enumerate() {
                let Some(mid) = mid else { continue };
                if used[j] || prev.kind != opening.kind {
                    continue;
                }
                let radius = if prev.manual {
                    config.manual_opening_reuse_radius_m
                } else {
                    config.opening_reuse_radius_m
                };
                let dist = mid.distance_to(&here);
                if dist <= radius && best.map_or(true, |(_, b)| dist < b) {
                    best = Some((j, dist));
                }
            }
        }

        match best {
            Some((j, _)) => {
                used[j] = true;
                let prev = prev_openings[j].0;
                if prev.manual && edge_accepts(room, prev) {
                    opening = prev.clone();
                } else {
                    opening.id = prev.id.clone();
                }
            }
            None => opening.id = ids.fresh_id("opening"),
        }
        out.push(opening);
    }
    room.openings = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OpeningKind, RoomEdge, RoomShape};
    use approx::assert_relative_eq;

    fn rect(id: &str, name: &str, x: f64, z: f64, w: f64, d: f64) -> Room {
        Room {
            id: id.into(),
            name: name.into(),
            level: 0,
            group_id: None,
            height: 3.0,
            shape: RoomShape::Rectangle {
                center: WorldPoint::new(x, z),
                width: w,
                depth: d,
            },
            openings: Vec::new(),
        }
    }

    fn window(id: &str, start_m: f64, end_m: f64, manual: bool) -> RoomOpening {
        RoomOpening {
            id: id.into(),
            kind: OpeningKind::Window,
            edge: RoomEdge::MinZ,
            start_m,
            end_m,
            sill_m: 1.0,
            height_m: 1.5,
            manual,
            meta: None,
        }
    }

    #[test]
    fn test_moved_room_keeps_identity() {
        let config = EngineConfig::default();
        let previous = vec![rect("r1", "Kitchen", 2.0, 1.5, 4.0, 3.0)];
        let mut ids = FloorPlanState::new();

        let rooms = reconcile_rooms(
            &previous,
            vec![rect("", "", 2.3, 1.5, 4.01, 3.0)],
            &mut ids,
            false,
            &config,
        );
        assert_eq!(rooms[0].id, "r1");
        assert_eq!(rooms[0].name, "Kitchen");
        assert_relative_eq!(rooms[0].center().x, 2.3);

        let rooms = reconcile_rooms(
            &previous,
            vec![rect("", "", 2.3, 1.5, 4.0, 3.0)],
            &mut ids,
            true,
            &config,
        );
        assert_relative_eq!(rooms[0].center().x, 2.0);
    }

    #[test]
    fn test_resized_room_gets_fresh_id() {
        let config = EngineConfig::default();
        let previous = vec![rect("r1", "Kitchen", 2.0, 1.5, 4.0, 3.0)];
        let mut ids = FloorPlanState::new();
        let rooms = reconcile_rooms(
            &previous,
            vec![rect("", "", 2.0, 1.5, 4.5, 3.0)],
            &mut ids,
            false,
            &config,
        );
        assert_eq!(rooms[0].id, "room_1");
        assert_eq!(rooms[0].name, DEFAULT_ROOM_NAME);
    }

    #[test]
    fn test_equal_rooms_match_nearest() {
        let previous = vec![
            rect("left", "A", 0.0, 0.0, 3.0, 3.0),
            rect("right", "B", 10.0, 0.0, 3.0, 3.0),
        ];
        let rooms = vec![
            rect("", "", 9.5, 0.0, 3.0, 3.0),
            rect("", "", 0.5, 0.0, 3.0, 3.0),
        ];
        assert_eq!(match_rooms(&previous, &rooms, 0.02), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_group_id_wins_over_size() {
        let previous = vec![
            rect("r2", "Hall", 0.0, 0.0, 3.0, 3.0),
            rect("r9", "Study", 5.0, 0.0, 2.0, 2.0),
        ];
        let mut grouped = rect("", "", 0.0, 0.0, 3.0, 3.0);
        grouped.group_id = Some("room:r9".into());
        assert_eq!(match_rooms(&previous, &[grouped], 0.02), vec![Some(1)]);
    }

    #[test]
    fn test_opening_ids_and_manual_placement() {
        let config = EngineConfig::default();
        let mut prev = rect("r1", "Kitchen", 2.0, 1.5, 4.0, 3.0);
        prev.openings.push(window("w-auto", 1.0, 2.0, false));
        prev.openings.push(window("w-manual", 2.6, 3.6, true));
        let mut ids = FloorPlanState::new();

        let mut room = rect("r1", "Kitchen", 2.0, 1.5, 4.0, 3.0);
        room.openings.push(window("", 1.1, 2.1, false));
        room.openings.push(window("", 2.0, 3.0, false));
        room.openings.push(RoomOpening {
            kind: OpeningKind::Door,
            ..window("", 1.0, 2.0, false)
        });
        reconcile_openings(&mut room, Some(&prev), &mut ids, &config);

        assert_eq!(room.openings[0].id, "w-auto");
        assert_relative_eq!(room.openings[0].start_m, 1.1);
        assert_eq!(room.openings[1].id, "w-manual");
        assert_relative_eq!(room.openings[1].start_m, 2.6);
        assert!(room.openings[1].manual);
        assert_eq!(room.openings[2].id, "opening_1");
    }
}
