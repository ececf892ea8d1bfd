// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconstruction of rooms whose walls were tagged with a group id
//!
//! When the 2D plan is populated from existing 3D rooms, every perimeter
//! wall carries `groupId = "room:<id>"`. Such a room is rebuilt directly
//! from the bounding box of its walls as long as all four sides are still
//! drawn; if the user deleted a side the group falls through to generic
//! detection instead of being healed.

use crate::line_ops::spans_cover;
use crate::types::{WallId, WallSegment};

/// Prefix of group ids produced by the 3D-to-2D round trip
pub const ROOM_GROUP_PREFIX: &str = "room:";

/// Room rebuilt from a wall group, in plan space
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRoom {
    pub group_id: String,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub walls: Vec<WallId>,
}

impl GroupedRoom {
    /// Id of the room this group was exported from
    pub fn source_room_id(&self) -> Option<&str> {
        self.group_id.strip_prefix(ROOM_GROUP_PREFIX)
    }
}

/// Rebuild intact wall groups; incomplete groups are left for the detectors
pub fn preserve_grouped_rooms(walls: &[WallSegment], tol: f64) -> Vec<GroupedRoom> {
    // Groups in order of first appearance
    let mut groups: Vec<(&str, Vec<&WallSegment>)> = Vec::new();
    for w in walls {
        let Some(gid) = w.group_id.as_deref() else {
            continue;
        };
        if !gid.starts_with(ROOM_GROUP_PREFIX) {
            continue;
        }
        match groups.iter_mut().find(|(g, _)| *g == gid) {
            Some((_, members)) => members.push(w),
            None => groups.push((gid, vec![w])),
        }
    }

    let mut rooms = Vec::new();
    for (gid, members) in groups {
        if members.len() < 4 {
            tracing::debug!(group = gid, walls = members.len(), "Wall group too small");
            continue;
        }
        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        let mut min_y = f64::MAX;
        let mut max_y = f64::MIN;
        for w in &members {
            min_x = min_x.min(w.start.x).min(w.end.x);
            max_x = max_x.max(w.start.x).max(w.end.x);
            min_y = min_y.min(w.start.y).min(w.end.y);
            max_y = max_y.max(w.start.y).max(w.end.y);
        }

        let side_spans = |horizontal: bool, at: f64| -> Vec<(f64, f64)> {
            members
                .iter()
                .filter(|w| {
                    if horizontal {
                        w.is_horizontal(tol) && ((w.start.y + w.end.y) / 2.0 - at).abs() <= tol
                    } else {
                        w.is_vertical(tol) && ((w.start.x + w.end.x) / 2.0 - at).abs() <= tol
                    }
                })
                .map(|w| {
                    if horizontal {
                        (w.start.x.min(w.end.x), w.start.x.max(w.end.x))
                    } else {
                        (w.start.y.min(w.end.y), w.start.y.max(w.end.y))
                    }
                })
                .collect()
        };
        let intact = spans_cover(&side_spans(true, min_y), min_x, max_x, tol)
            && spans_cover(&side_spans(true, max_y), min_x, max_x, tol)
            && spans_cover(&side_spans(false, min_x), min_y, max_y, tol)
            && spans_cover(&side_spans(false, max_x), min_y, max_y, tol);
        if !intact {
            tracing::debug!(group = gid, "Wall group perimeter incomplete, using detection");
            continue;
        }

        rooms.push(GroupedRoom {
            group_id: gid.to_string(),
            min_x,
            max_x,
            min_y,
            max_y,
            walls: members.iter().map(|w| w.id).collect(),
        });
    }
    rooms
}
