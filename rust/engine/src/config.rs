// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pass options and engine tolerances

use serde::{Deserialize, Serialize};

/// Smallest accepted snapping precision (1 mm)
pub const MIN_PRECISION_M: f64 = 0.001;
/// Largest accepted snapping precision (5 cm)
pub const MAX_PRECISION_M: f64 = 0.05;

/// Per-invocation options supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyOptions {
    /// Target floor level
    pub level: i32,
    /// Skip room detection and extrude every wall as a strip
    pub strips_only: bool,
    /// Enable room synthesis at all
    pub allow_rooms: bool,
    /// Keep existing 3D state when the plan has no walls
    pub non_destructive: bool,
    /// Matched rooms keep their previous world position
    pub preserve_positions: bool,
    /// Restrict polygon detection to unbranched closed loops
    pub strict_closed_loops_only: bool,
    /// Suppress user-facing status messages
    pub quiet: bool,
    /// A 3D drag gesture is in progress; the pass declines to run
    pub drag_in_progress: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            level: 0,
            strips_only: false,
            allow_rooms: true,
            non_destructive: false,
            preserve_positions: false,
            strict_closed_loops_only: true,
            quiet: false,
            drag_in_progress: false,
        }
    }
}

impl ApplyOptions {
    pub fn for_level(level: i32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }
}

/// Tolerances and construction defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Snapping grid step in meters, clamped to [1 mm, 5 cm]
    pub precision_m: f64,
    /// Max distance between an opening and the edge it is classified on
    pub opening_edge_tol_m: f64,
    /// Endpoint rounding for wall-strip deduplication
    pub strip_dedup_round_m: f64,
    /// Max gap between same-profile windows that still merge
    pub window_merge_gap_m: f64,
    /// Width/depth tolerance when matching rooms across passes
    pub room_size_match_m: f64,
    /// Radius within which a previous opening is reused
    pub opening_reuse_radius_m: f64,
    /// Reuse radius for manually placed openings
    pub manual_opening_reuse_radius_m: f64,
    /// Minimum face area kept by the permissive face pass
    pub min_polygon_face_area_m2: f64,
    pub default_door_width_m: f64,
    pub default_window_width_m: f64,
    pub default_window_sill_m: f64,
    pub default_window_height_m: f64,
    pub default_door_height_m: f64,
    pub default_wall_thickness_m: f64,
    /// Height of extruded wall strips
    pub wall_height_m: f64,
    pub room_height_m: f64,
    /// Vertical distance between floor levels
    pub level_height_m: f64,
    /// Rectangle rooms are never narrower than this
    pub min_room_side_m: f64,
    /// Cap on the steps of one loop or face walk; unset, the graph size bounds it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_traversal_steps: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precision_m: 0.03,
            opening_edge_tol_m: 0.05,
            strip_dedup_round_m: 0.001,
            window_merge_gap_m: 0.002,
            room_size_match_m: 0.02,
            opening_reuse_radius_m: 0.25,
            manual_opening_reuse_radius_m: 2.0,
            min_polygon_face_area_m2: 0.25,
            default_door_width_m: 0.9,
            default_window_width_m: 1.2,
            default_window_sill_m: 1.0,
            default_window_height_m: 1.5,
            default_door_height_m: 2.04,
            default_wall_thickness_m: 0.3,
            wall_height_m: 3.0,
            room_height_m: 3.0,
            level_height_m: 3.5,
            min_room_side_m: 0.5,
            max_traversal_steps: None,
        }
    }
}

impl EngineConfig {
    /// Load overrides from `HOUSEPLAN_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            precision_m: env_f64("HOUSEPLAN_PRECISION_M", defaults.precision_m),
            wall_height_m: env_f64("HOUSEPLAN_WALL_HEIGHT_M", defaults.wall_height_m),
            level_height_m: env_f64("HOUSEPLAN_LEVEL_HEIGHT_M", defaults.level_height_m),
            ..defaults
        }
    }

    /// Active snapping tolerance
    pub fn snap_tolerance(&self) -> f64 {
        if self.precision_m.is_finite() {
            self.precision_m.clamp(MIN_PRECISION_M, MAX_PRECISION_M)
        } else {
            Self::default().precision_m
        }
    }

    /// Base elevation of a floor level
    pub fn level_base(&self, level: i32) -> f64 {
        level as f64 * self.level_height_m
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or(default)
}
