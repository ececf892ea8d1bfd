// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D floor plan to 3D room conversion
//!
//! This crate turns the wall, window and door segments of a freehand 2D
//! plan into:
//! 1. Room volumes, rectangular or arbitrary closed polygons
//! 2. Freestanding wall strips for walls no room encloses
//! 3. Openings placed on room edges and strips
//!
//! A pass is a pure function of the previous state, the plan and the
//! options. Rooms and openings that survive an edit keep their ids and
//! names through best-effort matching against the previous state.
//!
//! # Usage
//!
//! ```rust,ignore
//! use houseplan_engine::{apply_plan, ApplyOptions, EngineConfig, FloorPlanState};
//! use houseplan_engine::plan::{PlanElement, PlanInput};
//!
//! let plan = PlanInput::new(vec![
//!     PlanElement::wall(0.0, 0.0, 4.0, 0.0),
//!     PlanElement::wall(4.0, 0.0, 4.0, 3.0),
//!     PlanElement::wall(4.0, 3.0, 0.0, 3.0),
//!     PlanElement::wall(0.0, 3.0, 0.0, 0.0),
//!     PlanElement::window_on(0, 0.25, 0.55),
//! ]);
//!
//! let outcome = apply_plan(
//!     &FloorPlanState::new(),
//!     &plan,
//!     &ApplyOptions::default(),
//!     &EngineConfig::default(),
//! );
//! assert_eq!(outcome.summary.rooms_rect, 1);
//! ```

pub mod apply;
pub mod config;
pub mod dedup;
pub mod error;
pub mod grouped;
pub mod line_ops;
pub mod openings;
pub mod plan;
pub mod polygon_detector;
pub mod rect_detector;
pub mod reconcile;
pub mod snap;
pub mod strips;
pub mod types;

// Re-export commonly used types and functions
pub use apply::{apply_plan, try_apply_plan, ApplyOutcome};
pub use config::{ApplyOptions, EngineConfig};
pub use error::{Error, Result};
pub use plan::{PlanElement, PlanInput, PlanTransform};
pub use types::{
    ApplyAction, ApplySummary, FloorPlanState, OpeningKind, Point2D, Room, RoomEdge,
    RoomOpening, RoomShape, StripOpening, WallStrip, WorldPoint,
};
