// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plan input submitted by the drawing UI and its validation
//!
//! Elements are addressed by their index in [`PlanInput::elements`]; window
//! and door hosts refer to that index. Resolution drops malformed entries
//! (non-finite coordinates, dangling hosts, zero-length walls) and counts
//! them instead of failing the pass.

use crate::config::EngineConfig;
use crate::types::{DoorMeta, OpeningKind, Point2D, WallId, WallRole, WallSegment, WorldPoint};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Plan-to-world mapping used by the drawing UI
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanTransform {
    pub center_x: f64,
    pub center_z: f64,
    /// +1 when plan y grows with world z, -1 when it is mirrored
    pub axis_sign: f64,
    pub scale: f64,
}

impl Default for PlanTransform {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_z: 0.0,
            axis_sign: 1.0,
            scale: 1.0,
        }
    }
}

impl PlanTransform {
    pub fn sign(&self) -> f64 {
        if self.axis_sign < 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    pub fn scale(&self) -> f64 {
        if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            1.0
        }
    }

    pub fn to_world(&self, p: &Point2D) -> WorldPoint {
        WorldPoint::new(
            self.center_x + p.x * self.scale(),
            self.center_z + self.sign() * p.y * self.scale(),
        )
    }

    pub fn to_plan(&self, p: &WorldPoint) -> Point2D {
        Point2D::new(
            (p.x - self.center_x) / self.scale(),
            self.sign() * (p.z - self.center_z) / self.scale(),
        )
    }
}

/// Infinite construction line that splits the walls it crosses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "axis", rename_all = "lowercase")]
pub enum GuideLine {
    Horizontal { y: f64 },
    Vertical { x: f64 },
}

/// Wall as drawn in the plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WallElement {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// User-drawn rather than inferred
    #[serde(default)]
    pub manual: bool,
    #[serde(default, alias = "wallRole")]
    pub role: WallRole,
}

/// Window or door, either hosted on a wall or free-standing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OpeningElement {
    /// Element index of the host wall
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sill_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_m: Option<f64>,
    pub manual: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<DoorMeta>,
}

/// One element of the plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlanElement {
    Wall(WallElement),
    Window(OpeningElement),
    Door(OpeningElement),
}

impl PlanElement {
    pub fn wall(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        PlanElement::Wall(WallElement {
            x0,
            y0,
            x1,
            y1,
            thickness: None,
            group_id: None,
            manual: true,
            role: WallRole::Unassigned,
        })
    }

    pub fn grouped_wall(x0: f64, y0: f64, x1: f64, y1: f64, group_id: &str) -> Self {
        match Self::wall(x0, y0, x1, y1) {
            PlanElement::Wall(w) => PlanElement::Wall(WallElement {
                group_id: Some(group_id.to_string()),
                ..w
            }),
            other => other,
        }
    }

    pub fn window_on(host: usize, t0: f64, t1: f64) -> Self {
        PlanElement::Window(OpeningElement {
            host: Some(host),
            t0: Some(t0),
            t1: Some(t1),
            ..OpeningElement::default()
        })
    }

    pub fn door_on(host: usize, t0: f64, t1: f64) -> Self {
        PlanElement::Door(OpeningElement {
            host: Some(host),
            t0: Some(t0),
            t1: Some(t1),
            ..OpeningElement::default()
        })
    }

    pub fn window_between(start: Point2D, end: Point2D) -> Self {
        PlanElement::Window(OpeningElement::between(start, end))
    }

    pub fn door_between(start: Point2D, end: Point2D) -> Self {
        PlanElement::Door(OpeningElement::between(start, end))
    }
}

impl OpeningElement {
    pub fn between(start: Point2D, end: Point2D) -> Self {
        Self {
            x0: Some(start.x),
            y0: Some(start.y),
            x1: Some(end.x),
            y1: Some(end.y),
            ..Self::default()
        }
    }
}

/// Everything the drawing UI submits for one floor level
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanInput {
    pub elements: Vec<PlanElement>,
    pub transform: PlanTransform,
    pub guides: Vec<GuideLine>,
}

impl PlanInput {
    pub fn new(elements: Vec<PlanElement>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    pub fn with_transform(mut self, transform: PlanTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Validate elements into walls and openings with plan endpoints
    pub fn resolve(&self, level: i32, config: &EngineConfig) -> ResolvedPlan {
        let mut walls: Vec<WallSegment> = Vec::new();
        let mut skipped = 0usize;

        for (index, element) in self.elements.iter().enumerate() {
            let PlanElement::Wall(w) = element else {
                continue;
            };
            let start = Point2D::new(w.x0, w.y0);
            let end = Point2D::new(w.x1, w.y1);
            if !start.is_finite() || !end.is_finite() {
                tracing::warn!(element = index, "Skipping wall with non-finite coordinates");
                skipped += 1;
                continue;
            }
            if start.distance_to(&end) < 1e-6 {
                tracing::debug!(element = index, "Skipping zero-length wall");
                skipped += 1;
                continue;
            }
            let thickness = w
                .thickness
                .filter(|t| t.is_finite() && *t > 0.0)
                .unwrap_or(config.default_wall_thickness_m);
            walls.push(WallSegment {
                id: index,
                start,
                end,
                thickness,
                level,
                group_id: w.group_id.clone(),
                manual: w.manual,
                declared_role: w.role,
            });
        }

        let valid_hosts: FxHashSet<WallId> = walls.iter().map(|w| w.id).collect();
        let mut openings: Vec<ResolvedOpening> = Vec::new();

        for (index, element) in self.elements.iter().enumerate() {
            let (kind, o) = match element {
                PlanElement::Window(o) => (OpeningKind::Window, o),
                PlanElement::Door(o) => (OpeningKind::Door, o),
                PlanElement::Wall(_) => continue,
            };
            let endpoints = match o.host {
                Some(host) => {
                    if !valid_hosts.contains(&host) {
                        tracing::warn!(element = index, host, "Skipping opening with invalid host");
                        skipped += 1;
                        continue;
                    }
                    host_endpoints(&walls, host, o)
                }
                None => free_endpoints(o),
            };
            let Some((start, end)) = endpoints else {
                tracing::warn!(element = index, "Skipping opening with unusable coordinates");
                skipped += 1;
                continue;
            };

            let (sill_m, height_m) = match kind {
                OpeningKind::Window => (
                    finite_or(o.sill_m, config.default_window_sill_m),
                    finite_or(o.height_m, config.default_window_height_m),
                ),
                OpeningKind::Door => (0.0, finite_or(o.height_m, config.default_door_height_m)),
            };

            openings.push(ResolvedOpening {
                index,
                kind,
                start,
                end,
                host: o.host,
                sill_m,
                height_m,
                manual: o.manual,
                meta: o.meta,
            });
        }

        let guides = self
            .guides
            .iter()
            .copied()
            .filter(|g| match g {
                GuideLine::Horizontal { y } => y.is_finite(),
                GuideLine::Vertical { x } => x.is_finite(),
            })
            .collect();

        ResolvedPlan {
            walls,
            openings,
            guides,
            skipped,
        }
    }
}

fn finite_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(default)
}

fn host_endpoints(
    walls: &[WallSegment],
    host: WallId,
    o: &OpeningElement,
) -> Option<(Point2D, Point2D)> {
    let wall = walls.iter().find(|w| w.id == host)?;
    let t0 = o.t0.unwrap_or(0.0);
    let t1 = o.t1.unwrap_or(t0);
    if !t0.is_finite() || !t1.is_finite() {
        return None;
    }
    let (t0, t1) = (t0.clamp(0.0, 1.0), t1.clamp(0.0, 1.0));
    let (t0, t1) = if t1 < t0 { (t1, t0) } else { (t0, t1) };
    Some((wall.point_at(t0), wall.point_at(t1)))
}

fn free_endpoints(o: &OpeningElement) -> Option<(Point2D, Point2D)> {
    let start = Point2D::new(o.x0?, o.y0?);
    let end = Point2D::new(o.x1?, o.y1?);
    (start.is_finite() && end.is_finite()).then_some((start, end))
}

/// Window or door with plan-space endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOpening {
    /// Element index in the submitted plan
    pub index: usize,
    pub kind: OpeningKind,
    pub start: Point2D,
    pub end: Point2D,
    pub host: Option<WallId>,
    pub sill_m: f64,
    pub height_m: f64,
    pub manual: bool,
    pub meta: Option<DoorMeta>,
}

/// Validated plan for one pass
#[derive(Debug, Clone, Default)]
pub struct ResolvedPlan {
    pub walls: Vec<WallSegment>,
    pub openings: Vec<ResolvedOpening>,
    pub guides: Vec<GuideLine>,
    /// Elements dropped as malformed
    pub skipped: usize,
}
