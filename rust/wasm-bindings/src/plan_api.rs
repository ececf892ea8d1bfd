// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WebAssembly bindings for the 2D-to-3D plan conversion engine
//!
//! The drawing UI owns the debounce timer; each call to `apply` runs one
//! complete pass against the state held here and returns the summary.

use houseplan_engine::{
    apply_plan, ApplyOptions, ApplySummary, EngineConfig, FloorPlanState, PlanInput,
    Result as EngineResult,
};
use wasm_bindgen::prelude::*;

/// Engine state between passes, independent of the JS boundary
#[derive(Debug, Default)]
pub struct PlanSession {
    state: FloorPlanState,
    config: EngineConfig,
    drag_in_progress: bool,
}

impl PlanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one pass; an empty options string means defaults
    pub fn apply(&mut self, plan_json: &str, options_json: &str) -> EngineResult<ApplySummary> {
        let plan: PlanInput = serde_json::from_str(plan_json)?;
        let mut options: ApplyOptions = if options_json.trim().is_empty() {
            ApplyOptions::default()
        } else {
            serde_json::from_str(options_json)?
        };
        options.drag_in_progress |= self.drag_in_progress;

        let outcome = apply_plan(&self.state, &plan, &options, &self.config);
        self.state = outcome.state;
        Ok(outcome.summary)
    }

    pub fn set_drag_in_progress(&mut self, dragging: bool) {
        self.drag_in_progress = dragging;
    }

    pub fn state(&self) -> &FloorPlanState {
        &self.state
    }

    pub fn load_state(&mut self, state_json: &str) -> EngineResult<()> {
        self.state = serde_json::from_str(state_json)?;
        Ok(())
    }

    pub fn set_config(&mut self, config_json: &str) -> EngineResult<()> {
        self.config = serde_json::from_str(config_json)?;
        Ok(())
    }
}

/// Plan conversion API
#[wasm_bindgen]
pub struct PlanEngineApi {
    session: PlanSession,
}

#[wasm_bindgen]
impl PlanEngineApi {
    /// Create an engine with an empty state and default tolerances
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            session: PlanSession::new(),
        }
    }

    /// Apply a plan to the held state
    ///
    /// # Arguments
    ///
    /// * `plan_json` - `{elements, transform, guides}` as produced by the 2D editor
    /// * `options_json` - `ApplyOptions` in camelCase, may be empty
    ///
    /// # Returns
    ///
    /// JSON string containing the pass summary
    #[wasm_bindgen(js_name = apply)]
    pub fn apply(&mut self, plan_json: &str, options_json: &str) -> Result<String, JsError> {
        let summary = self
            .session
            .apply(plan_json, options_json)
            .map_err(|e| JsError::new(&format!("Failed to apply plan: {}", e)))?;
        serde_json::to_string(&summary)
            .map_err(|e| JsError::new(&format!("Failed to serialize summary: {}", e)))
    }

    /// Mark a 3D drag gesture as started or finished
    #[wasm_bindgen(js_name = setDragInProgress)]
    pub fn set_drag_in_progress(&mut self, dragging: bool) {
        self.session.set_drag_in_progress(dragging);
    }

    /// Current rooms and wall strips of every level as JSON
    #[wasm_bindgen(js_name = stateJson)]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(self.session.state())
            .map_err(|e| JsError::new(&format!("Failed to serialize state: {}", e)))
    }

    /// Replace the held state, e.g. after loading a project
    #[wasm_bindgen(js_name = loadState)]
    pub fn load_state(&mut self, state_json: &str) -> Result<(), JsError> {
        self.session
            .load_state(state_json)
            .map_err(|e| JsError::new(&format!("Invalid state JSON: {}", e)))
    }

    /// Override tolerances and construction defaults
    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&mut self, config_json: &str) -> Result<(), JsError> {
        self.session
            .set_config(config_json)
            .map_err(|e| JsError::new(&format!("Invalid config JSON: {}", e)))
    }
}

impl Default for PlanEngineApi {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use houseplan_engine::ApplyAction;

    const SQUARE: &str = r#"{"elements": [
        {"type": "wall", "x0": 0, "y0": 0, "x1": 4, "y1": 0},
        {"type": "wall", "x0": 4, "y0": 0, "x1": 4, "y1": 4},
        {"type": "wall", "x0": 4, "y0": 4, "x1": 0, "y1": 4},
        {"type": "wall", "x0": 0, "y0": 4, "x1": 0, "y1": 0},
        {"type": "door", "host": 0, "t0": 0.4, "t1": 0.6, "meta": {"hinge": "t1"}}
    ]}"#;

    #[test]
    fn test_session_apply_and_drag_guard() {
        let mut session = PlanSession::new();
        let summary = session.apply(SQUARE, "").unwrap();
        assert_eq!(summary.action, ApplyAction::RoomsApplied);
        assert_eq!(session.state().rooms.len(), 1);
        assert_eq!(session.state().rooms[0].openings.len(), 1);

        session.set_drag_in_progress(true);
        let summary = session.apply(r#"{"elements": []}"#, "{}").unwrap();
        assert_eq!(summary.action, ApplyAction::SkippedDragInProgress);
        assert_eq!(session.state().rooms.len(), 1);
    }

    #[test]
    fn test_session_rejects_bad_json() {
        let mut session = PlanSession::new();
        assert!(session.apply("not json", "").is_err());
        assert!(session.load_state("[1, 2]").is_err());
    }

    #[test]
    fn test_session_state_round_trip() {
        let mut session = PlanSession::new();
        session.apply(SQUARE, r#"{"level": 2}"#).unwrap();
        let json = serde_json::to_string(session.state()).unwrap();

        let mut restored = PlanSession::new();
        restored.load_state(&json).unwrap();
        assert_eq!(restored.state(), session.state());
        assert_eq!(restored.state().rooms[0].level, 2);
    }
}
