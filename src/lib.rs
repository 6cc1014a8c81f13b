// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel

pub mod types;
pub mod geo;
pub mod propagation;
pub mod gravity;
pub mod gate;
pub mod inertia;
pub mod scale;
pub mod validation;
pub mod config;
pub mod simulation;
pub mod kernel;

pub use types::*;
pub use config::{ConfigError, KernelConfig};
pub use gate::{
    can_transition, next_possible_states, GateDecision, GateLedger, GateReason, GateStateMachine,
    GravityEvent,
};
pub use gravity::{GravityContext, RegionalConfigResolver, RegionalPreset, ResolvedGravity};
pub use inertia::{DebtStatus, InertiaConfig, InertiaDebtEngine, InertiaDebtResult};
pub use kernel::CausalKernel;
pub use propagation::{propagate, propagate_to_all, PropagationParams, PropagationResult};
pub use scale::{NodeVisibility, ScaleLevel, ScaleLockFilter};
pub use simulation::{SimFrame, SimResult, SimulationError, SimulationOrchestrator};
pub use validation::{ValidationError, ValidationReport};

use std::collections::BTreeSet;

use serde::Serialize;
use wasm_bindgen::prelude::*;

fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ─── WASM Interface ──────────────────────────────────────────────────────────

#[wasm_bindgen]
impl CausalKernel {
    /// `config` may be `undefined`/`null` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn js_new(config: JsValue) -> Result<CausalKernel, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let config: KernelConfig = if config.is_undefined() || config.is_null() {
            KernelConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(js_error)?
        };
        CausalKernel::new(config).map_err(js_error)
    }

    /// Replace the world snapshot; returns the validation report.
    #[wasm_bindgen(js_name = load_world)]
    pub fn js_load_world(&mut self, world: JsValue) -> Result<JsValue, JsValue> {
        let world: WorldState = serde_wasm_bindgen::from_value(world).map_err(js_error)?;
        Ok(to_js(&self.load_world(world)))
    }

    #[wasm_bindgen(js_name = get_world)]
    pub fn js_get_world(&self) -> JsValue {
        to_js(self.world())
    }

    #[wasm_bindgen(js_name = simulate)]
    pub fn js_simulate(
        &mut self,
        focus_node_id: &str,
        t: f64,
        now: f64,
    ) -> Result<JsValue, JsValue> {
        let result = self.simulate(&NodeId::from(focus_node_id), t, now as i64).map_err(js_error)?;
        Ok(to_js(&result))
    }

    #[wasm_bindgen(js_name = simulate_steps)]
    pub fn js_simulate_steps(
        &mut self,
        focus_node_id: &str,
        steps: u32,
        now: f64,
    ) -> Result<JsValue, JsValue> {
        let results = self
            .simulate_steps(&NodeId::from(focus_node_id), steps, now as i64)
            .map_err(js_error)?;
        Ok(to_js(&results))
    }

    #[wasm_bindgen(js_name = get_gate_state)]
    pub fn js_gate_state(&self, node_id: &str) -> String {
        self.gate_state(&NodeId::from(node_id)).label().to_string()
    }

    #[wasm_bindgen(js_name = get_next_states)]
    pub fn js_next_states(&self, node_id: &str) -> JsValue {
        to_js(&next_possible_states(self.gate_state(&NodeId::from(node_id))))
    }

    #[wasm_bindgen(js_name = seal_node)]
    pub fn js_seal(&mut self, node_id: &str, now: f64) -> JsValue {
        match self.seal(&NodeId::from(node_id), now as i64) {
            Some(event) => to_js(&event),
            None => JsValue::NULL,
        }
    }

    /// Gravity events since the last drain.
    #[wasm_bindgen(js_name = drain_events)]
    pub fn js_drain_events(&mut self) -> JsValue {
        to_js(&self.drain_events())
    }

    #[wasm_bindgen(js_name = process_debt)]
    pub fn js_process_debt(&mut self, node_id: &str, now: f64) -> JsValue {
        match self.process_debt(&NodeId::from(node_id), now as i64) {
            Some(result) => to_js(&result),
            None => JsValue::NULL,
        }
    }

    #[wasm_bindgen(js_name = process_all_debts)]
    pub fn js_process_all_debts(&mut self, now: f64) -> JsValue {
        to_js(&self.process_all_debts(now as i64))
    }

    #[wasm_bindgen(js_name = record_entropy_reduction)]
    pub fn js_record_entropy_reduction(&mut self, node_id: &str, amount: f64) -> f64 {
        self.record_entropy_reduction(&NodeId::from(node_id), amount)
    }

    #[wasm_bindgen(js_name = record_violation)]
    pub fn js_record_violation(&mut self, node_id: &str, timestamp: f64) {
        self.record_violation(&NodeId::from(node_id), timestamp as i64);
    }

    /// `entropy_reduced` is an array of node ids.
    #[wasm_bindgen(js_name = run_decay_cycle)]
    pub fn js_run_decay_cycle(
        &mut self,
        entropy_reduced: JsValue,
        now: f64,
    ) -> Result<JsValue, JsValue> {
        let ids: Vec<NodeId> = serde_wasm_bindgen::from_value(entropy_reduced).map_err(js_error)?;
        let ids: BTreeSet<NodeId> = ids.into_iter().collect();
        Ok(to_js(&self.run_decay_cycle(&ids, now as i64)))
    }

    #[wasm_bindgen(js_name = get_debt)]
    pub fn js_debt(&self, node_id: &str) -> f64 {
        self.debts().debt(&NodeId::from(node_id))
    }

    #[wasm_bindgen(js_name = get_all_debts)]
    pub fn js_all_debts(&self) -> JsValue {
        to_js(&self.all_debts())
    }

    #[wasm_bindgen(js_name = get_latency_modifier)]
    pub fn js_latency_modifier(&self, node_id: &str) -> f64 {
        self.debts().latency_modifier(&NodeId::from(node_id))
    }

    #[wasm_bindgen(js_name = get_available_actions)]
    pub fn js_available_actions(&self, node_id: &str, all_actions: Vec<String>) -> Vec<String> {
        self.debts().available_actions(&NodeId::from(node_id), &all_actions)
    }

    #[wasm_bindgen(js_name = set_operator_scale)]
    pub fn js_set_operator_scale(&mut self, level: u8) -> Result<(), JsValue> {
        let level = ScaleLevel::new(level).map_err(js_error)?;
        self.set_operator_scale(level);
        Ok(())
    }

    #[wasm_bindgen(js_name = get_visibility)]
    pub fn js_visibility(&self) -> JsValue {
        to_js(&self.visibility())
    }

    #[wasm_bindgen(js_name = validate_camera_z)]
    pub fn js_validate_camera_z(&self, requested_z: f64) -> JsValue {
        to_js(&self.validate_camera(requested_z))
    }

    /// Reset to an empty world with the same configuration.
    #[wasm_bindgen(js_name = reset)]
    pub fn js_reset(&mut self) {
        self.reset();
    }
}
