// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Kernel Session

//! One kernel session per world.
//!
//! [`CausalKernel`] owns the snapshot, the orchestrator, the debt ledger and
//! the gate ledger for a single world. Callers construct and hold it
//! explicitly; nothing in the crate is global. Every simulation result is
//! fed back through the [`GateLedger`], so a node's gate state only moves
//! forward for the lifetime of the session even though each simulation step
//! recomputes states from the raw snapshot.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};
use wasm_bindgen::prelude::*;

use crate::config::{ConfigError, KernelConfig};
use crate::gate::{GateLedger, GravityEvent};
use crate::inertia::{DecayReport, InertiaDebtEngine, InertiaDebtResult};
use crate::scale::{
    validate_camera_z, CameraValidation, NodeVisibility, ScaleLevel, ScaleLockFilter,
};
use crate::simulation::{SimResult, SimulationError, SimulationOrchestrator};
use crate::types::{GateState, Node, NodeId, WorldState};
use crate::validation::{validate_node, validate_world, ValidationReport};

// ─── CausalKernel struct ────────────────────────────────────────────────────

#[wasm_bindgen]
pub struct CausalKernel {
    pub(crate) world: WorldState,
    pub(crate) orchestrator: SimulationOrchestrator,
    pub(crate) debts: InertiaDebtEngine,
    pub(crate) gates: GateLedger,
    pub(crate) scale_filter: ScaleLockFilter,
    pub(crate) config: KernelConfig,
    /// Accepted gate transitions not yet drained by the caller.
    pub(crate) events: Vec<GravityEvent>,
}

impl Default for CausalKernel {
    fn default() -> Self {
        Self::build(KernelConfig::default())
    }
}

// ─── Internal Logic (Testable, pure Rust) ───────────────────────────────────

impl CausalKernel {
    pub fn new(config: KernelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: KernelConfig) -> Self {
        Self {
            world: WorldState::default(),
            orchestrator: SimulationOrchestrator::from_config(&config),
            debts: InertiaDebtEngine::new(config.inertia),
            gates: GateLedger::new(),
            scale_filter: ScaleLockFilter::new(config.operator_scale),
            config,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Replace the snapshot. Gate states already held by the session are
    /// kept; a snapshot can only move a node further along.
    pub fn load_world(&mut self, world: WorldState) -> ValidationReport {
        let report = validate_world(&world);
        for node in &world.nodes {
            self.gates.observe(&node.id, node.gate_state);
        }
        self.world = world;
        self.sync_gate_states();
        info!(
            nodes = self.world.nodes.len(),
            boundaries = self.world.boundaries.len(),
            region = %self.world.region_id,
            issues = report.issues.len(),
            "world loaded"
        );
        report
    }

    fn sync_gate_states(&mut self) {
        for node in &mut self.world.nodes {
            node.gate_state = self.gates.current(&node.id);
        }
    }

    fn absorb(&mut self, result: &SimResult, now: i64) {
        for frame in &result.frames {
            let advanced =
                self.gates.advance(&frame.node_id, frame.gate_state, frame.gate_reason, now);
            if let Some(event) = advanced {
                self.events.push(event);
            }
        }
    }

    /// One simulation step against the current snapshot.
    pub fn simulate(
        &mut self,
        focus: &NodeId,
        t: f64,
        now: i64,
    ) -> Result<SimResult, SimulationError> {
        let result = self.orchestrator.simulate(&self.world, focus, t)?;
        self.absorb(&result, now);
        self.sync_gate_states();
        Ok(result)
    }

    /// Every step is computed from the snapshot as it was before the call.
    pub fn simulate_steps(
        &mut self,
        focus: &NodeId,
        steps: u32,
        now: i64,
    ) -> Result<Vec<SimResult>, SimulationError> {
        let results = self.orchestrator.simulate_steps(&self.world, focus, steps)?;
        for result in &results {
            self.absorb(result, now);
        }
        self.sync_gate_states();
        Ok(results)
    }

    pub fn gate_state(&self, node_id: &NodeId) -> GateState {
        self.gates.current(node_id)
    }

    /// Move a node to AFTERIMAGE.
    pub fn seal(&mut self, node_id: &NodeId, now: i64) -> Option<GravityEvent> {
        let event = self.gates.seal(node_id, now)?;
        self.events.push(event.clone());
        self.sync_gate_states();
        Some(event)
    }

    pub fn drain_events(&mut self) -> Vec<GravityEvent> {
        std::mem::take(&mut self.events)
    }

    // ─── Inertia debt ───────────────────────────────────────────────────────

    /// `None` if the node is absent from the snapshot or fails validation.
    pub fn process_debt(&mut self, node_id: &NodeId, now: i64) -> Option<InertiaDebtResult> {
        let node = self.world.node(node_id)?;
        if validate_node(node).is_err() {
            debug!(node = %node_id, "debt skipped for invalid node");
            return None;
        }
        Some(self.debts.process_node(node, now))
    }

    pub fn process_all_debts(&mut self, now: i64) -> Vec<InertiaDebtResult> {
        let valid = self.valid_nodes();
        self.debts.process_all(&valid, now)
    }

    pub fn record_entropy_reduction(&mut self, node_id: &NodeId, amount: f64) -> f64 {
        self.debts.record_entropy_reduction(node_id, amount)
    }

    pub fn record_violation(&mut self, node_id: &NodeId, timestamp: i64) {
        self.debts.record_violation(node_id, timestamp);
    }

    pub fn run_decay_cycle(&mut self, entropy_reduced: &BTreeSet<NodeId>, now: i64) -> DecayReport {
        self.debts.run_decay_cycle(entropy_reduced, now)
    }

    pub fn debts(&self) -> &InertiaDebtEngine {
        &self.debts
    }

    pub fn all_debts(&self) -> BTreeMap<NodeId, f64> {
        self.debts.all_debts()
    }

    // ─── Scale lock ─────────────────────────────────────────────────────────

    pub fn operator_scale(&self) -> ScaleLevel {
        self.scale_filter.operator()
    }

    pub fn set_operator_scale(&mut self, level: ScaleLevel) {
        self.scale_filter = ScaleLockFilter::new(level);
    }

    /// Visibility of every node that passes validation, in snapshot order.
    pub fn visibility(&self) -> Vec<NodeVisibility> {
        self.scale_filter.filter(&self.valid_nodes())
    }

    pub fn validate_camera(&self, requested_z: f64) -> CameraValidation {
        validate_camera_z(requested_z, &self.scale_filter.camera_constraints())
    }

    /// Drop the snapshot and both ledgers; configuration is kept.
    pub fn reset(&mut self) {
        *self = Self::build(self.config.clone());
    }

    fn valid_nodes(&self) -> Vec<Node> {
        self.world.nodes.iter().filter(|n| validate_node(n).is_ok()).cloned().collect()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coordinate, NodeMetrics};

    const HOUR_MS: i64 = 3_600_000;

    fn world(energy: f64) -> WorldState {
        let hot = NodeMetrics { energy, ..NodeMetrics::default() };
        WorldState::new(
            vec![
                Node::new("focus", 5.0, Coordinate::new(0.0, 0.0)).with_timing(0, 0, 0.5),
                Node::new("hot", 2.0, Coordinate::new(0.01, 0.01)).with_metrics(hot),
            ],
            vec![],
            "default",
        )
    }

    #[test]
    fn lock_survives_a_calmer_snapshot() {
        let mut k = CausalKernel::default();
        k.load_world(world(-1.0));
        let focus = NodeId::from("focus");
        let r = k.simulate(&focus, 0.5, 100).expect("test: focus exists");
        assert!(r.gate_triggered);
        let events = k.drain_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_lock());
        assert!(k.drain_events().is_empty());

        // Energy recovers, but the session keeps the node locked.
        k.load_world(world(1.0));
        let r = k.simulate(&focus, 0.5, 200).expect("test: focus exists");
        assert!(!r.gate_triggered);
        assert_eq!(k.gate_state(&NodeId::from("hot")), GateState::Lock);
        assert_eq!(r.frames[1].gate_state, GateState::Lock);
    }

    #[test]
    fn sealed_node_stays_sealed() {
        let mut k = CausalKernel::default();
        k.load_world(world(-1.0));
        let hot = NodeId::from("hot");
        let ev = k.seal(&hot, 1).expect("test: seal from OBSERVE");
        assert_eq!(ev.to, GateState::Afterimage);
        k.simulate(&NodeId::from("focus"), 1.0, 2).expect("test: focus exists");
        assert_eq!(k.gate_state(&hot), GateState::Afterimage);
        assert_eq!(k.drain_events().len(), 1);
    }

    #[test]
    fn debt_flows_through_session() {
        let mut k = CausalKernel::default();
        k.load_world(world(1.0));
        let focus = NodeId::from("focus");
        let r = k.process_debt(&focus, 2 * HOUR_MS).expect("test: node exists");
        assert_eq!(r.total_debt, 5.0);
        assert_eq!(k.record_entropy_reduction(&focus, 2.0), 3.0);
        let report = k.run_decay_cycle(&BTreeSet::from([focus.clone()]), 2 * HOUR_MS);
        assert_eq!(report.decayed, vec![focus.clone()]);
        assert!((k.all_debts()[&focus] - 2.85).abs() < 1e-12);
        assert!(k.process_debt(&NodeId::from("ghost"), 0).is_none());
    }

    #[test]
    fn operator_scale_drives_visibility_and_camera() {
        let mut k = CausalKernel::default();
        let mut w = world(1.0);
        w.nodes[1].scale = ScaleLevel::new(3).expect("test: K3");
        k.load_world(w);
        k.set_operator_scale(ScaleLevel::new(2).expect("test: K2"));
        let vis = k.visibility();
        assert_eq!(vis.len(), 2);
        assert_eq!(vis[1].visibility, crate::scale::Visibility::ShapeOnly);

        // A node the orchestrator would skip is not reported either.
        let mut w = world(1.0);
        w.nodes[1].coordinate = Coordinate::new(95.0, 0.0);
        k.load_world(w);
        let ids: Vec<NodeId> = k.visibility().into_iter().map(|v| v.node_id).collect();
        assert_eq!(ids, vec![NodeId::from("focus")]);
        let cam = k.validate_camera(350.0);
        assert!(cam.violation);
        assert_eq!(cam.z, 200.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = KernelConfig::default();
        config.inertia.decay_rate = -0.1;
        assert!(CausalKernel::new(config).is_err());
    }

    #[test]
    fn reset_clears_ledgers() {
        let mut k = CausalKernel::default();
        k.load_world(world(-1.0));
        k.simulate(&NodeId::from("focus"), 0.5, 1).expect("test: focus exists");
        k.process_all_debts(HOUR_MS);
        k.reset();
        assert!(k.world().nodes.is_empty());
        assert!(k.all_debts().is_empty());
        assert!(k.drain_events().is_empty());
        assert_eq!(k.gate_state(&NodeId::from("hot")), GateState::Observe);
    }
}
