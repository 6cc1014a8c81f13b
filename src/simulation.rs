// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Simulation Orchestrator

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::KernelConfig;
use crate::gate::{can_transition, GateInput, GateReason, GateStateMachine};
use crate::gravity::{GravityContext, RegionalConfigResolver, ResolvedGravity};
use crate::propagation::{
    propagate_to_all, PropagationParams, PropagationResult, DEFAULT_DENSITY_RADIUS_M,
};
use crate::types::{GateState, Node, NodeId, WorldState};
use crate::validation::validate_node;

/// Fixed simulated time per frame, seconds.
pub const FRAME_DT: f64 = 1.0 / 60.0;

/// Halo saturates at this multiple of the threshold.
const HALO_THETA_SCALE: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("focus node {0} not found")]
    FocusNodeNotFound(NodeId),
}

// ─── Frames ─────────────────────────────────────────────────────────────────

/// One node's render state for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimFrame {
    pub node_id: NodeId,
    /// Recomputed state if `can_transition` allows the move from the node's
    /// current state, otherwise the current state. An AFTERIMAGE node stays
    /// AFTERIMAGE here even when the cascade says LOCK.
    pub gate_state: GateState,
    /// Rule that produced the recomputed state, whether or not it was kept.
    pub gate_reason: GateReason,
    /// Distance from the focus node; 0 for the focus node itself.
    pub wave_radius: f64,
    /// `wave_radius * t`.
    pub wave_front: f64,
    pub color_temp: f64,
    pub inertia_halo: f64,
    pub impact_value: f64,
    /// This frame moved the node into LOCK.
    pub lock_edge: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimResult {
    pub focus_node_id: NodeId,
    pub t: f64,
    pub frames: Vec<SimFrame>,
    pub gate_triggered: bool,
    pub locked_nodes: Vec<NodeId>,
    pub total_entropy: f64,
    pub gravity: ResolvedGravity,
    /// Wall clock, milliseconds. Informational only.
    pub timestamp: f64,
}

impl SimResult {
    /// Equality on everything except `timestamp`.
    pub fn same_outcome(&self, other: &SimResult) -> bool {
        self.focus_node_id == other.focus_node_id
            && self.t == other.t
            && self.frames == other.frames
            && self.gate_triggered == other.gate_triggered
            && self.locked_nodes == other.locked_nodes
            && self.total_entropy == other.total_entropy
            && self.gravity == other.gravity
    }
}

/// `numerator / denominator` clamped into `[0, 1]`. A non-positive
/// denominator saturates any positive numerator.
fn unit_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 || denominator.is_nan() {
        return if numerator > 0.0 { 1.0 } else { 0.0 };
    }
    let ratio = numerator / denominator;
    if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) }
}

#[cfg(target_arch = "wasm32")]
fn wall_clock_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
fn wall_clock_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1_000.0)
        .unwrap_or(0.0)
}

// ─── SimulationOrchestrator ─────────────────────────────────────────────────

/// Runs propagation, gravity resolution and gate evaluation over a world
/// snapshot. Holds only immutable configuration.
#[derive(Debug, Clone)]
pub struct SimulationOrchestrator {
    resolver: RegionalConfigResolver,
    gates: GateStateMachine,
    density_radius_m: f64,
}

impl Default for SimulationOrchestrator {
    fn default() -> Self {
        Self::new(
            RegionalConfigResolver::default(),
            GateStateMachine::default(),
            DEFAULT_DENSITY_RADIUS_M,
        )
    }
}

impl SimulationOrchestrator {
    pub fn new(
        resolver: RegionalConfigResolver,
        gates: GateStateMachine,
        density_radius_m: f64,
    ) -> Self {
        Self { resolver, gates, density_radius_m }
    }

    pub fn from_config(config: &KernelConfig) -> Self {
        Self::new(
            RegionalConfigResolver::new(config.preset_table()),
            GateStateMachine::new(config.gate),
            config.propagation.density_radius_m,
        )
    }

    pub fn resolver(&self) -> &RegionalConfigResolver {
        &self.resolver
    }

    pub fn gates(&self) -> &GateStateMachine {
        &self.gates
    }

    /// One step at parameter `t`.
    ///
    /// Nodes failing validation are skipped; a focus node that fails
    /// validation counts as missing.
    pub fn simulate(
        &self,
        world: &WorldState,
        focus_node_id: &NodeId,
        t: f64,
    ) -> Result<SimResult, SimulationError> {
        let nodes: Vec<Node> = world
            .nodes
            .iter()
            .filter(|n| match validate_node(n) {
                Ok(()) => true,
                Err(e) => {
                    warn!(node = %n.id, error = %e, "skipping invalid node");
                    false
                }
            })
            .cloned()
            .collect();

        let focus = nodes
            .iter()
            .find(|n| &n.id == focus_node_id)
            .ok_or_else(|| SimulationError::FocusNodeNotFound(focus_node_id.clone()))?;

        let gravity = self
            .resolver
            .resolve_gravity(&GravityContext::new(world.region_id.as_str(), focus.gate_state));
        let theta = gravity.effective_theta;
        let params = PropagationParams::from_preset(&gravity.preset, self.density_radius_m);
        let propagation = propagate_to_all(focus, &nodes, &world.boundaries, &params);

        let mut frames = Vec::with_capacity(nodes.len());
        let mut locked_nodes = Vec::new();
        let mut total_entropy = 0.0;

        for node in &nodes {
            let m = &node.metrics;
            let decision = self.gates.evaluate(&GateInput {
                entropy_acceleration: m.entropy_acceleration,
                responsibility_load: m.responsibility_load,
                responsibility_cap: m.responsibility_cap,
                energy: m.energy,
                threshold: theta,
            });
            let old = node.gate_state;
            let gate_state = if can_transition(old, decision.state) { decision.state } else { old };
            let lock_edge = gate_state == GateState::Lock && old != GateState::Lock;
            if lock_edge {
                locked_nodes.push(node.id.clone());
            }
            total_entropy += m.entropy_acceleration * FRAME_DT;

            let hit: Option<&PropagationResult> = propagation.iter().find(|r| r.node_id == node.id);
            let wave_radius = hit.map_or(0.0, |r| r.distance);
            frames.push(SimFrame {
                node_id: node.id.clone(),
                gate_state,
                gate_reason: decision.reason,
                wave_radius,
                wave_front: wave_radius * t,
                color_temp: unit_ratio(m.entropy_acceleration, theta),
                inertia_halo: unit_ratio(m.inertia_delta, theta * HALO_THETA_SCALE),
                impact_value: hit.map_or(0.0, |r| r.impact),
                lock_edge,
            });
        }

        debug!(
            focus = %focus_node_id,
            t,
            frames = frames.len(),
            locked = locked_nodes.len(),
            "simulation step"
        );

        Ok(SimResult {
            focus_node_id: focus_node_id.clone(),
            t,
            gate_triggered: !locked_nodes.is_empty(),
            frames,
            locked_nodes,
            total_entropy,
            gravity,
            timestamp: wall_clock_ms(),
        })
    }

    /// `steps` independent runs at `t = i / steps` for `i` in `1..=steps`,
    /// all against the same snapshot.
    pub fn simulate_steps(
        &self,
        world: &WorldState,
        focus_node_id: &NodeId,
        steps: u32,
    ) -> Result<Vec<SimResult>, SimulationError> {
        (1..=steps)
            .map(|i| self.simulate(world, focus_node_id, i as f64 / steps as f64))
            .collect()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coordinate, NodeMetrics};

    fn metrics(ea: f64, load: f64, energy: f64, inertia_delta: f64) -> NodeMetrics {
        NodeMetrics {
            entropy_acceleration: ea,
            responsibility_load: load,
            responsibility_cap: 1.0,
            energy,
            inertia_delta,
        }
    }

    fn world() -> WorldState {
        WorldState::new(
            vec![
                Node::new("n1", 5.0, Coordinate::new(0.0, 0.0)).with_metrics(metrics(0.1, 0.0, 1.0, 0.3)),
                Node::new("n2", 2.0, Coordinate::new(0.01, 0.0)).with_metrics(metrics(0.8, 0.0, 1.0, 0.0)),
                Node::new("n3", 1.0, Coordinate::new(0.02, 0.0)).with_metrics(metrics(0.0, 0.0, -1.0, 3.0)),
            ],
            vec![],
            "default",
        )
    }

    #[test]
    fn frame_per_valid_node() {
        let sim = SimulationOrchestrator::default();
        let r = sim.simulate(&world(), &NodeId::from("n1"), 0.5).expect("test: focus exists");
        let ids: Vec<&str> = r.frames.iter().map(|f| f.node_id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3"]);

        let focus = &r.frames[0];
        assert_eq!(focus.wave_radius, 0.0);
        assert_eq!(focus.impact_value, 0.0);
        assert!((focus.color_temp - 0.1).abs() < 1e-12);
        assert!((focus.inertia_halo - 0.2).abs() < 1e-12);

        assert_eq!(r.frames[1].gate_state, GateState::Ring);
        assert!(r.frames[1].wave_radius > 0.0);
        assert_eq!(r.frames[1].wave_front, r.frames[1].wave_radius * 0.5);
        assert_eq!(r.frames[2].inertia_halo, 1.0);
    }

    #[test]
    fn lock_edge_is_reported() {
        let sim = SimulationOrchestrator::default();
        let r = sim.simulate(&world(), &NodeId::from("n1"), 1.0).expect("test: focus exists");
        assert!(r.gate_triggered);
        assert_eq!(r.locked_nodes, vec![NodeId::from("n3")]);
        assert_eq!(r.frames[2].gate_reason, GateReason::EnergyExhausted);
        assert!(r.frames[2].lock_edge);
    }

    #[test]
    fn already_locked_node_is_not_an_edge() {
        let mut w = world();
        w.nodes[2].gate_state = GateState::Lock;
        let r = SimulationOrchestrator::default()
            .simulate(&w, &NodeId::from("n1"), 1.0)
            .expect("test: focus exists");
        assert!(!r.gate_triggered);
        assert_eq!(r.frames[2].gate_state, GateState::Lock);
    }

    #[test]
    fn afterimage_never_regresses() {
        let mut w = world();
        w.nodes[1].gate_state = GateState::Afterimage;
        let r = SimulationOrchestrator::default()
            .simulate(&w, &NodeId::from("n1"), 1.0)
            .expect("test: focus exists");
        assert_eq!(r.frames[1].gate_state, GateState::Afterimage);
    }

    #[test]
    fn afterimage_focus_collapses_threshold() {
        let mut w = world();
        w.nodes[0].gate_state = GateState::Afterimage;
        let r = SimulationOrchestrator::default()
            .simulate(&w, &NodeId::from("n1"), 1.0)
            .expect("test: focus exists");
        assert_eq!(r.gravity.effective_theta, 0.0);

        // Any positive entropy acceleration now overflows a zero threshold.
        assert_eq!(r.frames[0].gate_reason, GateReason::EntropyOverflow);
        assert_eq!(r.frames[0].gate_state, GateState::Afterimage);
        assert!(!r.frames[0].lock_edge);
        assert_eq!(r.frames[0].color_temp, 1.0);

        assert_eq!(r.frames[1].gate_state, GateState::Lock);
        assert_eq!(r.frames[1].gate_reason, GateReason::EntropyOverflow);
        assert_eq!(r.locked_nodes, vec![NodeId::from("n2"), NodeId::from("n3")]);
    }

    #[test]
    fn total_entropy_uses_fixed_dt() {
        let r = SimulationOrchestrator::default()
            .simulate(&world(), &NodeId::from("n2"), 0.0)
            .expect("test: focus exists");
        assert!((r.total_entropy - 0.9 * FRAME_DT).abs() < 1e-12);
    }

    #[test]
    fn missing_and_invalid_focus() {
        let sim = SimulationOrchestrator::default();
        let missing = NodeId::from("does-not-exist");
        assert_eq!(
            sim.simulate(&world(), &missing, 0.5),
            Err(SimulationError::FocusNodeNotFound(missing.clone()))
        );

        let mut w = world();
        w.nodes[0].coordinate = Coordinate::new(f64::NAN, 0.0);
        let r = sim.simulate(&w, &NodeId::from("n1"), 0.5);
        assert!(matches!(r, Err(SimulationError::FocusNodeNotFound(_))));
        let r = sim.simulate(&w, &NodeId::from("n2"), 0.5).expect("test: n2 still valid");
        assert_eq!(r.frames.len(), 2);
    }

    #[test]
    fn steps_sweep_t() {
        let sim = SimulationOrchestrator::default();
        let runs = sim.simulate_steps(&world(), &NodeId::from("n1"), 4).expect("test: focus exists");
        let ts: Vec<f64> = runs.iter().map(|r| r.t).collect();
        assert_eq!(ts, vec![0.25, 0.5, 0.75, 1.0]);
        assert!(sim.simulate_steps(&world(), &NodeId::from("n1"), 0).expect("test: empty").is_empty());
    }

    #[test]
    fn unit_ratio_edges() {
        assert_eq!(unit_ratio(0.5, 0.0), 1.0);
        assert_eq!(unit_ratio(0.0, 0.0), 0.0);
        assert_eq!(unit_ratio(-1.0, 2.0), 0.0);
        assert_eq!(unit_ratio(4.0, 2.0), 1.0);
    }
}
