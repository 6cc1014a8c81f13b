// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Gate State Machine

//! Threshold gate: OBSERVE -> RING -> LOCK -> AFTERIMAGE.
//!
//! [`GateStateMachine`] is stateless; it maps inputs to a state. Holding the
//! "current" state per node is the caller's job, and [`GateLedger`] is the
//! holder the kernel session uses. It only ever moves a node forward.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{GateState, NodeId};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Load above `cap * overload_multiplier` locks the gate.
    pub overload_multiplier: f64,
    /// Entropy acceleration above `threshold * ring_fraction` rings.
    pub ring_fraction: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { overload_multiplier: 1.5, ring_fraction: 0.7 }
    }
}

// ---------------------------------------------------------------------------
// Inputs and decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateInput {
    pub entropy_acceleration: f64,
    pub responsibility_load: f64,
    pub responsibility_cap: f64,
    pub energy: f64,
    pub threshold: f64,
}

/// Which rule of the cascade produced a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    /// G3: energy below zero.
    EnergyExhausted,
    /// G2: load beyond the hard overload multiple of the cap.
    LoadOverflow,
    /// G1: entropy acceleration beyond the threshold.
    EntropyOverflow,
    EntropyWarning,
    SoftOverload,
    Nominal,
    /// Forced terminal transition.
    Sealed,
}

impl GateReason {
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::EntropyOverflow => Some("G1"),
            Self::LoadOverflow => Some("G2"),
            Self::EnergyExhausted => Some("G3"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub state: GateState,
    pub reason: GateReason,
}

// ---------------------------------------------------------------------------
// GateStateMachine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct GateStateMachine {
    config: GateConfig,
}

impl GateStateMachine {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Ordered rule cascade; the first matching rule wins.
    pub fn evaluate(&self, input: &GateInput) -> GateDecision {
        let cfg = &self.config;
        let (state, reason) = if input.energy < 0.0 {
            (GateState::Lock, GateReason::EnergyExhausted)
        } else if input.responsibility_load > input.responsibility_cap * cfg.overload_multiplier {
            (GateState::Lock, GateReason::LoadOverflow)
        } else if input.entropy_acceleration > input.threshold {
            (GateState::Lock, GateReason::EntropyOverflow)
        } else if input.entropy_acceleration > input.threshold * cfg.ring_fraction {
            (GateState::Ring, GateReason::EntropyWarning)
        } else if input.responsibility_load > input.responsibility_cap {
            (GateState::Ring, GateReason::SoftOverload)
        } else {
            (GateState::Observe, GateReason::Nominal)
        };
        GateDecision { state, reason }
    }

    pub fn determine_gate(&self, input: &GateInput) -> GateState {
        self.evaluate(input).state
    }
}

/// True only for a strictly forward move.
pub fn can_transition(from: GateState, to: GateState) -> bool {
    to.ordinal() > from.ordinal()
}

/// Every state reachable from `state`, in order. Empty for AFTERIMAGE.
pub fn next_possible_states(state: GateState) -> Vec<GateState> {
    GateState::ALL
        .iter()
        .copied()
        .filter(|s| can_transition(state, *s))
        .collect()
}

// ---------------------------------------------------------------------------
// GravityEvent / GateLedger
// ---------------------------------------------------------------------------

/// An accepted forward gate transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityEvent {
    pub node_id: NodeId,
    pub from: GateState,
    pub to: GateState,
    pub reason: GateReason,
    /// Caller-supplied time, milliseconds.
    pub at: i64,
}

impl GravityEvent {
    pub fn is_lock(&self) -> bool {
        self.to == GateState::Lock
    }
}

/// Per-node current gate state, advanced only through [`can_transition`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateLedger {
    states: BTreeMap<NodeId, GateState>,
}

impl GateLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; OBSERVE for nodes never seen.
    pub fn current(&self, node_id: &NodeId) -> GateState {
        self.states.get(node_id).copied().unwrap_or_default()
    }

    /// Record a state the caller already holds, keeping whichever is further
    /// along. Used when loading a snapshot.
    pub fn observe(&mut self, node_id: &NodeId, state: GateState) {
        let entry = self.states.entry(node_id.clone()).or_default();
        if can_transition(*entry, state) {
            *entry = state;
        }
    }

    /// Move `node_id` to `proposed` if that is a forward transition.
    pub fn advance(
        &mut self,
        node_id: &NodeId,
        proposed: GateState,
        reason: GateReason,
        at: i64,
    ) -> Option<GravityEvent> {
        let from = self.current(node_id);
        if !can_transition(from, proposed) {
            debug!(node = %node_id, %from, to = %proposed, "gate transition rejected");
            return None;
        }
        self.states.insert(node_id.clone(), proposed);
        if proposed == GateState::Lock {
            info!(node = %node_id, %from, reason = ?reason, "gate locked");
        }
        Some(GravityEvent { node_id: node_id.clone(), from, to: proposed, reason, at })
    }

    /// Move a node to the terminal state.
    pub fn seal(&mut self, node_id: &NodeId, at: i64) -> Option<GravityEvent> {
        self.advance(node_id, GateState::Afterimage, GateReason::Sealed, at)
    }

    pub fn states(&self) -> &BTreeMap<NodeId, GateState> {
        &self.states
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn input(ea: f64, load: f64, cap: f64, energy: f64, threshold: f64) -> GateInput {
        GateInput {
            entropy_acceleration: ea,
            responsibility_load: load,
            responsibility_cap: cap,
            energy,
            threshold,
        }
    }

    #[test]
    fn negative_energy_always_locks() {
        let g = GateStateMachine::default();
        let d = g.evaluate(&input(0.0, 0.0, 1.0, -1.0, 1.0));
        assert_eq!(d.state, GateState::Lock);
        assert_eq!(d.reason, GateReason::EnergyExhausted);
        assert_eq!(d.reason.code(), Some("G3"));
        // Even when every other rule would also fire, G3 wins.
        let d = g.evaluate(&input(9.0, 9.0, 1.0, -0.001, 1.0));
        assert_eq!(d.reason, GateReason::EnergyExhausted);
    }

    #[test]
    fn cascade_order() {
        let g = GateStateMachine::default();
        assert_eq!(g.evaluate(&input(0.0, 1.6, 1.0, 1.0, 1.0)).reason, GateReason::LoadOverflow);
        assert_eq!(g.evaluate(&input(1.1, 0.0, 1.0, 1.0, 1.0)).reason, GateReason::EntropyOverflow);
        assert_eq!(g.evaluate(&input(0.8, 0.0, 1.0, 1.0, 1.0)).state, GateState::Ring);
        assert_eq!(g.evaluate(&input(0.8, 0.0, 1.0, 1.0, 1.0)).reason, GateReason::EntropyWarning);
        assert_eq!(g.evaluate(&input(0.1, 1.2, 1.0, 1.0, 1.0)).reason, GateReason::SoftOverload);
        assert_eq!(g.determine_gate(&input(0.1, 0.5, 1.0, 0.0, 1.0)), GateState::Observe);
    }

    #[test]
    fn boundaries_are_strict() {
        let g = GateStateMachine::default();
        // Exactly at threshold is not an overflow, but is above the ring band.
        assert_eq!(g.determine_gate(&input(1.0, 0.0, 1.0, 1.0, 1.0)), GateState::Ring);
        // Exactly at the ring band is still OBSERVE.
        assert_eq!(g.determine_gate(&input(0.7, 0.0, 1.0, 1.0, 1.0)), GateState::Observe);
        // Exactly at the cap is still OBSERVE.
        assert_eq!(g.determine_gate(&input(0.0, 1.0, 1.0, 1.0, 1.0)), GateState::Observe);
    }

    #[test]
    fn zero_threshold_locks_any_positive_acceleration() {
        let g = GateStateMachine::default();
        assert_eq!(g.determine_gate(&input(0.001, 0.0, 1.0, 1.0, 0.0)), GateState::Lock);
        assert_eq!(g.determine_gate(&input(0.0, 0.0, 1.0, 1.0, 0.0)), GateState::Observe);
    }

    #[test]
    fn transitions_are_monotonic() {
        assert!(!can_transition(GateState::Lock, GateState::Ring));
        assert!(can_transition(GateState::Observe, GateState::Lock));
        assert!(!can_transition(GateState::Ring, GateState::Ring));
        for s in GateState::ALL {
            assert!(!can_transition(GateState::Afterimage, s));
        }
    }

    #[test]
    fn next_states() {
        assert_eq!(
            next_possible_states(GateState::Observe),
            vec![GateState::Ring, GateState::Lock, GateState::Afterimage]
        );
        assert_eq!(next_possible_states(GateState::Lock), vec![GateState::Afterimage]);
        assert!(next_possible_states(GateState::Afterimage).is_empty());
    }

    #[test]
    fn ledger_only_moves_forward() {
        let mut ledger = GateLedger::new();
        let id = NodeId::from("n1");
        assert_eq!(ledger.current(&id), GateState::Observe);

        let ev = ledger.advance(&id, GateState::Lock, GateReason::EntropyOverflow, 10);
        let ev = ev.expect("test: forward transition should be accepted");
        assert_eq!(ev.from, GateState::Observe);
        assert!(ev.is_lock());

        assert!(ledger.advance(&id, GateState::Ring, GateReason::EntropyWarning, 11).is_none());
        assert!(ledger.advance(&id, GateState::Lock, GateReason::EntropyOverflow, 12).is_none());
        assert_eq!(ledger.current(&id), GateState::Lock);

        let sealed = ledger.seal(&id, 13).expect("test: seal from LOCK");
        assert_eq!(sealed.to, GateState::Afterimage);
        assert!(ledger.seal(&id, 14).is_none());
        assert!(ledger.advance(&id, GateState::Lock, GateReason::Nominal, 15).is_none());
    }

    #[test]
    fn observe_keeps_furthest_state() {
        let mut ledger = GateLedger::new();
        let id = NodeId::from(7u32);
        ledger.observe(&id, GateState::Lock);
        ledger.observe(&id, GateState::Ring);
        assert_eq!(ledger.current(&id), GateState::Lock);
    }
}
