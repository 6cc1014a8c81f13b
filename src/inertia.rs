// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Inertia Debt

//! Per-node inertia debt ledger.
//!
//! Debt grows with `clamp(mass, 1, 10) * elapsed_hours * clamp(psi, 0, 1)`
//! every time a node is processed and only shrinks through explicit entropy
//! reduction or the conditional decay cycle. From the running total the
//! engine derives drag, entropy, a status band, flags, latency and the
//! subset of actions still available.
//!
//! The ledger is the kernel's only mutable state. Every writer takes
//! `&mut self`, so one engine has exactly one writer at a time; callers that
//! share an engine across threads wrap it in a `Mutex`. Readers get copies.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{clamp_mass, Node, NodeId};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Drag above this adds [`DebtFlag::SevereDrag`].
const SEVERE_DRAG: f64 = 0.7;

/// Fraction of the action list kept per status.
const WARNING_ACTION_FRACTION: f64 = 0.6;
const CRITICAL_ACTION_FRACTION: f64 = 0.3;

/// The only action offered to a node in the dark-matter band.
pub const INTERVENTION_ACTION: &str = "request_intervention";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InertiaConfig {
    /// Fraction removed per qualifying decay cycle.
    pub decay_rate: f64,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    /// Also the scale of the drag curve.
    pub dark_matter_threshold: f64,
    pub max_drag: f64,
    pub entropy_scale: f64,
    /// Window `run_decay_cycle` uses to look for recent violations.
    pub violation_window_hours: f64,
}

impl Default for InertiaConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.05,
            warning_threshold: 10.0,
            critical_threshold: 25.0,
            dark_matter_threshold: 50.0,
            max_drag: 0.95,
            entropy_scale: 0.01,
            violation_window_hours: 24.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Status and flags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Normal,
    Warning,
    Critical,
    DarkMatter,
}

impl DebtStatus {
    pub fn latency_multiplier(&self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Warning => 1.5,
            Self::Critical => 2.5,
            Self::DarkMatter => 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebtFlag {
    DebtWarning,
    LatencyPenalty,
    ActionsRestricted,
    DarkMatterVisual,
    InteractionBlocked,
    RequiresIntervention,
    SevereDrag,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of processing one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InertiaDebtResult {
    pub node_id: NodeId,
    pub delta_time_hours: f64,
    pub debt_increment: f64,
    pub total_debt: f64,
    pub drag_coefficient: f64,
    pub entropy_delta: f64,
    pub status: DebtStatus,
    pub flags: Vec<DebtFlag>,
}

/// Which ledger entries a decay cycle touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecayReport {
    pub decayed: Vec<NodeId>,
    pub unchanged: Vec<NodeId>,
}

// ---------------------------------------------------------------------------
// InertiaDebtEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InertiaDebtEngine {
    config: InertiaConfig,
    ledger: BTreeMap<NodeId, f64>,
    violations: BTreeMap<NodeId, Vec<i64>>,
    /// Latest `now` processed per node. Calls at or before it add nothing.
    last_processed: BTreeMap<NodeId, i64>,
}

impl InertiaDebtEngine {
    pub fn new(config: InertiaConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn config(&self) -> &InertiaConfig {
        &self.config
    }

    /// Debt increment for a node at `now` (milliseconds), without touching
    /// the ledger.
    pub fn debt_increment(node: &Node, now: i64) -> (f64, f64) {
        let delta_hours = (now.saturating_sub(node.last_action_at) as f64 / MS_PER_HOUR).max(0.0);
        let psi = if node.psi.is_nan() { 0.0 } else { node.psi.clamp(0.0, 1.0) };
        (clamp_mass(node.mass) * delta_hours * psi, delta_hours)
    }

    /// Add this call's increment to the node's running debt and derive
    /// everything downstream from the new total.
    pub fn process_node(&mut self, node: &Node, now: i64) -> InertiaDebtResult {
        let (mut increment, delta_time_hours) = Self::debt_increment(node, now);
        match self.last_processed.get(&node.id) {
            Some(&seen) if now <= seen => {
                debug!(node = %node.id, now, seen, "tick already processed");
                increment = 0.0;
            }
            _ => {
                self.last_processed.insert(node.id.clone(), now);
            }
        }

        let previous_status = self.status_for(self.debt(&node.id));
        let total = self.ledger.entry(node.id.clone()).or_insert(0.0);
        *total += increment;
        let total_debt = *total;

        let status = self.status_for(total_debt);
        let drag_coefficient = self.drag_for(total_debt);
        let entropy_delta = total_debt * clamp_mass(node.mass) * self.config.entropy_scale;
        let flags = flags_for(status, drag_coefficient);

        if status != previous_status {
            if status == DebtStatus::DarkMatter {
                warn!(node = %node.id, total_debt, "node entered dark matter");
            } else {
                info!(node = %node.id, total_debt, ?status, "debt status changed");
            }
        }
        debug!(node = %node.id, increment, total_debt, drag_coefficient, "processed node");

        InertiaDebtResult {
            node_id: node.id.clone(),
            delta_time_hours,
            debt_increment: increment,
            total_debt,
            drag_coefficient,
            entropy_delta,
            status,
            flags,
        }
    }

    /// Process every node in order.
    pub fn process_all(&mut self, nodes: &[Node], now: i64) -> Vec<InertiaDebtResult> {
        nodes.iter().map(|n| self.process_node(n, now)).collect()
    }

    /// Subtract `amount`, flooring at zero. Returns the new debt. Unknown
    /// nodes stay at zero and are not added to the ledger.
    pub fn record_entropy_reduction(&mut self, node_id: &NodeId, amount: f64) -> f64 {
        let amount = if amount.is_nan() { 0.0 } else { amount.max(0.0) };
        match self.ledger.get_mut(node_id) {
            Some(debt) => {
                *debt = (*debt - amount).max(0.0);
                *debt
            }
            None => 0.0,
        }
    }

    pub fn record_violation(&mut self, node_id: &NodeId, timestamp: i64) {
        self.violations.entry(node_id.clone()).or_default().push(timestamp);
    }

    /// Any violation within `window_hours` before `now` (inclusive).
    pub fn has_recent_violations(&self, node_id: &NodeId, window_hours: f64, now: i64) -> bool {
        let window_ms = window_hours.max(0.0) * MS_PER_HOUR;
        self.violations
            .get(node_id)
            .map(|log| {
                log.iter()
                    .any(|&ts| ts <= now && now.saturating_sub(ts) as f64 <= window_ms)
            })
            .unwrap_or(false)
    }

    pub fn violations(&self, node_id: &NodeId) -> Vec<i64> {
        self.violations.get(node_id).cloned().unwrap_or_default()
    }

    /// `current_debt * (1 - decay_rate)` only when both conditions hold.
    pub fn apply_decay(
        &self,
        current_debt: f64,
        entropy_reduced: bool,
        no_new_violations: bool,
    ) -> f64 {
        if entropy_reduced && no_new_violations {
            current_debt * (1.0 - self.config.decay_rate)
        } else {
            current_debt
        }
    }

    /// One decay pass over the whole ledger. Nodes outside
    /// `entropy_reduced` count as not reduced.
    pub fn run_decay_cycle(&mut self, entropy_reduced: &BTreeSet<NodeId>, now: i64) -> DecayReport {
        let window = self.config.violation_window_hours;
        let mut report = DecayReport::default();
        let ids: Vec<NodeId> = self.ledger.keys().cloned().collect();
        for id in ids {
            let reduced = entropy_reduced.contains(&id);
            let clean = !self.has_recent_violations(&id, window, now);
            let current = self.debt(&id);
            let next = self.apply_decay(current, reduced, clean);
            if reduced && clean {
                self.ledger.insert(id.clone(), next);
                report.decayed.push(id);
            } else {
                report.unchanged.push(id);
            }
        }
        info!(decayed = report.decayed.len(), unchanged = report.unchanged.len(), "decay cycle");
        report
    }

    /// Current debt; zero for unknown nodes.
    pub fn debt(&self, node_id: &NodeId) -> f64 {
        self.ledger.get(node_id).copied().unwrap_or(0.0)
    }

    /// Copy of the whole ledger.
    pub fn all_debts(&self) -> BTreeMap<NodeId, f64> {
        self.ledger.clone()
    }

    pub fn status(&self, node_id: &NodeId) -> DebtStatus {
        self.status_for(self.debt(node_id))
    }

    pub fn status_for(&self, debt: f64) -> DebtStatus {
        let cfg = &self.config;
        if debt >= cfg.dark_matter_threshold {
            DebtStatus::DarkMatter
        } else if debt >= cfg.critical_threshold {
            DebtStatus::Critical
        } else if debt >= cfg.warning_threshold {
            DebtStatus::Warning
        } else {
            DebtStatus::Normal
        }
    }

    /// `tanh(debt / dark_matter_threshold) * max_drag`, never above `max_drag`.
    pub fn drag_for(&self, debt: f64) -> f64 {
        let cfg = &self.config;
        if cfg.dark_matter_threshold <= 0.0 {
            return cfg.max_drag;
        }
        let drag = (debt.max(0.0) / cfg.dark_matter_threshold).tanh() * cfg.max_drag;
        drag.min(cfg.max_drag)
    }

    pub fn latency_modifier(&self, node_id: &NodeId) -> f64 {
        self.status(node_id).latency_multiplier()
    }

    /// Actions still open to the node, taken from the front of `all_actions`.
    pub fn available_actions(&self, node_id: &NodeId, all_actions: &[String]) -> Vec<String> {
        let keep = |fraction: f64| {
            let n = (all_actions.len() as f64 * fraction).ceil() as usize;
            all_actions[..n.min(all_actions.len())].to_vec()
        };
        match self.status(node_id) {
            DebtStatus::Normal => all_actions.to_vec(),
            DebtStatus::Warning => keep(WARNING_ACTION_FRACTION),
            DebtStatus::Critical => keep(CRITICAL_ACTION_FRACTION),
            DebtStatus::DarkMatter => vec![INTERVENTION_ACTION.to_string()],
        }
    }

    pub fn reset(&mut self) {
        self.ledger.clear();
        self.violations.clear();
        self.last_processed.clear();
    }
}

fn flags_for(status: DebtStatus, drag: f64) -> Vec<DebtFlag> {
    let mut flags = match status {
        DebtStatus::Normal => Vec::new(),
        DebtStatus::Warning => vec![DebtFlag::DebtWarning],
        DebtStatus::Critical => vec![DebtFlag::LatencyPenalty, DebtFlag::ActionsRestricted],
        DebtStatus::DarkMatter => vec![
            DebtFlag::DarkMatterVisual,
            DebtFlag::InteractionBlocked,
            DebtFlag::RequiresIntervention,
        ],
    };
    if drag > SEVERE_DRAG {
        flags.push(DebtFlag::SevereDrag);
    }
    flags
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
