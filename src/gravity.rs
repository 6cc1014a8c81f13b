// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Regional Gravity Presets

//! Regional gravity presets and gate-state modifiers.
//!
//! Presets are loaded once when the resolver is built and never change
//! afterwards. Every query is a pure lookup combined with the fixed
//! per-gate modifier tables below.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::GateState;

/// Id of the preset every unknown region falls back to.
pub const DEFAULT_PRESET_ID: &str = "default";

// ---------------------------------------------------------------------------
// RegionalPreset
// ---------------------------------------------------------------------------

/// Named bundle of propagation and gating constants for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalPreset {
    pub id: String,
    /// Distance decay rate, per meter.
    pub alpha: f64,
    /// Default boundary attenuation for boundaries that carry none.
    pub beta: f64,
    /// Density amplification.
    pub gamma: f64,
    /// Entropy-acceleration threshold.
    pub theta: f64,
    pub cost_multiplier: f64,
}

impl RegionalPreset {
    fn builtin(id: &str, alpha: f64, beta: f64, gamma: f64, theta: f64, cost: f64) -> Self {
        Self { id: id.to_string(), alpha, beta, gamma, theta, cost_multiplier: cost }
    }
}

/// The preset table shipped with the kernel.
pub fn builtin_presets() -> Vec<RegionalPreset> {
    vec![
        RegionalPreset::builtin(DEFAULT_PRESET_ID, 1.0e-4, 0.8, 0.5, 1.0, 1.0),
        RegionalPreset::builtin("urban", 2.0e-4, 0.7, 0.8, 0.8, 1.2),
        RegionalPreset::builtin("regional", 5.0e-5, 0.85, 0.4, 1.2, 1.0),
        RegionalPreset::builtin("remote", 2.0e-5, 0.95, 0.2, 1.5, 0.8),
    ]
}

// ---------------------------------------------------------------------------
// Gate modifiers
// ---------------------------------------------------------------------------

/// Cost multiplier applied on top of the preset for a gate state.
pub fn gate_cost_modifier(state: GateState) -> f64 {
    match state {
        GateState::Observe => 1.0,
        GateState::Ring => 1.3,
        GateState::Lock => 2.0,
        GateState::Afterimage => f64::INFINITY,
    }
}

/// Threshold multiplier applied on top of the preset for a gate state.
/// AFTERIMAGE collapses the threshold to zero.
pub fn gate_theta_modifier(state: GateState) -> f64 {
    match state {
        GateState::Observe => 1.0,
        GateState::Ring => 0.9,
        GateState::Lock => 0.7,
        GateState::Afterimage => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Region and gate state a gravity lookup is made for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityContext {
    pub region_id: String,
    pub gate_state: GateState,
}

impl GravityContext {
    pub fn new(region_id: impl Into<String>, gate_state: GateState) -> Self {
        Self { region_id: region_id.into(), gate_state }
    }
}

/// Preset plus the gate-adjusted values derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedGravity {
    pub preset: RegionalPreset,
    pub effective_cost_multiplier: f64,
    pub effective_theta: f64,
}

/// Read-only preset table. There is no way to change a preset after
/// construction.
#[derive(Debug, Clone)]
pub struct RegionalConfigResolver {
    presets: Vec<RegionalPreset>,
    default_index: usize,
}

impl Default for RegionalConfigResolver {
    fn default() -> Self {
        Self::new(builtin_presets())
    }
}

impl RegionalConfigResolver {
    /// Build from a preset table. If the table has no `"default"` entry the
    /// built-in default is appended so fallback always succeeds. Later
    /// duplicates of an id are shadowed by the first occurrence.
    pub fn new(mut presets: Vec<RegionalPreset>) -> Self {
        let default_index = match presets.iter().position(|p| p.id == DEFAULT_PRESET_ID) {
            Some(i) => i,
            None => {
                let builtin = builtin_presets().swap_remove(0);
                presets.push(builtin);
                presets.len() - 1
            }
        };
        Self { presets, default_index }
    }

    pub fn presets(&self) -> &[RegionalPreset] {
        &self.presets
    }

    /// Exact-id lookup, falling back to the default preset.
    pub fn get_preset(&self, region_id: &str) -> &RegionalPreset {
        match self.presets.iter().find(|p| p.id == region_id) {
            Some(p) => p,
            None => {
                warn!(region_id, "unknown region, using default gravity preset");
                &self.presets[self.default_index]
            }
        }
    }

    pub fn resolve_gravity(&self, ctx: &GravityContext) -> ResolvedGravity {
        let preset = self.get_preset(&ctx.region_id).clone();
        let effective_cost_multiplier = preset.cost_multiplier * gate_cost_modifier(ctx.gate_state);
        let effective_theta = preset.theta * gate_theta_modifier(ctx.gate_state);
        ResolvedGravity { preset, effective_cost_multiplier, effective_theta }
    }

    /// `base_cost` scaled by the effective cost multiplier.
    ///
    /// An infinite multiplier (AFTERIMAGE) yields an infinite cost for any
    /// base, including zero.
    pub fn calculate_cost(&self, base_cost: f64, ctx: &GravityContext) -> f64 {
        let multiplier = self.resolve_gravity(ctx).effective_cost_multiplier;
        if multiplier.is_infinite() {
            return f64::INFINITY;
        }
        base_cost * multiplier
    }

    /// Whether an entropy acceleration stays within the effective threshold.
    /// Nothing passes a zero threshold.
    pub fn can_pass_gate(&self, entropy_acceleration: f64, ctx: &GravityContext) -> bool {
        let theta = self.resolve_gravity(ctx).effective_theta;
        theta > 0.0 && entropy_acceleration <= theta
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(region: &str, state: GateState) -> GravityContext {
        GravityContext::new(region, state)
    }

    #[test]
    fn exact_lookup() {
        let r = RegionalConfigResolver::default();
        assert_eq!(r.get_preset("urban").id, "urban");
        assert_eq!(r.get_preset("remote").id, "remote");
    }

    #[test]
    fn unknown_region_falls_back_to_default() {
        let r = RegionalConfigResolver::default();
        assert_eq!(r.get_preset("atlantis").id, DEFAULT_PRESET_ID);
        assert_eq!(r.get_preset("").id, DEFAULT_PRESET_ID);
    }

    #[test]
    fn missing_default_is_supplied() {
        let only = RegionalPreset::builtin("solo", 1.0, 1.0, 1.0, 2.0, 3.0);
        let r = RegionalConfigResolver::new(vec![only]);
        assert_eq!(r.presets().len(), 2);
        assert_eq!(r.get_preset("nowhere").id, DEFAULT_PRESET_ID);
        assert_eq!(r.get_preset("solo").theta, 2.0);
    }

    #[test]
    fn modifiers_apply_per_gate_state() {
        let r = RegionalConfigResolver::default();
        let observe = r.resolve_gravity(&ctx("default", GateState::Observe));
        assert_eq!(observe.effective_cost_multiplier, 1.0);
        assert_eq!(observe.effective_theta, 1.0);

        let ring = r.resolve_gravity(&ctx("default", GateState::Ring));
        assert!((ring.effective_cost_multiplier - 1.3).abs() < 1e-12);
        assert!((ring.effective_theta - 0.9).abs() < 1e-12);

        let lock = r.resolve_gravity(&ctx("default", GateState::Lock));
        assert_eq!(lock.effective_cost_multiplier, 2.0);
        assert!((lock.effective_theta - 0.7).abs() < 1e-12);
    }

    #[test]
    fn afterimage_collapses_threshold_and_cost() {
        let r = RegionalConfigResolver::default();
        let c = ctx("urban", GateState::Afterimage);
        let g = r.resolve_gravity(&c);
        assert_eq!(g.effective_theta, 0.0);
        assert!(g.effective_cost_multiplier.is_infinite());
        assert!(r.calculate_cost(0.0, &c).is_infinite());
        assert!(!r.can_pass_gate(0.0, &c));
        assert!(!r.can_pass_gate(-1.0, &c));
    }

    #[test]
    fn cost_and_pass_are_derived_from_resolution() {
        let r = RegionalConfigResolver::default();
        let c = ctx("urban", GateState::Lock);
        // 10 * 1.2 * 2.0
        assert!((r.calculate_cost(10.0, &c) - 24.0).abs() < 1e-9);
        // theta = 0.8 * 0.7 = 0.56
        assert!(r.can_pass_gate(0.5, &c));
        assert!(!r.can_pass_gate(0.6, &c));
    }
}
