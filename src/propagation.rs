// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Impact Propagation

use serde::{Deserialize, Serialize};

use crate::geo::{crossed_boundaries, density, haversine_distance};
use crate::gravity::RegionalPreset;
use crate::types::{clamp_mass, Boundary, Node, NodeId};

/// Radius used for density amplification when none is configured.
pub const DEFAULT_DENSITY_RADIUS_M: f64 = 5_000.0;

/// Constants the propagation formula runs with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropagationParams {
    /// Distance decay per meter. Negative values are treated as zero.
    pub alpha: f64,
    /// Attenuation for boundaries that carry none of their own.
    pub beta: f64,
    pub gamma: f64,
    pub density_radius_m: f64,
}

impl Default for PropagationParams {
    fn default() -> Self {
        Self { alpha: 1.0e-4, beta: 0.8, gamma: 0.5, density_radius_m: DEFAULT_DENSITY_RADIUS_M }
    }
}

impl PropagationParams {
    pub fn from_preset(preset: &RegionalPreset, density_radius_m: f64) -> Self {
        Self { alpha: preset.alpha, beta: preset.beta, gamma: preset.gamma, density_radius_m }
    }
}

/// Impact of one source on one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationResult {
    pub node_id: NodeId,
    /// Meters.
    pub distance: f64,
    pub impact: f64,
    /// Ids of the boundaries the path crossed.
    pub crossed_boundaries: Vec<String>,
    pub density_factor: f64,
}

/// Impact of `source` on `target`.
///
/// Applied in order: exponential distance decay on the clamped source mass,
/// attenuation for every crossed boundary, then density amplification at the
/// target over `all_nodes`.
pub fn propagate(
    source: &Node,
    target: &Node,
    boundaries: &[Boundary],
    all_nodes: &[Node],
    params: &PropagationParams,
) -> PropagationResult {
    let distance = haversine_distance(&source.coordinate, &target.coordinate);
    let alpha = params.alpha.max(0.0);
    let mut impact = clamp_mass(source.mass) * (-alpha * distance).exp();

    let crossed = crossed_boundaries(&source.coordinate, &target.coordinate, boundaries);
    for boundary in &crossed {
        impact *= boundary.attenuation.unwrap_or(params.beta);
    }

    let density_factor =
        1.0 + params.gamma * density(&target.coordinate, all_nodes, params.density_radius_m);
    impact *= density_factor;

    PropagationResult {
        node_id: target.id.clone(),
        distance,
        impact,
        crossed_boundaries: crossed.iter().map(|b| b.id.clone()).collect(),
        density_factor,
    }
}

/// [`propagate`] over every target except the source itself, in target order.
/// `targets` doubles as the population for the density estimate.
pub fn propagate_to_all(
    source: &Node,
    targets: &[Node],
    boundaries: &[Boundary],
    params: &PropagationParams,
) -> Vec<PropagationResult> {
    targets
        .iter()
        .filter(|t| t.id != source.id)
        .map(|t| propagate(source, t, boundaries, targets, params))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
