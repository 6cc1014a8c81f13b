// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Type Definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scale::ScaleLevel;

/// Mass bounds applied when a formula consumes `Node::mass`.
pub const MASS_MIN: f64 = 1.0;
pub const MASS_MAX: f64 = 10.0;

/// Clamp a node mass into the range formulas operate on.
pub fn clamp_mass(mass: f64) -> f64 {
    if mass.is_nan() {
        return MASS_MIN;
    }
    mass.clamp(MASS_MIN, MASS_MAX)
}

// ─── Coordinate ─────────────────────────────────────────────────────────────

/// A point on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components finite and inside `[-90, 90]` x `[-180, 180]`.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

// ─── NodeId ─────────────────────────────────────────────────────────────────

/// Node identifier. Accepts either a string or a number on input and always
/// serialises as a string.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawNodeId")]
pub struct NodeId(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNodeId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl From<RawNodeId> for NodeId {
    fn from(raw: RawNodeId) -> Self {
        match raw {
            RawNodeId::Text(s) => NodeId(s),
            RawNodeId::Unsigned(n) => NodeId(n.to_string()),
            RawNodeId::Signed(n) => NodeId(n.to_string()),
        }
    }
}

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self { NodeId(s) }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self { NodeId(s.to_string()) }
}

impl From<u64> for NodeId {
    fn from(n: u64) -> Self { NodeId(n.to_string()) }
}

impl From<u32> for NodeId {
    fn from(n: u32) -> Self { NodeId(n.to_string()) }
}

// ─── Gate State ─────────────────────────────────────────────────────────────

/// Ordinal gate state. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateState {
    Observe = 0,
    Ring = 1,
    Lock = 2,
    /// Terminal.
    Afterimage = 3,
}

impl Default for GateState {
    fn default() -> Self { GateState::Observe }
}

impl GateState {
    pub const ALL: [GateState; 4] = [
        GateState::Observe,
        GateState::Ring,
        GateState::Lock,
        GateState::Afterimage,
    ];

    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Afterimage)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Observe => "OBSERVE",
            Self::Ring => "RING",
            Self::Lock => "LOCK",
            Self::Afterimage => "AFTERIMAGE",
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─── Node ───────────────────────────────────────────────────────────────────

/// Inputs the gate evaluator reads for a node each frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    #[serde(default)]
    pub entropy_acceleration: f64,
    #[serde(default)]
    pub responsibility_load: f64,
    #[serde(default = "default_responsibility_cap")]
    pub responsibility_cap: f64,
    #[serde(default = "default_energy")]
    pub energy: f64,
    #[serde(default)]
    pub inertia_delta: f64,
}

fn default_responsibility_cap() -> f64 { 1.0 }
fn default_energy() -> f64 { 1.0 }

impl Default for NodeMetrics {
    fn default() -> Self {
        Self {
            entropy_acceleration: 0.0,
            responsibility_load: 0.0,
            responsibility_cap: default_responsibility_cap(),
            energy: default_energy(),
            inertia_delta: 0.0,
        }
    }
}

/// One spatial node in a world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Importance weight. Clamped to `[1, 10]` by formulas.
    pub mass: f64,
    pub coordinate: Coordinate,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub last_action_at: i64,
    /// Irreversibility factor, clamped to `[0, 1]` by the debt engine.
    #[serde(default)]
    pub psi: f64,
    #[serde(default)]
    pub gate_state: GateState,
    #[serde(default)]
    pub metrics: NodeMetrics,
    #[serde(default)]
    pub scale: ScaleLevel,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, mass: f64, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            mass,
            coordinate,
            created_at: 0,
            last_action_at: 0,
            psi: 0.0,
            gate_state: GateState::Observe,
            metrics: NodeMetrics::default(),
            scale: ScaleLevel::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: NodeMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_gate_state(mut self, state: GateState) -> Self {
        self.gate_state = state;
        self
    }

    pub fn with_scale(mut self, scale: ScaleLevel) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_timing(mut self, created_at: i64, last_action_at: i64, psi: f64) -> Self {
        self.created_at = created_at;
        self.last_action_at = last_action_at;
        self.psi = psi;
        self
    }
}

// ─── Boundary ───────────────────────────────────────────────────────────────

/// A named polygon that attenuates impact when a propagation path crosses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub id: String,
    /// Ordered vertices; closing the ring is optional.
    pub polygon: Vec<Coordinate>,
    /// Multiplicative loss on crossing. Falls back to the region's beta.
    #[serde(default)]
    pub attenuation: Option<f64>,
}

impl Boundary {
    pub fn new(id: impl Into<String>, polygon: Vec<Coordinate>, attenuation: f64) -> Self {
        Self { id: id.into(), polygon, attenuation: Some(attenuation) }
    }
}

// ─── WorldState ─────────────────────────────────────────────────────────────

/// Immutable snapshot the orchestrator works from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldState {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub boundaries: Vec<Boundary>,
    #[serde(default = "default_region")]
    pub region_id: String,
}

fn default_region() -> String { crate::gravity::DEFAULT_PRESET_ID.to_string() }

impl WorldState {
    pub fn new(nodes: Vec<Node>, boundaries: Vec<Boundary>, region_id: impl Into<String>) -> Self {
        Self { nodes, boundaries, region_id: region_id.into() }
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}
