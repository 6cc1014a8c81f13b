// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Scale Lock (K-level visibility)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Node, NodeId};

pub const MIN_SCALE: u8 = 1;
pub const MAX_SCALE: u8 = 10;

/// Width of one level's Z band.
pub const Z_BAND_WIDTH: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScaleError {
    #[error("scale level {0} outside K1..K10")]
    OutOfRange(u8),
}

// ---------------------------------------------------------------------------
// ScaleLevel
// ---------------------------------------------------------------------------

/// Ordinal altitude tier, K1 (closest) through K10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ScaleLevel(u8);

impl ScaleLevel {
    pub fn new(level: u8) -> Result<Self, ScaleError> {
        if (MIN_SCALE..=MAX_SCALE).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ScaleError::OutOfRange(level))
        }
    }

    /// Saturating constructor.
    pub fn clamped(level: i64) -> Self {
        Self(level.clamp(MIN_SCALE as i64, MAX_SCALE as i64) as u8)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Z range `[min, max)` owned by this level.
    pub fn band(&self) -> (f64, f64) {
        let lower = (self.0 - 1) as f64 * Z_BAND_WIDTH;
        (lower, lower + Z_BAND_WIDTH)
    }
}

impl Default for ScaleLevel {
    fn default() -> Self { Self(MIN_SCALE) }
}

impl TryFrom<u8> for ScaleLevel {
    type Error = ScaleError;
    fn try_from(level: u8) -> Result<Self, Self::Error> { Self::new(level) }
}

impl From<ScaleLevel> for u8 {
    fn from(level: ScaleLevel) -> u8 { level.0 }
}

impl fmt::Display for ScaleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "K{}", self.0)
    }
}

/// Level whose band contains `z`. Saturates at both ends; NaN maps to K1.
pub fn scale_for_z(z: f64) -> ScaleLevel {
    if z.is_nan() || z < 0.0 {
        return ScaleLevel(MIN_SCALE);
    }
    if z >= MAX_SCALE as f64 * Z_BAND_WIDTH {
        return ScaleLevel(MAX_SCALE);
    }
    ScaleLevel::clamped((z / Z_BAND_WIDTH).floor() as i64 + 1)
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Full,
    ShapeOnly,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Full,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeVisibility {
    pub node_id: NodeId,
    pub scale: ScaleLevel,
    pub visibility: Visibility,
    pub interaction: Interaction,
}

/// Access policy for one operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleLockFilter {
    operator: ScaleLevel,
}

impl ScaleLockFilter {
    pub fn new(operator: ScaleLevel) -> Self {
        Self { operator }
    }

    pub fn operator(&self) -> ScaleLevel {
        self.operator
    }

    pub fn visibility(&self, node_scale: ScaleLevel) -> Visibility {
        if node_scale <= self.operator {
            Visibility::Full
        } else if node_scale.get() == self.operator.get() + 1 {
            Visibility::ShapeOnly
        } else {
            Visibility::Hidden
        }
    }

    pub fn interaction(&self, node_scale: ScaleLevel) -> Interaction {
        if node_scale <= self.operator {
            Interaction::Full
        } else {
            Interaction::Blocked
        }
    }

    pub fn evaluate(&self, node: &Node) -> NodeVisibility {
        NodeVisibility {
            node_id: node.id.clone(),
            scale: node.scale,
            visibility: self.visibility(node.scale),
            interaction: self.interaction(node.scale),
        }
    }

    pub fn filter(&self, nodes: &[Node]) -> Vec<NodeVisibility> {
        nodes.iter().map(|n| self.evaluate(n)).collect()
    }

    pub fn camera_constraints(&self) -> CameraConstraints {
        CameraConstraints::for_operator(self.operator)
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConstraints {
    pub min_z: f64,
    pub max_z: f64,
}

impl CameraConstraints {
    /// From ground level up to the top of the operator's own band.
    pub fn for_operator(operator: ScaleLevel) -> Self {
        Self { min_z: 0.0, max_z: operator.band().1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraValidation {
    pub z: f64,
    /// Only exceeding `max_z` is a violation; dropping below `min_z` is
    /// clamped silently.
    pub violation: bool,
}

pub fn validate_camera_z(requested_z: f64, constraints: &CameraConstraints) -> CameraValidation {
    let z = requested_z.max(constraints.min_z).min(constraints.max_z);
    CameraValidation { z, violation: requested_z > constraints.max_z }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinate;

    fn k(level: u8) -> ScaleLevel {
        ScaleLevel::new(level).expect("test: level in range")
    }

    #[test]
    fn visibility_table_for_k2_operator() {
        let filter = ScaleLockFilter::new(k(2));
        assert_eq!(filter.visibility(k(1)), Visibility::Full);
        assert_eq!(filter.visibility(k(2)), Visibility::Full);
        assert_eq!(filter.interaction(k(2)), Interaction::Full);
        assert_eq!(filter.visibility(k(3)), Visibility::ShapeOnly);
        assert_eq!(filter.interaction(k(3)), Interaction::Blocked);
        assert_eq!(filter.visibility(k(5)), Visibility::Hidden);
        assert_eq!(filter.interaction(k(5)), Interaction::Blocked);
    }

    #[test]
    fn top_operator_sees_everything() {
        let filter = ScaleLockFilter::new(k(10));
        for level in MIN_SCALE..=MAX_SCALE {
            assert_eq!(filter.visibility(k(level)), Visibility::Full);
        }
    }

    #[test]
    fn filter_preserves_node_order() {
        let filter = ScaleLockFilter::new(k(3));
        let origin = Coordinate::new(0.0, 0.0);
        let nodes = vec![
            Node::new("hi", 1.0, origin).with_scale(k(9)),
            Node::new("lo", 1.0, origin).with_scale(k(1)),
            Node::new("edge", 1.0, origin).with_scale(k(4)),
        ];
        let out = filter.filter(&nodes);
        let vis: Vec<Visibility> = out.iter().map(|v| v.visibility).collect();
        assert_eq!(vis, vec![Visibility::Hidden, Visibility::Full, Visibility::ShapeOnly]);
    }

    #[test]
    fn level_range_is_enforced() {
        assert_eq!(ScaleLevel::new(0), Err(ScaleError::OutOfRange(0)));
        assert_eq!(ScaleLevel::new(11), Err(ScaleError::OutOfRange(11)));
        assert_eq!(ScaleLevel::clamped(-4).get(), 1);
        assert_eq!(ScaleLevel::clamped(40).get(), 10);
        assert_eq!(k(7).to_string(), "K7");
    }

    #[test]
    fn z_bands_are_contiguous() {
        assert_eq!(scale_for_z(0.0), k(1));
        assert_eq!(scale_for_z(99.9), k(1));
        assert_eq!(scale_for_z(100.0), k(2));
        assert_eq!(scale_for_z(999.0), k(10));
        assert_eq!(scale_for_z(5_000.0), k(10));
        assert_eq!(scale_for_z(1_000.0), k(10));
        assert_eq!(scale_for_z(1e300), k(10));
        assert_eq!(scale_for_z(f64::INFINITY), k(10));
        assert_eq!(scale_for_z(f64::NEG_INFINITY), k(1));
        assert_eq!(scale_for_z(-1.0), k(1));
        assert_eq!(k(4).band(), (300.0, 400.0));
        for level in MIN_SCALE..MAX_SCALE {
            assert_eq!(k(level).band().1, k(level + 1).band().0);
        }
    }

    #[test]
    fn camera_only_flags_upper_violation() {
        let c = CameraConstraints { min_z: 50.0, max_z: 200.0 };
        let low = validate_camera_z(10.0, &c);
        assert_eq!(low.z, 50.0);
        assert!(!low.violation);
        let high = validate_camera_z(250.0, &c);
        assert_eq!(high.z, 200.0);
        assert!(high.violation);
        let ok = validate_camera_z(120.0, &c);
        assert_eq!(ok.z, 120.0);
        assert!(!ok.violation);
    }

    #[test]
    fn operator_camera_ceiling() {
        let filter = ScaleLockFilter::new(k(3));
        assert_eq!(filter.camera_constraints().max_z, 300.0);
    }

    #[test]
    fn serde_uses_ordinal() {
        let json = serde_json::to_string(&k(4)).expect("test: serialize");
        assert_eq!(json, "4");
        let back: ScaleLevel = serde_json::from_str("9").expect("test: deserialize");
        assert_eq!(back, k(9));
        assert!(serde_json::from_str::<ScaleLevel>("0").is_err());
    }
}
