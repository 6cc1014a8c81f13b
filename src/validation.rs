// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Snapshot Validation

use serde::{Deserialize, Serialize};

use crate::types::{Boundary, Coordinate, Node, NodeId, WorldState, MASS_MAX};

/// Lowest mass accepted before clamping.
pub const MASS_VALIDATION_MIN: f64 = 0.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("coordinate ({lat}, {lng}) is not a finite point on the globe")]
    InvalidCoordinate { lat: f64, lng: f64 },
    #[error("node id is empty")]
    EmptyNodeId,
    #[error("node {node_id}: mass {mass} outside [0, 10]")]
    InvalidMass { node_id: NodeId, mass: f64 },
    #[error("node {node_id}: {source}")]
    NodeCoordinate { node_id: NodeId, source: Box<ValidationError> },
    #[error("boundary {boundary_id}: {vertices} vertices, need at least 3")]
    DegeneratePolygon { boundary_id: String, vertices: usize },
    #[error("boundary {boundary_id}: vertex {index} invalid")]
    InvalidVertex { boundary_id: String, index: usize },
    #[error("boundary {boundary_id}: attenuation is not finite")]
    InvalidAttenuation { boundary_id: String },
}

pub fn validate_coordinate(c: &Coordinate) -> Result<(), ValidationError> {
    if c.is_valid() {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinate { lat: c.lat, lng: c.lng })
    }
}

pub fn validate_node(node: &Node) -> Result<(), ValidationError> {
    if node.id.is_empty() {
        return Err(ValidationError::EmptyNodeId);
    }
    validate_coordinate(&node.coordinate).map_err(|e| ValidationError::NodeCoordinate {
        node_id: node.id.clone(),
        source: Box::new(e),
    })?;
    if !node.mass.is_finite() || !(MASS_VALIDATION_MIN..=MASS_MAX).contains(&node.mass) {
        return Err(ValidationError::InvalidMass { node_id: node.id.clone(), mass: node.mass });
    }
    Ok(())
}

/// Attenuation outside `[0, 1]` is accepted; only non-finite values fail.
pub fn validate_boundary(boundary: &Boundary) -> Result<(), ValidationError> {
    if boundary.polygon.len() < 3 {
        return Err(ValidationError::DegeneratePolygon {
            boundary_id: boundary.id.clone(),
            vertices: boundary.polygon.len(),
        });
    }
    if let Some(index) = boundary.polygon.iter().position(|v| !v.is_valid()) {
        return Err(ValidationError::InvalidVertex { boundary_id: boundary.id.clone(), index });
    }
    if matches!(boundary.attenuation, Some(a) if !a.is_finite()) {
        return Err(ValidationError::InvalidAttenuation { boundary_id: boundary.id.clone() });
    }
    Ok(())
}

/// Every problem found in a snapshot, plus the nodes that are usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationError>,
    pub valid_node_ids: Vec<NodeId>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn validate_world(world: &WorldState) -> ValidationReport {
    let mut report = ValidationReport::default();
    for node in &world.nodes {
        match validate_node(node) {
            Ok(()) => report.valid_node_ids.push(node.id.clone()),
            Err(e) => report.issues.push(e),
        }
    }
    report.issues.extend(world.boundaries.iter().filter_map(|b| validate_boundary(b).err()));
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
