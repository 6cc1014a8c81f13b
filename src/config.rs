// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Causal Kernel - Configuration

use serde::{Deserialize, Serialize};

use crate::gate::GateConfig;
use crate::gravity::{builtin_presets, RegionalPreset};
use crate::inertia::InertiaConfig;
use crate::propagation::DEFAULT_DENSITY_RADIUS_M;
use crate::scale::ScaleLevel;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(
        "debt thresholds must satisfy 0 <= warning <= critical <= dark_matter, \
         got {warning} / {critical} / {dark_matter}"
    )]
    ThresholdOrder { warning: f64, critical: f64, dark_matter: f64 },
    #[error("decay_rate {0} outside [0, 1]")]
    DecayRate(f64),
    #[error("max_drag {0} outside [0, 1]")]
    MaxDrag(f64),
    #[error("density_radius_m must be positive, got {0}")]
    DensityRadius(f64),
    #[error("gate {field} must be positive, got {value}")]
    GateParameter { field: &'static str, value: f64 },
    #[error("preset table is empty")]
    NoPresets,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub density_radius_m: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self { density_radius_m: DEFAULT_DENSITY_RADIUS_M }
    }
}

/// Everything a kernel session is constructed from. Every section may be
/// omitted; missing sections take their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub inertia: InertiaConfig,
    pub gate: GateConfig,
    pub propagation: PropagationConfig,
    /// Replaces the built-in preset table when present.
    pub presets: Option<Vec<RegionalPreset>>,
    pub operator_scale: ScaleLevel,
}

impl KernelConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The configured preset table, or the built-in one.
    pub fn preset_table(&self) -> Vec<RegionalPreset> {
        self.presets.clone().unwrap_or_else(builtin_presets)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let i = &self.inertia;
        let ordered = 0.0 <= i.warning_threshold
            && i.warning_threshold <= i.critical_threshold
            && i.critical_threshold <= i.dark_matter_threshold;
        if !ordered {
            return Err(ConfigError::ThresholdOrder {
                warning: i.warning_threshold,
                critical: i.critical_threshold,
                dark_matter: i.dark_matter_threshold,
            });
        }
        if !(0.0..=1.0).contains(&i.decay_rate) {
            return Err(ConfigError::DecayRate(i.decay_rate));
        }
        if !(0.0..=1.0).contains(&i.max_drag) {
            return Err(ConfigError::MaxDrag(i.max_drag));
        }

        let radius = self.propagation.density_radius_m;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ConfigError::DensityRadius(radius));
        }

        for (field, value) in [
            ("overload_multiplier", self.gate.overload_multiplier),
            ("ring_fraction", self.gate.ring_fraction),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::GateParameter { field, value });
            }
        }

        if matches!(&self.presets, Some(p) if p.is_empty()) {
            return Err(ConfigError::NoPresets);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_all_defaults() {
        let cfg = KernelConfig::from_json("{}").expect("test: defaults parse");
        assert_eq!(cfg, KernelConfig::default());
        assert_eq!(cfg.inertia.decay_rate, 0.05);
        assert_eq!(cfg.gate.overload_multiplier, 1.5);
        assert_eq!(cfg.propagation.density_radius_m, DEFAULT_DENSITY_RADIUS_M);
        assert_eq!(cfg.preset_table().len(), 4);
    }

    #[test]
    fn partial_sections_fill_in() {
        let cfg = KernelConfig::from_json(
            r#"{"inertia": {"decay_rate": 0.1}, "gate": {"ring_fraction": 0.5}, "operator_scale": 4}"#,
        )
        .expect("test: partial config parses");
        assert_eq!(cfg.inertia.decay_rate, 0.1);
        assert_eq!(cfg.inertia.warning_threshold, 10.0);
        assert_eq!(cfg.gate.ring_fraction, 0.5);
        assert_eq!(cfg.gate.overload_multiplier, 1.5);
        assert_eq!(cfg.operator_scale.get(), 4);
    }

    #[test]
    fn rejects_misordered_thresholds() {
        let err = KernelConfig::from_json(r#"{"inertia": {"warning_threshold": 30}}"#)
            .expect_err("test: warning above critical");
        assert!(matches!(err, ConfigError::ThresholdOrder { .. }));
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(matches!(
            KernelConfig::from_json(r#"{"inertia": {"decay_rate": 1.5}}"#),
            Err(ConfigError::DecayRate(_))
        ));
        assert!(matches!(
            KernelConfig::from_json(r#"{"propagation": {"density_radius_m": 0}}"#),
            Err(ConfigError::DensityRadius(_))
        ));
        assert!(matches!(
            KernelConfig::from_json(r#"{"presets": []}"#),
            Err(ConfigError::NoPresets)
        ));
        assert!(matches!(
            KernelConfig::from_json(r#"{"operator_scale": 11}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(KernelConfig::from_json("not json"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn custom_preset_table() {
        let cfg = KernelConfig::from_json(
            r#"{"presets": [{"id": "lab", "alpha": 0.001, "beta": 0.5, "gamma": 0.1, "theta": 2.0, "cost_multiplier": 1.0}]}"#,
        )
        .expect("test: preset table parses");
        let table = cfg.preset_table();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].id, "lab");
    }
}
