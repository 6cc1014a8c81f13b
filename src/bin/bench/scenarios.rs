// Scenario definitions: world shape, step count and what each run must show.

use crate::worldgen::WorldShape;

// ─── Scenario Configuration ─────────────────────────────────────────────────

pub struct Scenario {
    pub name: &'static str,
    pub label: &'static str,
    pub category: &'static str,
    pub shape: WorldShape,
    /// Simulation steps per run.
    pub steps: u32,
    /// Debt is processed this many times, an hour apart.
    pub debt_rounds: u32,
    /// Operator scale for the visibility pass.
    pub operator_scale: u8,
    pub criteria: PassCriteria,
}

pub struct PassCriteria {
    pub require_determinism: bool,
    pub require_monotonic_gates: bool,
    /// Fraction of valid nodes that must end LOCK or later.
    pub min_locked_fraction: Option<f64>,
    pub max_locked_fraction: Option<f64>,
    pub min_dark_matter: Option<u32>,
}

impl Default for PassCriteria {
    fn default() -> Self {
        Self {
            require_determinism: true,
            require_monotonic_gates: true,
            min_locked_fraction: None,
            max_locked_fraction: None,
            min_dark_matter: None,
        }
    }
}

fn shape(nodes: u32, boundaries: u32, region_id: &'static str) -> WorldShape {
    WorldShape {
        nodes,
        boundaries,
        spread_deg: 0.5,
        hot_fraction: 0.1,
        drained_fraction: 0.02,
        overload_fraction: 0.05,
        max_idle_hours: 6.0,
        region_id,
    }
}

// ─── Scenario Table ─────────────────────────────────────────────────────────

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "CALM_DEFAULT",
            label: "Calm default region",
            category: "baseline",
            shape: WorldShape { hot_fraction: 0.0, drained_fraction: 0.0, overload_fraction: 0.0, ..shape(64, 2, "default") },
            steps: 30,
            debt_rounds: 3,
            operator_scale: 5,
            criteria: PassCriteria { max_locked_fraction: Some(0.0), ..PassCriteria::default() },
        },
        Scenario {
            name: "URBAN_DENSE",
            label: "Dense urban cluster",
            category: "propagation",
            shape: WorldShape { spread_deg: 0.05, ..shape(256, 6, "urban") },
            steps: 30,
            debt_rounds: 3,
            operator_scale: 3,
            criteria: PassCriteria::default(),
        },
        Scenario {
            name: "REMOTE_SPARSE",
            label: "Sparse remote network",
            category: "propagation",
            shape: WorldShape { spread_deg: 3.0, ..shape(48, 1, "remote") },
            steps: 30,
            debt_rounds: 3,
            operator_scale: 8,
            criteria: PassCriteria::default(),
        },
        Scenario {
            name: "ENERGY_COLLAPSE",
            label: "Energy collapse",
            category: "gate",
            shape: WorldShape { drained_fraction: 1.0, ..shape(64, 0, "regional") },
            steps: 10,
            debt_rounds: 1,
            operator_scale: 5,
            criteria: PassCriteria { min_locked_fraction: Some(1.0), ..PassCriteria::default() },
        },
        Scenario {
            name: "ENTROPY_STORM",
            label: "Entropy storm",
            category: "gate",
            shape: WorldShape { hot_fraction: 0.8, ..shape(128, 3, "default") },
            steps: 60,
            debt_rounds: 3,
            operator_scale: 5,
            criteria: PassCriteria { min_locked_fraction: Some(0.1), ..PassCriteria::default() },
        },
        Scenario {
            name: "DEBT_SPIRAL",
            label: "Long-idle debt spiral",
            category: "inertia",
            shape: WorldShape { max_idle_hours: 72.0, ..shape(64, 0, "default") },
            steps: 5,
            debt_rounds: 24,
            operator_scale: 5,
            criteria: PassCriteria { min_dark_matter: Some(1), ..PassCriteria::default() },
        },
        Scenario {
            name: "UNKNOWN_REGION",
            label: "Unknown region fallback",
            category: "gravity",
            shape: shape(32, 1, "atlantis"),
            steps: 10,
            debt_rounds: 1,
            operator_scale: 1,
            criteria: PassCriteria::default(),
        },
    ]
}
