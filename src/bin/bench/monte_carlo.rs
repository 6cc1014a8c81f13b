// Monte Carlo infrastructure: N seeded runs per scenario, aggregated into
// mean ± 95% CI per metric.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use causal_kernel::inertia::DebtStatus;
use causal_kernel::scale::Visibility;
use causal_kernel::*;

use crate::report::*;
use crate::scenarios::Scenario;
use crate::worldgen::WorldGenerator;

const HOUR_MS: i64 = 3_600_000;

/// Clock every generated world starts at (2026-01-01T00:00:00Z).
const EPOCH_MS: i64 = 1_767_225_600_000;

/// Same snapshot with every node's gate inputs back at rest.
fn calmed(world: &WorldState) -> WorldState {
    let mut calm = world.clone();
    for node in &mut calm.nodes {
        node.metrics = NodeMetrics::default();
    }
    calm
}

fn failed(scenario: &Scenario, seed: u64, start: Instant) -> BenchResult {
    BenchResult {
        name: scenario.name.to_string(),
        seed,
        pass: false,
        valid_nodes: 0,
        validation_issues: 0,
        deterministic: false,
        monotonic_gates: false,
        lock_events: 0,
        locked_fraction: 0.0,
        mean_total_entropy: 0.0,
        max_impact: 0.0,
        mean_debt: 0.0,
        max_debt: 0.0,
        dark_matter_count: 0,
        decayed_count: 0,
        visible_fraction: 0.0,
        elapsed_ms: start.elapsed().as_millis(),
        frames_per_sec: 0.0,
    }
}

/// Run a single scenario iteration with a specific seed.
pub fn run_single(scenario: &Scenario, seed: u64) -> BenchResult {
    let start = Instant::now();
    let mut generator = WorldGenerator::new(ChaCha8Rng::seed_from_u64(seed));
    let world = generator.generate(&scenario.shape, EPOCH_MS);

    let config = KernelConfig {
        operator_scale: ScaleLevel::clamped(scenario.operator_scale as i64),
        ..KernelConfig::default()
    };
    let mut kernel = match CausalKernel::new(config) {
        Ok(k) => k,
        Err(e) => {
            warn!(scenario = scenario.name, error = %e, "kernel config rejected");
            return failed(scenario, seed, start);
        }
    };

    let validation = kernel.load_world(world.clone());
    let Some(focus) = validation.valid_node_ids.first().cloned() else {
        warn!(scenario = scenario.name, seed, "no valid focus node");
        return failed(scenario, seed, start);
    };

    // ─── Simulation ─────────────────────────────────────────────────────

    let results = match kernel.simulate_steps(&focus, scenario.steps, EPOCH_MS) {
        Ok(r) => r,
        Err(e) => {
            warn!(scenario = scenario.name, error = %e, "simulation failed");
            return failed(scenario, seed, start);
        }
    };

    let replay = SimulationOrchestrator::from_config(kernel.config()).simulate_steps(&world, &focus, scenario.steps);
    let deterministic = match &replay {
        Ok(again) => again.len() == results.len() && again.iter().zip(&results).all(|(a, b)| a.same_outcome(b)),
        Err(_) => false,
    };

    let after_first: BTreeMap<NodeId, GateState> =
        validation.valid_node_ids.iter().map(|id| (id.clone(), kernel.gate_state(id))).collect();

    // A calmer snapshot must not pull any gate backwards.
    kernel.load_world(calmed(&world));
    let second = kernel.simulate(&focus, 1.0, EPOCH_MS + HOUR_MS);
    let monotonic_gates = second.is_ok()
        && after_first.iter().all(|(id, before)| kernel.gate_state(id) >= *before);

    let events = kernel.drain_events();
    let lock_events = events.iter().filter(|e| e.is_lock()).count();
    let valid_nodes = validation.valid_node_ids.len();
    let locked = validation
        .valid_node_ids
        .iter()
        .filter(|id| kernel.gate_state(id) >= GateState::Lock)
        .count();
    let locked_fraction = locked as f64 / valid_nodes.max(1) as f64;

    let mean_total_entropy = results.iter().map(|r| r.total_entropy).sum::<f64>() / results.len().max(1) as f64;
    let max_impact = results
        .iter()
        .flat_map(|r| r.frames.iter().map(|f| f.impact_value))
        .fold(0.0_f64, f64::max);
    let total_frames: usize = results.iter().map(|r| r.frames.len()).sum();

    // ─── Inertia debt ───────────────────────────────────────────────────

    let mut last_round = Vec::new();
    for round in 0..scenario.debt_rounds {
        last_round = kernel.process_all_debts(EPOCH_MS + (round as i64 + 1) * HOUR_MS);
    }
    let dark_matter_count = last_round.iter().filter(|r| r.status == DebtStatus::DarkMatter).count() as u32;

    let reduced: BTreeSet<NodeId> = validation.valid_node_ids.iter().step_by(2).cloned().collect();
    for id in &reduced {
        kernel.record_entropy_reduction(id, 1.0);
    }
    let decay_at = EPOCH_MS + (scenario.debt_rounds as i64 + 1) * HOUR_MS;
    let decay = kernel.run_decay_cycle(&reduced, decay_at);

    let debts = kernel.all_debts();
    let mean_debt = debts.values().sum::<f64>() / debts.len().max(1) as f64;
    let max_debt = debts.values().cloned().fold(0.0_f64, f64::max);

    // ─── Scale lock ─────────────────────────────────────────────────────

    let visibility = kernel.visibility();
    let visible = visibility.iter().filter(|v| v.visibility == Visibility::Full).count();
    let visible_fraction = visible as f64 / visibility.len().max(1) as f64;

    // ─── Pass / fail ────────────────────────────────────────────────────

    let c = &scenario.criteria;
    let mut pass = true;
    if c.require_determinism && !deterministic {
        pass = false;
    }
    if c.require_monotonic_gates && !monotonic_gates {
        pass = false;
    }
    if matches!(c.min_locked_fraction, Some(min) if locked_fraction < min) {
        pass = false;
    }
    if matches!(c.max_locked_fraction, Some(max) if locked_fraction > max) {
        pass = false;
    }
    if matches!(c.min_dark_matter, Some(min) if dark_matter_count < min) {
        pass = false;
    }

    let elapsed = start.elapsed();
    debug!(scenario = scenario.name, seed, pass, ms = elapsed.as_millis() as u64, "run finished");

    BenchResult {
        name: scenario.name.to_string(),
        seed,
        pass,
        valid_nodes,
        validation_issues: validation.issues.len(),
        deterministic,
        monotonic_gates,
        lock_events,
        locked_fraction,
        mean_total_entropy,
        max_impact,
        mean_debt,
        max_debt,
        dark_matter_count,
        decayed_count: decay.decayed.len(),
        visible_fraction,
        elapsed_ms: elapsed.as_millis(),
        frames_per_sec: total_frames as f64 / elapsed.as_secs_f64().max(0.001),
    }
}

/// Run Monte Carlo: N runs of a scenario, aggregate stats.
pub fn run_monte_carlo(scenario: &Scenario, n_runs: usize, base_seed: u64) -> MonteCarloReport {
    let results: Vec<BenchResult> = (0..n_runs)
        .map(|i| run_single(scenario, base_seed + i as u64))
        .collect();

    let collect = |f: fn(&BenchResult) -> f64| -> Stats {
        let samples: Vec<f64> = results.iter().map(f).collect();
        Stats::from_samples(&samples)
    };

    let passed = results.iter().filter(|r| r.pass).count();
    MonteCarloReport {
        scenario_name: scenario.name.to_string(),
        label: scenario.label.to_string(),
        category: scenario.category.to_string(),
        n_runs,
        pass_rate: passed as f64 / n_runs.max(1) as f64,
        locked_fraction: collect(|r| r.locked_fraction),
        lock_events: collect(|r| r.lock_events as f64),
        mean_total_entropy: collect(|r| r.mean_total_entropy),
        max_impact: collect(|r| r.max_impact),
        mean_debt: collect(|r| r.mean_debt),
        dark_matter_count: collect(|r| r.dark_matter_count as f64),
        elapsed_ms: collect(|r| r.elapsed_ms as f64),
        frames_per_sec: collect(|r| r.frames_per_sec),
        individual_runs: results,
    }
}
