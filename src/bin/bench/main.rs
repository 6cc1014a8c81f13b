// Causal Kernel Benchmark Runner
// Monte Carlo over seeded random worlds: determinism, gate monotonicity,
// debt accumulation and throughput per scenario.
//
// Usage:
//   cargo run --release --bin bench                     # Run all scenarios (30 runs each)
//   cargo run --release --bin bench -- --runs 5         # Quick mode (5 runs each)
//   cargo run --release --bin bench -- ENTROPY          # Filter by name, label or category
//   cargo run --release --bin bench -- --seed 42        # Custom base seed
//   RUST_LOG=causal_kernel=debug cargo run --bin bench  # Kernel tracing

mod monte_carlo;
mod report;
mod scenarios;
mod worldgen;

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::error;
use tracing_subscriber::EnvFilter;

use report::*;
use scenarios::*;

const PASS_THRESHOLD: f64 = 0.933;

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    runs: usize,
    seed: u64,
    filter: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs { runs: 30, seed: 0, filter: None };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                i += 1;
                if i < args.len() {
                    cli.runs = args[i].parse().unwrap_or(30);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            arg if !arg.starts_with('-') => {
                cli.filter = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let all_scenarios = scenarios();

    let to_run: Vec<&Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios
                .iter()
                .filter(|s| {
                    s.name.to_lowercase().contains(&f_lower)
                        || s.label.to_lowercase().contains(&f_lower)
                        || s.category.to_lowercase().contains(&f_lower)
                })
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No scenarios match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    println!("\n  Causal Kernel Benchmark Runner v{}", env!("CARGO_PKG_VERSION"));
    println!("  PRNG: ChaCha8Rng | Runs/scenario: {} | Base seed: {}", cli.runs, cli.seed);
    println!("  Running {} scenario(s)...\n", to_run.len());
    println!(
        "  {:<30} {:>5} {:>11} {:>8} {:>10} {:>6} {:>10} {:>7}",
        "Scenario", "Pass%", "Locked%", "Locks", "MeanDebt", "Dark", "Frames/s", "Time"
    );
    println!("  {}", "-".repeat(96));

    let suite_start = Instant::now();
    let mut mc_reports = Vec::new();

    for scenario in &to_run {
        let report = monte_carlo::run_monte_carlo(scenario, cli.runs, cli.seed);

        let pass_pct = report.pass_rate * 100.0;
        let locked_ci = (report.locked_fraction.ci_upper - report.locked_fraction.ci_lower) / 2.0 * 100.0;
        let status = if report.pass_rate >= PASS_THRESHOLD { "PASS" } else { "FAIL" };

        println!(
            "  {:<30} {:>4}% {:>6.1}±{:<3.1} {:>8.1} {:>10.2} {:>6.1} {:>10.0} {:>5.0}ms  {}",
            report.label,
            pass_pct as u32,
            report.locked_fraction.mean * 100.0,
            locked_ci,
            report.lock_events.mean,
            report.mean_debt.mean,
            report.dark_matter_count.mean,
            report.frames_per_sec.mean,
            report.elapsed_ms.mean,
            status,
        );

        mc_reports.push(report);
    }

    let suite_elapsed = suite_start.elapsed();

    // ─── Summary ────────────────────────────────────────────────────────

    let total = mc_reports.len();
    let passed = mc_reports.iter().filter(|r| r.pass_rate >= PASS_THRESHOLD).count();
    let failed = total - passed;

    println!("  {}", "-".repeat(96));
    println!(
        "  Total: {}  Passed: {}  Failed: {}  Suite time: {:.1}s\n",
        total,
        passed,
        failed,
        suite_elapsed.as_secs_f64()
    );

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let timestamp = format!("{}", ts);

    let report = BenchReport {
        timestamp: timestamp.clone(),
        version: env!("CARGO_PKG_VERSION"),
        prng: "ChaCha8Rng",
        n_runs_per_scenario: cli.runs,
        base_seed: cli.seed,
        summary: Summary {
            total,
            passed,
            failed,
            pass_rate: passed as f64 / total as f64,
        },
        scenarios: mc_reports,
    };

    if let Err(e) = write_report(&report, &timestamp) {
        error!(error = %e, "failed to write benchmark report");
        std::process::exit(2);
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn write_report(report: &BenchReport, timestamp: &str) -> std::io::Result<()> {
    let dir = std::path::Path::new("benchmark-results");
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("bench-{}.json", timestamp));
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;
    println!("  Results saved to: {}\n", path.display());
    Ok(())
}
