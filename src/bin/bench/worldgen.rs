// Seedable world generator: nodes scattered around a region centre,
// optional square boundaries, randomised gate inputs and debt timing.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use causal_kernel::{Boundary, Coordinate, Node, NodeMetrics, ScaleLevel, WorldState};

const HOUR_MS: i64 = 3_600_000;

pub struct WorldShape {
    pub nodes: u32,
    pub boundaries: u32,
    /// Half-width of the scatter square, degrees.
    pub spread_deg: f64,
    /// Chance a node gets entropy acceleration near or past the threshold.
    pub hot_fraction: f64,
    /// Chance a node has exhausted its energy.
    pub drained_fraction: f64,
    /// Chance a node is overloaded past its cap.
    pub overload_fraction: f64,
    /// Upper bound on hours since a node last acted.
    pub max_idle_hours: f64,
    pub region_id: &'static str,
}

pub struct WorldGenerator {
    rng: ChaCha8Rng,
}

impl WorldGenerator {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }

    /// Builds a world whose clock reads `now` milliseconds.
    pub fn generate(&mut self, shape: &WorldShape, now: i64) -> WorldState {
        let nodes = (0..shape.nodes).map(|i| self.node(i, shape, now)).collect();
        let boundaries = (0..shape.boundaries).map(|i| self.boundary(i, shape)).collect();
        WorldState::new(nodes, boundaries, shape.region_id)
    }

    fn node(&mut self, i: u32, shape: &WorldShape, now: i64) -> Node {
        let lat = self.rng.gen_range(-shape.spread_deg..=shape.spread_deg);
        let lng = self.rng.gen_range(-shape.spread_deg..=shape.spread_deg);

        let entropy_acceleration = if self.rng.gen_bool(shape.hot_fraction) {
            self.rng.gen_range(0.6..1.6)
        } else {
            self.rng.gen_range(0.0..0.5)
        };
        let responsibility_load = if self.rng.gen_bool(shape.overload_fraction) {
            self.rng.gen_range(1.0..2.0)
        } else {
            self.rng.gen_range(0.0..0.9)
        };
        let energy = if self.rng.gen_bool(shape.drained_fraction) {
            -self.rng.gen_range(0.01..1.0)
        } else {
            self.rng.gen_range(0.1..1.0)
        };
        let metrics = NodeMetrics {
            entropy_acceleration,
            responsibility_load,
            responsibility_cap: 1.0,
            energy,
            inertia_delta: self.rng.gen_range(0.0..2.0),
        };

        let idle_ms = (self.rng.gen_range(0.0..=shape.max_idle_hours) * HOUR_MS as f64) as i64;
        let last_action_at = now - idle_ms;
        let scale = ScaleLevel::clamped(self.rng.gen_range(1..=10));

        Node::new(format!("n{i}"), self.rng.gen_range(0.0..=10.0), Coordinate::new(lat, lng))
            .with_metrics(metrics)
            .with_timing(last_action_at - HOUR_MS, last_action_at, self.rng.gen_range(0.0..=1.0))
            .with_scale(scale)
    }

    fn boundary(&mut self, i: u32, shape: &WorldShape) -> Boundary {
        let half = self.rng.gen_range(shape.spread_deg * 0.1..=shape.spread_deg * 0.4);
        let lat = self.rng.gen_range(-shape.spread_deg..=shape.spread_deg);
        let lng = self.rng.gen_range(-shape.spread_deg..=shape.spread_deg);
        Boundary::new(
            format!("b{i}"),
            vec![
                Coordinate::new(lat - half, lng - half),
                Coordinate::new(lat - half, lng + half),
                Coordinate::new(lat + half, lng + half),
                Coordinate::new(lat + half, lng - half),
            ],
            self.rng.gen_range(0.3..0.95),
        )
    }
}
