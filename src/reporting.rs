//! End-of-run summaries built from the per-generation statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::orb::DeathReason;
use crate::simulation::Simulation;
use crate::stats::GenerationStats;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl MetricSummary {
    /// Summarize a sample set; all zeros when empty.
    pub fn from_samples(samples: impl IntoIterator<Item = f64>) -> Self {
        let mut sorted: Vec<f64> = samples.into_iter().collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sorted.iter().sum::<f64>() / count as f64,
            p50: nearest_rank(&sorted, 0.50),
            p90: nearest_rank(&sorted, 0.90),
            p95: nearest_rank(&sorted, 0.95),
            p99: nearest_rank(&sorted, 0.99),
        }
    }
}

fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// What a headless run produced. Only finished generations feed the summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,
    pub ticks: u64,
    pub generations_completed: usize,
    pub current_generation: u32,
    pub alive_at_end: usize,
    pub max_turns: u64,
    pub turns_per_generation: MetricSummary,
    pub max_age_per_generation: MetricSummary,
    pub births_per_generation: MetricSummary,
    pub deaths_by_reason: BTreeMap<String, u64>,
    pub energy_consumed: u64,
    pub hp_from_predation: u64,
    pub command_usage: BTreeMap<String, u64>,
}

impl RunReport {
    pub fn from_simulation(seed: u64, sim: &Simulation) -> Self {
        let stats = sim.stats();
        let finished: Vec<&GenerationStats> = stats.all().iter().filter(|g| g.is_finished()).collect();

        let deaths_by_reason: BTreeMap<String, u64> = DeathReason::ALL
            .iter()
            .map(|&reason| {
                let total: u64 = stats.all().iter().map(|g| g.deaths.get(reason) as u64).sum();
                (reason.label().to_string(), total)
            })
            .collect();
        let command_usage: BTreeMap<String, u64> = stats
            .command_totals()
            .into_iter()
            .map(|(command, count)| (command.to_string(), count))
            .collect();

        Self {
            seed,
            ticks: sim.tick_count(),
            generations_completed: finished.len(),
            current_generation: sim.generation(),
            alive_at_end: sim.alive_count(),
            max_turns: stats.max_turns(),
            turns_per_generation: MetricSummary::from_samples(
                finished.iter().filter_map(|g| g.turns).map(|t| t as f64),
            ),
            max_age_per_generation: MetricSummary::from_samples(
                finished.iter().map(|g| g.max_age as f64),
            ),
            births_per_generation: MetricSummary::from_samples(
                finished.iter().map(|g| g.births as f64),
            ),
            deaths_by_reason,
            energy_consumed: stats.all().iter().map(|g| g.energy_consumed).sum(),
            hp_from_predation: stats.all().iter().map(|g| g.hp_from_predation).sum(),
            command_usage,
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}
