//! Per-generation counters fed by the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::command::Command;
use crate::orb::DeathReason;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathCounts {
    pub out_of_world: u32,
    pub eaten: u32,
    pub no_hp: u32,
}

impl DeathCounts {
    pub fn get(&self, reason: DeathReason) -> u32 {
        match reason {
            DeathReason::OutOfWorld => self.out_of_world,
            DeathReason::Eaten => self.eaten,
            DeathReason::NoHp => self.no_hp,
        }
    }

    fn bump(&mut self, reason: DeathReason) {
        match reason {
            DeathReason::OutOfWorld => self.out_of_world += 1,
            DeathReason::Eaten => self.eaten += 1,
            DeathReason::NoHp => self.no_hp += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.out_of_world + self.eaten + self.no_hp
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: u32,
    pub deaths: DeathCounts,
    /// Set when the generation ends.
    pub turns: Option<u64>,
    pub max_age: u32,
    pub births: u32,
    pub energy_consumed: u64,
    pub hp_from_predation: u64,
    pub starting_energy: u64,
    pub command_counts: BTreeMap<Command, u64>,
}

impl GenerationStats {
    pub fn is_finished(&self) -> bool {
        self.turns.is_some()
    }
}

/// Accumulates one [`GenerationStats`] bucket per generation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRecorder {
    generations: Vec<GenerationStats>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the bucket for `generation`, replacing any earlier bucket with that index.
    pub fn begin_generation(&mut self, generation: u32, starting_energy: u64) {
        self.generations.retain(|g| g.generation != generation);
        self.generations.push(GenerationStats {
            generation,
            starting_energy,
            ..GenerationStats::default()
        });
    }

    pub fn end_generation(&mut self, turns: u64) {
        if let Some(current) = self.generations.last_mut() {
            current.turns = Some(turns);
        }
    }

    pub fn record_death(&mut self, reason: DeathReason, age: u32) {
        if let Some(current) = self.generations.last_mut() {
            current.deaths.bump(reason);
            current.max_age = current.max_age.max(age);
        }
    }

    pub fn record_age(&mut self, age: u32) {
        if let Some(current) = self.generations.last_mut() {
            current.max_age = current.max_age.max(age);
        }
    }

    pub fn record_birth(&mut self) {
        if let Some(current) = self.generations.last_mut() {
            current.births += 1;
        }
    }

    pub fn record_energy_consumed(&mut self, amount: u32) {
        if let Some(current) = self.generations.last_mut() {
            current.energy_consumed += amount as u64;
        }
    }

    pub fn record_predation(&mut self, hp: i32) {
        if let Some(current) = self.generations.last_mut() {
            current.hp_from_predation += hp.max(0) as u64;
        }
    }

    pub fn record_command(&mut self, command: Command) {
        if let Some(current) = self.generations.last_mut() {
            *current.command_counts.entry(command).or_insert(0) += 1;
        }
    }

    pub fn current(&self) -> Option<&GenerationStats> {
        self.generations.last()
    }

    pub fn generation(&self, index: u32) -> Option<&GenerationStats> {
        self.generations.iter().find(|g| g.generation == index)
    }

    pub fn all(&self) -> &[GenerationStats] {
        &self.generations
    }

    /// Longest finished generation so far, in turns.
    pub fn max_turns(&self) -> u64 {
        self.generations.iter().filter_map(|g| g.turns).max().unwrap_or(0)
    }

    pub fn total_eaten(&self) -> u64 {
        self.generations.iter().map(|g| g.deaths.eaten as u64).sum()
    }

    pub fn command_totals(&self) -> BTreeMap<Command, u64> {
        let mut totals = BTreeMap::new();
        for g in &self.generations {
            for (command, count) in &g.command_counts {
                *totals.entry(*command).or_insert(0) += count;
            }
        }
        totals
    }
}
