use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use rand_chacha::ChaCha8Rng;

use crate::config::SimConfig;
use crate::orb::Orb;
use crate::simulation::Simulation;
use crate::stats::StatsRecorder;
use crate::world::World;

const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("unsupported save version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("invalid save: {0}")]
    Invalid(String),
}

/// Full engine snapshot. The RNG is stored as its own bincode payload so a restored
/// engine continues the exact random stream.
#[derive(Clone, Serialize, Deserialize)]
struct SaveState {
    version: u32,
    config: SimConfig,
    rows: usize,
    cols: usize,
    energy: Vec<u32>,
    orbs: Vec<Orb>,
    recently_dead: Vec<Orb>,
    stats: StatsRecorder,
    rng_state: Vec<u8>,
    generation: u32,
    turn: u64,
    tick_count: u64,
}

impl SaveState {
    fn from_sim(sim: &Simulation) -> Result<Self, SaveError> {
        Ok(Self {
            version: SAVE_VERSION,
            config: sim.config.clone(),
            rows: sim.world.rows,
            cols: sim.world.cols,
            energy: sim.world.energy_cells().to_vec(),
            orbs: sim.orbs.clone(),
            recently_dead: sim.recently_dead.clone(),
            stats: sim.stats.clone(),
            rng_state: bincode::serialize(&sim.rng)?,
            generation: sim.generation,
            turn: sim.turn,
            tick_count: sim.tick_count,
        })
    }

    fn restore(self) -> Result<Simulation, SaveError> {
        if self.version != SAVE_VERSION {
            return Err(SaveError::Version {
                found: self.version,
                expected: SAVE_VERSION,
            });
        }
        if self.config != self.config.sanitized() {
            return Err(SaveError::Invalid("configuration out of range".into()));
        }
        if (self.rows, self.cols) != (self.config.rows, self.config.cols) {
            return Err(SaveError::Invalid(format!(
                "world is {}x{} but config says {}x{}",
                self.rows, self.cols, self.config.rows, self.config.cols
            )));
        }
        let world = World::from_cells(self.rows, self.cols, self.energy).ok_or_else(|| {
            SaveError::Invalid(format!("energy field does not cover {}x{}", self.rows, self.cols))
        })?;
        validate_orbs(&world, &self.orbs, &self.recently_dead)?;
        let rng: ChaCha8Rng = bincode::deserialize(&self.rng_state)?;

        let mut sim = Simulation::blank(self.config, rng);
        sim.world = world;
        sim.orbs = self.orbs;
        sim.recently_dead = self.recently_dead;
        sim.stats = self.stats;
        sim.generation = self.generation;
        sim.turn = self.turn;
        sim.tick_count = self.tick_count;
        Ok(sim)
    }
}

fn validate_orbs(world: &World, live: &[Orb], dead: &[Orb]) -> Result<(), SaveError> {
    let mut cells = HashSet::new();
    let mut ids = HashSet::new();

    for orb in live {
        if orb.hp <= 0 {
            return Err(SaveError::Invalid(format!("live orb {} has hp {}", orb.id, orb.hp)));
        }
        if !world.in_bounds(orb.x, orb.y) {
            return Err(SaveError::Invalid(format!(
                "orb {} at ({}, {}) is outside the world",
                orb.id, orb.x, orb.y
            )));
        }
        if !cells.insert((orb.x, orb.y)) {
            return Err(SaveError::Invalid(format!(
                "two orbs share cell ({}, {})",
                orb.x, orb.y
            )));
        }
        if orb.dna_pointer >= orb.dna().len() {
            return Err(SaveError::Invalid(format!("orb {} has dna pointer out of range", orb.id)));
        }
        if orb.genome.reactions.find_watch().is_some() {
            return Err(SaveError::Invalid(format!("orb {} reacts with a watch", orb.id)));
        }
    }

    for orb in live.iter().chain(dead) {
        if !ids.insert(&orb.id) {
            return Err(SaveError::Invalid(format!("duplicate orb id {}", orb.id)));
        }
    }
    if let Some(orb) = dead.iter().find(|o| o.is_alive()) {
        return Err(SaveError::Invalid(format!("dead orb {} still has hp", orb.id)));
    }
    Ok(())
}

impl Simulation {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveError> {
        let state = SaveState::from_sim(self)?;
        Ok(bincode::serialize(&state)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SaveError> {
        let state: SaveState = bincode::deserialize(bytes)?;
        state.restore()
    }
}

/// Save the simulation state to a file.
pub fn save_to_file(sim: &Simulation, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let path = path.as_ref();
    std::fs::write(path, sim.to_bytes()?)?;
    log::info!(
        "saved generation {} tick {} to {}",
        sim.generation,
        sim.tick_count,
        path.display()
    );
    Ok(())
}

/// Load simulation state from a file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Simulation, SaveError> {
    let path = path.as_ref();
    let sim = Simulation::from_bytes(&std::fs::read(path)?)?;
    log::info!(
        "loaded generation {} tick {} from {}",
        sim.generation,
        sim.tick_count,
        path.display()
    );
    Ok(sim)
}
