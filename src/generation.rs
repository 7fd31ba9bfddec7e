//! Generation turnover: parent selection by longevity, offspring placement,
//! the energy carry-over policy, and the random bootstrap population.

use std::collections::HashSet;

use crate::genome::Genome;
use crate::orb::Orb;
use crate::simulation::Simulation;

/// The `k` oldest distinct orbs among `dead`, oldest first.
///
/// Ties keep the order of death.
pub fn select_parents(dead: &[Orb], k: usize) -> Vec<&Orb> {
    let mut ranked: Vec<&Orb> = dead.iter().collect();
    ranked.sort_by(|a, b| b.age.cmp(&a.age));

    let mut seen = HashSet::new();
    ranked
        .into_iter()
        .filter(|orb| seen.insert(orb.id.clone()))
        .take(k)
        .collect()
}

impl Simulation {
    /// Generation 0: fresh energy field and a random population.
    pub(crate) fn bootstrap(&mut self) {
        self.generation = 0;
        self.turn = 0;
        self.world.reseed(self.config.initial_energy, &mut self.rng);
        self.stats.begin_generation(0, self.world.total_energy());
        self.populate_random();
        log::info!(
            "generation 0 started with {} orbs and {} energy",
            self.orbs.len(),
            self.world.total_energy()
        );
    }

    pub(crate) fn finish_generation(&mut self) {
        self.stats.end_generation(self.turn);
        if let Some(stats) = self.stats.current() {
            log::info!(
                "generation {} ended after {} turns: {} deaths ({} eaten, {} out of world), max age {}",
                stats.generation,
                self.turn,
                stats.deaths.total(),
                stats.deaths.eaten,
                stats.deaths.out_of_world,
                stats.max_age
            );
        }
    }

    /// Breed the next generation from the longest-lived orbs of the one that just ended.
    pub(crate) fn start_next_generation(&mut self) {
        let parents: Vec<Genome> = select_parents(&self.recently_dead, self.config.strongest_count)
            .into_iter()
            .map(|orb| orb.genome.clone())
            .collect();

        self.orbs.clear();
        self.recently_dead.clear();
        self.generation += 1;
        self.turn = 0;

        if self.config.reset_energy_on_new_generation {
            self.world.reseed(self.config.initial_energy, &mut self.rng);
        }
        self.stats
            .begin_generation(self.generation, self.world.total_energy());

        if parents.is_empty() {
            self.populate_random();
        } else {
            self.populate_from(&parents);
        }

        log::info!(
            "generation {} started with {} orbs from {} parents",
            self.generation,
            self.orbs.len(),
            parents.len()
        );
    }

    /// Throw away the current population and roll a fresh random one under the same
    /// generation index. Nobody is counted as dead.
    pub fn restart_generation(&mut self) {
        self.orbs.clear();
        self.recently_dead.clear();
        self.events.clear();
        self.turn = 0;
        self.world.reseed(self.config.initial_energy, &mut self.rng);
        self.stats
            .begin_generation(self.generation, self.world.total_energy());
        self.populate_random();
        log::info!(
            "generation {} restarted with {} orbs",
            self.generation,
            self.orbs.len()
        );
    }

    fn populate_random(&mut self) {
        for placed in 0..self.config.initial_orb_count {
            let Some((x, y)) = self.random_empty_cell() else {
                log::warn!(
                    "world full, placed {placed} of {} orbs",
                    self.config.initial_orb_count
                );
                return;
            };
            let hp = self.random_initial_hp();
            let genome = Genome::random(&self.config, &mut self.rng);
            self.spawn_orb(x, y, hp, genome);
        }
    }

    fn populate_from(&mut self, parents: &[Genome]) {
        let wanted = parents.len() * self.config.offspring_per_parent;
        for parent in parents {
            for _ in 0..self.config.offspring_per_parent {
                let Some((x, y)) = self.random_empty_cell() else {
                    log::warn!("world full, placed {} of {wanted} offspring", self.orbs.len());
                    return;
                };
                let hp = self.random_initial_hp();
                let genome = parent.mutate(&mut self.rng);
                self.spawn_orb(x, y, hp, genome);
            }
        }
    }
}
