use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::command::Command;
use crate::config::{self, SimConfig};
use crate::genome::{Genome, ReactionMatrix};
use crate::orb::{Orb, OrbEvent, OrbId};
use crate::stats::StatsRecorder;
use crate::templates::TemplateError;
use crate::world::{self, World};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Something an orb did this tick, for presentation layers that animate effects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimEvent {
    pub orb: OrbId,
    pub event: OrbEvent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continued { alive: usize },
    /// The population died out; the next generation has already been spawned.
    GenerationEnded { generation: u32, turns: u64 },
}

/// The whole simulation: world, population, statistics and the random source.
///
/// Every mutation goes through [`advance_tick`](Self::advance_tick),
/// [`restart_generation`](Self::restart_generation),
/// [`spawn_from_template`](Self::spawn_from_template) or
/// [`reconfigure`](Self::reconfigure). Everything else is a read-only view.
pub struct Simulation {
    pub(crate) config: SimConfig,
    pub(crate) world: World,
    pub(crate) orbs: Vec<Orb>,
    pub(crate) recently_dead: Vec<Orb>,
    pub(crate) stats: StatsRecorder,
    pub(crate) events: Vec<SimEvent>,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) generation: u32,
    pub(crate) turn: u64,
    pub(crate) tick_count: u64,
}

impl Simulation {
    pub fn new(config: SimConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Build and bootstrap generation 0 using the given random source.
    pub fn with_rng(config: SimConfig, rng: ChaCha8Rng) -> Self {
        let mut sim = Self::blank(config.sanitized(), rng);
        sim.bootstrap();
        sim
    }

    pub(crate) fn blank(config: SimConfig, rng: ChaCha8Rng) -> Self {
        Self {
            world: World::new(config.rows, config.cols),
            config,
            orbs: Vec::new(),
            recently_dead: Vec::new(),
            stats: StatsRecorder::new(),
            events: Vec::new(),
            rng,
            generation: 0,
            turn: 0,
            tick_count: 0,
        }
    }

    /// Replace the configuration and start over from generation 0.
    /// The random stream continues from where it was.
    pub fn reconfigure(&mut self, config: SimConfig) {
        let rng = std::mem::replace(&mut self.rng, ChaCha8Rng::seed_from_u64(0));
        *self = Self::with_rng(config, rng);
        log::info!(
            "reconfigured: {}x{} world, {} orbs",
            self.config.rows,
            self.config.cols,
            self.orbs.len()
        );
    }

    /// Start over from generation 0 with the current configuration.
    pub fn reset(&mut self) {
        let config = self.config.clone();
        self.reconfigure(config);
    }

    /// Run one tick: every orb alive at the start of the tick acts once, in insertion order.
    ///
    /// Children born during the tick are appended behind the scheduled range and first act
    /// on the next tick. Orbs killed earlier in the tick are skipped and swept at the end.
    pub fn advance_tick(&mut self) -> TickOutcome {
        self.events.clear();

        let scheduled = self.orbs.len();
        for idx in 0..scheduled {
            if self.orbs[idx].is_alive() {
                self.act(idx);
            }
        }

        self.sweep_dead();
        self.turn += 1;
        self.tick_count += 1;
        log::trace!(
            "tick {} (generation {}, turn {}): {} alive",
            self.tick_count,
            self.generation,
            self.turn,
            self.orbs.len()
        );

        if self.orbs.is_empty() {
            let generation = self.generation;
            let turns = self.turn;
            self.finish_generation();
            self.start_next_generation();
            return TickOutcome::GenerationEnded { generation, turns };
        }

        TickOutcome::Continued { alive: self.orbs.len() }
    }

    /// Place a user-supplied genome, unmutated, on a random free cell.
    pub fn spawn_from_template(
        &mut self,
        dna: Vec<Command>,
        reactions: ReactionMatrix,
        hp: i32,
    ) -> Result<OrbId, TemplateError> {
        if dna.is_empty() {
            return Err(TemplateError::EmptyDna);
        }
        if hp <= 0 {
            return Err(TemplateError::NonPositiveHp(hp));
        }
        if !reactions.is_rectangular()
            || reactions.rows() != self.config.reaction_rows
            || reactions.cols() != self.config.reaction_columns
        {
            return Err(TemplateError::ReactionShape {
                expected_rows: self.config.reaction_rows,
                expected_cols: self.config.reaction_columns,
                rows: reactions.rows(),
                cols: reactions.cols(),
            });
        }
        if let Some((row, col)) = reactions.find_watch() {
            return Err(TemplateError::WatchInReactions { row, col });
        }

        let (x, y) = self.random_empty_cell().ok_or(TemplateError::WorldFull)?;
        let idx = self.spawn_orb(x, y, hp, Genome { dna, reactions });
        let id = self.orbs[idx].id.clone();
        log::info!("spawned template orb {id} at ({x}, {y}) with {hp} hp");
        Ok(id)
    }

    // --- read-only views ---

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Live orbs in scheduling order.
    pub fn orbs(&self) -> &[Orb] {
        &self.orbs
    }

    pub fn orb(&self, id: &OrbId) -> Option<&Orb> {
        self.orbs.iter().find(|o| &o.id == id)
    }

    /// Orbs that died during the current generation, in order of death.
    pub fn recently_dead(&self) -> &[Orb] {
        &self.recently_dead
    }

    pub fn stats(&self) -> &StatsRecorder {
        &self.stats
    }

    /// Events raised during the most recent tick.
    pub fn last_events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Turns elapsed in the current generation.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn alive_count(&self) -> usize {
        self.orbs.len()
    }

    // --- internals shared by the interpreter and generation manager ---

    pub(crate) fn spawn_orb(&mut self, x: i32, y: i32, hp: i32, genome: Genome) -> usize {
        let id = self.new_id();
        let orb = Orb::new(id.clone(), x, y, hp, genome, self.generation);
        self.orbs.push(orb);
        self.events.push(SimEvent { orb: id, event: OrbEvent::Born { hp } });
        self.orbs.len() - 1
    }

    /// Append to the orb's current log frame and to this tick's event stream.
    pub(crate) fn record(&mut self, idx: usize, event: OrbEvent) {
        let orb = &mut self.orbs[idx];
        self.events.push(SimEvent {
            orb: orb.id.clone(),
            event: event.clone(),
        });
        orb.record(event);
    }

    fn new_id(&mut self) -> OrbId {
        let mut len = self.config.id_length;
        loop {
            for _ in 0..config::ID_RETRIES {
                let token: String = (0..len)
                    .map(|_| HEX[self.rng.gen_range(0..HEX.len())] as char)
                    .collect();
                let taken = self
                    .orbs
                    .iter()
                    .chain(self.recently_dead.iter())
                    .any(|o| o.id.0 == token);
                if !taken {
                    return OrbId(token);
                }
            }
            len += 1;
        }
    }

    /// Random free cell: a run of random probes, then a scan of what is left.
    pub(crate) fn random_empty_cell(&mut self) -> Option<(i32, i32)> {
        for _ in 0..config::EMPTY_CELL_PROBES {
            let (x, y) = self.world.random_cell(&mut self.rng);
            if !world::is_occupied(&self.orbs, x, y) {
                return Some((x, y));
            }
        }

        let cols = self.world.cols;
        let free: Vec<(i32, i32)> = (0..self.world.rows)
            .flat_map(|y| (0..cols).map(move |x| (x as i32, y as i32)))
            .filter(|&(x, y)| !world::is_occupied(&self.orbs, x, y))
            .collect();
        free.choose(&mut self.rng).copied()
    }

    pub(crate) fn random_initial_hp(&mut self) -> i32 {
        self.rng
            .gen_range(self.config.initial_hp_min..=self.config.initial_hp_max)
    }

    /// Move orbs killed this tick out of the live set, keeping order on both sides.
    fn sweep_dead(&mut self) {
        if self.orbs.iter().all(Orb::is_alive) {
            return;
        }
        let (alive, dead): (Vec<Orb>, Vec<Orb>) =
            std::mem::take(&mut self.orbs).into_iter().partition(Orb::is_alive);
        self.orbs = alive;
        self.recently_dead.extend(dead);
    }

    #[cfg(test)]
    pub(crate) fn empty_for_tests(config: SimConfig, seed: u64) -> Self {
        let mut sim = Self::blank(config.sanitized(), ChaCha8Rng::seed_from_u64(seed));
        sim.stats.begin_generation(0, 0);
        sim
    }

    #[cfg(test)]
    pub(crate) fn place(&mut self, x: i32, y: i32, hp: i32, genome: Genome) -> usize {
        self.spawn_orb(x, y, hp, genome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn fixed_genome(dna: Vec<Command>) -> Genome {
        Genome {
            dna,
            reactions: ReactionMatrix { cells: vec![vec![Command::Idle; 5]; 4] },
        }
    }

    fn small_config() -> SimConfig {
        SimConfig {
            rows: 6,
            cols: 6,
            initial_orb_count: 8,
            strongest_count: 2,
            offspring_per_parent: 3,
            initial_energy: 20,
            ..SimConfig::default()
        }
    }

    fn assert_invariants(sim: &Simulation) {
        let mut cells = HashSet::new();
        for orb in sim.orbs() {
            assert!(orb.hp > 0, "live orb {} has hp {}", orb.id, orb.hp);
            assert!(sim.world().in_bounds(orb.x, orb.y));
            assert!(cells.insert((orb.x, orb.y)), "two orbs on ({}, {})", orb.x, orb.y);
            assert!(orb.dna_pointer < orb.dna().len());
            assert!(orb.genome.reactions.find_watch().is_none());
        }
    }

    #[test]
    fn bootstrap_seeds_population_and_energy() {
        let sim = Simulation::new(small_config(), 7);
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.orbs().len(), 8);
        assert_eq!(sim.world().total_energy(), 20);
        assert_eq!(sim.stats().current().unwrap().starting_energy, 20);
        for orb in sim.orbs() {
            assert!((8..=16).contains(&orb.hp));
            assert_eq!(orb.dna().len(), 36);
        }
        assert_invariants(&sim);
    }

    #[test]
    fn invariants_hold_across_many_ticks_and_generations() {
        let mut sim = Simulation::new(small_config(), 99);
        let mut ended = 0;
        for _ in 0..2_000 {
            if let TickOutcome::GenerationEnded { .. } = sim.advance_tick() {
                ended += 1;
            }
            assert_invariants(&sim);
            assert!(sim.recently_dead().iter().all(|o| o.hp <= 0 && o.death_reason.is_some()));
        }
        assert!(ended > 0, "population never died out in 2000 ticks");
        assert_eq!(sim.generation() as usize, ended);
    }

    #[test]
    fn identical_seeds_replay_identically() {
        let run = |seed| {
            let mut sim = Simulation::new(small_config(), seed);
            for _ in 0..300 {
                sim.advance_tick();
            }
            (sim.orbs().to_vec(), sim.world().clone(), sim.stats().clone(), sim.generation())
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn newborns_do_not_act_in_their_birth_tick() {
        let mut sim = Simulation::empty_for_tests(small_config(), 1);
        let parent = sim.place(2, 2, 10, fixed_genome(vec![Command::GiveBirthRight]));

        sim.advance_tick();

        assert_eq!(sim.orbs.len(), 2);
        let child = &sim.orbs[1];
        assert_eq!((child.x, child.y), (3, 2));
        assert_eq!(child.age, 0);
        assert_eq!(child.log.len(), 1, "child should only carry its birth frame");
        assert_eq!(sim.orbs[parent].age, 1);
    }

    #[test]
    fn orbs_killed_earlier_in_tick_do_not_act() {
        let mut sim = Simulation::empty_for_tests(small_config(), 1);
        sim.place(1, 1, 10, fixed_genome(vec![Command::BiteRight]));
        sim.place(2, 1, 3, fixed_genome(vec![Command::MoveUp]));

        sim.advance_tick();

        assert_eq!(sim.orbs.len(), 1);
        assert_eq!(sim.recently_dead.len(), 1);
        let prey = &sim.recently_dead[0];
        assert_eq!((prey.x, prey.y), (2, 1));
        assert_eq!(prey.age, 0);
    }

    #[test]
    fn dead_orbs_leave_live_set_by_end_of_tick() {
        let mut sim = Simulation::empty_for_tests(small_config(), 1);
        sim.place(0, 0, 1, fixed_genome(vec![Command::Idle]));
        sim.place(3, 3, 5, fixed_genome(vec![Command::Idle]));

        let outcome = sim.advance_tick();

        assert_eq!(outcome, TickOutcome::Continued { alive: 1 });
        assert_eq!(sim.orbs.len(), 1);
        assert_eq!(sim.recently_dead.len(), 1);
        assert!(sim
            .last_events()
            .iter()
            .any(|e| matches!(e.event, OrbEvent::Died { .. })));
    }

    #[test]
    fn template_spawn_validates_input() {
        let mut sim = Simulation::new(small_config(), 3);
        let good = ReactionMatrix { cells: vec![vec![Command::Idle; 5]; 4] };

        assert_eq!(
            sim.spawn_from_template(vec![], good.clone(), 5),
            Err(TemplateError::EmptyDna)
        );
        assert_eq!(
            sim.spawn_from_template(vec![Command::Idle], good.clone(), 0),
            Err(TemplateError::NonPositiveHp(0))
        );
        let mut watching = good.clone();
        watching.cells[2][1] = Command::WatchUp;
        assert_eq!(
            sim.spawn_from_template(vec![Command::Idle], watching, 5),
            Err(TemplateError::WatchInReactions { row: 2, col: 1 })
        );
        assert!(matches!(
            sim.spawn_from_template(
                vec![Command::Idle],
                ReactionMatrix { cells: vec![vec![Command::Idle; 2]] },
                5
            ),
            Err(TemplateError::ReactionShape { .. })
        ));

        let before = sim.orbs().len();
        let id = sim
            .spawn_from_template(vec![Command::ConsumeEnergy, Command::Idle], good, 12)
            .unwrap();
        assert_eq!(sim.orbs().len(), before + 1);
        let orb = sim.orb(&id).unwrap();
        assert_eq!(orb.hp, 12);
        assert_eq!(orb.dna(), &[Command::ConsumeEnergy, Command::Idle]);
        assert_invariants(&sim);
    }

    #[test]
    fn template_spawn_reports_full_world() {
        let config = SimConfig {
            rows: 1,
            cols: 1,
            initial_orb_count: 1,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(config, 3);
        assert_eq!(sim.orbs().len(), 1);
        let reactions = ReactionMatrix { cells: vec![vec![Command::Idle; 5]; 4] };
        assert_eq!(
            sim.spawn_from_template(vec![Command::Idle], reactions, 5),
            Err(TemplateError::WorldFull)
        );
    }

    #[test]
    fn reconfigure_resets_everything() {
        let mut sim = Simulation::new(small_config(), 4);
        for _ in 0..500 {
            sim.advance_tick();
        }

        sim.reconfigure(SimConfig {
            rows: 3,
            cols: 4,
            initial_orb_count: 2,
            ..SimConfig::default()
        });

        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.turn(), 0);
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.world().rows, 3);
        assert_eq!(sim.world().cols, 4);
        assert_eq!(sim.orbs().len(), 2);
        assert!(sim.recently_dead().is_empty());
        assert_eq!(sim.stats().all().len(), 1);
    }

    #[test]
    fn reset_keeps_config_and_restarts_counters() {
        let mut sim = Simulation::new(small_config(), 4);
        for _ in 0..50 {
            sim.advance_tick();
        }

        sim.reset();

        assert_eq!(sim.config(), &small_config().sanitized());
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.orbs().len(), 8);
    }

    #[test]
    fn tick_events_name_the_acting_orb() {
        let mut sim = Simulation::empty_for_tests(small_config(), 1);
        let idx = sim.place(3, 3, 5, fixed_genome(vec![Command::MoveLeft]));
        let id = sim.orbs[idx].id.clone();

        sim.advance_tick();

        let events: Vec<&OrbEvent> = sim
            .last_events()
            .iter()
            .filter(|e| e.orb == id)
            .map(|e| &e.event)
            .collect();
        assert_eq!(events[0], &OrbEvent::Executed { command: Command::MoveLeft });
        assert_eq!(events[1], &OrbEvent::Moved { x: 2, y: 3 });
    }

    #[test]
    fn ids_stay_unique_even_when_short() {
        let config = SimConfig {
            rows: 10,
            cols: 10,
            initial_orb_count: 40,
            id_length: 1,
            ..SimConfig::default()
        };
        let sim = Simulation::new(config, 12);
        let ids: HashSet<_> = sim.orbs().iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids.len(), 40);
    }

    #[test]
    fn population_is_capped_by_free_cells() {
        let config = SimConfig {
            rows: 2,
            cols: 2,
            initial_orb_count: 10,
            ..SimConfig::default()
        };
        let sim = Simulation::new(config, 1);
        assert_eq!(sim.orbs().len(), 4);
        assert_invariants(&sim);
    }
}
