use rand::seq::SliceRandom;

use crate::command::{Action, Command, Direction};
use crate::orb::{DeathReason, OrbEvent};
use crate::simulation::Simulation;
use crate::world;

impl Simulation {
    /// One turn for the orb at `idx`: run the command under the DNA pointer, pay aging,
    /// advance the pointer and grow a tick older.
    pub(crate) fn act(&mut self, idx: usize) {
        if !self.orbs[idx].is_alive() {
            return;
        }

        self.orbs[idx].begin_turn();
        let command = self.orbs[idx].current_command();
        self.execute_command(idx, command, false);
        if !self.orbs[idx].is_alive() {
            return;
        }

        if !std::mem::take(&mut self.orbs[idx].prevent_aging) {
            self.lose_hp(idx, 1);
            if !self.orbs[idx].is_alive() {
                return;
            }
        }

        let orb = &mut self.orbs[idx];
        orb.advance_pointer();
        orb.age += 1;
        let age = orb.age;
        self.stats.record_age(age);
    }

    /// Run one command. `nested` is set when the command came out of a reaction lookup.
    pub(crate) fn execute_command(&mut self, idx: usize, command: Command, nested: bool) {
        self.stats.record_command(command);
        self.record(idx, OrbEvent::Executed { command });

        match command.action() {
            Action::Move(direction) => self.move_orb(idx, direction),
            Action::Bite(direction) => self.bite(idx, direction),
            Action::ConsumeEnergy => self.consume_energy(idx),
            Action::GiveBirth(direction) => self.give_birth(idx, direction),
            Action::Watch(direction) => self.watch(idx, direction, nested),
            Action::Idle => self.record(idx, OrbEvent::Idled),
        }
    }

    fn target(&self, idx: usize, direction: Direction) -> (i32, i32) {
        let orb = &self.orbs[idx];
        direction.step(orb.x, orb.y)
    }

    fn move_orb(&mut self, idx: usize, direction: Direction) {
        let (x, y) = self.target(idx, direction);

        if !self.world.in_bounds(x, y) {
            // Leaving the world is fatal regardless of hp.
            self.record(idx, OrbEvent::LeftWorld { direction });
            self.orbs[idx].mark_death_reason(DeathReason::OutOfWorld);
            let hp = self.orbs[idx].hp;
            self.lose_hp(idx, hp);
            return;
        }
        if world::is_occupied(&self.orbs, x, y) {
            self.record(idx, OrbEvent::MoveBlocked { direction });
            return;
        }

        let orb = &mut self.orbs[idx];
        orb.x = x;
        orb.y = y;
        self.record(idx, OrbEvent::Moved { x, y });
    }

    fn bite(&mut self, idx: usize, direction: Direction) {
        let (x, y) = self.target(idx, direction);
        let candidates = world::occupants_at(&self.orbs, x, y, Some(idx));
        if candidates.is_empty() {
            self.record(idx, OrbEvent::BiteMissed { direction });
            return;
        }

        let attacker_hp = i64::from(self.orbs[idx].hp);
        let qualifying: Vec<usize> = candidates
            .into_iter()
            .filter(|&p| 2 * i64::from(self.orbs[p].hp) < attacker_hp)
            .collect();
        let Some(&prey) = qualifying.choose(&mut self.rng) else {
            self.record(idx, OrbEvent::PreyTooBig { direction });
            return;
        };

        let gained = self.orbs[prey].hp;
        let prey_id = self.orbs[prey].id.clone();
        let predator = self.orbs[idx].id.clone();

        self.record(idx, OrbEvent::Ate { prey: prey_id, hp: gained });
        self.gain_hp(idx, gained);
        self.orbs[idx].prevent_aging = true;
        self.stats.record_predation(gained);

        self.record(prey, OrbEvent::EatenBy { predator });
        self.orbs[prey].mark_death_reason(DeathReason::Eaten);
        self.lose_hp(prey, gained);
    }

    fn consume_energy(&mut self, idx: usize) {
        let (x, y) = (self.orbs[idx].x, self.orbs[idx].y);
        if !self.world.consume_energy(y as usize, x as usize, 1) {
            self.record(idx, OrbEvent::NoEnergy);
            return;
        }

        self.record(idx, OrbEvent::ConsumedEnergy);
        self.stats.record_energy_consumed(1);
        self.gain_hp(idx, self.config.hp_gain_per_energy);
        self.orbs[idx].prevent_aging = true;
    }

    fn give_birth(&mut self, idx: usize, direction: Direction) {
        let hp = self.orbs[idx].hp;
        let required = self.config.split_hp_threshold;
        if hp < required {
            self.record(idx, OrbEvent::NotEnoughHp { hp, required });
            return;
        }

        let (x, y) = self.target(idx, direction);
        if !self.world.in_bounds(x, y) {
            self.record(idx, OrbEvent::BirthOutOfWorld { direction });
            return;
        }
        if world::is_occupied(&self.orbs, x, y) {
            self.record(idx, OrbEvent::BirthBlocked { direction });
            return;
        }

        let child_hp = hp - hp / 2;
        let genome = self.orbs[idx].genome.mutate(&mut self.rng);
        let child = self.spawn_orb(x, y, child_hp, genome);
        let child_id = self.orbs[child].id.clone();
        log::debug!("orb {} split into {child_id} at ({x}, {y})", self.orbs[idx].id);

        self.stats.record_birth();
        self.record(idx, OrbEvent::GaveBirth { child: child_id, child_hp });
        self.lose_hp(idx, hp / 2);
    }

    pub(crate) fn gain_hp(&mut self, idx: usize, amount: i32) {
        if amount <= 0 {
            return;
        }
        let orb = &mut self.orbs[idx];
        orb.hp = orb.hp.saturating_add(amount);
        let hp = orb.hp;
        self.record(idx, OrbEvent::HpGained { amount, hp });
    }

    /// Subtract hp; dropping to zero or below kills the orb on the spot.
    pub(crate) fn lose_hp(&mut self, idx: usize, amount: i32) {
        if amount <= 0 {
            return;
        }
        let orb = &mut self.orbs[idx];
        orb.hp = orb.hp.saturating_sub(amount);
        let hp = orb.hp;
        self.record(idx, OrbEvent::HpLost { amount, hp });
        if hp <= 0 {
            self.die(idx);
        }
    }

    /// Death bookkeeping. The orb stays in place until the end-of-tick sweep,
    /// invisible to occupancy queries.
    fn die(&mut self, idx: usize) {
        let (x, y) = (self.orbs[idx].x, self.orbs[idx].y);
        if self.world.in_bounds(x, y) {
            self.world
                .add_energy(y as usize, x as usize, i64::from(self.config.energy_on_death));
        }

        self.orbs[idx].mark_death_reason(DeathReason::NoHp);
        let reason = self.orbs[idx].death_reason.unwrap_or(DeathReason::NoHp);
        let age = self.orbs[idx].age;
        self.record(idx, OrbEvent::Died { reason, age });
        self.stats.record_death(reason, age);
        log::debug!("orb {} died ({}) at age {age}", self.orbs[idx].id, reason.label());
    }
}
