use serde::{Deserialize, Serialize};

use crate::command::{Command, Direction};
use crate::orb::{Orb, OrbEvent};
use crate::simulation::Simulation;
use crate::world::{self, World};

/// What a watch command sees in its target cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    OutOfWorld,
    Energy,
    Empty,
    SmallerOrb,
    BiggerOrb,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::OutOfWorld,
        Signal::Energy,
        Signal::Empty,
        Signal::SmallerOrb,
        Signal::BiggerOrb,
    ];

    /// Column of the reaction matrix.
    pub fn index(self) -> usize {
        match self {
            Signal::OutOfWorld => 0,
            Signal::Energy => 1,
            Signal::Empty => 2,
            Signal::SmallerOrb => 3,
            Signal::BiggerOrb => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Signal::OutOfWorld => "the edge",
            Signal::Energy => "energy",
            Signal::Empty => "nothing",
            Signal::SmallerOrb => "a smaller orb",
            Signal::BiggerOrb => "a bigger orb",
        }
    }
}

/// Classify the cell (x, y) as seen by the orb at `observer`.
///
/// An occupant takes precedence over energy lying on the same cell.
pub fn classify(world: &World, orbs: &[Orb], observer: usize, x: i32, y: i32) -> Signal {
    if !world.in_bounds(x, y) {
        return Signal::OutOfWorld;
    }
    if let Some(&other) = world::occupants_at(orbs, x, y, Some(observer)).first() {
        return if orbs[other].hp < orbs[observer].hp {
            Signal::SmallerOrb
        } else {
            Signal::BiggerOrb
        };
    }
    if world.energy_at(y as usize, x as usize) > 0 {
        Signal::Energy
    } else {
        Signal::Empty
    }
}

impl Simulation {
    /// Resolve a watch and run the looked-up reaction one level deep.
    pub(crate) fn watch(&mut self, idx: usize, direction: Direction, nested: bool) {
        if nested {
            let command = direction_watch(direction);
            self.record(idx, OrbEvent::NestedWatchIgnored { command });
            return;
        }

        let (x, y) = {
            let orb = &self.orbs[idx];
            direction.step(orb.x, orb.y)
        };
        let signal = classify(&self.world, &self.orbs, idx, x, y);

        match self.orbs[idx].genome.reactions.reaction(direction, signal.index()) {
            Some(reaction) => {
                self.record(idx, OrbEvent::Watched { direction, signal, reaction });
                if reaction.is_watch() {
                    self.record(idx, OrbEvent::NestedWatchIgnored { command: reaction });
                } else {
                    self.execute_command(idx, reaction, true);
                }
            }
            None => self.record(idx, OrbEvent::NoReaction { direction, signal }),
        }
    }
}

fn direction_watch(direction: Direction) -> Command {
    match direction {
        Direction::Left => Command::WatchLeft,
        Direction::Right => Command::WatchRight,
        Direction::Up => Command::WatchUp,
        Direction::Down => Command::WatchDown,
    }
}
