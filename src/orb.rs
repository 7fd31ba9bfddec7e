use serde::{Deserialize, Serialize};
use std::fmt;

use crate::command::{Command, Direction};
use crate::config;
use crate::genome::Genome;
use crate::reaction::Signal;

/// Opaque hex token identifying an orb.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrbId(pub String);

impl fmt::Display for OrbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeathReason {
    OutOfWorld,
    Eaten,
    NoHp,
}

impl DeathReason {
    pub const ALL: [DeathReason; 3] = [DeathReason::OutOfWorld, DeathReason::Eaten, DeathReason::NoHp];

    pub fn label(self) -> &'static str {
        match self {
            DeathReason::OutOfWorld => "out_of_world",
            DeathReason::Eaten => "eaten",
            DeathReason::NoHp => "no_hp",
        }
    }
}

/// One entry in an orb's turn log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbEvent {
    Born { hp: i32 },
    Executed { command: Command },
    Moved { x: i32, y: i32 },
    MoveBlocked { direction: Direction },
    LeftWorld { direction: Direction },
    Ate { prey: OrbId, hp: i32 },
    BiteMissed { direction: Direction },
    PreyTooBig { direction: Direction },
    EatenBy { predator: OrbId },
    ConsumedEnergy,
    NoEnergy,
    GaveBirth { child: OrbId, child_hp: i32 },
    BirthOutOfWorld { direction: Direction },
    BirthBlocked { direction: Direction },
    NotEnoughHp { hp: i32, required: i32 },
    Watched { direction: Direction, signal: Signal, reaction: Command },
    NoReaction { direction: Direction, signal: Signal },
    NestedWatchIgnored { command: Command },
    Idled,
    HpGained { amount: i32, hp: i32 },
    HpLost { amount: i32, hp: i32 },
    Died { reason: DeathReason, age: u32 },
}

impl fmt::Display for OrbEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrbEvent::Born { hp } => write!(f, "born with {hp} hp"),
            OrbEvent::Executed { command } => write!(f, "{command}"),
            OrbEvent::Moved { x, y } => write!(f, "moved to ({x}, {y})"),
            OrbEvent::MoveBlocked { direction } => write!(f, "cell {} is occupied", direction.label()),
            OrbEvent::LeftWorld { direction } => write!(f, "stepped {} out of the world", direction.label()),
            OrbEvent::Ate { prey, hp } => write!(f, "ate {prey} for {hp} hp"),
            OrbEvent::BiteMissed { direction } => write!(f, "bit {} into nothing", direction.label()),
            OrbEvent::PreyTooBig { direction } => write!(f, "prey {} too big to eat", direction.label()),
            OrbEvent::EatenBy { predator } => write!(f, "eaten by {predator}"),
            OrbEvent::ConsumedEnergy => write!(f, "consumed energy"),
            OrbEvent::NoEnergy => write!(f, "no energy here"),
            OrbEvent::GaveBirth { child, child_hp } => write!(f, "gave birth to {child} with {child_hp} hp"),
            OrbEvent::BirthOutOfWorld { direction } => {
                write!(f, "cannot give birth {} outside the world", direction.label())
            }
            OrbEvent::BirthBlocked { direction } => write!(f, "cannot give birth {} into occupied cell", direction.label()),
            OrbEvent::NotEnoughHp { hp, required } => write!(f, "{hp} hp is not enough to split (needs {required})"),
            OrbEvent::Watched { direction, signal, reaction } => {
                write!(f, "saw {} {}, reacting with {reaction}", signal.label(), direction.label())
            }
            OrbEvent::NoReaction { direction, signal } => {
                write!(f, "saw {} {}, no reaction", signal.label(), direction.label())
            }
            OrbEvent::NestedWatchIgnored { command } => write!(f, "ignored nested {command}"),
            OrbEvent::Idled => write!(f, "idle"),
            OrbEvent::HpGained { amount, hp } => write!(f, "+{amount} hp ({hp})"),
            OrbEvent::HpLost { amount, hp } => write!(f, "-{amount} hp ({hp})"),
            OrbEvent::Died { reason, age } => write!(f, "died ({}) at age {age}", reason.label()),
        }
    }
}

/// A simulated agent. DNA and reactions are fixed at spawn; only the pointer moves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orb {
    pub id: OrbId,
    pub name: String,
    pub age: u32,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
    pub genome: Genome,
    pub dna_pointer: usize,
    /// One frame of events per turn, oldest first, at most `ORB_LOG_FRAMES` frames.
    pub log: Vec<Vec<OrbEvent>>,
    pub death_reason: Option<DeathReason>,
    /// Generation index the orb was spawned into.
    pub generation: u32,
    #[serde(skip)]
    pub(crate) prevent_aging: bool,
}

impl Orb {
    pub fn new(id: OrbId, x: i32, y: i32, hp: i32, genome: Genome, generation: u32) -> Self {
        Self {
            id,
            name: genome.name(),
            age: 0,
            x,
            y,
            hp,
            genome,
            dna_pointer: 0,
            log: vec![vec![OrbEvent::Born { hp }]],
            death_reason: None,
            generation,
            prevent_aging: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn dna(&self) -> &[Command] {
        &self.genome.dna
    }

    pub fn color(&self) -> [u8; 3] {
        self.genome.color()
    }

    pub fn current_command(&self) -> Command {
        self.genome.dna[self.dna_pointer]
    }

    /// Advance the cyclic DNA pointer by one.
    pub fn advance_pointer(&mut self) {
        self.dna_pointer += 1;
        if self.dna_pointer >= self.genome.dna.len() {
            self.dna_pointer = 0;
        }
    }

    pub(crate) fn begin_turn(&mut self) {
        self.prevent_aging = false;
        if self.log.len() >= config::ORB_LOG_FRAMES {
            let excess = self.log.len() + 1 - config::ORB_LOG_FRAMES;
            self.log.drain(..excess);
        }
        self.log.push(Vec::new());
    }

    pub(crate) fn record(&mut self, event: OrbEvent) {
        match self.log.last_mut() {
            Some(frame) => frame.push(event),
            None => self.log.push(vec![event]),
        }
    }

    /// First write wins.
    pub(crate) fn mark_death_reason(&mut self, reason: DeathReason) {
        if self.death_reason.is_none() {
            self.death_reason = Some(reason);
        }
    }

    pub fn last_turn(&self) -> &[OrbEvent] {
        self.log.last().map_or(&[], Vec::as_slice)
    }
}
