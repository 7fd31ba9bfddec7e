use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four grid directions an orb can act toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Left, Direction::Right, Direction::Up, Direction::Down];

    /// (dx, dy) offset. y grows upward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
        }
    }

    /// Row of the reaction matrix this direction reads.
    pub fn index(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
            Direction::Up => 2,
            Direction::Down => 3,
        }
    }

    pub fn step(self, x: i32, y: i32) -> (i32, i32) {
        let (dx, dy) = self.offset();
        (x + dx, y + dy)
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// Closed set of DNA instructions.
///
/// The numeric codes are stable and are what templates and settings files store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Command {
    MoveRight,
    MoveLeft,
    MoveUp,
    MoveDown,
    ConsumeEnergy,
    BiteLeft,
    BiteRight,
    BiteUp,
    BiteDown,
    Idle,
    WatchLeft,
    WatchRight,
    WatchUp,
    WatchDown,
    GiveBirthLeft,
    GiveBirthRight,
    GiveBirthUp,
    GiveBirthDown,
}

/// What a command does, with its direction pulled out. The interpreter dispatches on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    Bite(Direction),
    ConsumeEnergy,
    GiveBirth(Direction),
    Watch(Direction),
    Idle,
}

impl Command {
    pub const ALL: [Command; 18] = [
        Command::MoveRight,
        Command::MoveLeft,
        Command::MoveUp,
        Command::MoveDown,
        Command::ConsumeEnergy,
        Command::BiteLeft,
        Command::BiteRight,
        Command::BiteUp,
        Command::BiteDown,
        Command::Idle,
        Command::WatchLeft,
        Command::WatchRight,
        Command::WatchUp,
        Command::WatchDown,
        Command::GiveBirthLeft,
        Command::GiveBirthRight,
        Command::GiveBirthUp,
        Command::GiveBirthDown,
    ];

    /// Every command that may sit in a reaction matrix cell.
    pub const REACTIONS: [Command; 14] = [
        Command::MoveRight,
        Command::MoveLeft,
        Command::MoveUp,
        Command::MoveDown,
        Command::ConsumeEnergy,
        Command::BiteLeft,
        Command::BiteRight,
        Command::BiteUp,
        Command::BiteDown,
        Command::Idle,
        Command::GiveBirthLeft,
        Command::GiveBirthRight,
        Command::GiveBirthUp,
        Command::GiveBirthDown,
    ];

    pub fn code(self) -> u8 {
        match self {
            Command::MoveRight => 1,
            Command::MoveLeft => 2,
            Command::MoveUp => 3,
            Command::MoveDown => 4,
            Command::ConsumeEnergy => 5,
            Command::BiteLeft => 6,
            Command::BiteRight => 7,
            Command::BiteUp => 8,
            Command::BiteDown => 9,
            Command::Idle => 10,
            Command::WatchLeft => 11,
            Command::WatchRight => 12,
            Command::WatchUp => 13,
            Command::WatchDown => 14,
            Command::GiveBirthLeft => 16,
            Command::GiveBirthRight => 17,
            Command::GiveBirthUp => 18,
            Command::GiveBirthDown => 19,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    pub fn action(self) -> Action {
        use Direction::*;
        match self {
            Command::MoveRight => Action::Move(Right),
            Command::MoveLeft => Action::Move(Left),
            Command::MoveUp => Action::Move(Up),
            Command::MoveDown => Action::Move(Down),
            Command::ConsumeEnergy => Action::ConsumeEnergy,
            Command::BiteLeft => Action::Bite(Left),
            Command::BiteRight => Action::Bite(Right),
            Command::BiteUp => Action::Bite(Up),
            Command::BiteDown => Action::Bite(Down),
            Command::Idle => Action::Idle,
            Command::WatchLeft => Action::Watch(Left),
            Command::WatchRight => Action::Watch(Right),
            Command::WatchUp => Action::Watch(Up),
            Command::WatchDown => Action::Watch(Down),
            Command::GiveBirthLeft => Action::GiveBirth(Left),
            Command::GiveBirthRight => Action::GiveBirth(Right),
            Command::GiveBirthUp => Action::GiveBirth(Up),
            Command::GiveBirthDown => Action::GiveBirth(Down),
        }
    }

    pub fn is_watch(self) -> bool {
        matches!(self.action(), Action::Watch(_))
    }

    pub fn is_bite(self) -> bool {
        matches!(self.action(), Action::Bite(_))
    }

    pub fn is_birth(self) -> bool {
        matches!(self.action(), Action::GiveBirth(_))
    }

    /// Uniform over the whole command set.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Uniform over the non-watch commands.
    pub fn random_reaction(rng: &mut impl Rng) -> Self {
        Self::REACTIONS[rng.gen_range(0..Self::REACTIONS.len())]
    }

    /// Uniform over `pool` minus `current`. Used by mutation so a replaced gene always changes.
    pub fn random_other(pool: &[Command], current: Command, rng: &mut impl Rng) -> Self {
        let others: Vec<Command> = pool.iter().copied().filter(|c| *c != current).collect();
        if others.is_empty() {
            return current;
        }
        others[rng.gen_range(0..others.len())]
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown command code {0}")]
pub struct UnknownCommand(pub u8);

impl TryFrom<u8> for Command {
    type Error = UnknownCommand;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Command::from_code(code).ok_or(UnknownCommand(code))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action() {
            Action::Move(d) => write!(f, "move {}", d.label()),
            Action::Bite(d) => write!(f, "bite {}", d.label()),
            Action::ConsumeEnergy => write!(f, "consume energy"),
            Action::GiveBirth(d) => write!(f, "give birth {}", d.label()),
            Action::Watch(d) => write!(f, "watch {}", d.label()),
            Action::Idle => write!(f, "idle"),
        }
    }
}
