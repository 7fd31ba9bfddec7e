//! Grid simulator for DNA-programmed orbs competing for energy and each other,
//! bred generation after generation from the longest-lived survivors.

pub mod command;
pub mod config;
pub mod generation;
pub mod genome;
mod interpreter;
pub mod orb;
pub mod reaction;
pub mod reporting;
pub mod save_load;
pub mod simulation;
pub mod stats;
pub mod templates;
pub mod world;

pub use command::{Command, Direction};
pub use config::SimConfig;
pub use genome::{Genome, ReactionMatrix};
pub use orb::{DeathReason, Orb, OrbEvent, OrbId};
pub use reaction::Signal;
pub use simulation::{SimEvent, Simulation, TickOutcome};
pub use stats::{GenerationStats, StatsRecorder};
pub use templates::{OrbTemplate, TemplateError, TemplateStore};
