//! User-saved orb genomes and their JSON store.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::command::Command;
use crate::genome::ReactionMatrix;
use crate::orb::{Orb, OrbId};
use crate::simulation::Simulation;

/// Why a template could not be placed in the world.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template has no dna")]
    EmptyDna,
    #[error("reaction matrix holds a watch command at row {row}, column {col}")]
    WatchInReactions { row: usize, col: usize },
    #[error("reaction matrix is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    ReactionShape {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },
    #[error("hp must be positive, got {0}")]
    NonPositiveHp(i32),
    #[error("no free cell left in the world")]
    WorldFull,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrbTemplate {
    pub id: String,
    pub name: String,
    pub dna: Vec<Command>,
    pub reactions: ReactionMatrix,
}

impl OrbTemplate {
    /// Capture a live orb's genome under its own id.
    pub fn from_orb(orb: &Orb, name: impl Into<String>) -> Self {
        Self {
            id: orb.id.0.clone(),
            name: name.into(),
            dna: orb.genome.dna.clone(),
            reactions: orb.genome.reactions.clone(),
        }
    }

    pub fn spawn(&self, sim: &mut Simulation, hp: i32) -> Result<OrbId, TemplateError> {
        sim.spawn_from_template(self.dna.clone(), self.reactions.clone(), hp)
            .map_err(|e| {
                log::warn!("template {} ({}) rejected: {e}", self.name, self.id);
                e
            })
    }
}

/// Ordered collection of templates, persisted as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateStore {
    templates: Vec<OrbTemplate>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A missing file is an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        let store: Self = serde_json::from_str(&raw)?;
        log::info!("loaded {} templates from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("saved {} templates to {}", self.len(), path.display());
        Ok(())
    }

    /// Insert, replacing any template with the same id.
    pub fn add(&mut self, template: OrbTemplate) {
        match self.templates.iter_mut().find(|t| t.id == template.id) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<OrbTemplate> {
        let pos = self.templates.iter().position(|t| t.id == id)?;
        Some(self.templates.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&OrbTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn list(&self) -> &[OrbTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn template(id: &str, name: &str) -> OrbTemplate {
        OrbTemplate {
            id: id.into(),
            name: name.into(),
            dna: vec![Command::ConsumeEnergy, Command::WatchLeft, Command::Idle],
            reactions: ReactionMatrix { cells: vec![vec![Command::MoveRight; 5]; 4] },
        }
    }

    #[test]
    fn add_replaces_by_id_and_remove_returns_template() {
        let mut store = TemplateStore::new();
        store.add(template("a1", "first"));
        store.add(template("b2", "second"));
        store.add(template("a1", "renamed"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a1").unwrap().name, "renamed");
        assert_eq!(store.list()[1].id, "b2");

        let removed = store.remove("b2").unwrap();
        assert_eq!(removed.name, "second");
        assert!(store.remove("b2").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn json_uses_command_codes_and_nested_arrays() {
        let json = serde_json::to_value(template("a1", "x")).unwrap();
        assert_eq!(json["dna"], serde_json::json!([5, 11, 10]));
        assert_eq!(json["reactions"][0][0], serde_json::json!(1));
    }

    #[test]
    fn store_round_trips_through_file() {
        let path = std::env::temp_dir().join(format!("orbsim_templates_{}.json", std::process::id()));
        let mut store = TemplateStore::new();
        store.add(template("a1", "first"));
        store.save(&path).unwrap();

        let loaded = TemplateStore::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, store);

        let missing = TemplateStore::load("/definitely/not/here.json").unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn malformed_store_is_a_json_error() {
        let path = std::env::temp_dir().join(format!("orbsim_bad_templates_{}.json", std::process::id()));
        std::fs::write(&path, "[{\"id\": 3}]").unwrap();
        let result = TemplateStore::load(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(StoreError::Json(_))));
    }

    #[test]
    fn template_from_live_orb_spawns_unmutated() {
        let config = SimConfig {
            rows: 5,
            cols: 5,
            initial_orb_count: 3,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(config, 8);
        let saved = OrbTemplate::from_orb(&sim.orbs()[0], "keeper");
        assert_eq!(saved.id, sim.orbs()[0].id.0);

        let id = saved.spawn(&mut sim, 9).unwrap();
        let spawned = sim.orb(&id).unwrap();
        assert_eq!(spawned.genome.dna, saved.dna);
        assert_eq!(spawned.genome.reactions, saved.reactions);
        assert_eq!(spawned.hp, 9);
        assert_eq!(sim.stats().current().unwrap().births, 0);
    }

    #[test]
    fn template_with_watch_reaction_is_rejected() {
        let mut sim = Simulation::new(SimConfig::default(), 8);
        let mut bad = template("w", "watcher");
        bad.reactions.cells[0][4] = Command::WatchDown;
        assert_eq!(
            bad.spawn(&mut sim, 5),
            Err(TemplateError::WatchInReactions { row: 0, col: 4 })
        );
    }
}
