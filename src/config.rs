// All tunable simulation parameters in one place.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

// Random DNA: positions where `index % 2 == 0 || index % 3 == 0` are forced to
// ConsumeEnergy, roughly two thirds of every fresh genome.
pub const CONSUME_BIAS_MODULI: [usize; 2] = [2, 3];

// Random probes before falling back to a full scan for a free cell.
pub const EMPTY_CELL_PROBES: usize = 1000;

// Id collisions tolerated before the generated id grows by one character.
pub const ID_RETRIES: usize = 64;

// Turn frames kept per orb; older frames are dropped.
pub const ORB_LOG_FRAMES: usize = 1000;

/// Engine configuration. Applied at construction or through `Simulation::reconfigure`.
///
/// Every field has a default, so a partial settings file merges over the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub rows: usize,
    pub cols: usize,
    pub initial_hp_min: i32,
    pub initial_hp_max: i32,
    pub initial_orb_count: usize,
    pub strongest_count: usize,
    pub offspring_per_parent: usize,
    pub initial_energy: u32,
    pub reset_energy_on_new_generation: bool,
    pub split_hp_threshold: i32,
    pub hp_gain_per_energy: i32,
    pub energy_on_death: u32,
    pub dna_length: usize,
    pub reaction_rows: usize,
    pub reaction_columns: usize,
    pub id_length: usize,
    /// Presentation pacing only; the engine never reads it.
    pub tick_duration_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rows: 15,
            cols: 25,
            initial_hp_min: 8,
            initial_hp_max: 16,
            initial_orb_count: 30,
            strongest_count: 10,
            offspring_per_parent: 3,
            initial_energy: 300,
            reset_energy_on_new_generation: false,
            split_hp_threshold: 6,
            hp_gain_per_energy: 3,
            energy_on_death: 2,
            dna_length: 36,
            reaction_rows: 4,
            reaction_columns: 5,
            id_length: 6,
            tick_duration_ms: 100,
        }
    }
}

impl SimConfig {
    /// Clamp every field into its legal range: at least 1 for lengths and counts,
    /// at least 0 for quantities, and `initial_hp_max >= initial_hp_min`.
    pub fn sanitized(&self) -> Self {
        let initial_hp_min = self.initial_hp_min.max(1);
        Self {
            rows: self.rows.max(1),
            cols: self.cols.max(1),
            initial_hp_min,
            initial_hp_max: self.initial_hp_max.max(initial_hp_min),
            initial_orb_count: self.initial_orb_count.max(1),
            strongest_count: self.strongest_count.max(1),
            offspring_per_parent: self.offspring_per_parent.max(1),
            initial_energy: self.initial_energy,
            reset_energy_on_new_generation: self.reset_energy_on_new_generation,
            split_hp_threshold: self.split_hp_threshold.max(1),
            hp_gain_per_energy: self.hp_gain_per_energy.max(0),
            energy_on_death: self.energy_on_death,
            dna_length: self.dna_length.max(1),
            reaction_rows: self.reaction_rows.max(1),
            reaction_columns: self.reaction_columns.max(1),
            id_length: self.id_length.max(1),
            tick_duration_ms: self.tick_duration_ms.max(1),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Load settings from a JSON file. Missing or unparseable files fall back to the
    /// defaults; otherwise each field present is merged over the defaults and clamped.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("settings {} unreadable ({e}), using defaults", path.display());
                return Self::default();
            }
        };
        match Self::from_json(&raw) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("settings {} invalid ({e}), using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Merge a JSON settings object over the defaults. Numbers are floored and clamped,
    /// so negative or fractional values land on the nearest legal value; fields of the
    /// wrong type keep their default.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        let d = Self::default();
        let n = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite())
                .map(f64::floor)
        };
        let flag = |key: &str, fallback: bool| value.get(key).and_then(Value::as_bool).unwrap_or(fallback);

        // Float-to-int `as` casts saturate, so negatives become 0 before sanitizing.
        let config = Self {
            rows: n("rows").map_or(d.rows, |v| v as usize),
            cols: n("cols").map_or(d.cols, |v| v as usize),
            initial_hp_min: n("initial_hp_min").map_or(d.initial_hp_min, |v| v as i32),
            initial_hp_max: n("initial_hp_max").map_or(d.initial_hp_max, |v| v as i32),
            initial_orb_count: n("initial_orb_count").map_or(d.initial_orb_count, |v| v as usize),
            strongest_count: n("strongest_count").map_or(d.strongest_count, |v| v as usize),
            offspring_per_parent: n("offspring_per_parent").map_or(d.offspring_per_parent, |v| v as usize),
            initial_energy: n("initial_energy").map_or(d.initial_energy, |v| v as u32),
            reset_energy_on_new_generation: flag(
                "reset_energy_on_new_generation",
                d.reset_energy_on_new_generation,
            ),
            split_hp_threshold: n("split_hp_threshold").map_or(d.split_hp_threshold, |v| v as i32),
            hp_gain_per_energy: n("hp_gain_per_energy").map_or(d.hp_gain_per_energy, |v| v as i32),
            energy_on_death: n("energy_on_death").map_or(d.energy_on_death, |v| v as u32),
            dna_length: n("dna_length").map_or(d.dna_length, |v| v as usize),
            reaction_rows: n("reaction_rows").map_or(d.reaction_rows, |v| v as usize),
            reaction_columns: n("reaction_columns").map_or(d.reaction_columns, |v| v as usize),
            id_length: n("id_length").map_or(d.id_length, |v| v as usize),
            tick_duration_ms: n("tick_duration_ms").map_or(d.tick_duration_ms, |v| v as u64),
        };
        Ok(config.sanitized())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.sanitized())?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_counts_and_hp_range() {
        let raw = SimConfig {
            rows: 0,
            cols: 0,
            initial_hp_min: -3,
            initial_hp_max: 0,
            initial_orb_count: 0,
            strongest_count: 0,
            offspring_per_parent: 0,
            split_hp_threshold: 0,
            hp_gain_per_energy: -5,
            dna_length: 0,
            reaction_rows: 0,
            reaction_columns: 0,
            id_length: 0,
            tick_duration_ms: 0,
            ..SimConfig::default()
        };

        let clean = raw.sanitized();
        assert_eq!(clean.rows, 1);
        assert_eq!(clean.cols, 1);
        assert_eq!(clean.initial_hp_min, 1);
        assert_eq!(clean.initial_hp_max, 1);
        assert_eq!(clean.initial_orb_count, 1);
        assert_eq!(clean.strongest_count, 1);
        assert_eq!(clean.offspring_per_parent, 1);
        assert_eq!(clean.split_hp_threshold, 1);
        assert_eq!(clean.hp_gain_per_energy, 0);
        assert_eq!(clean.dna_length, 1);
        assert_eq!(clean.reaction_rows, 1);
        assert_eq!(clean.reaction_columns, 1);
        assert_eq!(clean.id_length, 1);
        assert_eq!(clean.tick_duration_ms, 1);
    }

    #[test]
    fn partial_json_merges_over_defaults() {
        let parsed: SimConfig = serde_json::from_str(r#"{ "rows": 7, "dna_length": 12 }"#).unwrap();
        assert_eq!(parsed.rows, 7);
        assert_eq!(parsed.dna_length, 12);
        assert_eq!(parsed.cols, SimConfig::default().cols);
        assert_eq!(parsed.initial_energy, SimConfig::default().initial_energy);
    }

    #[test]
    fn load_falls_back_to_defaults_on_bad_file() {
        let path = std::env::temp_dir().join(format!("orbsim_bad_settings_{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(SimConfig::load(&path), SimConfig::default());
        let _ = std::fs::remove_file(&path);

        assert_eq!(SimConfig::load("/definitely/not/here.json"), SimConfig::default());
    }

    #[test]
    fn out_of_range_numbers_are_clamped_not_rejected() {
        let config = SimConfig::from_json(
            r#"{ "rows": 30, "cols": 40, "initial_energy": -5, "energy_on_death": -1 }"#,
        )
        .unwrap();
        assert_eq!(config.rows, 30);
        assert_eq!(config.cols, 40);
        assert_eq!(config.initial_energy, 0);
        assert_eq!(config.energy_on_death, 0);

        let config = SimConfig::from_json(r#"{ "rows": -3, "dna_length": 12, "cols": 7.9 }"#).unwrap();
        assert_eq!(config.rows, 1);
        assert_eq!(config.cols, 7);
        assert_eq!(config.dna_length, 12);
        assert_eq!(config.initial_orb_count, SimConfig::default().initial_orb_count);
    }

    #[test]
    fn wrongly_typed_fields_keep_defaults() {
        let config =
            SimConfig::from_json(r#"{ "rows": "many", "reset_energy_on_new_generation": true }"#).unwrap();
        assert_eq!(config.rows, SimConfig::default().rows);
        assert!(config.reset_energy_on_new_generation);
    }

    #[test]
    fn load_merges_partial_file_with_bad_values() {
        let path = std::env::temp_dir().join(format!("orbsim_partial_settings_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "rows": 30, "initial_energy": -5 }"#).unwrap();
        let loaded = SimConfig::load(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.rows, 30);
        assert_eq!(loaded.initial_energy, 0);
        assert_eq!(loaded.cols, SimConfig::default().cols);
    }

    #[test]
    fn save_then_load_keeps_sanitized_values() {
        let path = std::env::temp_dir().join(format!("orbsim_settings_{}.json", std::process::id()));
        let config = SimConfig {
            rows: 0,
            reset_energy_on_new_generation: true,
            ..SimConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = SimConfig::load(&path);
        assert_eq!(loaded.rows, 1);
        assert!(loaded.reset_energy_on_new_generation);
        let _ = std::fs::remove_file(&path);
    }
}
