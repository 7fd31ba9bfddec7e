use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::command::{Command, Direction};
use crate::config::{self, SimConfig};

/// Direction x signal lookup table. Row per watch direction, column per signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionMatrix {
    /// `cells[row][col]`; never holds a watch command.
    pub cells: Vec<Vec<Command>>,
}

impl ReactionMatrix {
    pub fn random(rows: usize, cols: usize, rng: &mut impl Rng) -> Self {
        let cells = (0..rows)
            .map(|_| (0..cols).map(|_| Command::random_reaction(rng)).collect())
            .collect();
        Self { cells }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Command> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn reaction(&self, direction: Direction, signal_index: usize) -> Option<Command> {
        self.get(direction.index(), signal_index)
    }

    /// First watch command found, as (row, col).
    pub fn find_watch(&self) -> Option<(usize, usize)> {
        self.cells.iter().enumerate().find_map(|(r, row)| {
            row.iter().position(|c| c.is_watch()).map(|c| (r, c))
        })
    }

    pub fn is_rectangular(&self) -> bool {
        let cols = self.cols();
        self.cells.iter().all(|row| row.len() == cols)
    }
}

/// Heritable part of an orb: its DNA program and reaction matrix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    pub dna: Vec<Command>,
    pub reactions: ReactionMatrix,
}

impl Genome {
    /// Fresh genome. Biased positions are forced to ConsumeEnergy; the rest are uniform.
    pub fn random(config: &SimConfig, rng: &mut impl Rng) -> Self {
        let dna = (0..config.dna_length)
            .map(|index| {
                if config::CONSUME_BIAS_MODULI.iter().any(|m| index % m == 0) {
                    Command::ConsumeEnergy
                } else {
                    Command::random(rng)
                }
            })
            .collect();
        Self {
            dna,
            reactions: ReactionMatrix::random(config.reaction_rows, config.reaction_columns, rng),
        }
    }

    /// Copy with exactly one DNA position and exactly one reaction cell replaced.
    pub fn mutate(&self, rng: &mut impl Rng) -> Self {
        let mut child = self.clone();

        if !child.dna.is_empty() {
            let i = rng.gen_range(0..child.dna.len());
            child.dna[i] = Command::random_other(&Command::ALL, child.dna[i], rng);
        }

        let rows = child.reactions.rows();
        if rows > 0 {
            let r = rng.gen_range(0..rows);
            let row = &mut child.reactions.cells[r];
            if !row.is_empty() {
                let c = rng.gen_range(0..row.len());
                row[c] = Command::random_other(&Command::REACTIONS, row[c], rng);
            }
        }

        child
    }

    /// Display colour from DNA composition: red = bites, green = energy use, blue = births.
    pub fn color(&self) -> [u8; 3] {
        let len = self.dna.len().max(1) as f32;
        let share = |pred: fn(&Command) -> bool| -> u8 {
            let n = self.dna.iter().filter(|c| pred(c)).count() as f32;
            ((n / len) * 255.0).round().clamp(0.0, 255.0) as u8
        };
        [
            share(|c| c.is_bite()),
            share(|c| *c == Command::ConsumeEnergy),
            share(|c| c.is_birth()),
        ]
    }

    /// Stable, pronounceable label derived only from the DNA.
    pub fn name(&self) -> String {
        const ONSETS: [&str; 16] = [
            "b", "d", "f", "g", "k", "l", "m", "n", "p", "r", "s", "t", "v", "z", "sh", "th",
        ];
        const VOWELS: [&str; 8] = ["a", "e", "i", "o", "u", "ai", "ou", "y"];

        let mut h: u32 = 0x811c_9dc5;
        for c in &self.dna {
            h ^= c.code() as u32;
            h = h.wrapping_mul(0x0100_0193);
        }
        let h = mix32(h);

        let mut name = String::new();
        for syllable in 0..3 {
            let bits = h >> (syllable * 7);
            name.push_str(ONSETS[(bits & 0xf) as usize]);
            name.push_str(VOWELS[((bits >> 4) & 0x7) as usize]);
        }
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => name,
        }
    }
}

fn mix32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}
