use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::orb::Orb;

/// Bounded grid carrying a non-negative energy count per cell.
///
/// x is the column and y the row. Orb occupancy is not stored here; see [`occupants_at`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub rows: usize,
    pub cols: usize,
    energy: Vec<u32>,
}

impl World {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            energy: vec![0; rows * cols],
        }
    }

    pub(crate) fn from_cells(rows: usize, cols: usize, energy: Vec<u32>) -> Option<Self> {
        (energy.len() == rows * cols).then_some(Self { rows, cols, energy })
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.cols && (y as usize) < self.rows
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    /// Energy at a cell; 0 outside the grid.
    pub fn energy_at(&self, row: usize, col: usize) -> u32 {
        self.index(row, col).map_or(0, |i| self.energy[i])
    }

    /// Negative amounts contribute nothing.
    pub fn add_energy(&mut self, row: usize, col: usize, amount: i64) {
        if amount <= 0 {
            return;
        }
        if let Some(i) = self.index(row, col) {
            let add = u32::try_from(amount).unwrap_or(u32::MAX);
            self.energy[i] = self.energy[i].saturating_add(add);
        }
    }

    /// Take `amount` units. Fails without mutation if the cell holds less.
    pub fn consume_energy(&mut self, row: usize, col: usize, amount: u32) -> bool {
        match self.index(row, col) {
            Some(i) if self.energy[i] >= amount => {
                self.energy[i] -= amount;
                true
            }
            _ => false,
        }
    }

    /// Drop `total` single units on uniformly random cells. Cells may stack.
    pub fn distribute(&mut self, total: u32, rng: &mut impl Rng) {
        if self.energy.is_empty() {
            return;
        }
        for _ in 0..total {
            let i = rng.gen_range(0..self.energy.len());
            self.energy[i] = self.energy[i].saturating_add(1);
        }
    }

    pub fn clear_energy(&mut self) {
        self.energy.iter_mut().for_each(|e| *e = 0);
    }

    /// Wipe the field and scatter a fresh `total`.
    pub fn reseed(&mut self, total: u32, rng: &mut impl Rng) {
        self.clear_energy();
        self.distribute(total, rng);
    }

    pub fn total_energy(&self) -> u64 {
        self.energy.iter().map(|&e| e as u64).sum()
    }

    /// Row-major copy of the field for presentation.
    pub fn energy_cells(&self) -> &[u32] {
        &self.energy
    }

    pub fn random_cell(&self, rng: &mut impl Rng) -> (i32, i32) {
        (
            rng.gen_range(0..self.cols) as i32,
            rng.gen_range(0..self.rows) as i32,
        )
    }
}

/// Indices of live orbs standing on (x, y), optionally skipping one index.
///
/// Orbs with hp <= 0 that are still awaiting the end-of-tick sweep are invisible here.
pub fn occupants_at(orbs: &[Orb], x: i32, y: i32, exclude: Option<usize>) -> Vec<usize> {
    orbs.iter()
        .enumerate()
        .filter(|(i, o)| Some(*i) != exclude && o.is_alive() && o.x == x && o.y == y)
        .map(|(i, _)| i)
        .collect()
}

pub fn is_occupied(orbs: &[Orb], x: i32, y: i32) -> bool {
    orbs.iter().any(|o| o.is_alive() && o.x == x && o.y == y)
}
