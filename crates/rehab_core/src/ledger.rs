//! Per-cell outcome record built during the measurement phase.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::space::GridIndex;
use crate::target::TargetKind;

/// Classification of one target interaction, worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Never touched.
    Unreachable,
    /// Grasped but let go too quickly to count as a hold.
    GrabMiss,
    /// Held, then released outside every container.
    Dropped,
    /// Released into the container for the other kind.
    WrongContainer,
    Success,
}

impl Outcome {
    pub const ALL: [Outcome; 5] = [
        Outcome::Unreachable,
        Outcome::GrabMiss,
        Outcome::Dropped,
        Outcome::WrongContainer,
        Outcome::Success,
    ];

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Unreachable => "unreachable",
            Outcome::GrabMiss => "grab_miss",
            Outcome::Dropped => "dropped",
            Outcome::WrongContainer => "wrong_container",
            Outcome::Success => "success",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last recorded outcome per cell, plus the kind each cell was measured
/// with so retries present the same kind again.
#[derive(Debug, Clone, Default)]
pub struct OutcomeLedger {
    results: HashMap<GridIndex, Outcome>,
    kinds: HashMap<GridIndex, TargetKind>,
}

impl OutcomeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites any earlier outcome for the cell.
    pub fn record(&mut self, grid_index: GridIndex, outcome: Outcome) {
        if let Some(previous) = self.results.insert(grid_index, outcome) {
            log::debug!("Cell {} outcome {} -> {}", grid_index, previous, outcome);
        } else {
            log::debug!("Recorded {} for cell {}", outcome, grid_index);
        }
    }

    /// Cells currently mapped to `outcome`, sorted by index.
    pub fn filter(&self, outcome: Outcome) -> Vec<GridIndex> {
        let mut cells: Vec<GridIndex> =
            self.results.iter().filter(|(_, o)| **o == outcome).map(|(g, _)| *g).collect();
        cells.sort();
        cells
    }

    /// Union of several filters without duplicates, sorted.
    pub fn filter_any(&self, outcomes: &[Outcome]) -> Vec<GridIndex> {
        let mut cells: Vec<GridIndex> =
            self.results.iter().filter(|(_, o)| outcomes.contains(o)).map(|(g, _)| *g).collect();
        cells.sort();
        cells.dedup();
        cells
    }

    pub fn outcome_of(&self, grid_index: GridIndex) -> Option<Outcome> {
        self.results.get(&grid_index).copied()
    }

    pub fn note_kind(&mut self, grid_index: GridIndex, kind: TargetKind) {
        self.kinds.insert(grid_index, kind);
    }

    pub fn kind_of(&self, grid_index: GridIndex) -> Option<TargetKind> {
        self.kinds.get(&grid_index).copied()
    }

    pub fn reset_all(&mut self) {
        self.results.clear();
        self.kinds.clear();
    }

    /// Marks every listed cell without an outcome as `Unreachable`.
    /// Returns how many were filled.
    pub fn backfill_unreachable(&mut self, cells: &[GridIndex]) -> usize {
        let mut filled = 0;
        for cell in cells {
            if !self.results.contains_key(cell) {
                self.results.insert(*cell, Outcome::Unreachable);
                filled += 1;
            }
        }
        filled
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Count per outcome, every outcome present.
    pub fn summary(&self) -> BTreeMap<Outcome, usize> {
        let mut summary: BTreeMap<Outcome, usize> = Outcome::ALL.iter().map(|o| (*o, 0)).collect();
        for outcome in self.results.values() {
            *summary.entry(*outcome).or_insert(0) += 1;
        }
        summary
    }

    /// Ordered copy for serialization and display.
    pub fn snapshot(&self) -> BTreeMap<GridIndex, Outcome> {
        self.results.iter().map(|(g, o)| (*g, *o)).collect()
    }
}
