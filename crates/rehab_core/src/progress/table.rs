use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ActivityMode;

/// Best-known percent per level, per mode. Missing levels read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TherapyProgress {
    results: BTreeMap<ActivityMode, Vec<u8>>,
}

impl TherapyProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_percent(&self, mode: ActivityMode, level_index: usize) -> u8 {
        self.results.get(&mode).and_then(|levels| levels.get(level_index)).copied().unwrap_or(0)
    }

    /// Overwrites the level's percent, clamped to 100. Earlier unplayed
    /// levels are padded with 0.
    pub fn set_percent(&mut self, mode: ActivityMode, level_index: usize, percent: u32) {
        let levels = self.results.entry(mode).or_default();
        if levels.len() <= level_index {
            levels.resize(level_index + 1, 0);
        }
        levels[level_index] = percent.min(100) as u8;
    }

    /// Highest level index completed at 100%.
    pub fn last_full_index(&self, mode: ActivityMode) -> Option<usize> {
        self.results.get(&mode)?.iter().rposition(|p| *p == 100)
    }

    pub fn levels(&self, mode: ActivityMode) -> &[u8] {
        self.results.get(&mode).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn modes(&self) -> impl Iterator<Item = (&ActivityMode, &Vec<u8>)> {
        self.results.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.results.values().all(Vec::is_empty)
    }

    /// True when every stored percent is within 0..=100.
    pub fn is_consistent(&self) -> bool {
        self.results.values().flatten().all(|p| *p <= 100)
    }
}
