use serde::{Deserialize, Serialize};

use super::{ActivityMode, ProgressRecord};

/// Display format of history timestamps (UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A finished level as shown in the therapist's history view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub timestamp: String,
    pub mode: ActivityMode,
    pub level_index: usize,
    pub percent: u8,
    pub session_id: String,
}

impl From<&ProgressRecord> for ProgressEntry {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            timestamp: record.recorded_at.format(TIMESTAMP_FORMAT).to_string(),
            mode: record.mode,
            level_index: record.level_index,
            percent: record.percent,
            session_id: record.session_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressLog {
    entries: Vec<ProgressEntry>,
}

impl ProgressLog {
    pub fn push(&mut self, record: &ProgressRecord) {
        self.entries.push(ProgressEntry::from(record));
    }

    pub fn entries(&self) -> &[ProgressEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest first, at most `n`.
    pub fn recent(&self, n: usize) -> Vec<&ProgressEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn for_mode(&self, mode: ActivityMode) -> Vec<&ProgressEntry> {
        self.entries.iter().filter(|e| e.mode == mode).collect()
    }
}
