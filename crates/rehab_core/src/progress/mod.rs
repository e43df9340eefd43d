//! Per-mode completion percentages, history, and persistence sinks.
//!
//! The engine keeps its own [`TherapyProgress`] for `continue` and queries;
//! every finished level is also forwarded to a [`ProgressSink`], which is
//! fire-and-forget. Sink failures are logged and never reach the caller.

mod error;
mod history;
mod store;
mod table;

pub use error::StoreError;
pub use history::{ProgressEntry, ProgressLog};
pub use store::{FileSink, ProgressArchive, ProgressStore, ARCHIVE_VERSION};
pub use table::TherapyProgress;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::target::InteractionStyle;

/// Key under which results are stored: one per interaction style plus one
/// per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityMode {
    Reach,
    Grip,
    Carry,
    Sort,
    Measurement,
    WrongContainerRetry,
    DropRetry,
    UnreachableRetry,
    Static,
}

impl ActivityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityMode::Reach => "reach",
            ActivityMode::Grip => "grip",
            ActivityMode::Carry => "carry",
            ActivityMode::Sort => "sort",
            ActivityMode::Measurement => "measurement",
            ActivityMode::WrongContainerRetry => "wrong_container_retry",
            ActivityMode::DropRetry => "drop_retry",
            ActivityMode::UnreachableRetry => "unreachable_retry",
            ActivityMode::Static => "static",
        }
    }

    pub fn is_phase(&self) -> bool {
        !matches!(self, ActivityMode::Reach | ActivityMode::Grip | ActivityMode::Carry | ActivityMode::Sort)
    }
}

impl fmt::Display for ActivityMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<InteractionStyle> for ActivityMode {
    fn from(style: InteractionStyle) -> Self {
        match style {
            InteractionStyle::Reach => ActivityMode::Reach,
            InteractionStyle::Grip => ActivityMode::Grip,
            InteractionStyle::Carry => ActivityMode::Carry,
            InteractionStyle::Sort => ActivityMode::Sort,
        }
    }
}

/// One scored level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub mode: ActivityMode,
    pub level_index: usize,
    pub percent: u8,
    pub session_id: Uuid,
    pub recorded_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn new(mode: ActivityMode, level_index: usize, percent: u8, session_id: Uuid) -> Self {
        Self { mode, level_index, percent, session_id, recorded_at: Utc::now() }
    }
}

/// Destination for finished-level results.
pub trait ProgressSink {
    /// Must not fail the caller; implementations log their own errors.
    fn persist(&mut self, record: &ProgressRecord);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn persist(&mut self, record: &ProgressRecord) {
        log::trace!("Discarding {} level {} = {}%", record.mode, record.level_index, record.percent);
    }
}

/// Keeps records in memory. Clones share the same buffer, so a caller can
/// hand one clone to the engine and inspect the other.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Rc<RefCell<Vec<ProgressRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ProgressRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn last(&self) -> Option<ProgressRecord> {
        self.records.borrow().last().cloned()
    }
}

impl ProgressSink for MemorySink {
    fn persist(&mut self, record: &ProgressRecord) {
        self.records.borrow_mut().push(record.clone());
    }
}
