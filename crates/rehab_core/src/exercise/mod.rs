//! Exercise lifecycle shared by every interaction style.
//!
//! ```text
//! Idle --start--> Countdown --elapsed--> Active --finish--> Finished --start--> Countdown
//! ```
//!
//! The lifecycle owns the timing, counters and scoring; a [`StyleVariant`]
//! decides what gets spawned and which containers go with it.

mod lifecycle;
mod styles;

pub use lifecycle::{ExerciseLifecycle, FinishOrNext, LevelStart};
pub use styles::{variant_for, CarryStyle, GripStyle, ReachStyle, SortStyle};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ContainerConfig, LevelDescriptor};
use crate::error::Result;
use crate::progress::ActivityMode;
use crate::space::{Cell, GridCellSpace};
use crate::target::{ContainerRig, InteractionStyle, TargetKind, TargetSpawner};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExerciseState {
    Idle,
    Countdown { elapsed: f32, duration: f32 },
    Active,
    Finished,
}

impl ExerciseState {
    pub fn is_active(&self) -> bool {
        matches!(self, ExerciseState::Active)
    }
}

/// Counters for the level currently (or last) played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSession {
    pub id: Uuid,
    pub mode: ActivityMode,
    pub level_index: usize,
    pub processed: u32,
    pub success: u32,
    pub spawned: u32,
    pub percent: u8,
    pub active: bool,
}

impl ExerciseSession {
    pub fn new(mode: ActivityMode, level_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            level_index,
            processed: 0,
            success: 0,
            spawned: 0,
            percent: 0,
            active: false,
        }
    }

    pub fn percent_so_far(&self) -> u8 {
        completion_percent(self.success, self.processed, self.spawned)
    }
}

/// `round(success / max(total, 1) * 100)` with `total = max(processed, spawned)`.
pub fn completion_percent(success: u32, processed: u32, spawned: u32) -> u8 {
    let total = processed.max(spawned).max(1);
    let percent = (success.min(total) as f64 / total as f64 * 100.0).round();
    percent as u8
}

/// What a started level spawns.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelContent {
    /// A row built from a level descriptor.
    Level(LevelDescriptor),
    /// Explicit cells, as phases use. `kinds[i]` applies to `cells[i]` for Sort.
    Cells { cells: Vec<Cell>, kinds: Vec<TargetKind> },
}

/// Mutable access to the collaborators a variant spawns into.
pub struct Stage<'a> {
    pub space: &'a GridCellSpace,
    pub spawner: &'a mut TargetSpawner,
    pub rig: &'a mut ContainerRig,
    pub containers: &'a ContainerConfig,
}

/// Per-style content and container handling.
pub trait StyleVariant {
    fn style(&self) -> InteractionStyle;

    /// Spawn the level's targets and containers. Returns the target count.
    fn spawn_level_content(&mut self, content: &LevelContent, stage: &mut Stage) -> Result<usize>;

    fn notify_success(&mut self, succeeded: bool);

    /// Targets spawned and not yet resolved.
    fn outstanding(&self) -> usize;

    /// Remove targets and containers.
    fn cleanup(&mut self, stage: &mut Stage);
}
