//! Measurement and remedial phases.
//!
//! Measurement spawns the whole workspace and records every resolution in
//! the ledger; whatever is still untouched when the timer runs out becomes
//! `Unreachable`. The retry phases then re-present only the cells that
//! failed a certain way.

mod timer;

pub use timer::PhaseTimer;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::TimingConfig;
use crate::ledger::{Outcome, OutcomeLedger};
use crate::progress::ActivityMode;
use crate::space::{GridIndex, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Measurement,
    WrongContainerRetry,
    DropRetry,
    UnreachableRetry,
    Static,
}

impl GameMode {
    pub const ALL: [GameMode; 5] = [
        GameMode::Measurement,
        GameMode::WrongContainerRetry,
        GameMode::DropRetry,
        GameMode::UnreachableRetry,
        GameMode::Static,
    ];

    /// Outcomes whose cells a retry phase re-presents.
    pub fn retry_outcomes(&self) -> &'static [Outcome] {
        match self {
            GameMode::WrongContainerRetry => &[Outcome::WrongContainer],
            GameMode::DropRetry => &[Outcome::Dropped, Outcome::GrabMiss],
            GameMode::UnreachableRetry => &[Outcome::Unreachable],
            GameMode::Measurement | GameMode::Static => &[],
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(ActivityMode::from(*self).as_str())
    }
}

impl From<GameMode> for ActivityMode {
    fn from(mode: GameMode) -> Self {
        match mode {
            GameMode::Measurement => ActivityMode::Measurement,
            GameMode::WrongContainerRetry => ActivityMode::WrongContainerRetry,
            GameMode::DropRetry => ActivityMode::DropRetry,
            GameMode::UnreachableRetry => ActivityMode::UnreachableRetry,
            GameMode::Static => ActivityMode::Static,
        }
    }
}

/// Result of entering a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseStart {
    Running { mode: GameMode, cells: Vec<GridIndex>, secs: f32 },
    /// Nothing to present; the phase is already over.
    Finished { mode: GameMode },
}

/// What ended when a phase completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseEnd {
    pub mode: GameMode,
    /// Cells back-filled as unreachable (measurement only).
    pub backfilled: usize,
}

/// Tracks the running phase, its timer and the cells it presented.
#[derive(Debug, Clone)]
pub struct PhaseOrchestrator {
    timing: TimingConfig,
    current: Option<GameMode>,
    timer: PhaseTimer,
    cells: Vec<GridIndex>,
}

impl PhaseOrchestrator {
    pub fn new(timing: TimingConfig) -> Self {
        Self { timing, current: None, timer: PhaseTimer::default(), cells: Vec::new() }
    }

    pub fn current(&self) -> Option<GameMode> {
        self.current
    }

    pub fn cells(&self) -> &[GridIndex] {
        &self.cells
    }

    pub fn remaining(&self) -> Option<f32> {
        self.timer.remaining()
    }

    pub fn duration_for(&self, mode: GameMode) -> f32 {
        match mode {
            GameMode::Measurement => self.timing.measure_secs,
            _ => self.timing.phase_secs,
        }
    }

    /// Cells a phase would present. Measurement resets the ledger and takes
    /// the whole workspace.
    pub fn select_cells(
        &self,
        mode: GameMode,
        ledger: &mut OutcomeLedger,
        workspace: &Workspace,
        static_cells: &[GridIndex],
    ) -> Vec<GridIndex> {
        match mode {
            GameMode::Measurement => {
                ledger.reset_all();
                workspace.grid_indices()
            }
            GameMode::Static => static_cells.to_vec(),
            retry => ledger.filter_any(retry.retry_outcomes()),
        }
    }

    /// Record that `mode` is presenting `cells` and start its timer. An
    /// empty set finishes immediately and leaves the orchestrator idle.
    pub fn begin(&mut self, mode: GameMode, cells: Vec<GridIndex>) -> PhaseStart {
        self.cancel();
        if cells.is_empty() {
            log::info!("Phase {} has no cells, finished immediately", mode);
            return PhaseStart::Finished { mode };
        }
        let secs = self.duration_for(mode);
        log::info!("Phase {} started: {} cells for {:.0}s", mode, cells.len(), secs);
        self.timer.start(secs);
        self.current = Some(mode);
        self.cells = cells.clone();
        PhaseStart::Running { mode, cells, secs }
    }

    /// Returns true when the running phase's timer expired on this tick.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.current.is_some() && self.timer.tick(dt)
    }

    /// Close the running phase. Measurement back-fills every presented cell
    /// that never resolved.
    pub fn complete(&mut self, ledger: &mut OutcomeLedger) -> Option<PhaseEnd> {
        let mode = self.current.take()?;
        self.timer.cancel();
        let backfilled = match mode {
            GameMode::Measurement => ledger.backfill_unreachable(&self.cells),
            _ => 0,
        };
        log::info!("Phase {} complete ({} cells back-filled as unreachable)", mode, backfilled);
        Some(PhaseEnd { mode, backfilled })
    }

    /// Stop without back-filling.
    pub fn cancel(&mut self) {
        if let Some(mode) = self.current.take() {
            log::info!("Phase {} cancelled", mode);
        }
        self.timer.cancel();
        self.cells.clear();
    }
}
