use super::{completion_percent, ExerciseSession, ExerciseState, LevelContent, Stage, StyleVariant};
use crate::config::LevelDescriptor;
use crate::error::{RehabError, Result};
use crate::progress::{ActivityMode, ProgressRecord, ProgressSink, TherapyProgress};
use crate::target::InteractionStyle;

/// How a start request left the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelStart {
    /// Waiting `secs` before spawning.
    Countdown { secs: f32 },
    /// Spawned immediately.
    Active { spawned: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinishOrNext {
    Finished(ProgressRecord),
    Advanced { level_index: usize, start: LevelStart },
    /// Nothing running and no completed level to advance from.
    Idle,
}

/// Drives one style variant through countdown, play and scoring.
pub struct ExerciseLifecycle {
    mode: ActivityMode,
    variant: Box<dyn StyleVariant>,
    levels: Vec<LevelDescriptor>,
    countdown_secs: f32,
    state: ExerciseState,
    session: ExerciseSession,
    pending: Option<LevelContent>,
}

impl ExerciseLifecycle {
    pub fn new(
        mode: ActivityMode,
        variant: Box<dyn StyleVariant>,
        levels: Vec<LevelDescriptor>,
        countdown_secs: f32,
    ) -> Self {
        Self {
            mode,
            variant,
            levels,
            countdown_secs: countdown_secs.max(0.0),
            state: ExerciseState::Idle,
            session: ExerciseSession::new(mode, 0),
            pending: None,
        }
    }

    pub fn mode(&self) -> ActivityMode {
        self.mode
    }

    /// Results are stored under `mode`; lets phases reuse one lifecycle.
    pub fn set_mode(&mut self, mode: ActivityMode) {
        self.mode = mode;
    }

    pub fn style(&self) -> InteractionStyle {
        self.variant.style()
    }

    pub fn state(&self) -> ExerciseState {
        self.state
    }

    pub fn session(&self) -> &ExerciseSession {
        &self.session
    }

    pub fn levels(&self) -> &[LevelDescriptor] {
        &self.levels
    }

    pub fn outstanding(&self) -> usize {
        self.variant.outstanding()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// The descriptor `start_level_at(index)` would use. Logs and fails the
    /// same way without touching any state.
    pub fn level_for(&self, index: usize) -> Result<LevelDescriptor> {
        if self.levels.is_empty() {
            log::error!("No levels configured for {}", self.mode);
            return Err(RehabError::EmptyLevelList { style: self.style() });
        }
        self.levels.get(index).copied().ok_or_else(|| {
            log::warn!("Level {} out of range for {} ({} levels)", index, self.mode, self.levels.len());
            RehabError::InvalidLevel { index, len: self.levels.len() }
        })
    }

    pub fn start_level_at(&mut self, index: usize, stage: &mut Stage) -> Result<LevelStart> {
        let level = self.level_for(index)?;
        self.start_content(index, LevelContent::Level(level), stage)
    }

    /// Start arbitrary content scored as level `level_index`.
    pub fn start_content(
        &mut self,
        level_index: usize,
        content: LevelContent,
        stage: &mut Stage,
    ) -> Result<LevelStart> {
        stage.spawner.check_assets(self.style())?;

        self.variant.cleanup(stage);
        self.session = ExerciseSession::new(self.mode, level_index);
        self.pending = None;

        if self.countdown_secs > 0.0 {
            log::info!("{} level {}: countdown {:.1}s", self.mode, level_index, self.countdown_secs);
            self.state = ExerciseState::Countdown { elapsed: 0.0, duration: self.countdown_secs };
            self.pending = Some(content);
            return Ok(LevelStart::Countdown { secs: self.countdown_secs });
        }

        let spawned = self.activate(&content, stage)?;
        Ok(LevelStart::Active { spawned })
    }

    fn activate(&mut self, content: &LevelContent, stage: &mut Stage) -> Result<usize> {
        match self.variant.spawn_level_content(content, stage) {
            Ok(spawned) => {
                self.state = ExerciseState::Active;
                self.session.spawned = spawned as u32;
                self.session.active = true;
                log::info!("{} level {} active with {} targets", self.mode, self.session.level_index, spawned);
                Ok(spawned)
            }
            Err(e) => {
                log::error!("{} level {} failed to spawn: {}", self.mode, self.session.level_index, e);
                self.variant.cleanup(stage);
                self.state = ExerciseState::Idle;
                Err(e)
            }
        }
    }

    /// Advance the countdown. Returns the spawn count on the tick that
    /// activates the level.
    pub fn tick(&mut self, dt: f32, stage: &mut Stage) -> Result<Option<usize>> {
        let ExerciseState::Countdown { elapsed, duration } = self.state else {
            return Ok(None);
        };
        let elapsed = elapsed + dt.max(0.0);
        if elapsed < duration {
            self.state = ExerciseState::Countdown { elapsed, duration };
            return Ok(None);
        }
        match self.pending.take() {
            Some(content) => self.activate(&content, stage).map(Some),
            None => {
                self.state = ExerciseState::Idle;
                Ok(None)
            }
        }
    }

    /// Count one resolved target. Ignored unless active; never finishes the
    /// level on its own.
    pub fn notify_success(&mut self, succeeded: bool) -> bool {
        if !self.state.is_active() {
            return false;
        }
        self.session.processed += 1;
        if succeeded {
            self.session.success += 1;
        }
        self.variant.notify_success(succeeded);
        true
    }

    /// Score, persist, and clear the level. No-op unless active.
    pub fn finish(&mut self, stage: &mut Stage, sink: &mut dyn ProgressSink) -> Option<ProgressRecord> {
        if !self.state.is_active() {
            return None;
        }
        let s = &mut self.session;
        s.percent = completion_percent(s.success, s.processed, s.spawned);
        s.active = false;
        let record = ProgressRecord::new(self.mode, s.level_index, s.percent, s.id);
        log::info!(
            "{} level {} finished: {}/{} ({} spawned) = {}%",
            self.mode,
            s.level_index,
            s.success,
            s.processed,
            s.spawned,
            s.percent
        );

        sink.persist(&record);
        self.state = ExerciseState::Finished;
        self.variant.cleanup(stage);
        Some(record)
    }

    pub fn restart(&mut self, stage: &mut Stage) -> Result<LevelStart> {
        self.start_level_at(0, stage)
    }

    /// Resume at the last level completed at 100%, or the first level.
    pub fn continue_level(&mut self, progress: &TherapyProgress, stage: &mut Stage) -> Result<LevelStart> {
        let index = self.continue_index(progress);
        self.start_level_at(index, stage)
    }

    /// Last level finished at 100%, or 0 when there is none in range.
    pub fn continue_index(&self, progress: &TherapyProgress) -> usize {
        progress.last_full_index(self.mode).filter(|i| *i < self.levels.len()).unwrap_or(0)
    }

    /// Finish an active level; otherwise advance past a level just finished
    /// at 100%.
    pub fn finish_or_next(&mut self, stage: &mut Stage, sink: &mut dyn ProgressSink) -> Result<FinishOrNext> {
        if let Some(record) = self.finish(stage, sink) {
            return Ok(FinishOrNext::Finished(record));
        }
        if self.state == ExerciseState::Finished && self.session.percent == 100 {
            let next = self.session.level_index + 1;
            if next < self.levels.len() {
                let start = self.start_level_at(next, stage)?;
                return Ok(FinishOrNext::Advanced { level_index: next, start });
            }
            log::info!("{} has no level after {}", self.mode, self.session.level_index);
        }
        Ok(FinishOrNext::Idle)
    }

    /// Drop content and return to idle without scoring.
    pub fn cancel(&mut self, stage: &mut Stage) {
        if matches!(self.state, ExerciseState::Countdown { .. } | ExerciseState::Active) {
            log::info!("{} level {} cancelled", self.mode, self.session.level_index);
        }
        self.variant.cleanup(stage);
        self.pending = None;
        self.session.active = false;
        self.state = ExerciseState::Idle;
    }
}
