//! # Rehab Engine
//!
//! Owns every component of a session and exposes the host API. Nothing is
//! global: the host builds one engine per patient session and hands it a
//! head-pose provider and a progress sink.
//!
//! ## Routing
//!
//! Host events go through the [`OutcomeClassifier`]; resolutions land in the
//! spawner's notice queue and are routed on the same call to:
//! - the ledger, while the measurement phase runs
//! - the running lifecycle (style level or phase), always
//!
//! ## Usage
//! ```rust
//! use rehab_core::prelude::*;
//!
//! let mut engine = RehabEngine::new(
//!     RehabConfig::quick_drill(),
//!     Box::new(FixedFrame::default()),
//!     Box::new(NullSink),
//! )
//! .unwrap();
//! engine.switch_style(InteractionStyle::Reach);
//! engine.start_level_at(0).unwrap();
//! let first = engine.targets().next().map(|t| t.id).unwrap();
//! engine.handle(InteractionEvent::Contact { target: first });
//! assert_eq!(engine.lifecycle(InteractionStyle::Reach).unwrap().session().success, 1);
//! ```

use std::collections::BTreeMap;

use nalgebra::UnitQuaternion;
use serde::Serialize;

use crate::classify::{InteractionEvent, OutcomeClassifier};
use crate::config::{ContainerConfig, LevelConfigSource, RehabConfig};
use crate::error::{RehabError, Result};
use crate::exercise::{variant_for, ExerciseLifecycle, FinishOrNext, LevelContent, LevelStart, Stage};
use crate::ledger::{Outcome, OutcomeLedger};
use crate::phase::{GameMode, PhaseEnd, PhaseOrchestrator, PhaseStart};
use crate::progress::{ActivityMode, ProgressRecord, ProgressSink, TherapyProgress};
use crate::space::{GridCellSpace, GridIndex, HandSide, ReferenceFrameProvider, Vec3, Workspace};
use crate::target::{Container, ContainerRig, InteractionStyle, Target, TargetId, TargetKind, TargetSpawner};

/// Notifications for the host's renderer and UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    StyleSwitched {
        style: InteractionStyle,
    },
    CountdownStarted {
        mode: ActivityMode,
        level_index: usize,
        secs: f32,
    },
    LevelStarted {
        mode: ActivityMode,
        level_index: usize,
        targets: usize,
    },
    TargetSpawned {
        id: TargetId,
        style: InteractionStyle,
        kind: TargetKind,
        position: Vec3,
        rotation: UnitQuaternion<f32>,
        asset: Option<String>,
        material: Option<String>,
    },
    /// `position` is where success or failure feedback should play.
    TargetResolved {
        id: TargetId,
        cell: GridIndex,
        outcome: Outcome,
        position: Vec3,
    },
    LevelFinished {
        record: ProgressRecord,
    },
    PhaseStarted {
        mode: GameMode,
        cells: usize,
        secs: f32,
    },
    PhaseFinished {
        mode: GameMode,
        backfilled: usize,
        percent: Option<u8>,
    },
}

/// Geometry and live objects a lifecycle spawns into.
struct Scene {
    space: GridCellSpace,
    spawner: TargetSpawner,
    rig: ContainerRig,
    containers: ContainerConfig,
}

impl Scene {
    fn stage(&mut self) -> Stage<'_> {
        Stage { space: &self.space, spawner: &mut self.spawner, rig: &mut self.rig, containers: &self.containers }
    }
}

/// One lifecycle per interaction style plus the one phases run through.
struct Runs {
    styles: BTreeMap<InteractionStyle, ExerciseLifecycle>,
    phase: ExerciseLifecycle,
}

impl Runs {
    fn build(source: &dyn LevelConfigSource, countdown_secs: f32, phase_style: InteractionStyle) -> Self {
        let styles = InteractionStyle::ALL
            .iter()
            .map(|style| {
                let lifecycle =
                    ExerciseLifecycle::new((*style).into(), variant_for(*style), source.levels(*style), countdown_secs);
                (*style, lifecycle)
            })
            .collect();
        let phase = ExerciseLifecycle::new(ActivityMode::Measurement, variant_for(phase_style), Vec::new(), 0.0);
        Self { styles, phase }
    }

    /// The lifecycle that should receive resolutions right now.
    fn current(&mut self, phase_running: bool, style: Option<InteractionStyle>) -> Option<&mut ExerciseLifecycle> {
        if phase_running {
            return Some(&mut self.phase);
        }
        self.styles.get_mut(&style?)
    }

    fn cancel_all(&mut self, stage: &mut Stage) {
        for lifecycle in self.styles.values_mut() {
            lifecycle.cancel(stage);
        }
        self.phase.cancel(stage);
    }
}

pub struct RehabEngine {
    config: RehabConfig,
    frames: Box<dyn ReferenceFrameProvider>,
    scene: Scene,
    ledger: OutcomeLedger,
    classifier: OutcomeClassifier,
    runs: Runs,
    orchestrator: PhaseOrchestrator,
    style: Option<InteractionStyle>,
    progress: TherapyProgress,
    sink: Box<dyn ProgressSink>,
    clock: f32,
    events: Vec<EngineEvent>,
}

impl RehabEngine {
    pub fn new(
        config: RehabConfig,
        frames: Box<dyn ReferenceFrameProvider>,
        sink: Box<dyn ProgressSink>,
    ) -> Result<Self> {
        config.validate()?;

        let mut space = GridCellSpace::new(config.grid.clone());
        space.rebuild(&frames.current_frame());
        let scene = Scene {
            space,
            spawner: TargetSpawner::new(config.spawn.clone(), config.seed),
            rig: ContainerRig::new(),
            containers: config.containers.clone(),
        };
        let runs = Runs::build(&config.levels, config.timing.countdown_secs, config.phase_style);

        log::info!(
            "Rehab engine ready: {} cells, phase style {}, seed {}",
            scene.space.workspace().len(),
            config.phase_style,
            config.seed
        );

        Ok(Self {
            classifier: OutcomeClassifier::new(&config.grasp),
            orchestrator: PhaseOrchestrator::new(config.timing.clone()),
            config,
            frames,
            scene,
            ledger: OutcomeLedger::new(),
            runs,
            style: None,
            progress: TherapyProgress::new(),
            sink,
            clock: 0.0,
            events: Vec::new(),
        })
    }

    /// Seed the percent table, e.g. from a stored archive.
    pub fn with_progress(mut self, progress: TherapyProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Replace the per-style level lists. Any running level is dropped.
    pub fn with_level_source(mut self, source: &dyn LevelConfigSource) -> Self {
        self.runs.cancel_all(&mut self.scene.stage());
        self.runs = Runs::build(source, self.config.timing.countdown_secs, self.config.phase_style);
        self
    }

    // ========== Style levels ==========

    /// Select an interaction style. Every other run is cancelled without
    /// scoring; no level starts until asked.
    pub fn switch_style(&mut self, style: InteractionStyle) {
        self.cancel_everything();
        self.style = Some(style);
        log::info!("Interaction style switched to {}", style);
        self.events.push(EngineEvent::StyleSwitched { style });
    }

    pub fn style(&self) -> Option<InteractionStyle> {
        self.style
    }

    pub fn start_level_at(&mut self, index: usize) -> Result<LevelStart> {
        self.start_style_level(|_, _| index)
    }

    pub fn restart(&mut self) -> Result<LevelStart> {
        self.start_style_level(|_, _| 0)
    }

    /// Resume at the last level completed at 100%.
    pub fn continue_progress(&mut self) -> Result<LevelStart> {
        self.start_style_level(|lifecycle, progress| lifecycle.continue_index(progress))
    }

    /// Rejected starts leave the running level or phase untouched: the index
    /// and assets are checked before anything is cancelled or realigned.
    fn start_style_level<F>(&mut self, pick: F) -> Result<LevelStart>
    where
        F: FnOnce(&ExerciseLifecycle, &TherapyProgress) -> usize,
    {
        let style = self.require_style()?;
        let lifecycle = self.runs.styles.get(&style).ok_or(RehabError::NoActiveStyle)?;
        let index = pick(lifecycle, &self.progress);
        lifecycle.level_for(index)?;
        self.scene.spawner.check_assets(style)?;

        self.stop_running_phase();
        self.realign();

        let lifecycle = self.runs.styles.get_mut(&style).ok_or(RehabError::NoActiveStyle)?;
        let started = lifecycle.start_level_at(index, &mut self.scene.stage())?;
        let (mode, level_index) = (lifecycle.mode(), lifecycle.session().level_index);
        self.report_start(mode, level_index, started);
        Ok(started)
    }

    /// Score the running level (or phase) and clear its content.
    pub fn finish(&mut self) -> Option<ProgressRecord> {
        self.route_notices();
        if self.orchestrator.current().is_some() {
            return self.complete_phase().and_then(|(_, record)| record);
        }
        let style = self.style?;
        let lifecycle = self.runs.styles.get_mut(&style)?;
        let record = lifecycle.finish(&mut self.scene.stage(), self.sink.as_mut())?;
        self.record_result(record.clone());
        Some(record)
    }

    /// Therapist shortcut: finish the running level, or move on after a
    /// perfect one.
    ///
    /// While a phase runs this finishes the phase instead; the workspace is
    /// only realigned when a new level is about to spawn.
    pub fn finish_or_next(&mut self) -> Result<FinishOrNext> {
        let style = self.require_style()?;
        self.route_notices();
        if self.orchestrator.current().is_some() {
            return Ok(match self.complete_phase() {
                Some((_, Some(record))) => FinishOrNext::Finished(record),
                _ => FinishOrNext::Idle,
            });
        }
        let level_running = self.runs.styles.get(&style).map_or(false, |l| l.is_active());
        if !level_running {
            self.realign();
        }
        let lifecycle = self.runs.styles.get_mut(&style).ok_or(RehabError::NoActiveStyle)?;
        let outcome = lifecycle.finish_or_next(&mut self.scene.stage(), self.sink.as_mut())?;
        match &outcome {
            FinishOrNext::Finished(record) => self.record_result(record.clone()),
            FinishOrNext::Advanced { level_index, start } => {
                self.report_start(ActivityMode::from(style), *level_index, *start)
            }
            FinishOrNext::Idle => {}
        }
        Ok(outcome)
    }

    // ========== Events and time ==========

    /// Feed one interaction. Returns the outcome when it resolved a target.
    pub fn handle(&mut self, event: InteractionEvent) -> Option<Outcome> {
        let notice = self.classifier.handle(event, self.clock, &mut self.scene.spawner, &self.scene.rig);
        self.route_notices();
        notice.map(|n| n.outcome)
    }

    /// Advance countdowns and phase timers by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.clock += dt.max(0.0);
        self.route_notices();

        if let Some(style) = self.style {
            if let Some(lifecycle) = self.runs.styles.get_mut(&style) {
                let (mode, level_index) = (lifecycle.mode(), lifecycle.session().level_index);
                match lifecycle.tick(dt, &mut self.scene.stage()) {
                    Ok(Some(spawned)) => self.report_start(mode, level_index, LevelStart::Active { spawned }),
                    Ok(None) => {}
                    Err(e) => log::warn!("Countdown for {} ended without a level: {}", mode, e),
                }
            }
        }

        if self.orchestrator.tick(dt) {
            self.complete_phase();
        }
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn route_notices(&mut self) {
        let measuring = self.orchestrator.current() == Some(GameMode::Measurement);
        let phase_running = self.orchestrator.current().is_some();
        for notice in self.scene.spawner.drain_notices() {
            if measuring {
                self.ledger.record(notice.cell, notice.outcome);
            }
            if let Some(lifecycle) = self.runs.current(phase_running, self.style) {
                lifecycle.notify_success(notice.succeeded());
            }
            self.events.push(EngineEvent::TargetResolved {
                id: notice.target,
                cell: notice.cell,
                outcome: notice.outcome,
                position: notice.position,
            });
        }
    }

    // ========== Phases ==========

    pub fn start_measurement(&mut self) -> Result<PhaseStart> {
        self.start_phase(GameMode::Measurement, &[])
    }

    pub fn start_wrong_container_retry(&mut self) -> Result<PhaseStart> {
        self.start_phase(GameMode::WrongContainerRetry, &[])
    }

    pub fn start_drop_retry(&mut self) -> Result<PhaseStart> {
        self.start_phase(GameMode::DropRetry, &[])
    }

    pub fn start_unreachable_retry(&mut self) -> Result<PhaseStart> {
        self.start_phase(GameMode::UnreachableRetry, &[])
    }

    /// Present an explicit cell list. Indices are clamped into the layout.
    pub fn start_static(&mut self, cells: &[GridIndex]) -> Result<PhaseStart> {
        self.start_phase(GameMode::Static, cells)
    }

    fn start_phase(&mut self, mode: GameMode, static_cells: &[GridIndex]) -> Result<PhaseStart> {
        self.scene.spawner.check_assets(self.config.phase_style)?;
        self.cancel_everything();
        self.realign();

        let indices =
            self.orchestrator.select_cells(mode, &mut self.ledger, self.scene.space.workspace(), static_cells);
        let cells = match mode {
            GameMode::Measurement => self.scene.space.workspace().cells().to_vec(),
            _ => self.scene.space.cells_for(&indices),
        };
        let start = self.orchestrator.begin(mode, cells.iter().map(|c| c.grid_index).collect());

        match &start {
            PhaseStart::Finished { mode } => {
                self.events.push(EngineEvent::PhaseFinished { mode: *mode, backfilled: 0, percent: None });
            }
            PhaseStart::Running { mode, cells: presented, secs } => {
                let kinds = match mode {
                    GameMode::Measurement | GameMode::Static => self.config.spawn.sort_kinds.clone(),
                    // a retried cell keeps the kind it was measured with
                    _ => cells.iter().map_while(|c| self.ledger.kind_of(c.grid_index)).collect(),
                };
                let content = LevelContent::Cells { cells, kinds };
                self.runs.phase.set_mode((*mode).into());
                if let Err(e) = self.runs.phase.start_content(0, content, &mut self.scene.stage()) {
                    self.orchestrator.cancel();
                    return Err(e);
                }
                if *mode == GameMode::Measurement {
                    for target in self.scene.spawner.targets() {
                        self.ledger.note_kind(target.cell, target.kind);
                    }
                }
                self.events.push(EngineEvent::PhaseStarted { mode: *mode, cells: presented.len(), secs: *secs });
                self.emit_spawned();
            }
        }
        Ok(start)
    }

    /// End the running phase now, as if its timer had run out.
    pub fn stop_phase(&mut self) -> Option<PhaseEnd> {
        self.complete_phase().map(|(end, _)| end)
    }

    pub fn current_phase(&self) -> Option<GameMode> {
        self.orchestrator.current()
    }

    pub fn phase_remaining(&self) -> Option<f32> {
        self.orchestrator.remaining()
    }

    fn complete_phase(&mut self) -> Option<(PhaseEnd, Option<ProgressRecord>)> {
        self.route_notices();
        let end = self.orchestrator.complete(&mut self.ledger)?;
        let record = self.runs.phase.finish(&mut self.scene.stage(), self.sink.as_mut());
        let percent = record.as_ref().map(|r| r.percent);
        if let Some(record) = &record {
            self.record_result(record.clone());
        }
        self.events.push(EngineEvent::PhaseFinished { mode: end.mode, backfilled: end.backfilled, percent });
        Some((end, record))
    }

    // ========== Queries ==========

    pub fn current_percent(&self, mode: ActivityMode, level_index: usize) -> u8 {
        self.progress.get_percent(mode, level_index)
    }

    pub fn last_fully_completed_index(&self, mode: ActivityMode) -> Option<usize> {
        self.progress.last_full_index(mode)
    }

    pub fn progress(&self) -> &TherapyProgress {
        &self.progress
    }

    pub fn ledger(&self) -> &OutcomeLedger {
        &self.ledger
    }

    pub fn workspace(&self) -> &Workspace {
        self.scene.space.workspace()
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.scene.spawner.targets()
    }

    pub fn containers(&self) -> &[Container] {
        self.scene.rig.containers()
    }

    pub fn lifecycle(&self, style: InteractionStyle) -> Option<&ExerciseLifecycle> {
        self.runs.styles.get(&style)
    }

    pub fn phase_lifecycle(&self) -> &ExerciseLifecycle {
        &self.runs.phase
    }

    pub fn config(&self) -> &RehabConfig {
        &self.config
    }

    /// Switch the trained hand. Takes effect from the next level or phase.
    pub fn set_hand(&mut self, hand: HandSide) {
        self.config.grid.hand = hand;
    }

    // ========== Internals ==========

    fn require_style(&self) -> Result<InteractionStyle> {
        self.style.ok_or_else(|| {
            log::warn!("No interaction style selected");
            RehabError::NoActiveStyle
        })
    }

    /// Regenerate the workspace against the current head pose.
    /// Also picks up a hand switch made since the last build.
    fn realign(&mut self) {
        let frame = self.frames.current_frame();
        if self.scene.space.config().hand != self.config.grid.hand {
            self.scene.space.set_hand(self.config.grid.hand);
        }
        self.scene.space.rebuild(&frame);
    }

    fn stop_running_phase(&mut self) {
        if self.orchestrator.current().is_some() {
            self.orchestrator.cancel();
            self.runs.phase.cancel(&mut self.scene.stage());
        }
    }

    fn cancel_everything(&mut self) {
        self.orchestrator.cancel();
        self.runs.cancel_all(&mut self.scene.stage());
    }

    fn record_result(&mut self, record: ProgressRecord) {
        self.progress.set_percent(record.mode, record.level_index, record.percent as u32);
        self.events.push(EngineEvent::LevelFinished { record });
    }

    fn report_start(&mut self, mode: ActivityMode, level_index: usize, start: LevelStart) {
        match start {
            LevelStart::Countdown { secs } => {
                self.events.push(EngineEvent::CountdownStarted { mode, level_index, secs });
            }
            LevelStart::Active { spawned } => {
                self.events.push(EngineEvent::LevelStarted { mode, level_index, targets: spawned });
                self.emit_spawned();
            }
        }
    }

    fn emit_spawned(&mut self) {
        let asset = self.scene.spawner.config().assets.target_asset.clone();
        for target in self.scene.spawner.targets() {
            self.events.push(EngineEvent::TargetSpawned {
                id: target.id,
                style: target.style,
                kind: target.kind,
                position: target.position,
                rotation: target.rotation,
                asset: asset.clone(),
                material: self.scene.spawner.material_for(target.kind).map(str::to_string),
            });
        }
    }
}
