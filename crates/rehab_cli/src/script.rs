//! Session replay from a JSON step list.
//!
//! ```json
//! [
//!   { "op": "switch_style", "style": "sort" },
//!   { "op": "start_level", "index": 0 },
//!   { "op": "release", "target": 1, "at": [-0.25, -0.4, 0.7], "hold": 0.5 },
//!   { "op": "finish" }
//! ]
//! ```

use serde::Deserialize;

use rehab_core::prelude::*;
use rehab_core::{ProgressRecord, TherapyProgress, Vec3};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    SwitchStyle {
        style: InteractionStyle,
    },
    StartLevel {
        index: usize,
    },
    Restart,
    Continue,
    Finish,
    FinishOrNext,
    Contact {
        target: TargetId,
    },
    /// Contact every live target.
    ContactAll,
    GraspStart {
        target: TargetId,
    },
    GraspMove {
        target: TargetId,
        at: Vec3,
    },
    GraspEnd {
        target: TargetId,
        at: Vec3,
    },
    /// Grasp, hold for `hold` seconds, release at `at`.
    Release {
        target: TargetId,
        at: Vec3,
        #[serde(default)]
        hold: f32,
    },
    Tick {
        dt: f32,
    },
    Phase {
        mode: GameMode,
        #[serde(default)]
        cells: Vec<GridIndex>,
    },
    StopPhase,
    /// Move the tracked head. Applies from the next level or phase.
    Head {
        position: Vec3,
        #[serde(default)]
        yaw_deg: f32,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::SwitchStyle { .. } => "switch_style",
            Step::StartLevel { .. } => "start_level",
            Step::Restart => "restart",
            Step::Continue => "continue",
            Step::Finish => "finish",
            Step::FinishOrNext => "finish_or_next",
            Step::Contact { .. } => "contact",
            Step::ContactAll => "contact_all",
            Step::GraspStart { .. } => "grasp_start",
            Step::GraspMove { .. } => "grasp_move",
            Step::GraspEnd { .. } => "grasp_end",
            Step::Release { .. } => "release",
            Step::Tick { .. } => "tick",
            Step::Phase { .. } => "phase",
            Step::StopPhase => "stop_phase",
            Step::Head { .. } => "head",
        }
    }
}

pub fn parse_script(text: &str) -> serde_json::Result<Vec<Step>> {
    serde_json::from_str(text)
}

/// Drives one engine through a script against a tracked head.
pub struct Replay {
    engine: RehabEngine,
    head: TrackedFrame,
}

impl Replay {
    pub fn new(
        config: RehabConfig,
        sink: Box<dyn ProgressSink>,
        progress: TherapyProgress,
    ) -> rehab_core::Result<Self> {
        let head = TrackedFrame::new(ReferenceFrame::identity());
        let engine = RehabEngine::new(config, Box::new(head.clone()), sink)?.with_progress(progress);
        Ok(Self { engine, head })
    }

    pub fn engine(&self) -> &RehabEngine {
        &self.engine
    }

    /// Apply every step. Failed steps are logged and skipped, the way a host
    /// would keep its session running.
    pub fn run(&mut self, steps: &[Step]) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        for (i, step) in steps.iter().enumerate() {
            tracing::debug!("step {}: {:?}", i, step);
            if let Err(e) = self.apply(step) {
                tracing::warn!("step {} ({}) failed: {}", i, step.name(), e);
            }
            events.extend(self.engine.drain_events());
        }
        events
    }

    pub fn apply(&mut self, step: &Step) -> rehab_core::Result<()> {
        let engine = &mut self.engine;
        match step {
            Step::SwitchStyle { style } => engine.switch_style(*style),
            Step::StartLevel { index } => {
                engine.start_level_at(*index)?;
            }
            Step::Restart => {
                engine.restart()?;
            }
            Step::Continue => {
                engine.continue_progress()?;
            }
            Step::Finish => log_record(engine.finish()),
            Step::FinishOrNext => {
                engine.finish_or_next()?;
            }
            Step::Contact { target } => {
                engine.handle(InteractionEvent::Contact { target: *target });
            }
            Step::ContactAll => {
                let live: Vec<TargetId> = engine.targets().map(|t| t.id).collect();
                for target in live {
                    engine.handle(InteractionEvent::Contact { target });
                }
            }
            Step::GraspStart { target } => {
                engine.handle(InteractionEvent::GraspStart { target: *target });
            }
            Step::GraspMove { target, at } => {
                engine.handle(InteractionEvent::GraspMove { target: *target, at: *at });
            }
            Step::GraspEnd { target, at } => {
                engine.handle(InteractionEvent::GraspEnd { target: *target, at: *at });
            }
            Step::Release { target, at, hold } => {
                engine.handle(InteractionEvent::GraspStart { target: *target });
                engine.tick(*hold);
                engine.handle(InteractionEvent::GraspEnd { target: *target, at: *at });
            }
            Step::Tick { dt } => engine.tick(*dt),
            Step::Phase { mode, cells } => {
                match mode {
                    GameMode::Measurement => engine.start_measurement()?,
                    GameMode::WrongContainerRetry => engine.start_wrong_container_retry()?,
                    GameMode::DropRetry => engine.start_drop_retry()?,
                    GameMode::UnreachableRetry => engine.start_unreachable_retry()?,
                    GameMode::Static => engine.start_static(cells)?,
                };
            }
            Step::StopPhase => {
                engine.stop_phase();
            }
            Step::Head { position, yaw_deg } => {
                self.head.set(ReferenceFrame::from_yaw(*position, *yaw_deg));
            }
        }
        Ok(())
    }
}

fn log_record(record: Option<ProgressRecord>) {
    match record {
        Some(r) => tracing::info!("{} level {} scored {}%", r.mode, r.level_index, r.percent),
        None => tracing::info!("nothing to finish"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let steps = parse_script(
            r#"[
                {"op": "switch_style", "style": "carry"},
                {"op": "start_level", "index": 2},
                {"op": "release", "target": 3, "at": [0.0, -0.4, 0.6]},
                {"op": "phase", "mode": "static", "cells": [{"x": 1, "y": 0, "z": 0}]},
                {"op": "stop_phase"}
            ]"#,
        )
        .unwrap();

        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0], Step::SwitchStyle { style: InteractionStyle::Carry });
        assert_eq!(steps[2], Step::Release { target: TargetId(3), at: Vec3::new(0.0, -0.4, 0.6), hold: 0.0 });
        assert_eq!(steps[3], Step::Phase { mode: GameMode::Static, cells: vec![GridIndex::new(1, 0, 0)] });
        assert_eq!(steps[4].name(), "stop_phase");
    }

    #[test]
    fn test_unknown_op_rejected() {
        assert!(parse_script(r#"[{"op": "teleport"}]"#).is_err());
    }

    #[test]
    fn test_reach_replay_scores() {
        let sink = MemorySink::new();
        let mut replay = Replay::new(RehabConfig::quick_drill(), Box::new(sink.clone()), TherapyProgress::new()).unwrap();
        let steps = vec![
            Step::SwitchStyle { style: InteractionStyle::Reach },
            Step::StartLevel { index: 0 },
            Step::ContactAll,
            Step::Finish,
        ];

        let events = replay.run(&steps);
        assert_eq!(sink.last().map(|r| r.percent), Some(100));
        assert!(events.iter().any(|e| matches!(e, EngineEvent::LevelFinished { .. })));
        assert_eq!(replay.engine().current_percent(ActivityMode::Reach, 0), 100);
    }

    #[test]
    fn test_failed_step_is_skipped() {
        let mut replay = Replay::new(RehabConfig::quick_drill(), Box::new(NullSink), TherapyProgress::new()).unwrap();
        let steps = vec![Step::StartLevel { index: 0 }, Step::SwitchStyle { style: InteractionStyle::Grip }];
        let events = replay.run(&steps);
        assert_eq!(events.len(), 1);
        assert_eq!(replay.engine().style(), Some(InteractionStyle::Grip));
    }

    #[test]
    fn test_head_moves_next_phase() {
        let mut replay = Replay::new(RehabConfig::quick_drill(), Box::new(NullSink), TherapyProgress::new()).unwrap();
        replay.run(&[
            Step::Head { position: Vec3::new(0.0, 1.5, 0.0), yaw_deg: 90.0 },
            Step::Phase { mode: GameMode::Measurement, cells: vec![] },
        ]);
        let frame = replay.engine().workspace().frame();
        assert!((frame.position.y - 1.5).abs() < 1e-5);
        assert!((frame.forward.x - 1.0).abs() < 1e-5);
    }
}
