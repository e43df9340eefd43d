//! End-to-end sessions through the public engine API.

use crate::config::RehabConfig;
use crate::engine::{EngineEvent, RehabEngine};
use crate::error::RehabError;
use crate::exercise::{ExerciseState, FinishOrNext, LevelStart};
use crate::ledger::Outcome;
use crate::phase::{GameMode, PhaseStart};
use crate::progress::{ActivityMode, FileSink, MemorySink, ProgressStore, TherapyProgress};
use crate::space::{FixedFrame, GridIndex, HandSide, LineLayout, ReferenceFrame, TrackedFrame, Vec3};
use crate::target::{InteractionStyle, TargetId, TargetKind};
use crate::InteractionEvent;

const EPS: f32 = 1e-4;

fn build(config: RehabConfig) -> (RehabEngine, MemorySink) {
    let sink = MemorySink::new();
    let engine = RehabEngine::new(config, Box::new(FixedFrame::default()), Box::new(sink.clone())).unwrap();
    (engine, sink)
}

/// Single row of `cells` targets, sorted by the given kinds.
fn row_config(cells: usize, phase_style: InteractionStyle, kinds: Vec<TargetKind>) -> RehabConfig {
    let mut config = RehabConfig::quick_drill();
    config.grid.layout = LineLayout::row(-0.4, 0.4, cells, 0.0, 0.6).into();
    config.phase_style = phase_style;
    config.spawn.sort_kinds = kinds;
    config
}

fn ids(engine: &RehabEngine) -> Vec<TargetId> {
    engine.targets().map(|t| t.id).collect()
}

fn healthy_zone() -> Vec3 {
    Vec3::new(-0.25, -0.4, 0.7)
}

fn rotten_zone() -> Vec3 {
    Vec3::new(0.25, -0.4, 0.7)
}

fn release(engine: &mut RehabEngine, target: TargetId, at: Vec3) -> Option<Outcome> {
    engine.handle(InteractionEvent::GraspStart { target });
    engine.tick(0.5);
    engine.handle(InteractionEvent::GraspEnd { target, at })
}

#[test]
fn reach_level_scores_full_marks() {
    let (mut engine, sink) = build(RehabConfig::quick_drill());
    engine.switch_style(InteractionStyle::Reach);
    assert_eq!(engine.start_level_at(0).unwrap(), LevelStart::Active { spawned: 5 });

    for target in ids(&engine) {
        assert_eq!(engine.handle(InteractionEvent::Contact { target }), Some(Outcome::Success));
    }
    let session = engine.lifecycle(InteractionStyle::Reach).unwrap().session().clone();
    assert_eq!((session.success, session.processed), (5, 5));
    assert!(session.active);

    let record = engine.finish().unwrap();
    assert_eq!(record.percent, 100);
    assert_eq!(sink.last().map(|r| r.percent), Some(100));
    assert_eq!(engine.current_percent(ActivityMode::Reach, 0), 100);
    assert_eq!(engine.last_fully_completed_index(ActivityMode::Reach), Some(0));
    assert_eq!(engine.targets().count(), 0);
}

#[test]
fn measurement_partitions_every_cell() {
    let mut config = RehabConfig::quick_drill();
    config.phase_style = InteractionStyle::Reach;
    let (mut engine, _) = build(config);

    let start = engine.start_measurement().unwrap();
    let n = engine.workspace().len();
    assert!(matches!(start, PhaseStart::Running { ref cells, .. } if cells.len() == n));
    assert_eq!(engine.targets().count(), n);

    let touched: Vec<TargetId> = ids(&engine).into_iter().step_by(12).collect();
    for target in &touched {
        engine.handle(InteractionEvent::Contact { target: *target });
    }

    // measurement runs 10s in the quick drill
    engine.tick(10.0);
    assert_eq!(engine.current_phase(), None);

    let ledger = engine.ledger();
    let total: usize = Outcome::ALL.iter().map(|o| ledger.filter(*o).len()).sum();
    assert_eq!(total, n);
    assert_eq!(ledger.filter(Outcome::Success).len(), touched.len());
    assert_eq!(ledger.filter(Outcome::Unreachable).len(), n - touched.len());
}

#[test]
fn sort_measurement_mixed_results() {
    let kinds = vec![TargetKind::Healthy, TargetKind::Healthy, TargetKind::Rotten, TargetKind::Healthy];
    let (mut engine, sink) = build(row_config(4, InteractionStyle::Sort, kinds));
    engine.start_measurement().unwrap();

    let targets = ids(&engine);
    assert_eq!(release(&mut engine, targets[0], healthy_zone()), Some(Outcome::Success));
    assert_eq!(release(&mut engine, targets[1], healthy_zone()), Some(Outcome::Success));
    assert_eq!(release(&mut engine, targets[2], healthy_zone()), Some(Outcome::WrongContainer));
    assert_eq!(release(&mut engine, targets[3], Vec3::new(0.0, 0.8, 0.4)), Some(Outcome::Dropped));

    let end = engine.stop_phase().unwrap();
    assert_eq!(end.backfilled, 0);
    assert_eq!(engine.ledger().filter(Outcome::WrongContainer).len(), 1);

    let record = sink.last().unwrap();
    assert_eq!(record.mode, ActivityMode::Measurement);
    assert_eq!(record.percent, 50);
    assert_eq!(engine.current_percent(ActivityMode::Measurement, 0), 50);
}

#[test]
fn retry_phases_present_filtered_cells() {
    let (mut engine, _) = build(row_config(5, InteractionStyle::Sort, vec![TargetKind::Healthy; 5]));
    engine.start_measurement().unwrap();

    let targets = ids(&engine);
    for target in &targets[..3] {
        assert_eq!(release(&mut engine, *target, rotten_zone()), Some(Outcome::WrongContainer));
    }
    engine.stop_phase();
    assert_eq!(engine.ledger().filter(Outcome::Unreachable).len(), 2);

    let wrong = engine.start_wrong_container_retry().unwrap();
    assert!(matches!(wrong, PhaseStart::Running { ref cells, .. } if cells.len() == 3));
    assert_eq!(engine.targets().count(), 3);
    let expected: Vec<GridIndex> = (0..3).map(|x| GridIndex::new(x, 0, 0)).collect();
    let mut presented: Vec<GridIndex> = engine.targets().map(|t| t.cell).collect();
    presented.sort();
    assert_eq!(presented, expected);

    let unreachable = engine.start_unreachable_retry().unwrap();
    assert!(matches!(unreachable, PhaseStart::Running { ref cells, .. } if cells.len() == 2));
    assert_eq!(engine.targets().count(), 2);

    // retries never touch the ledger
    let target = ids(&engine)[0];
    release(&mut engine, target, healthy_zone());
    assert_eq!(engine.ledger().filter(Outcome::Unreachable).len(), 2);
    assert_eq!(engine.ledger().filter(Outcome::Success).len(), 0);
}

#[test]
fn empty_retry_finishes_immediately() {
    let (mut engine, sink) = build(row_config(3, InteractionStyle::Sort, vec![]));
    let start = engine.start_drop_retry().unwrap();
    assert_eq!(start, PhaseStart::Finished { mode: GameMode::DropRetry });
    assert_eq!(engine.current_phase(), None);
    assert_eq!(engine.targets().count(), 0);
    assert!(sink.is_empty());

    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::PhaseFinished { mode: GameMode::DropRetry, percent: None, .. }
    )));
}

#[test]
fn drop_retry_merges_drops_and_misses() {
    let (mut engine, _) = build(row_config(4, InteractionStyle::Carry, vec![]));
    engine.start_measurement().unwrap();
    let targets = ids(&engine);
    let away = Vec3::new(0.0, 0.8, 0.4);

    assert_eq!(release(&mut engine, targets[0], away), Some(Outcome::Dropped));
    engine.handle(InteractionEvent::GraspStart { target: targets[1] });
    assert_eq!(engine.handle(InteractionEvent::GraspEnd { target: targets[1], at: away }), Some(Outcome::GrabMiss));
    engine.stop_phase();

    let start = engine.start_drop_retry().unwrap();
    assert!(matches!(start, PhaseStart::Running { ref cells, .. } if cells.len() == 2));
}

#[test]
fn static_phase_clamps_indices() {
    let (mut engine, _) = build(RehabConfig::quick_drill());
    let start = engine.start_static(&[GridIndex::new(0, 0, 0), GridIndex::new(42, 0, 0), GridIndex::new(7, 0, 0)]);
    match start.unwrap() {
        PhaseStart::Running { cells, mode, .. } => {
            assert_eq!(mode, GameMode::Static);
            assert_eq!(cells, vec![GridIndex::new(0, 0, 0), GridIndex::new(7, 0, 0)]);
        }
        other => panic!("expected a running phase, got {:?}", other),
    }
}

#[test]
fn switching_style_cancels_phase_without_scoring() {
    let (mut engine, sink) = build(RehabConfig::quick_drill());
    engine.start_measurement().unwrap();
    assert!(engine.targets().count() > 0);

    engine.switch_style(InteractionStyle::Grip);
    assert_eq!(engine.current_phase(), None);
    assert_eq!(engine.targets().count(), 0);
    assert!(engine.ledger().is_empty());
    assert!(sink.is_empty());

    // the cancelled timer never fires
    engine.tick(60.0);
    assert!(engine.ledger().is_empty());
}

#[test]
fn countdown_then_spawn_events() {
    let (mut engine, _) = build(RehabConfig::default());
    engine.switch_style(InteractionStyle::Carry);
    assert_eq!(engine.start_level_at(1).unwrap(), LevelStart::Countdown { secs: 3.0 });
    assert_eq!(engine.targets().count(), 0);
    assert!(engine.containers().is_empty());

    engine.tick(2.0);
    assert_eq!(engine.targets().count(), 0);
    engine.tick(1.0);
    assert_eq!(engine.targets().count(), 6);
    assert_eq!(engine.containers().len(), 1);

    let events = engine.drain_events();
    assert!(matches!(events[0], EngineEvent::StyleSwitched { style: InteractionStyle::Carry }));
    assert!(matches!(events[1], EngineEvent::CountdownStarted { level_index: 1, .. }));
    assert!(matches!(events[2], EngineEvent::LevelStarted { level_index: 1, targets: 6, .. }));
    let spawned = events.iter().filter(|e| matches!(e, EngineEvent::TargetSpawned { .. })).count();
    assert_eq!(spawned, 6);
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::TargetSpawned { material: Some(m), .. } if m == "apple_healthy"
    )));
}

#[test]
fn level_requests_need_a_style() {
    let (mut engine, _) = build(RehabConfig::quick_drill());
    assert_eq!(engine.start_level_at(0).unwrap_err(), RehabError::NoActiveStyle);

    engine.switch_style(InteractionStyle::Sort);
    assert_eq!(engine.start_level_at(99).unwrap_err(), RehabError::InvalidLevel { index: 99, len: 5 });
    assert_eq!(engine.lifecycle(InteractionStyle::Sort).unwrap().state(), ExerciseState::Idle);
}

#[test]
fn missing_asset_blocks_phase() {
    let mut config = RehabConfig::quick_drill();
    config.spawn.assets.target_asset = None;
    let (mut engine, _) = build(config);
    assert!(matches!(engine.start_measurement(), Err(RehabError::MissingConfig(_))));
    assert_eq!(engine.current_phase(), None);
    assert_eq!(engine.targets().count(), 0);
}

#[test]
fn workspace_follows_tracked_head() {
    let head = TrackedFrame::new(ReferenceFrame::identity());
    let mut engine =
        RehabEngine::new(RehabConfig::quick_drill(), Box::new(head.clone()), Box::new(MemorySink::new())).unwrap();

    head.set(ReferenceFrame::from_yaw(Vec3::new(1.0, 1.6, -2.0), 0.0));
    engine.start_measurement().unwrap();

    assert!((engine.workspace().frame().position - Vec3::new(1.0, 1.6, -2.0)).norm() < EPS);
    let workspace = engine.workspace().clone();
    for target in engine.targets() {
        let cell = workspace.get(target.cell).unwrap();
        assert!((target.position - workspace.world_position(cell)).norm() < EPS);
    }
    let basket = engine.containers()[0].position;
    assert!((basket - Vec3::new(0.75, 1.2, -1.3)).norm() < EPS);
}

#[test]
fn continue_and_finish_or_next() {
    let mut progress = TherapyProgress::new();
    progress.set_percent(ActivityMode::Reach, 2, 100);
    let (engine, _) = build(RehabConfig::quick_drill());
    let mut engine = engine.with_progress(progress);

    engine.switch_style(InteractionStyle::Reach);
    engine.continue_progress().unwrap();
    assert_eq!(engine.lifecycle(InteractionStyle::Reach).unwrap().session().level_index, 2);

    for target in ids(&engine) {
        engine.handle(InteractionEvent::Contact { target });
    }
    assert!(matches!(engine.finish_or_next().unwrap(), FinishOrNext::Finished(ref r) if r.percent == 100));
    let next = engine.finish_or_next().unwrap();
    assert_eq!(next, FinishOrNext::Advanced { level_index: 3, start: LevelStart::Active { spawned: 8 } });
    assert_eq!(engine.targets().count(), 8);

    engine.restart().unwrap();
    assert_eq!(engine.lifecycle(InteractionStyle::Reach).unwrap().session().level_index, 0);
}

#[test]
fn file_sink_keeps_history() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("patient.dat");
    let sink = FileSink::open(&path).unwrap();
    let mut engine = RehabEngine::new(RehabConfig::quick_drill(), Box::new(FixedFrame::default()), Box::new(sink))
        .unwrap();

    engine.switch_style(InteractionStyle::Grip);
    engine.start_level_at(0).unwrap();
    let basket = engine.containers()[0].position;
    let targets = ids(&engine);
    for target in &targets[..4] {
        engine.handle(InteractionEvent::GraspStart { target: *target });
        engine.handle(InteractionEvent::GraspMove { target: *target, at: basket });
    }
    engine.finish().unwrap();

    let archive = ProgressStore::load_from_path(&path).unwrap();
    assert_eq!(archive.progress.get_percent(ActivityMode::Grip, 0), 80);
    assert_eq!(archive.history.len(), 1);
}

#[test]
fn bad_level_index_leaves_phase_running() {
    let mut config = RehabConfig::quick_drill();
    config.phase_style = InteractionStyle::Reach;
    let (mut engine, sink) = build(config);
    engine.switch_style(InteractionStyle::Reach);
    engine.start_measurement().unwrap();
    let before = ids(&engine);

    assert!(matches!(engine.start_level_at(99), Err(RehabError::InvalidLevel { index: 99, .. })));
    assert_eq!(engine.current_phase(), Some(GameMode::Measurement));
    assert_eq!(ids(&engine), before);
    assert!(engine.phase_lifecycle().is_active());

    // the untouched phase still scores when its timer runs out
    engine.handle(InteractionEvent::Contact { target: before[0] });
    engine.tick(10.0);
    assert_eq!(engine.ledger().filter(Outcome::Success).len(), 1);
    assert_eq!(sink.last().map(|r| r.mode), Some(ActivityMode::Measurement));
}

#[test]
fn missing_style_asset_leaves_phase_running() {
    let mut config = RehabConfig::quick_drill();
    config.phase_style = InteractionStyle::Reach;
    config.spawn.assets.rotten_material = None;
    let (mut engine, sink) = build(config);
    engine.switch_style(InteractionStyle::Sort);
    engine.start_measurement().unwrap();
    let before = ids(&engine);

    assert!(matches!(engine.start_level_at(0), Err(RehabError::MissingConfig(_))));
    assert!(matches!(engine.restart(), Err(RehabError::MissingConfig(_))));
    assert_eq!(engine.current_phase(), Some(GameMode::Measurement));
    assert_eq!(ids(&engine), before);
    assert_eq!(engine.lifecycle(InteractionStyle::Sort).unwrap().state(), ExerciseState::Idle);
    assert!(sink.is_empty());
}

#[test]
fn valid_level_start_cancels_phase_without_scoring() {
    let mut config = RehabConfig::quick_drill();
    config.phase_style = InteractionStyle::Reach;
    let (mut engine, sink) = build(config);
    engine.switch_style(InteractionStyle::Reach);
    engine.start_measurement().unwrap();
    let first = ids(&engine)[0];
    engine.handle(InteractionEvent::Contact { target: first });

    assert_eq!(engine.start_level_at(0).unwrap(), LevelStart::Active { spawned: 5 });
    assert_eq!(engine.current_phase(), None);
    assert!(!engine.phase_lifecycle().is_active());
    assert_eq!(engine.targets().count(), 5);
    assert!(sink.is_empty());

    // no back-fill: only the contact made before the cancel is recorded
    engine.tick(30.0);
    assert_eq!(engine.ledger().len(), 1);
    assert_eq!(engine.ledger().filter(Outcome::Unreachable).len(), 0);
    assert!(sink.is_empty());
}

#[test]
fn finish_or_next_ends_phase_in_place() {
    let head = TrackedFrame::new(ReferenceFrame::identity());
    let sink = MemorySink::new();
    let mut config = RehabConfig::quick_drill();
    config.phase_style = InteractionStyle::Reach;
    let mut engine = RehabEngine::new(config, Box::new(head.clone()), Box::new(sink.clone())).unwrap();
    engine.switch_style(InteractionStyle::Reach);
    engine.start_measurement().unwrap();
    let measured = engine.workspace().clone();
    for target in ids(&engine).into_iter().take(3) {
        engine.handle(InteractionEvent::Contact { target });
    }

    head.set(ReferenceFrame::from_yaw(Vec3::new(2.0, 1.6, 0.0), 45.0));
    match engine.finish_or_next().unwrap() {
        FinishOrNext::Finished(record) => assert_eq!(record.mode, ActivityMode::Measurement),
        other => panic!("expected the phase to finish, got {:?}", other),
    }

    assert_eq!(engine.current_phase(), None);
    assert_eq!(engine.targets().count(), 0);
    assert_eq!(engine.workspace(), &measured);
    assert_eq!(engine.ledger().filter(Outcome::Success).len(), 3);
    assert_eq!(sink.len(), 1);
    assert!(!engine.lifecycle(InteractionStyle::Reach).unwrap().is_active());

    // the next level picks up the new head pose
    engine.finish_or_next().unwrap();
    assert!((engine.workspace().frame().position - Vec3::new(2.0, 1.6, 0.0)).norm() < EPS);
}

#[test]
fn hand_switch_waits_for_next_phase() {
    let (mut engine, _) = build(RehabConfig::quick_drill());
    engine.start_measurement().unwrap();
    let right = engine.workspace().clone();
    let positions: Vec<Vec3> = engine.targets().map(|t| t.position).collect();

    engine.set_hand(HandSide::Left);
    assert_eq!(engine.config().grid.hand, HandSide::Left);
    assert_eq!(engine.workspace(), &right);
    assert_eq!(engine.targets().map(|t| t.position).collect::<Vec<_>>(), positions);

    engine.stop_phase();
    engine.start_measurement().unwrap();
    let cell = right.cells()[0].grid_index;
    let before = right.world_position(&right.cells()[0]);
    let after = engine.workspace().get(cell).map(|c| engine.workspace().world_position(c)).unwrap();
    // default offset is 0.15 m toward the trained hand
    assert!((before.x - after.x - 0.3).abs() < EPS);
}

#[test]
fn wrong_container_retry_keeps_measured_kinds() {
    let kinds = vec![TargetKind::Rotten, TargetKind::Healthy, TargetKind::Rotten];
    let (mut engine, _) = build(row_config(3, InteractionStyle::Sort, kinds));
    engine.start_measurement().unwrap();

    let by_cell = |engine: &RehabEngine, x: i32| {
        engine.targets().find(|t| t.cell == GridIndex::new(x, 0, 0)).map(|t| (t.id, t.kind)).unwrap()
    };
    let (first, _) = by_cell(&engine, 0);
    let (second, second_kind) = by_cell(&engine, 1);
    let (third, third_kind) = by_cell(&engine, 2);
    assert_eq!((second_kind, third_kind), (TargetKind::Healthy, TargetKind::Rotten));

    assert_eq!(release(&mut engine, first, rotten_zone()), Some(Outcome::Success));
    assert_eq!(release(&mut engine, second, rotten_zone()), Some(Outcome::WrongContainer));
    assert_eq!(release(&mut engine, third, healthy_zone()), Some(Outcome::WrongContainer));
    engine.stop_phase();
    assert_eq!(engine.ledger().kind_of(GridIndex::new(1, 0, 0)), Some(TargetKind::Healthy));

    engine.start_wrong_container_retry().unwrap();
    assert_eq!(engine.targets().count(), 2);
    assert_eq!(by_cell(&engine, 1).1, TargetKind::Healthy);
    assert_eq!(by_cell(&engine, 2).1, TargetKind::Rotten);
}
