//! Per-target outcome resolution from host interaction events.
//!
//! | Style | Resolves on | Outcome |
//! |-------|-------------|---------|
//! | Reach | contact or grasp | success |
//! | Grip  | held position inside any zone | success, else dropped on release |
//! | Carry | release | success inside the basket, else dropped |
//! | Sort  | release | success in the matching basket, wrong container in the other, else dropped |
//!
//! A release outside every zone after a hold shorter than `min_hold_secs`
//! is a grab miss instead of a drop.

use serde::{Deserialize, Serialize};

use crate::config::GraspConfig;
use crate::ledger::Outcome;
use crate::space::Vec3;
use crate::target::{
    ContainerRig, ContainerRole, InteractionStyle, Target, TargetId, TargetNotice, TargetSpawner, TargetState,
};

/// Contact and grasp signals supplied by the host's hand tracking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InteractionEvent {
    Contact { target: TargetId },
    GraspStart { target: TargetId },
    GraspMove { target: TargetId, at: Vec3 },
    GraspEnd { target: TargetId, at: Vec3 },
}

impl InteractionEvent {
    pub fn target(&self) -> TargetId {
        match self {
            InteractionEvent::Contact { target }
            | InteractionEvent::GraspStart { target }
            | InteractionEvent::GraspMove { target, .. }
            | InteractionEvent::GraspEnd { target, .. } => *target,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    min_hold_secs: f32,
}

impl Default for OutcomeClassifier {
    fn default() -> Self {
        Self::new(&GraspConfig::default())
    }
}

impl OutcomeClassifier {
    pub fn new(config: &GraspConfig) -> Self {
        Self { min_hold_secs: config.min_hold_secs.max(0.0) }
    }

    pub fn min_hold_secs(&self) -> f32 {
        self.min_hold_secs
    }

    /// Apply one event at session time `now`. Resolutions are removed from
    /// the spawner and queued there; the notice is also returned. Events for
    /// unknown or already resolved targets are ignored.
    pub fn handle(
        &self,
        event: InteractionEvent,
        now: f32,
        spawner: &mut TargetSpawner,
        rig: &ContainerRig,
    ) -> Option<TargetNotice> {
        let id = event.target();
        let target = spawner.get_mut(id)?;
        if target.processed {
            return None;
        }

        let outcome = match event {
            // contact alone never resolves a grasp style
            InteractionEvent::Contact { .. } => match target.style {
                InteractionStyle::Reach => Some(Outcome::Success),
                _ => None,
            },
            InteractionEvent::GraspStart { .. } => match target.style {
                InteractionStyle::Reach => Some(Outcome::Success),
                _ => {
                    target.state = TargetState::Held;
                    target.grasp_started_at = Some(now);
                    None
                }
            },
            InteractionEvent::GraspMove { at, .. } => {
                if !target.is_held() {
                    return None;
                }
                target.position = at;
                if target.style == InteractionStyle::Grip && rig.zone_at(&at).is_some() {
                    Some(Outcome::Success)
                } else {
                    None
                }
            }
            InteractionEvent::GraspEnd { at, .. } => {
                if !target.is_held() {
                    return None;
                }
                target.position = at;
                target.state = TargetState::Released;
                Some(self.release_outcome(target, rig.zone_at(&at), now))
            }
        };

        let outcome = outcome?;
        spawner.resolve(id, outcome)
    }

    fn release_outcome(&self, target: &Target, zone: Option<ContainerRole>, now: f32) -> Outcome {
        match (target.style, zone) {
            (InteractionStyle::Reach, _) => Outcome::Success,
            (InteractionStyle::Grip, Some(_)) => Outcome::Success,
            (InteractionStyle::Carry, Some(ContainerRole::Basket)) => Outcome::Success,
            (InteractionStyle::Sort, Some(role @ (ContainerRole::Healthy | ContainerRole::Rotten))) => {
                if role == ContainerRole::for_kind(target.kind) {
                    Outcome::Success
                } else {
                    Outcome::WrongContainer
                }
            }
            _ => self.miss_or_drop(target, now),
        }
    }

    fn miss_or_drop(&self, target: &Target, now: f32) -> Outcome {
        let held = target.grasp_started_at.map(|t| now - t).unwrap_or(0.0);
        if held < self.min_hold_secs {
            log::debug!("Target {} released after {:.2}s, counted as grab miss", target.id, held);
            Outcome::GrabMiss
        } else {
            Outcome::Dropped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContainerConfig, SpawnConfig};
    use crate::space::{Cell, GridIndex, ReferenceFrame};
    use crate::target::TargetKind;

    fn healthy_zone() -> Vec3 {
        Vec3::new(-0.25, -0.4, 0.7)
    }

    fn rotten_zone() -> Vec3 {
        Vec3::new(0.25, -0.4, 0.7)
    }

    fn nowhere() -> Vec3 {
        Vec3::new(0.0, 0.5, 0.3)
    }

    fn setup(style: InteractionStyle, kinds: &[TargetKind]) -> (TargetSpawner, ContainerRig) {
        let frame = ReferenceFrame::identity();
        let mut spawner = TargetSpawner::new(SpawnConfig::default(), 5);
        let cells: Vec<Cell> = (0..kinds.len().max(1))
            .map(|i| Cell { grid_index: GridIndex::new(i as i32, 0, 0), world_offset: Vec3::new(0.0, 0.0, 0.5) })
            .collect();
        spawner.spawn_at(&cells, &frame, style, kinds).unwrap();
        let mut rig = ContainerRig::new();
        match style {
            InteractionStyle::Sort => rig.place_dual(&frame, &ContainerConfig::default()),
            InteractionStyle::Grip | InteractionStyle::Carry => {
                rig.place_single(&frame, &ContainerConfig::default())
            }
            InteractionStyle::Reach => {}
        }
        (spawner, rig)
    }

    fn carry_to(
        classifier: &OutcomeClassifier,
        spawner: &mut TargetSpawner,
        rig: &ContainerRig,
        id: u64,
        at: Vec3,
        hold: f32,
    ) -> Option<Outcome> {
        let target = TargetId(id);
        classifier.handle(InteractionEvent::GraspStart { target }, 1.0, spawner, rig);
        classifier.handle(InteractionEvent::GraspEnd { target, at }, 1.0 + hold, spawner, rig).map(|n| n.outcome)
    }

    #[test]
    fn test_reach_contact_succeeds_once() {
        let classifier = OutcomeClassifier::default();
        let (mut spawner, rig) = setup(InteractionStyle::Reach, &[]);
        let target = TargetId(1);

        let notice = classifier.handle(InteractionEvent::Contact { target }, 0.0, &mut spawner, &rig).unwrap();
        assert_eq!(notice.outcome, Outcome::Success);
        assert!(classifier.handle(InteractionEvent::Contact { target }, 0.1, &mut spawner, &rig).is_none());
        assert_eq!(spawner.drain_notices().len(), 1);
    }

    #[test]
    fn test_grip_succeeds_on_entering_zone() {
        let classifier = OutcomeClassifier::default();
        let (mut spawner, rig) = setup(InteractionStyle::Grip, &[]);
        let target = TargetId(1);
        let basket = Vec3::new(0.0, -0.4, 0.6);

        // contact alone does nothing for grasp styles
        assert!(classifier.handle(InteractionEvent::Contact { target }, 0.0, &mut spawner, &rig).is_none());
        classifier.handle(InteractionEvent::GraspStart { target }, 0.0, &mut spawner, &rig);
        assert!(classifier.handle(InteractionEvent::GraspMove { target, at: nowhere() }, 0.5, &mut spawner, &rig).is_none());
        let notice = classifier.handle(InteractionEvent::GraspMove { target, at: basket }, 0.8, &mut spawner, &rig);
        assert_eq!(notice.map(|n| n.outcome), Some(Outcome::Success));
    }

    #[test]
    fn test_grip_release_outside_drops() {
        let classifier = OutcomeClassifier::default();
        let (mut spawner, rig) = setup(InteractionStyle::Grip, &[]);
        assert_eq!(carry_to(&classifier, &mut spawner, &rig, 1, nowhere(), 1.0), Some(Outcome::Dropped));
    }

    #[test]
    fn test_carry_basket_and_drop() {
        let classifier = OutcomeClassifier::default();
        let (mut spawner, rig) = setup(InteractionStyle::Carry, &[TargetKind::Healthy, TargetKind::Healthy]);
        let basket = Vec3::new(0.05, -0.35, 0.6);
        assert_eq!(carry_to(&classifier, &mut spawner, &rig, 1, basket, 1.0), Some(Outcome::Success));
        assert_eq!(carry_to(&classifier, &mut spawner, &rig, 2, nowhere(), 1.0), Some(Outcome::Dropped));
    }

    #[test]
    fn test_sort_outcomes() {
        let classifier = OutcomeClassifier::default();
        let kinds = [TargetKind::Healthy, TargetKind::Rotten, TargetKind::Rotten, TargetKind::Healthy];
        let (mut spawner, rig) = setup(InteractionStyle::Sort, &kinds);

        assert_eq!(carry_to(&classifier, &mut spawner, &rig, 1, healthy_zone(), 1.0), Some(Outcome::Success));
        assert_eq!(carry_to(&classifier, &mut spawner, &rig, 2, rotten_zone(), 1.0), Some(Outcome::Success));
        assert_eq!(carry_to(&classifier, &mut spawner, &rig, 3, healthy_zone(), 1.0), Some(Outcome::WrongContainer));
        assert_eq!(carry_to(&classifier, &mut spawner, &rig, 4, nowhere(), 1.0), Some(Outcome::Dropped));
    }

    #[test]
    fn test_short_hold_is_grab_miss() {
        let classifier = OutcomeClassifier::new(&GraspConfig { min_hold_secs: 0.3 });
        let (mut spawner, rig) = setup(InteractionStyle::Carry, &[TargetKind::Healthy, TargetKind::Healthy]);
        assert_eq!(carry_to(&classifier, &mut spawner, &rig, 1, nowhere(), 0.1), Some(Outcome::GrabMiss));
        // a quick but accurate release still counts
        let basket = Vec3::new(0.0, -0.4, 0.6);
        assert_eq!(carry_to(&classifier, &mut spawner, &rig, 2, basket, 0.1), Some(Outcome::Success));
    }

    #[test]
    fn test_release_without_grasp_is_ignored() {
        let classifier = OutcomeClassifier::default();
        let (mut spawner, rig) = setup(InteractionStyle::Carry, &[]);
        let target = TargetId(1);
        assert!(classifier.handle(InteractionEvent::GraspEnd { target, at: nowhere() }, 1.0, &mut spawner, &rig).is_none());
        assert!(classifier.handle(InteractionEvent::Contact { target: TargetId(99) }, 1.0, &mut spawner, &rig).is_none());
        assert_eq!(spawner.live_count(), 1);
    }
}
