//! Target creation and the outcome notice queue.
//!
//! The spawner is the only place targets come into existence. Resolved
//! targets leave the live set immediately and a [`TargetNotice`] is queued
//! for the engine to route; [`TargetSpawner::clear_all`] drops both live
//! targets and undelivered notices.

use std::collections::{BTreeMap, VecDeque};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{InteractionStyle, Target, TargetId, TargetKind, TargetState};
use crate::config::SpawnConfig;
use crate::error::{RehabError, Result};
use crate::ledger::Outcome;
use crate::space::{spawn_rotation, Cell, GridIndex, ReferenceFrame, Vec3};

/// A resolution waiting to be routed to the ledger and lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetNotice {
    pub target: TargetId,
    pub style: InteractionStyle,
    pub cell: GridIndex,
    pub outcome: Outcome,
    /// Where the target was when it resolved.
    pub position: Vec3,
}

impl TargetNotice {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }
}

#[derive(Debug)]
pub struct TargetSpawner {
    config: SpawnConfig,
    rng: ChaCha8Rng,
    targets: BTreeMap<TargetId, Target>,
    next_id: u64,
    outbox: VecDeque<TargetNotice>,
}

impl TargetSpawner {
    pub fn new(config: SpawnConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            targets: BTreeMap::new(),
            next_id: 1,
            outbox: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Restart the kind sequence, e.g. for a new patient session.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Create one target per cell at `frame.position + world_offset`.
    ///
    /// Sort targets take their kind from `kinds[i]` when present and draw
    /// one otherwise; every other style is healthy. Nothing is spawned when a
    /// required asset is unset.
    pub fn spawn_at(
        &mut self,
        cells: &[Cell],
        frame: &ReferenceFrame,
        style: InteractionStyle,
        kinds: &[TargetKind],
    ) -> Result<Vec<TargetId>> {
        self.check_assets(style)?;

        let mut spawned = Vec::with_capacity(cells.len());
        for (i, cell) in cells.iter().enumerate() {
            let kind = match style {
                InteractionStyle::Sort => match kinds.get(i) {
                    Some(kind) => *kind,
                    None => self.draw_kind(),
                },
                _ => TargetKind::Healthy,
            };
            let position = frame.position + cell.world_offset;
            let id = TargetId(self.next_id);
            self.next_id += 1;
            self.targets.insert(
                id,
                Target {
                    id,
                    style,
                    kind,
                    cell: cell.grid_index,
                    position,
                    rotation: spawn_rotation(self.config.rotation, frame, &position),
                    state: TargetState::Spawned,
                    processed: false,
                    grasp_started_at: None,
                },
            );
            spawned.push(id);
        }
        log::debug!("Spawned {} {} targets", spawned.len(), style);
        Ok(spawned)
    }

    /// Fails with the first required asset that is unset for `style`.
    pub fn check_assets(&self, style: InteractionStyle) -> Result<()> {
        let assets = &self.config.assets;
        let missing = if assets.target_asset.is_none() {
            Some("target asset")
        } else if assets.healthy_material.is_none() {
            Some("healthy material")
        } else if style == InteractionStyle::Sort && assets.rotten_material.is_none() {
            Some("rotten material")
        } else {
            None
        };
        match missing {
            Some(what) => {
                log::error!("Cannot spawn {} targets: {} is not configured", style, what);
                Err(RehabError::MissingConfig(what.to_string()))
            }
            None => Ok(()),
        }
    }

    fn draw_kind(&mut self) -> TargetKind {
        let p = self.config.rotten_probability.clamp(0.0, 1.0) as f64;
        if self.rng.gen_bool(p) {
            TargetKind::Rotten
        } else {
            TargetKind::Healthy
        }
    }

    /// Material name a renderer should apply to a target of `kind`.
    pub fn material_for(&self, kind: TargetKind) -> Option<&str> {
        match kind {
            TargetKind::Healthy => self.config.assets.healthy_material.as_deref(),
            TargetKind::Rotten => self.config.assets.rotten_material.as_deref(),
        }
    }

    pub fn get(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(&id)
    }

    pub fn get_mut(&mut self, id: TargetId) -> Option<&mut Target> {
        self.targets.get_mut(&id)
    }

    /// Live targets in spawn order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    pub fn live_count(&self) -> usize {
        self.targets.len()
    }

    /// Remove a target and queue its notice. Returns `None` for unknown ids,
    /// so a target can only resolve once.
    pub fn resolve(&mut self, id: TargetId, outcome: Outcome) -> Option<TargetNotice> {
        let mut target = self.targets.remove(&id)?;
        target.processed = true;
        target.state = TargetState::Resolved;
        let notice =
            TargetNotice { target: id, style: target.style, cell: target.cell, outcome, position: target.position };
        log::debug!("Target {} at {} resolved {}", id, target.cell, outcome);
        self.outbox.push_back(notice);
        Some(notice)
    }

    pub fn drain_notices(&mut self) -> Vec<TargetNotice> {
        self.outbox.drain(..).collect()
    }

    pub fn pending_notices(&self) -> usize {
        self.outbox.len()
    }

    /// Destroy every live target and drop undelivered notices.
    pub fn clear_all(&mut self) {
        if !self.targets.is_empty() {
            log::debug!("Clearing {} live targets", self.targets.len());
        }
        self.targets.clear();
        self.outbox.clear();
    }
}
