//! Basket placement relative to the head frame.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::TargetKind;
use crate::config::ContainerConfig;
use crate::space::{world_up, ReferenceFrame, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRole {
    /// The single basket used by Grip and Carry.
    Basket,
    Healthy,
    Rotten,
}

impl ContainerRole {
    /// The Sort container matching a target kind.
    pub fn for_kind(kind: TargetKind) -> Self {
        match kind {
            TargetKind::Healthy => ContainerRole::Healthy,
            TargetKind::Rotten => ContainerRole::Rotten,
        }
    }
}

impl fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContainerRole::Basket => write!(f, "basket"),
            ContainerRole::Healthy => write!(f, "healthy"),
            ContainerRole::Rotten => write!(f, "rotten"),
        }
    }
}

/// Axis-aligned drop zone, kept upright in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub role: ContainerRole,
    pub position: Vec3,
    pub half_extent: f32,
}

impl Container {
    pub fn contains(&self, point: &Vec3) -> bool {
        let d = point - self.position;
        d.x.abs() <= self.half_extent && d.y.abs() <= self.half_extent && d.z.abs() <= self.half_extent
    }
}

/// The containers currently placed for the running style.
#[derive(Debug, Clone, Default)]
pub struct ContainerRig {
    containers: Vec<Container>,
}

impl ContainerRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn get(&self, role: ContainerRole) -> Option<&Container> {
        self.containers.iter().find(|c| c.role == role)
    }

    /// First container whose zone holds `point`.
    pub fn zone_at(&self, point: &Vec3) -> Option<ContainerRole> {
        self.containers.iter().find(|c| c.contains(point)).map(|c| c.role)
    }

    /// One basket in front of and below the head.
    pub fn place_single(&mut self, frame: &ReferenceFrame, config: &ContainerConfig) {
        let position = level_offset(frame, &config.single_offset);
        self.containers = vec![Container { role: ContainerRole::Basket, position, half_extent: config.half_extent }];
        log::debug!("Basket placed at {:?}", position);
    }

    /// Healthy basket to the left of centre, rotten to the right.
    pub fn place_dual(&mut self, frame: &ReferenceFrame, config: &ContainerConfig) {
        let (_, right) = frame.horizontal_basis();
        let center = level_offset(frame, &config.dual_center);
        let gap = right * config.dual_half_gap;
        self.containers = vec![
            Container { role: ContainerRole::Healthy, position: center - gap, half_extent: config.half_extent },
            Container { role: ContainerRole::Rotten, position: center + gap, half_extent: config.half_extent },
        ];
        log::debug!("Sort baskets placed around {:?}", center);
    }

    pub fn clear(&mut self) {
        self.containers.clear();
    }
}

/// Frame-relative `(right, up, forward)` offset using the horizontal basis
/// and world up, so head pitch never tilts the baskets.
fn level_offset(frame: &ReferenceFrame, local: &Vec3) -> Vec3 {
    let (forward, right) = frame.horizontal_basis();
    frame.position + right * local.x + world_up() * local.y + forward * local.z
}
