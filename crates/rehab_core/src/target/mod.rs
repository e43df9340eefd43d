//! Targets: the apples the patient interacts with.
//!
//! - `spawner`: creation, bulk clear, and the outcome notice queue
//! - `container`: basket placement and zone containment

pub mod container;
pub mod spawner;

pub use container::{Container, ContainerRig, ContainerRole};
pub use spawner::{TargetNotice, TargetSpawner};

use std::fmt;

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

use crate::space::{GridIndex, Vec3};

/// How the patient is expected to interact with a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStyle {
    /// Touch it.
    Reach,
    /// Grasp it and bring it into a container zone.
    Grip,
    /// Grasp it and release it inside the basket.
    Carry,
    /// Grasp it and release it into the container matching its kind.
    Sort,
}

impl InteractionStyle {
    pub const ALL: [InteractionStyle; 4] =
        [InteractionStyle::Reach, InteractionStyle::Grip, InteractionStyle::Carry, InteractionStyle::Sort];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionStyle::Reach => "reach",
            InteractionStyle::Grip => "grip",
            InteractionStyle::Carry => "carry",
            InteractionStyle::Sort => "sort",
        }
    }

    /// Whether targets of this style need a grasp rather than a touch.
    pub fn needs_grasp(&self) -> bool {
        !matches!(self, InteractionStyle::Reach)
    }
}

impl fmt::Display for InteractionStyle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    #[default]
    Healthy,
    Rotten,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TargetKind::Healthy => write!(f, "healthy"),
            TargetKind::Rotten => write!(f, "rotten"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    Spawned,
    Held,
    Released,
    Resolved,
}

/// Session-unique target handle, assigned sequentially from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub style: InteractionStyle,
    pub kind: TargetKind,
    /// Back-reference to the cell it was spawned on.
    pub cell: GridIndex,
    pub position: Vec3,
    pub rotation: UnitQuaternion<f32>,
    pub state: TargetState,
    pub processed: bool,
    /// Session clock at grasp start, seconds.
    pub grasp_started_at: Option<f32>,
}

impl Target {
    pub fn is_live(&self) -> bool {
        !self.processed
    }

    pub fn is_held(&self) -> bool {
        self.state == TargetState::Held
    }
}
