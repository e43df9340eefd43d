//! Spawning, container and grasp configuration

use serde::{Deserialize, Serialize};

use crate::space::{RotationMode, Vec3};
use crate::target::TargetKind;

/// Host asset names. The core never loads them; it only refuses to spawn
/// when a required one is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnAssets {
    pub target_asset: Option<String>,
    pub healthy_material: Option<String>,
    /// Required for Sort only
    pub rotten_material: Option<String>,
}

impl Default for SpawnAssets {
    fn default() -> Self {
        Self {
            target_asset: Some("apple".to_string()),
            healthy_material: Some("apple_healthy".to_string()),
            rotten_material: Some("apple_rotten".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub assets: SpawnAssets,
    /// Chance a Sort target is rotten when no explicit kind is given (default: 0.3)
    pub rotten_probability: f32,
    /// Target orientation at spawn (default: match frame)
    pub rotation: RotationMode,
    /// Explicit Sort kinds for phase content, in cell order. Cells past the
    /// end of the list draw a random kind.
    pub sort_kinds: Vec<TargetKind>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            assets: SpawnAssets::default(),
            rotten_probability: 0.3,
            rotation: RotationMode::MatchFrame,
            sort_kinds: Vec::new(),
        }
    }
}

/// Basket placement, frame-relative `(right, up, forward)` metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Half edge of the containment box (default: 0.15)
    pub half_extent: f32,
    /// Single basket for Grip and Carry (default: 0, -0.4, 0.6)
    pub single_offset: Vec3,
    /// Centre between the Sort baskets (default: 0, -0.4, 0.7)
    pub dual_center: Vec3,
    /// Healthy basket sits this far left of centre, rotten this far right (default: 0.25)
    pub dual_half_gap: f32,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            half_extent: 0.15,
            single_offset: Vec3::new(0.0, -0.4, 0.6),
            dual_center: Vec3::new(0.0, -0.4, 0.7),
            dual_half_gap: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraspConfig {
    /// Shortest hold that counts as a real grasp, seconds (default: 0.3)
    pub min_hold_secs: f32,
}

impl Default for GraspConfig {
    fn default() -> Self {
        Self { min_hold_secs: 0.3 }
    }
}
