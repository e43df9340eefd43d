//! Workspace layout configuration

use serde::{Deserialize, Serialize};

use crate::space::{HandSide, Layout};

/// Layout and lateral hand shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Line lattice or spherical arc (default: 8 x 5 x 5 line lattice)
    pub layout: Layout,
    /// Trained hand (default: right)
    pub hand: HandSide,
    /// Lateral shift toward the trained hand, metres (default: 0.15)
    pub hand_offset: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { layout: Layout::default(), hand: HandSide::Right, hand_offset: 0.15 }
    }
}
