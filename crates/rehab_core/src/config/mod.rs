//! # Session Configuration
//!
//! Every tunable of a rehabilitation session lives here so clinics can ship
//! YAML/JSON profiles instead of code changes.
//!
//! ## Usage
//! ```rust
//! use rehab_core::config::RehabConfig;
//!
//! let config = RehabConfig::default();
//! let drill = RehabConfig::quick_drill();
//! assert!(drill.validate().is_ok());
//! ```
//!
//! ## Environment Variables
//!
//! - `REHAB_PROFILE`: preset for [`RehabConfig::from_env_or_default`]
//!   (`left_hand`, `arc`, `quick`, anything else = default)

mod grid_config;
mod levels;
mod spawn_config;
mod timing_config;

pub use grid_config::GridConfig;
pub use levels::{LevelCatalog, LevelConfigSource, LevelDescriptor};
pub use spawn_config::{ContainerConfig, GraspConfig, SpawnAssets, SpawnConfig};
pub use timing_config::TimingConfig;

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RehabError, Result};
use crate::space::{ArcLayout, HandSide, Layout};
use crate::target::InteractionStyle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RehabConfig {
    pub grid: GridConfig,
    pub spawn: SpawnConfig,
    pub containers: ContainerConfig,
    pub grasp: GraspConfig,
    pub timing: TimingConfig,
    pub levels: LevelCatalog,
    /// Interaction style used for measurement and remedial phases (default: sort)
    pub phase_style: InteractionStyle,
    /// Session RNG seed (default: 42)
    pub seed: u64,
}

impl Default for RehabConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            spawn: SpawnConfig::default(),
            containers: ContainerConfig::default(),
            grasp: GraspConfig::default(),
            timing: TimingConfig::default(),
            levels: LevelCatalog::default(),
            phase_style: InteractionStyle::Sort,
            seed: 42,
        }
    }
}

impl RehabConfig {
    /// Left-hand session, layout mirrored toward the left.
    pub fn left_hand() -> Self {
        let mut cfg = Self::default();
        cfg.grid.hand = HandSide::Left;
        cfg
    }

    /// Three arc shells instead of the line lattice.
    pub fn arc_workspace() -> Self {
        let mut cfg = Self::default();
        cfg.grid.layout = Layout::Arc(ArcLayout::default());
        cfg
    }

    /// No countdown, short phases. For demos and tests.
    pub fn quick_drill() -> Self {
        let mut cfg = Self::default();
        cfg.timing = TimingConfig { countdown_secs: 0.0, measure_secs: 10.0, phase_secs: 5.0 };
        cfg
    }

    pub fn from_env_or_default() -> Self {
        match env::var("REHAB_PROFILE").unwrap_or_default().to_lowercase().as_str() {
            "left_hand" | "left" => Self::left_hand(),
            "arc" => Self::arc_workspace(),
            "quick" => Self::quick_drill(),
            _ => Self::default(),
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load by extension: `.yaml`/`.yml` or `.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(RehabError::InvalidConfig(format!(
                "unsupported config extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match &self.grid.layout {
            Layout::Line(line) => {
                for (name, axis) in [("x", &line.x), ("y", &line.y), ("z", &line.z)] {
                    if axis.count == 0 {
                        return Err(RehabError::InvalidConfig(format!("line axis {} has zero count", name)));
                    }
                    if axis.min > axis.max {
                        return Err(RehabError::InvalidConfig(format!("line axis {} has min > max", name)));
                    }
                }
            }
            Layout::Arc(arc) => {
                if arc.horizontal_count == 0 || arc.vertical_count == 0 || arc.layer_count == 0 {
                    return Err(RehabError::InvalidConfig("arc counts must be at least 1".to_string()));
                }
                if arc.base_radius < 0.0 {
                    return Err(RehabError::InvalidConfig("arc base radius is negative".to_string()));
                }
            }
        }
        if self.grid.hand_offset < 0.0 {
            return Err(RehabError::InvalidConfig("hand offset is negative".to_string()));
        }
        if !(0.0..=1.0).contains(&self.spawn.rotten_probability) {
            return Err(RehabError::InvalidConfig(format!(
                "rotten probability {} outside 0..=1",
                self.spawn.rotten_probability
            )));
        }
        if self.containers.half_extent <= 0.0 {
            return Err(RehabError::InvalidConfig("container half extent must be positive".to_string()));
        }
        let t = &self.timing;
        if t.countdown_secs < 0.0 || t.measure_secs <= 0.0 || t.phase_secs <= 0.0 {
            return Err(RehabError::InvalidConfig("durations must be positive".to_string()));
        }
        if self.grasp.min_hold_secs < 0.0 {
            return Err(RehabError::InvalidConfig("minimum hold is negative".to_string()));
        }
        for style in InteractionStyle::ALL {
            if self.levels.for_style(style).iter().any(|lv| lv.target_count == 0) {
                return Err(RehabError::InvalidConfig(format!("{} has a level with no targets", style)));
            }
        }
        Ok(())
    }
}

// ========== Tests ==========
