//! # rehab_core - Adaptive Reach/Grip/Carry/Sort Rehabilitation Engine
//!
//! Places targets around a head-anchored reference frame, classifies every
//! interaction, and scores levels for VR arm rehabilitation. Rendering,
//! hand tracking and networking stay with the host.
//!
//! ## Features
//! - Line lattice or multi-layer arc workspaces, mirrored per trained hand
//! - Timed measurement pass with a per-cell outcome ledger
//! - Remedial phases built from the ledger (wrong container, dropped, unreachable)
//! - One lifecycle state machine shared by all four interaction styles
//! - Deterministic kind assignment (same seed = same session)

// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
// Lifecycle and phase entry points take a handful of collaborators
#![allow(clippy::too_many_arguments)]

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod exercise;
pub mod ledger;
pub mod phase;
pub mod progress;
pub mod space;
pub mod target;

#[cfg(test)]
mod scenarios;

pub use classify::{InteractionEvent, OutcomeClassifier};
pub use config::{LevelCatalog, LevelConfigSource, LevelDescriptor, RehabConfig};
pub use engine::{EngineEvent, RehabEngine};
pub use error::{RehabError, Result};
pub use exercise::{ExerciseLifecycle, ExerciseSession, ExerciseState, FinishOrNext, LevelStart};
pub use ledger::{Outcome, OutcomeLedger};
pub use phase::{GameMode, PhaseEnd, PhaseOrchestrator, PhaseStart};
pub use progress::{
    ActivityMode, FileSink, MemorySink, NullSink, ProgressArchive, ProgressRecord, ProgressSink, ProgressStore,
    StoreError, TherapyProgress,
};
pub use space::{Cell, FixedFrame, GridCellSpace, GridIndex, HandSide, ReferenceFrame, TrackedFrame, Vec3};
pub use target::{InteractionStyle, Target, TargetId, TargetKind};

/// Everything a host needs to drive a session.
pub mod prelude {
    pub use crate::classify::InteractionEvent;
    pub use crate::config::RehabConfig;
    pub use crate::engine::{EngineEvent, RehabEngine};
    pub use crate::ledger::Outcome;
    pub use crate::phase::{GameMode, PhaseStart};
    pub use crate::progress::{ActivityMode, FileSink, MemorySink, NullSink, ProgressSink};
    pub use crate::space::{FixedFrame, GridIndex, HandSide, ReferenceFrame, ReferenceFrameProvider, TrackedFrame};
    pub use crate::target::{InteractionStyle, TargetId, TargetKind};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
