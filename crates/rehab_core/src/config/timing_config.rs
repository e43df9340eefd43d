//! Countdown and phase durations

use serde::{Deserialize, Serialize};

/// All values in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pre-level countdown; 0 starts levels immediately (default: 3.0)
    pub countdown_secs: f32,
    /// Measurement phase length (default: 30.0)
    pub measure_secs: f32,
    /// Remedial and static phase length (default: 10.0)
    pub phase_secs: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { countdown_secs: 3.0, measure_secs: 30.0, phase_secs: 10.0 }
    }
}
