use thiserror::Error;

use crate::target::InteractionStyle;

/// Engine-level failures. Every variant is local and recoverable: the
/// operation that produced it leaves state untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RehabError {
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Level list for {style} is empty")]
    EmptyLevelList { style: InteractionStyle },

    #[error("Level index {index} out of range (0..{len})")]
    InvalidLevel { index: usize, len: usize },

    #[error("No interaction style selected")]
    NoActiveStyle,

    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl RehabError {
    /// Configuration problems stay broken until the host fixes its setup.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RehabError::MissingConfig(_)
                | RehabError::InvalidConfig(_)
                | RehabError::EmptyLevelList { .. }
                | RehabError::Parse(_)
        )
    }
}

impl From<std::io::Error> for RehabError {
    fn from(err: std::io::Error) -> Self {
        RehabError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RehabError {
    fn from(err: serde_json::Error) -> Self {
        RehabError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for RehabError {
    fn from(err: serde_yaml::Error) -> Self {
        RehabError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RehabError>;
