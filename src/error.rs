/// Error type for everything that can fail while setting up a match.
///
/// Resolution outcomes during a tick (blocked moves, empty paths, missed
/// lookups) are never errors; only construction and configuration are.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    /// Unknown wall / pickup / strategy name.
    #[error("unrecognized {family} variant: {name:?}")]
    UnrecognizedVariant { family: &'static str, name: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid map: {0}")]
    InvalidMap(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GameError {
    pub(crate) fn unrecognized(family: &'static str, name: &str) -> Self {
        GameError::UnrecognizedVariant { family, name: name.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
