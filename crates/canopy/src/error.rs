//! Error type for the canopy subsystem.
//!
//! Only configuration and data problems are errors. Caller-contract
//! violations (opening a canopy that is not connected and similar) are
//! assertions, and degenerate physics states are clamped where they occur.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanopyError {
    #[error("invalid RON data: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bone constraint refers to unknown bone `{0}`")]
    UnknownBone(String),

    #[error("bone `{0}` is defined more than once")]
    DuplicateBone(String),

    #[error("bone constraints form a cycle through `{0}`")]
    BoneCycle(String),

    #[error("no canopy gear with id {0}")]
    UnknownGear(u32),
}

pub type Result<T> = std::result::Result<T, CanopyError>;
