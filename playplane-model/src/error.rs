use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidSegment { id: String, start_ms: u64, end_ms: u64 },
    UnknownLayer(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidSegment {
                id,
                start_ms,
                end_ms,
            } => write!(
                f,
                "invalid segment {id}: start {start_ms}ms is after end {end_ms}ms"
            ),
            ModelError::UnknownLayer(name) => {
                write!(f, "unknown comment layer: {name}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
