//! Unified error type for the engine
//!
//! Subsystems report their own `thiserror` enums; this type wraps them for
//! callers that drive several subsystems at once (configuration, context setup).

use crate::memory::MemoryError;
use crate::world::error::WorldError;
use std::error::Error as StdError;
use std::fmt;

/// Main error type for the engine
#[derive(Debug)]
pub enum EngineError {
    // Configuration Errors
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },
    ConfigParse {
        error: String,
    },

    // Subsystem Errors
    Memory(MemoryError),
    World(WorldError),

    // Generic fallback for unexpected errors
    Internal {
        message: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidConfig {
                field,
                value,
                reason,
            } => write!(f, "Invalid config: {} = {} ({})", field, value, reason),
            EngineError::ConfigParse { error } => write!(f, "Config parse error: {}", error),
            EngineError::Memory(e) => write!(f, "Memory error: {}", e),
            EngineError::World(e) => write!(f, "World error: {}", e),
            EngineError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl StdError for EngineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            EngineError::Memory(e) => Some(e),
            EngineError::World(e) => Some(e),
            _ => None,
        }
    }
}

/// Type alias for Results in the engine
pub type EngineResult<T> = Result<T, EngineError>;

impl From<MemoryError> for EngineError {
    fn from(error: MemoryError) -> Self {
        EngineError::Memory(error)
    }
}

impl From<WorldError> for EngineError {
    fn from(error: WorldError) -> Self {
        EngineError::World(error)
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(error: toml::de::Error) -> Self {
        EngineError::ConfigParse {
            error: error.to_string(),
        }
    }
}

impl EngineError {
    pub(crate) fn invalid_config(
        field: &str,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::InvalidConfig {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
