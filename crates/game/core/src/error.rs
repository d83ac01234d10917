//! Common error infrastructure for escape-core.
//!
//! Rule rejections (a blocked move, an unavailable interaction, a pending
//! gate step) are ordinary values, never errors. The types here cover the
//! remaining failures: malformed level data and theme callbacks that fail.

use crate::state::{GridError, Position};

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the caller may retry or pick another action
/// - **Validation**: invalid input, retrying unchanged will fail again
/// - **Internal**: unexpected state inconsistency
/// - **Fatal**: the session cannot be constructed or continued
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all escape-core errors.
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Static identifier for metrics, logs and tests.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Errors raised while constructing or restarting a session.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid grid: {0}")]
    Grid(#[from] GridError),

    #[error("spawn position {0} is outside the grid")]
    SpawnOutOfBounds(Position),

    #[error("level declares zero lives")]
    NoLives,

    #[error("unique tile type '{0}' appears more than once")]
    DuplicateUniqueTile(String),
}

impl GameError for SessionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            SessionError::Grid(_)
            | SessionError::SpawnOutOfBounds(_)
            | SessionError::NoLives
            | SessionError::DuplicateUniqueTile(_) => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::Grid(_) => "SESSION_INVALID_GRID",
            SessionError::SpawnOutOfBounds(_) => "SESSION_SPAWN_OUT_OF_BOUNDS",
            SessionError::NoLives => "SESSION_NO_LIVES",
            SessionError::DuplicateUniqueTile(_) => "SESSION_DUPLICATE_UNIQUE_TILE",
        }
    }
}

/// Error reported by a theme callback.
///
/// The engine never propagates these: a failing callback makes the action it
/// was asked about unavailable and the generic fallback applies.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ThemeError {
    #[error("interaction '{0}' is not known to the theme")]
    UnknownInteraction(String),

    #[error("tile config at {position} is invalid: {reason}")]
    InvalidConfig { position: Position, reason: String },

    #[error("theme callback failed: {0}")]
    Callback(String),
}

impl GameError for ThemeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ThemeError::UnknownInteraction(_) | ThemeError::InvalidConfig { .. } => {
                ErrorSeverity::Validation
            }
            ThemeError::Callback(_) => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ThemeError::UnknownInteraction(_) => "THEME_UNKNOWN_INTERACTION",
            ThemeError::InvalidConfig { .. } => "THEME_INVALID_CONFIG",
            ThemeError::Callback(_) => "THEME_CALLBACK_FAILED",
        }
    }
}
