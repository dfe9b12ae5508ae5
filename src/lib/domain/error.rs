//! The error kinds named in the error-handling design: validation,
//! authorization, not-found, conflict and transient failures. Fatal startup
//! errors are handled separately in `main` (idle-forever), not as a variant
//! here, since nothing downstream ever constructs or matches on them.

use thiserror::Error;

use crate::utils::consts::ALREADY_SIGNED_UP_MESSAGE;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input, invariant violation, or a missing required field.
    /// Surfaced to the user verbatim; never logged above DEBUG.
    #[error("{0}")]
    Validation(String),

    /// Caller lacks the role, or is not the quest's referee.
    #[error("{0}")]
    Authorization(String),

    /// Target entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate signup, active cooldown, already-announced, etc.
    #[error("{0}")]
    Conflict(String),

    /// Network timeout, 5xx from a remote, or a storage connectivity blip.
    #[error("{0}")]
    Transient(String),
}

impl DomainError {
    pub fn already_signed_up() -> Self {
        Self::Conflict(ALREADY_SIGNED_UP_MESSAGE.to_string())
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn validation(what: impl std::fmt::Display) -> Self {
        Self::Validation(what.to_string())
    }

    pub fn authorization(what: impl std::fmt::Display) -> Self {
        Self::Authorization(what.to_string())
    }

    pub fn conflict(what: impl std::fmt::Display) -> Self {
        Self::Conflict(what.to_string())
    }

    pub fn transient(what: impl std::fmt::Display) -> Self {
        Self::Transient(what.to_string())
    }

    /// True if a retry against the same path is pointless and the caller
    /// should fall back to an alternate persistence path instead (§4.2, §7).
    pub const fn should_fall_back_to_local(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// The message shown to the end user for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transient(_) => "Something went wrong, please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
