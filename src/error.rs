use thiserror::Error;

use crate::model::{EntityKind, Id};

/// Typed failures surfaced by the integrity validator and the read side.
///
/// Infrastructure problems (lost connections, unexpected SQL errors) travel
/// as [`FleetError::Store`] and are never reported as one of the
/// user-facing kinds.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("{0}")]
    InvalidPagination(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

pub type FleetResult<T> = Result<T, FleetError>;

impl FleetError {
    pub fn validation(message: impl Into<String>) -> Self {
        FleetError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        FleetError::Conflict(message.into())
    }

    pub fn not_found(kind: EntityKind, id: &Id) -> Self {
        FleetError::NotFound(format!("{} '{}' not found", kind.label(), id))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FleetError::NotFound(_))
    }
}
