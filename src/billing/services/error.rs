//! Service-level errors for billing operations.

use crate::billing::{
    domain::{BillingDomainError, ProjectId, ProjectStatus, TimeEntryId, UserId},
    ports::StoreError,
};
use thiserror::Error;
use uuid::Uuid;

/// Caller-facing classification of a billing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The entity is absent or not visible to the caller.
    NotFound,
    /// The request collides with current state, such as a running timer.
    Conflict,
    /// The caller does not own the addressed project.
    Forbidden,
    /// The input or the current state makes the request invalid.
    Validation,
    /// Storage failed.
    Persistence,
}

/// Errors returned by billing services.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] BillingDomainError),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The entity is absent or belongs to another user.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity family, such as `task`.
        entity: &'static str,
        /// Requested identifier.
        id: Uuid,
    },

    /// The user already has a running timer.
    #[error("user {0} already has a running timer")]
    TimerAlreadyRunning(UserId),

    /// A running time entry cannot be deleted.
    #[error("time entry {0} is still running")]
    EntryRunning(TimeEntryId),

    /// The project belongs to another user.
    #[error("user {user_id} may not bill project {project_id}")]
    Forbidden {
        /// Caller.
        user_id: UserId,
        /// Addressed project.
        project_id: ProjectId,
    },

    /// Project invoicing requires a completed project.
    #[error("project {project_id} is {}, not completed", .status.as_str())]
    ProjectNotCompleted {
        /// Addressed project.
        project_id: ProjectId,
        /// Current project status.
        status: ProjectStatus,
    },

    /// The project has no completed, unbilled tasks.
    #[error("project {0} has no billable tasks")]
    NothingToBill(ProjectId),
}

impl BillingError {
    /// Builds a not-found error for `entity`.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl AsRef<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: *id.as_ref(),
        }
    }

    /// Returns the caller-facing classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(BillingDomainError::EntryNotRunning(_)) | Self::NotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::Domain(BillingDomainError::TaskAlreadyBilled(_))
            | Self::TimerAlreadyRunning(_)
            | Self::EntryRunning(_) => ErrorKind::Conflict,
            Self::Domain(_) | Self::ProjectNotCompleted { .. } | Self::NothingToBill(_) => {
                ErrorKind::Validation
            }
            Self::Store(store) => match store {
                StoreError::RunningTimerExists(_) | StoreError::DuplicateInvoiceNumber(_) => {
                    ErrorKind::Conflict
                }
                StoreError::MissingRecord { .. } => ErrorKind::NotFound,
                StoreError::Persistence(_) => ErrorKind::Persistence,
            },
            Self::Forbidden { .. } => ErrorKind::Forbidden,
        }
    }
}

/// Result type for billing service operations.
pub type BillingResult<T> = Result<T, BillingError>;
