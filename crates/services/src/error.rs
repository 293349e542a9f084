//! Shared error types for the services crate.

use thiserror::Error;

use lms_core::model::{AssignmentError, AssignmentId, ProgressError, QuizError, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Coarse failure category, for callers that map errors onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotStarted,
    AlreadyCompleted,
    Forbidden,
    Invalid,
    Storage,
}

fn storage_kind(err: &StorageError) -> ErrorKind {
    match err {
        StorageError::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Storage,
    }
}

/// Errors emitted by `AttemptService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("assignment {0} not found")]
    AssignmentNotFound(AssignmentId),
    #[error("assignment not started")]
    NotStarted,
    #[error("assignment already completed")]
    AlreadyCompleted,
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AttemptError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AssignmentNotFound(_) => ErrorKind::NotFound,
            Self::NotStarted => ErrorKind::NotStarted,
            Self::AlreadyCompleted | Self::Progress(ProgressError::AlreadyCompleted) => {
                ErrorKind::AlreadyCompleted
            }
            Self::Progress(_) => ErrorKind::Invalid,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `AccessPolicy`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccessError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AccessError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `ReportingService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    #[error("no progress for user {user} on assignment {assignment}")]
    ProgressNotFound {
        user: UserId,
        assignment: AssignmentId,
    },
    #[error("viewer may not see this progress")]
    Forbidden,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ReportError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProgressNotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::Access(err) => err.kind(),
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("assignment {0} not found")]
    AssignmentNotFound(AssignmentId),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("only managers and admins may author assignments")]
    Forbidden,
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CatalogError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AssignmentNotFound(_) | Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::Assignment(_) | Self::Quiz(_) => ErrorKind::Invalid,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
