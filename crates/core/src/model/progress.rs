use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::answer::Answer;
use crate::model::ids::{AssignmentId, ProgressId, UserId};
use crate::scoring::score_percentage;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("attempt already completed")]
    AlreadyCompleted,

    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("status {0:?} requires a completion time")]
    MissingCompletedAt(ProgressStatus),

    #[error("in-progress attempt cannot carry a completion time")]
    UnexpectedCompletedAt,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Persisted lifecycle state of an attempt.
///
/// There is no `NotStarted` variant: an attempt that has not been started has
/// no record at all. See [`AttemptStatus`] for the caller-facing view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressStatus {
    InProgress,
    Completed,
    Submitted,
}

impl ProgressStatus {
    /// Completed and Submitted are both final; nothing may change afterwards.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Submitted)
    }
}

/// Lifecycle state of a learner's attempt, including the absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
    Submitted,
}

impl AttemptStatus {
    #[must_use]
    pub fn of(progress: Option<&Progress>) -> Self {
        match progress.map(Progress::status) {
            None => Self::NotStarted,
            Some(ProgressStatus::InProgress) => Self::InProgress,
            Some(ProgressStatus::Completed) => Self::Completed,
            Some(ProgressStatus::Submitted) => Self::Submitted,
        }
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// One learner's attempt at one assignment.
///
/// At most one exists per (user, assignment). It is created in progress and
/// mutated exactly once more, when the attempt is completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    id: ProgressId,
    user_id: UserId,
    assignment_id: AssignmentId,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    total_score: u32,
    max_score: u32,
    status: ProgressStatus,
    answers: Vec<Answer>,
}

impl Progress {
    /// A freshly started attempt with no score yet.
    #[must_use]
    pub fn start(
        id: ProgressId,
        user_id: UserId,
        assignment_id: AssignmentId,
        max_score: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            assignment_id,
            started_at,
            completed_at: None,
            total_score: 0,
            max_score,
            status: ProgressStatus::InProgress,
            answers: Vec::new(),
        }
    }

    /// Rehydrate a progress record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the status and completion time disagree or the
    /// time range is inverted.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ProgressId,
        user_id: UserId,
        assignment_id: AssignmentId,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        total_score: u32,
        max_score: u32,
        status: ProgressStatus,
        answers: Vec<Answer>,
    ) -> Result<Self, ProgressError> {
        match (status.is_terminal(), completed_at) {
            (true, None) => return Err(ProgressError::MissingCompletedAt(status)),
            (false, Some(_)) => return Err(ProgressError::UnexpectedCompletedAt),
            (true, Some(done)) if done < started_at => {
                return Err(ProgressError::InvalidTimeRange);
            }
            _ => {}
        }

        Ok(Self {
            id,
            user_id,
            assignment_id,
            started_at,
            completed_at,
            total_score,
            max_score,
            status,
            answers,
        })
    }

    /// Move the attempt to `Completed` with its final score.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::AlreadyCompleted` if the attempt is terminal, and
    /// `ProgressError::InvalidTimeRange` if `completed_at` precedes the start.
    pub fn complete(
        &mut self,
        total_score: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<(), ProgressError> {
        if self.status.is_terminal() {
            return Err(ProgressError::AlreadyCompleted);
        }
        if completed_at < self.started_at {
            return Err(ProgressError::InvalidTimeRange);
        }
        self.total_score = total_score;
        self.completed_at = Some(completed_at);
        self.status = ProgressStatus::Completed;
        Ok(())
    }

    /// Attach the answers persisted alongside this attempt.
    pub fn set_answers(&mut self, answers: Vec<Answer>) {
        self.answers = answers;
    }

    #[must_use]
    pub fn id(&self) -> ProgressId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn assignment_id(&self) -> AssignmentId {
        self.assignment_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    #[must_use]
    pub fn status(&self) -> ProgressStatus {
        self.status
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn score_percentage(&self) -> f64 {
        score_percentage(self.total_score, self.max_score)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
