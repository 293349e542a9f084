use std::sync::Arc;

use tracing::{debug, info, warn};

use lms_core::model::{AssignmentId, AttemptStatus, Progress, UserId};
use lms_core::scoring::{self, SubmittedAnswer};
use lms_core::time::Clock;
use storage::repository::{
    AssignmentRepository, NewAnswerRecord, NewProgressRecord, ProgressRepository, QuizRepository,
    StorageError, SubmissionPersistence, UserDirectory,
};

use crate::error::AttemptError;
use crate::locks::KeyedLocks;
use crate::view::ProgressView;

/// Result of asking to start an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new attempt was created.
    Started(Progress),
    /// An attempt already existed; it is returned unchanged.
    AlreadyStarted(Progress),
}

impl StartOutcome {
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }

    #[must_use]
    pub fn progress(&self) -> &Progress {
        match self {
            Self::Started(p) | Self::AlreadyStarted(p) => p,
        }
    }
}

/// Starts, scores and completes learner attempts.
///
/// Start and submit for the same (user, assignment) are serialized in-process;
/// the storage uniqueness constraint and completion compare-and-set back this
/// up across processes.
pub struct AttemptService {
    clock: Clock,
    assignments: Arc<dyn AssignmentRepository>,
    quizzes: Arc<dyn QuizRepository>,
    progress: Arc<dyn ProgressRepository>,
    submissions: Arc<dyn SubmissionPersistence>,
    users: Arc<dyn UserDirectory>,
    locks: KeyedLocks<(UserId, AssignmentId)>,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        assignments: Arc<dyn AssignmentRepository>,
        quizzes: Arc<dyn QuizRepository>,
        progress: Arc<dyn ProgressRepository>,
        submissions: Arc<dyn SubmissionPersistence>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            clock,
            assignments,
            quizzes,
            progress,
            submissions,
            users,
            locks: KeyedLocks::new(),
        }
    }

    /// Start an attempt, or report the one that already exists.
    ///
    /// `max_score` is snapshotted from the assignment's current quizzes.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AssignmentNotFound` if the assignment does not exist.
    /// Returns `AttemptError::Storage` if repository access fails.
    pub async fn start_attempt(
        &self,
        assignment_id: AssignmentId,
        user_id: UserId,
    ) -> Result<StartOutcome, AttemptError> {
        let _guard = self.locks.acquire((user_id, assignment_id)).await;

        if self.assignments.get_assignment(assignment_id).await?.is_none() {
            return Err(AttemptError::AssignmentNotFound(assignment_id));
        }
        if let Some(existing) = self.progress.get_progress(user_id, assignment_id).await? {
            return Ok(StartOutcome::AlreadyStarted(existing));
        }

        let quizzes = self.quizzes.list_quizzes(assignment_id).await?;
        let record = NewProgressRecord {
            user_id,
            assignment_id,
            started_at: self.clock.now(),
            max_score: scoring::max_score(&quizzes),
        };

        match self.progress.create_progress(record).await {
            Ok(progress) => {
                info!(
                    user = %user_id,
                    assignment = %assignment_id,
                    max_score = progress.max_score(),
                    "attempt started"
                );
                Ok(StartOutcome::Started(progress))
            }
            Err(StorageError::Conflict) => {
                warn!(
                    user = %user_id,
                    assignment = %assignment_id,
                    "concurrent start resolved by storage constraint"
                );
                let existing = self
                    .progress
                    .get_progress(user_id, assignment_id)
                    .await?
                    .ok_or(StorageError::NotFound)?;
                Ok(StartOutcome::AlreadyStarted(existing))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Score a submission and complete the attempt.
    ///
    /// Answers for quizzes outside the assignment, and repeats of a quiz already
    /// answered earlier in the same submission, are skipped without failing.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotStarted` if no attempt exists.
    /// Returns `AttemptError::AlreadyCompleted` if the attempt is already final.
    /// Returns `AttemptError::Storage` if repository access fails.
    pub async fn submit_attempt(
        &self,
        assignment_id: AssignmentId,
        user_id: UserId,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<ProgressView, AttemptError> {
        let _guard = self.locks.acquire((user_id, assignment_id)).await;

        let mut progress = self
            .progress
            .get_progress(user_id, assignment_id)
            .await?
            .ok_or(AttemptError::NotStarted)?;
        if progress.is_completed() {
            return Err(AttemptError::AlreadyCompleted);
        }

        let quizzes = self.quizzes.list_quizzes(assignment_id).await?;
        // Looked up before committing: a directory failure must leave the attempt open.
        let subject = self.users.get_user(user_id).await?;
        let sheet = scoring::score_submission(&quizzes, &answers);
        for (quiz_id, reason) in &sheet.skipped {
            debug!(
                user = %user_id,
                assignment = %assignment_id,
                quiz = %quiz_id,
                ?reason,
                "submitted answer skipped"
            );
        }

        let now = self.clock.now();
        progress.complete(sheet.total_score, now)?;
        let records: Vec<NewAnswerRecord> = sheet
            .entries
            .into_iter()
            .map(|entry| NewAnswerRecord {
                quiz_id: entry.quiz_id,
                selected: entry.selected,
                is_correct: entry.is_correct,
                points_earned: entry.points_earned,
                answered_at: now,
            })
            .collect();

        let stored = match self.submissions.complete_submission(&progress, &records).await {
            Ok(stored) => stored,
            Err(StorageError::Conflict) => {
                warn!(
                    user = %user_id,
                    assignment = %assignment_id,
                    "concurrent submit resolved by storage compare-and-set"
                );
                return Err(AttemptError::AlreadyCompleted);
            }
            Err(err) => return Err(err.into()),
        };
        progress.set_answers(stored);

        info!(
            user = %user_id,
            assignment = %assignment_id,
            total_score = progress.total_score(),
            max_score = progress.max_score(),
            answered = progress.answers().len(),
            "attempt submitted"
        );

        Ok(ProgressView::assemble(&progress, subject.as_ref(), &quizzes))
    }

    /// True iff the assignment exists and is active. The user is not consulted.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` if repository access fails.
    pub async fn can_access(
        &self,
        assignment_id: AssignmentId,
        _user_id: UserId,
    ) -> Result<bool, AttemptError> {
        Ok(self
            .assignments
            .get_assignment(assignment_id)
            .await?
            .is_some_and(|a| a.is_active()))
    }

    /// True iff an attempt exists and is in a final state.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` if repository access fails.
    pub async fn has_completed(
        &self,
        assignment_id: AssignmentId,
        user_id: UserId,
    ) -> Result<bool, AttemptError> {
        Ok(self
            .progress
            .get_progress(user_id, assignment_id)
            .await?
            .is_some_and(|p| p.is_completed()))
    }

    /// # Errors
    ///
    /// Returns `AttemptError::Storage` if repository access fails.
    pub async fn attempt_status(
        &self,
        assignment_id: AssignmentId,
        user_id: UserId,
    ) -> Result<AttemptStatus, AttemptError> {
        let progress = self.progress.get_progress(user_id, assignment_id).await?;
        Ok(AttemptStatus::of(progress.as_ref()))
    }
}
