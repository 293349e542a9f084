use std::collections::HashSet;
use std::sync::Arc;

use lms_core::model::{AssignmentId, UserId};
use storage::repository::{ProgressRepository, QuizRepository, UserDirectory};

use crate::access_policy::AccessPolicy;
use crate::error::ReportError;
use crate::view::{ProgressView, ViewAssembler};

/// Manager-facing progress queries. Every list is newest-started first.
#[derive(Clone)]
pub struct ReportingService {
    users: Arc<dyn UserDirectory>,
    quizzes: Arc<dyn QuizRepository>,
    progress: Arc<dyn ProgressRepository>,
    access: AccessPolicy,
}

impl ReportingService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        quizzes: Arc<dyn QuizRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        let access = AccessPolicy::new(Arc::clone(&users));
        Self {
            users,
            quizzes,
            progress,
            access,
        }
    }

    fn assembler(&self) -> ViewAssembler<'_> {
        ViewAssembler::new(self.users.as_ref(), self.quizzes.as_ref())
    }

    /// Progress of every direct report of `manager_id`.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Storage` if repository access fails.
    pub async fn list_subordinate_progress(
        &self,
        manager_id: UserId,
    ) -> Result<Vec<ProgressView>, ReportError> {
        let rows = self.progress.list_progress_for_subordinates(manager_id).await?;
        Ok(self.assembler().views(&rows).await?)
    }

    /// Progress on one assignment, limited to direct reports of `manager_id`.
    ///
    /// Admins get no wider view here than any manager; only the single-record
    /// path in [`AccessPolicy`] lets admins see everyone.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Storage` if repository access fails.
    pub async fn assignment_progress_report(
        &self,
        assignment_id: AssignmentId,
        manager_id: UserId,
    ) -> Result<Vec<ProgressView>, ReportError> {
        let reports: HashSet<UserId> = self
            .users
            .list_subordinates(manager_id)
            .await?
            .iter()
            .map(|u| u.id())
            .collect();
        let rows: Vec<_> = self
            .progress
            .list_progress_for_assignment(assignment_id)
            .await?
            .into_iter()
            .filter(|p| reports.contains(&p.user_id()))
            .collect();
        Ok(self.assembler().views(&rows).await?)
    }

    /// All progress of one learner.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Storage` if repository access fails.
    pub async fn list_user_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ProgressView>, ReportError> {
        let rows = self.progress.list_progress_for_user(user_id).await?;
        Ok(self.assembler().views(&rows).await?)
    }

    /// One learner's progress on one assignment, as seen by `viewer_id`.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Forbidden` if the viewer may not see the subject.
    /// Returns `ReportError::ProgressNotFound` if no attempt exists.
    /// Returns `ReportError::Storage` if repository access fails.
    pub async fn progress_details(
        &self,
        viewer_id: UserId,
        subject_id: UserId,
        assignment_id: AssignmentId,
    ) -> Result<ProgressView, ReportError> {
        if !self.access.can_view_progress(viewer_id, subject_id).await? {
            return Err(ReportError::Forbidden);
        }
        let progress = self
            .progress
            .get_progress(subject_id, assignment_id)
            .await?
            .ok_or(ReportError::ProgressNotFound {
                user: subject_id,
                assignment: assignment_id,
            })?;
        Ok(self.assembler().view(&progress).await?)
    }
}
