//! Read models returned to callers.
//!
//! Views are assembled from domain records plus lookups (subject user, quiz
//! text) and never persisted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use lms_core::model::{
    AnswerId, Assignment, AssignmentId, Material, OptionLetter, Progress, ProgressId,
    ProgressStatus, Quiz, QuizId, User, UserId,
};
use lms_core::scoring::score_percentage;
use storage::repository::{QuizRepository, StorageError, UserDirectory};

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// One scored answer with enough context for learner feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredAnswerView {
    pub answer_id: AnswerId,
    pub quiz_id: QuizId,
    pub question: String,
    pub selected: String,
    /// `None` only if the quiz has since been removed from the catalog.
    pub correct: Option<OptionLetter>,
    pub is_correct: bool,
    pub points_earned: u32,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub id: ProgressId,
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_full_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_score: u32,
    pub max_score: u32,
    pub status: ProgressStatus,
    pub answers: Vec<ScoredAnswerView>,
}

impl ProgressView {
    /// Build a view from a progress record, its subject and the assignment's quizzes.
    #[must_use]
    pub fn assemble(progress: &Progress, subject: Option<&User>, quizzes: &[Quiz]) -> Self {
        let by_id: HashMap<QuizId, &Quiz> = quizzes.iter().map(|q| (q.id(), q)).collect();
        let answers = progress
            .answers()
            .iter()
            .map(|answer| {
                let quiz = by_id.get(&answer.quiz_id);
                ScoredAnswerView {
                    answer_id: answer.id,
                    quiz_id: answer.quiz_id,
                    question: quiz.map(|q| q.question().to_owned()).unwrap_or_default(),
                    selected: answer.selected.clone(),
                    correct: quiz.map(|q| q.correct()),
                    is_correct: answer.is_correct,
                    points_earned: answer.points_earned,
                    answered_at: answer.answered_at,
                }
            })
            .collect();

        Self {
            id: progress.id(),
            assignment_id: progress.assignment_id(),
            user_id: progress.user_id(),
            user_name: subject.map(|u| u.user_name().to_owned()).unwrap_or_default(),
            user_full_name: subject.map(User::full_name).unwrap_or_default(),
            started_at: progress.started_at(),
            completed_at: progress.completed_at(),
            total_score: progress.total_score(),
            max_score: progress.max_score(),
            status: progress.status(),
            answers,
        }
    }

    #[must_use]
    pub fn score_percentage(&self) -> f64 {
        score_percentage(self.total_score, self.max_score)
    }
}

/// Builds progress views, caching user and quiz lookups across one batch.
pub(crate) struct ViewAssembler<'a> {
    users: &'a dyn UserDirectory,
    quizzes: &'a dyn QuizRepository,
    user_cache: HashMap<UserId, Option<User>>,
    quiz_cache: HashMap<AssignmentId, Vec<Quiz>>,
}

impl<'a> ViewAssembler<'a> {
    pub(crate) fn new(users: &'a dyn UserDirectory, quizzes: &'a dyn QuizRepository) -> Self {
        Self {
            users,
            quizzes,
            user_cache: HashMap::new(),
            quiz_cache: HashMap::new(),
        }
    }

    pub(crate) async fn view(&mut self, progress: &Progress) -> Result<ProgressView, StorageError> {
        if !self.user_cache.contains_key(&progress.user_id()) {
            let user = self.users.get_user(progress.user_id()).await?;
            self.user_cache.insert(progress.user_id(), user);
        }
        if !self.quiz_cache.contains_key(&progress.assignment_id()) {
            let quizzes = self.quizzes.list_quizzes(progress.assignment_id()).await?;
            self.quiz_cache.insert(progress.assignment_id(), quizzes);
        }

        let subject = self.user_cache.get(&progress.user_id()).and_then(Option::as_ref);
        let quizzes = self
            .quiz_cache
            .get(&progress.assignment_id())
            .map_or(&[][..], Vec::as_slice);
        Ok(ProgressView::assemble(progress, subject, quizzes))
    }

    pub(crate) async fn views(
        &mut self,
        rows: &[Progress],
    ) -> Result<Vec<ProgressView>, StorageError> {
        let mut out = Vec::with_capacity(rows.len());
        for progress in rows {
            out.push(self.view(progress).await?);
        }
        Ok(out)
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// A question as shown to a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizView {
    pub id: QuizId,
    pub question: String,
    pub options: [String; 4],
    pub points: u32,
    pub order_index: i32,
    /// Revealed to managers and admins only.
    pub correct: Option<OptionLetter>,
    /// The viewer's own answer, once they have submitted.
    pub selected: Option<String>,
}

/// An active assignment paired with the viewer's progress, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentOverview {
    pub id: AssignmentId,
    pub title: String,
    pub description: String,
    pub material: Material,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub progress: Option<ProgressView>,
}

impl AssignmentOverview {
    pub(crate) fn new(assignment: &Assignment, progress: Option<ProgressView>) -> Self {
        Self {
            id: assignment.id(),
            title: assignment.title().to_owned(),
            description: assignment.description().to_owned(),
            material: assignment.material().clone(),
            created_at: assignment.created_at(),
            due_date: assignment.due_date(),
            created_by: assignment.created_by(),
            progress,
        }
    }
}

/// Full assignment with its ordered quizzes, as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentDetails {
    #[serde(flatten)]
    pub overview: AssignmentOverview,
    pub is_active: bool,
    pub quizzes: Vec<QuizView>,
}
