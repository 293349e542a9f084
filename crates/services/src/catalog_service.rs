use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use lms_core::model::{
    Assignment, AssignmentId, DEFAULT_POINTS, Material, OptionLetter, Quiz, QuizError, QuizId,
    UserId,
};
use lms_core::time::Clock;
use storage::repository::{
    AssignmentRepository, NewAssignmentRecord, NewQuizRecord, ProgressRepository, QuizRepository,
    UserDirectory,
};

use crate::error::CatalogError;
use crate::view::{AssignmentDetails, AssignmentOverview, QuizView, ViewAssembler};

/// Input for a new assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentDraft {
    pub title: String,
    pub description: String,
    pub material: Material,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Input for one question of a new assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizDraft {
    pub question: String,
    pub options: [String; 4],
    pub correct: OptionLetter,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub order_index: i32,
}

fn default_points() -> u32 {
    DEFAULT_POINTS
}

impl QuizDraft {
    fn validated(self) -> Result<Self, QuizError> {
        Quiz::check_options(&self.options)?;
        Ok(Self {
            question: Quiz::clean_question(&self.question)?,
            ..self
        })
    }
}

/// Assignment browsing and authoring.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    users: Arc<dyn UserDirectory>,
    assignments: Arc<dyn AssignmentRepository>,
    quizzes: Arc<dyn QuizRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserDirectory>,
        assignments: Arc<dyn AssignmentRepository>,
        quizzes: Arc<dyn QuizRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            assignments,
            quizzes,
            progress,
        }
    }

    /// Active assignments, newest first, each with `user_id`'s progress if started.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn active_assignments(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AssignmentOverview>, CatalogError> {
        let assignments = self.assignments.list_active_assignments().await?;
        let mut assembler = ViewAssembler::new(self.users.as_ref(), self.quizzes.as_ref());

        let mut out = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            let progress = match self.progress.get_progress(user_id, assignment.id()).await? {
                Some(p) => Some(assembler.view(&p).await?),
                None => None,
            };
            out.push(AssignmentOverview::new(assignment, progress));
        }
        Ok(out)
    }

    /// One assignment with its ordered quizzes as seen by `viewer_id`.
    ///
    /// Correct letters are included only for managers and admins; the viewer's
    /// own selections are included once they have submitted.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::AssignmentNotFound` if the assignment does not exist.
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn assignment_details(
        &self,
        assignment_id: AssignmentId,
        viewer_id: UserId,
    ) -> Result<AssignmentDetails, CatalogError> {
        let assignment = self
            .assignments
            .get_assignment(assignment_id)
            .await?
            .ok_or(CatalogError::AssignmentNotFound(assignment_id))?;
        let reveal = self
            .users
            .get_user(viewer_id)
            .await?
            .is_some_and(|u| u.role().is_supervisor());

        let quizzes = self.quizzes.list_quizzes(assignment_id).await?;
        let progress = self.progress.get_progress(viewer_id, assignment_id).await?;
        let selected: HashMap<QuizId, &str> = progress
            .as_ref()
            .map(|p| {
                p.answers()
                    .iter()
                    .map(|a| (a.quiz_id, a.selected.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let quiz_views = quizzes
            .iter()
            .map(|quiz| QuizView {
                id: quiz.id(),
                question: quiz.question().to_owned(),
                options: quiz.options().clone(),
                points: quiz.points(),
                order_index: quiz.order_index(),
                correct: reveal.then(|| quiz.correct()),
                selected: selected.get(&quiz.id()).map(|s| (*s).to_owned()),
            })
            .collect();

        let progress_view = match &progress {
            Some(p) => Some(
                ViewAssembler::new(self.users.as_ref(), self.quizzes.as_ref())
                    .view(p)
                    .await?,
            ),
            None => None,
        };

        Ok(AssignmentDetails {
            is_active: assignment.is_active(),
            overview: AssignmentOverview::new(&assignment, progress_view),
            quizzes: quiz_views,
        })
    }

    /// Create an active assignment with its questions.
    ///
    /// Everything is validated before anything is stored.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UserNotFound` if the creator is unknown.
    /// Returns `CatalogError::Forbidden` if the creator is a learner.
    /// Returns `CatalogError::Assignment` or `CatalogError::Quiz` for invalid input.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn create_assignment(
        &self,
        creator_id: UserId,
        draft: AssignmentDraft,
        quizzes: Vec<QuizDraft>,
    ) -> Result<AssignmentDetails, CatalogError> {
        let creator = self
            .users
            .get_user(creator_id)
            .await?
            .ok_or(CatalogError::UserNotFound(creator_id))?;
        if !creator.role().is_supervisor() {
            return Err(CatalogError::Forbidden);
        }

        let now = self.clock.now();
        let title = Assignment::clean_title(&draft.title)?;
        let description = Assignment::clean_description(&draft.description)?;
        Assignment::check_due_date(draft.due_date, now)?;
        let record = NewAssignmentRecord {
            title,
            description,
            material: draft.material,
            created_by: creator_id,
            due_date: draft.due_date,
            created_at: now,
            is_active: true,
        };
        let quizzes = quizzes
            .into_iter()
            .map(QuizDraft::validated)
            .collect::<Result<Vec<_>, _>>()?;
        let quiz_count = quizzes.len();

        let assignment_id = self.assignments.insert_assignment(record).await?;
        for quiz in quizzes {
            self.quizzes
                .insert_quiz(NewQuizRecord {
                    assignment_id,
                    question: quiz.question,
                    options: quiz.options,
                    correct: quiz.correct,
                    points: quiz.points,
                    order_index: quiz.order_index,
                })
                .await?;
        }

        info!(
            assignment = %assignment_id,
            creator = %creator_id,
            quizzes = quiz_count,
            "assignment created"
        );
        self.assignment_details(assignment_id, creator_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::{Role, User};
    use lms_core::scoring::SubmittedAnswer;
    use lms_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    use crate::attempt_service::AttemptService;

    fn catalog(repo: &InMemoryRepository) -> CatalogService {
        CatalogService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    async fn user(repo: &InMemoryRepository, name: &str, role: Role) -> User {
        let user = User::new(UserId::generate(), name, name, "", role, None, fixed_now()).unwrap();
        repo.upsert_user(&user).await.unwrap();
        user
    }

    fn draft() -> AssignmentDraft {
        AssignmentDraft {
            title: "Phishing awareness".into(),
            description: "Spot the fake".into(),
            material: Material::text("Check the sender."),
            due_date: None,
        }
    }

    fn quiz(question: &str, order_index: i32) -> QuizDraft {
        QuizDraft {
            question: question.into(),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct: OptionLetter::B,
            points: DEFAULT_POINTS,
            order_index,
        }
    }

    #[tokio::test]
    async fn learners_cannot_author() {
        let repo = InMemoryRepository::new();
        let learner = user(&repo, "l", Role::Learner).await;
        let err = catalog(&repo)
            .create_assignment(learner.id(), draft(), vec![quiz("Q", 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Forbidden));
    }

    #[tokio::test]
    async fn invalid_quiz_stores_nothing() {
        let repo = InMemoryRepository::new();
        let manager = user(&repo, "m", Role::Manager).await;
        let err = catalog(&repo)
            .create_assignment(manager.id(), draft(), vec![quiz("Q", 0), quiz("  ", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Quiz(_)));
        assert!(repo.list_active_assignments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stored_records_carry_cleaned_fields_and_assigned_ids() {
        let repo = InMemoryRepository::new();
        let manager = user(&repo, "m", Role::Manager).await;
        let created = catalog(&repo)
            .create_assignment(
                manager.id(),
                AssignmentDraft {
                    title: "  Phishing awareness  ".into(),
                    ..draft()
                },
                vec![quiz("  Which link is fake? ", 0)],
            )
            .await
            .unwrap();

        let stored = repo.get_assignment(created.overview.id).await.unwrap().unwrap();
        assert_eq!(stored.title(), "Phishing awareness");
        assert_eq!(stored.created_by(), manager.id());
        let quizzes = repo.list_quizzes(stored.id()).await.unwrap();
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].question(), "Which link is fake?");
        assert_eq!(quizzes[0].assignment_id(), stored.id());
    }

    #[tokio::test]
    async fn past_due_date_stores_nothing() {
        let repo = InMemoryRepository::new();
        let manager = user(&repo, "m", Role::Manager).await;
        let err = catalog(&repo)
            .create_assignment(
                manager.id(),
                AssignmentDraft {
                    due_date: Some(fixed_now() - chrono::Duration::days(1)),
                    ..draft()
                },
                vec![quiz("Q", 0)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Assignment(_)));
        assert!(repo.list_active_assignments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn details_reveal_answers_to_managers_only() {
        let repo = InMemoryRepository::new();
        let svc = catalog(&repo);
        let manager = user(&repo, "m", Role::Manager).await;
        let learner = user(&repo, "l", Role::Learner).await;

        let created = svc
            .create_assignment(manager.id(), draft(), vec![quiz("Second", 2), quiz("First", 1)])
            .await
            .unwrap();
        let questions: Vec<&str> = created.quizzes.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(questions, vec!["First", "Second"]);
        assert!(created.quizzes.iter().all(|q| q.correct == Some(OptionLetter::B)));

        let seen = svc
            .assignment_details(created.overview.id, learner.id())
            .await
            .unwrap();
        assert!(seen.quizzes.iter().all(|q| q.correct.is_none()));
        assert!(seen.quizzes.iter().all(|q| q.selected.is_none()));
    }

    #[tokio::test]
    async fn active_assignments_carry_learner_progress_and_selections() {
        let repo = InMemoryRepository::new();
        let svc = catalog(&repo);
        let attempts = AttemptService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        let manager = user(&repo, "m", Role::Admin).await;
        let learner = user(&repo, "l", Role::Learner).await;

        let created = svc
            .create_assignment(manager.id(), draft(), vec![quiz("Only", 0)])
            .await
            .unwrap();
        let assignment_id = created.overview.id;
        let quiz_id = created.quizzes[0].id;

        let before = svc.active_assignments(learner.id()).await.unwrap();
        assert_eq!(before.len(), 1);
        assert!(before[0].progress.is_none());

        attempts.start_attempt(assignment_id, learner.id()).await.unwrap();
        attempts
            .submit_attempt(
                assignment_id,
                learner.id(),
                vec![SubmittedAnswer::new(quiz_id, "b")],
            )
            .await
            .unwrap();

        let after = svc.active_assignments(learner.id()).await.unwrap();
        let progress = after[0].progress.as_ref().unwrap();
        assert_eq!(progress.total_score, DEFAULT_POINTS);
        assert!((progress.score_percentage() - 100.0).abs() < f64::EPSILON);

        let details = svc
            .assignment_details(assignment_id, learner.id())
            .await
            .unwrap();
        assert_eq!(details.quizzes[0].selected.as_deref(), Some("b"));
        assert!(details.quizzes[0].correct.is_none());
    }
}
