use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lms_core::model::{AssignmentId, Material, OptionLetter, Progress, ProgressStatus, QuizId, UserId};
use lms_core::scoring::SubmittedAnswer;
use lms_core::time::{fixed_clock, fixed_now};
use services::{AttemptError, AttemptService};
use storage::repository::{
    AssignmentRepository, InMemoryRepository, NewAssignmentRecord, NewProgressRecord,
    NewQuizRecord, ProgressRepository, QuizRepository, StorageError,
};

/// Progress reads that lag behind another writer.
///
/// `hide_next` makes the next lookup miss an existing row once; `stale` pins
/// every lookup to an old copy. Writes always reach the real store.
struct LaggingReads {
    inner: InMemoryRepository,
    hide_next: AtomicBool,
    stale: Mutex<Option<Progress>>,
}

impl LaggingReads {
    fn new(inner: InMemoryRepository) -> Self {
        Self {
            inner,
            hide_next: AtomicBool::new(false),
            stale: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ProgressRepository for LaggingReads {
    async fn get_progress(
        &self,
        user_id: UserId,
        assignment_id: AssignmentId,
    ) -> Result<Option<Progress>, StorageError> {
        if self.hide_next.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        if let Some(stale) = self.stale.lock().unwrap().clone() {
            return Ok(Some(stale));
        }
        self.inner.get_progress(user_id, assignment_id).await
    }

    async fn create_progress(&self, record: NewProgressRecord) -> Result<Progress, StorageError> {
        self.inner.create_progress(record).await
    }

    async fn list_progress_for_user(&self, user_id: UserId) -> Result<Vec<Progress>, StorageError> {
        self.inner.list_progress_for_user(user_id).await
    }

    async fn list_progress_for_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Progress>, StorageError> {
        self.inner.list_progress_for_assignment(assignment_id).await
    }

    async fn list_progress_for_subordinates(
        &self,
        manager_id: UserId,
    ) -> Result<Vec<Progress>, StorageError> {
        self.inner.list_progress_for_subordinates(manager_id).await
    }
}

struct Setup {
    repo: InMemoryRepository,
    reads: Arc<LaggingReads>,
    attempts: AttemptService,
    assignment_id: AssignmentId,
    quiz_id: QuizId,
}

async fn setup() -> Setup {
    let repo = InMemoryRepository::new();
    let assignment_id = repo
        .insert_assignment(NewAssignmentRecord {
            title: "Clean desk".into(),
            description: "One question".into(),
            material: Material::text("Lock the drawer."),
            created_by: UserId::generate(),
            due_date: None,
            created_at: fixed_now(),
            is_active: true,
        })
        .await
        .unwrap();
    let quiz_id = repo
        .insert_quiz(NewQuizRecord {
            assignment_id,
            question: "What goes in the drawer?".into(),
            options: ["Papers".into(), "Lunch".into(), "Plants".into(), "Nothing".into()],
            correct: OptionLetter::A,
            points: 20,
            order_index: 0,
        })
        .await
        .unwrap();

    let reads = Arc::new(LaggingReads::new(repo.clone()));
    let attempts = AttemptService::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::clone(&reads) as Arc<dyn ProgressRepository>,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );

    Setup {
        repo,
        reads,
        attempts,
        assignment_id,
        quiz_id,
    }
}

#[tokio::test]
async fn start_missed_by_read_resolves_through_unique_constraint() {
    let s = setup().await;
    let user = UserId::generate();
    let existing = s
        .repo
        .create_progress(NewProgressRecord {
            user_id: user,
            assignment_id: s.assignment_id,
            started_at: fixed_now(),
            max_score: 20,
        })
        .await
        .unwrap();

    s.reads.hide_next.store(true, Ordering::SeqCst);
    let outcome = s.attempts.start_attempt(s.assignment_id, user).await.unwrap();

    assert!(!outcome.is_started());
    assert_eq!(outcome.progress().id(), existing.id());
    assert_eq!(
        s.repo.list_progress_for_user(user).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn submit_on_stale_read_is_rejected_by_compare_and_set() {
    let s = setup().await;
    let user = UserId::generate();
    s.attempts.start_attempt(s.assignment_id, user).await.unwrap();
    let in_progress = s
        .repo
        .get_progress(user, s.assignment_id)
        .await
        .unwrap()
        .unwrap();

    let first = s
        .attempts
        .submit_attempt(s.assignment_id, user, vec![SubmittedAnswer::new(s.quiz_id, "A")])
        .await
        .unwrap();
    assert_eq!(first.total_score, 20);

    *s.reads.stale.lock().unwrap() = Some(in_progress);
    let err = s
        .attempts
        .submit_attempt(s.assignment_id, user, vec![SubmittedAnswer::new(s.quiz_id, "B")])
        .await
        .unwrap_err();
    assert!(matches!(err, AttemptError::AlreadyCompleted));

    let stored = s
        .repo
        .get_progress(user, s.assignment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status(), ProgressStatus::Completed);
    assert_eq!(stored.total_score(), 20);
    assert_eq!(stored.answers().len(), 1);
    assert_eq!(stored.answers()[0].selected, "A");
}
