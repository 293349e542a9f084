use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lms_core::model::{
    Answer, AnswerId, Assignment, AssignmentId, Material, OptionLetter, Progress, ProgressId,
    ProgressStatus, Quiz, QuizId, User, UserId,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert shape for an assignment; the id is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewAssignmentRecord {
    pub title: String,
    pub description: String,
    pub material: Material,
    pub created_by: UserId,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl NewAssignmentRecord {
    fn into_assignment(self, id: AssignmentId) -> Result<Assignment, StorageError> {
        Assignment::from_persisted(
            id,
            self.title,
            self.description,
            self.material,
            self.created_by,
            self.due_date,
            self.created_at,
            self.is_active,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Insert shape for a quiz question; the id is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewQuizRecord {
    pub assignment_id: AssignmentId,
    pub question: String,
    pub options: [String; 4],
    pub correct: OptionLetter,
    pub points: u32,
    pub order_index: i32,
}

/// Insert shape for a freshly started attempt.
#[derive(Debug, Clone, Copy)]
pub struct NewProgressRecord {
    pub user_id: UserId,
    pub assignment_id: AssignmentId,
    pub started_at: DateTime<Utc>,
    pub max_score: u32,
}

/// Insert shape for a scored answer; the owning progress is passed alongside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswerRecord {
    pub quiz_id: QuizId,
    pub selected: String,
    pub is_correct: bool,
    pub points_earned: u32,
    pub answered_at: DateTime<Utc>,
}

impl NewAnswerRecord {
    fn into_answer(self, id: AnswerId, progress_id: ProgressId) -> Answer {
        Answer {
            id,
            quiz_id: self.quiz_id,
            progress_id,
            selected: self.selected,
            is_correct: self.is_correct,
            points_earned: self.points_earned,
            answered_at: self.answered_at,
        }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read access to users and their reporting lines.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Persist or update a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be stored.
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError>;

    /// Fetch a user by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Users whose manager is `manager_id`, ordered by user name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_subordinates(&self, manager_id: UserId) -> Result<Vec<User>, StorageError>;
}

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Insert a new assignment and return its storage-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the assignment cannot be stored.
    async fn insert_assignment(
        &self,
        record: NewAssignmentRecord,
    ) -> Result<AssignmentId, StorageError>;

    /// Fetch an assignment by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StorageError>;

    /// Active assignments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_active_assignments(&self) -> Result<Vec<Assignment>, StorageError>;
}

/// The quiz catalog: questions and their answer keys.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Insert a question and return its storage-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the assignment does not exist.
    async fn insert_quiz(&self, record: NewQuizRecord) -> Result<QuizId, StorageError>;

    /// All questions of an assignment ordered by `order_index`, then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_quizzes(&self, assignment_id: AssignmentId) -> Result<Vec<Quiz>, StorageError>;
}

/// Progress records, always returned with their answers attached.
///
/// Every list is ordered newest-started first.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_progress(
        &self,
        user_id: UserId,
        assignment_id: AssignmentId,
    ) -> Result<Option<Progress>, StorageError>;

    /// Create the single progress record for (user, assignment).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if one already exists.
    async fn create_progress(&self, record: NewProgressRecord) -> Result<Progress, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_progress_for_user(&self, user_id: UserId) -> Result<Vec<Progress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_progress_for_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Progress>, StorageError>;

    /// Progress of every user whose manager is `manager_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_progress_for_subordinates(
        &self,
        manager_id: UserId,
    ) -> Result<Vec<Progress>, StorageError>;
}

/// Atomic completion of an attempt.
#[async_trait]
pub trait SubmissionPersistence: Send + Sync {
    /// Store the completed `progress` and its answers as one unit.
    ///
    /// The stored record must still be in progress; this is a compare-and-set
    /// and nothing is written when it fails.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the stored record is no longer in
    /// progress, `StorageError::NotFound` if it does not exist.
    async fn complete_submission(
        &self,
        progress: &Progress,
        answers: &[NewAnswerRecord],
    ) -> Result<Vec<Answer>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
    assignments: Arc<Mutex<BTreeMap<AssignmentId, Assignment>>>,
    quizzes: Arc<Mutex<BTreeMap<QuizId, Quiz>>>,
    progress: Arc<Mutex<BTreeMap<ProgressId, Progress>>>,
    answers: Arc<Mutex<BTreeMap<AnswerId, Answer>>>,
    next_id: Arc<AtomicU64>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

fn newest_first(rows: &mut [Progress]) {
    rows.sort_by(|a, b| {
        b.started_at()
            .cmp(&a.started_at())
            .then(b.id().cmp(&a.id()))
    });
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn with_answers(
        answers: &BTreeMap<AnswerId, Answer>,
        mut progress: Progress,
    ) -> Progress {
        let owned = answers
            .values()
            .filter(|a| a.progress_id == progress.id())
            .cloned()
            .collect();
        progress.set_answers(owned);
        progress
    }

    fn collect_progress(
        &self,
        keep: impl Fn(&Progress) -> bool,
    ) -> Result<Vec<Progress>, StorageError> {
        let progress = lock(&self.progress)?;
        let answers = lock(&self.answers)?;
        let mut rows: Vec<Progress> = progress
            .values()
            .filter(|p| keep(p))
            .cloned()
            .map(|p| Self::with_answers(&answers, p))
            .collect();
        newest_first(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl UserDirectory for InMemoryRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        lock(&self.users)?.insert(user.id(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(lock(&self.users)?.get(&id).cloned())
    }

    async fn list_subordinates(&self, manager_id: UserId) -> Result<Vec<User>, StorageError> {
        let mut users: Vec<User> = lock(&self.users)?
            .values()
            .filter(|u| u.reports_to(manager_id))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.user_name().cmp(b.user_name()));
        Ok(users)
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryRepository {
    async fn insert_assignment(
        &self,
        record: NewAssignmentRecord,
    ) -> Result<AssignmentId, StorageError> {
        let id = AssignmentId::new(self.next_id());
        let assignment = record.into_assignment(id)?;
        lock(&self.assignments)?.insert(id, assignment);
        Ok(id)
    }

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StorageError> {
        Ok(lock(&self.assignments)?.get(&id).cloned())
    }

    async fn list_active_assignments(&self) -> Result<Vec<Assignment>, StorageError> {
        let mut rows: Vec<Assignment> = lock(&self.assignments)?
            .values()
            .filter(|a| a.is_active())
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then(b.id().cmp(&a.id()))
        });
        Ok(rows)
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_quiz(&self, record: NewQuizRecord) -> Result<QuizId, StorageError> {
        if !lock(&self.assignments)?.contains_key(&record.assignment_id) {
            return Err(StorageError::NotFound);
        }
        let id = QuizId::new(self.next_id());
        let quiz = Quiz::new(
            id,
            record.assignment_id,
            record.question,
            record.options,
            record.correct,
            record.points,
            record.order_index,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        lock(&self.quizzes)?.insert(id, quiz);
        Ok(id)
    }

    async fn list_quizzes(&self, assignment_id: AssignmentId) -> Result<Vec<Quiz>, StorageError> {
        let mut rows: Vec<Quiz> = lock(&self.quizzes)?
            .values()
            .filter(|q| q.assignment_id() == assignment_id)
            .cloned()
            .collect();
        rows.sort_by(Quiz::display_order);
        Ok(rows)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        assignment_id: AssignmentId,
    ) -> Result<Option<Progress>, StorageError> {
        Ok(self
            .collect_progress(|p| p.user_id() == user_id && p.assignment_id() == assignment_id)?
            .into_iter()
            .next())
    }

    async fn create_progress(&self, record: NewProgressRecord) -> Result<Progress, StorageError> {
        let mut guard = lock(&self.progress)?;
        let exists = guard.values().any(|p| {
            p.user_id() == record.user_id && p.assignment_id() == record.assignment_id
        });
        if exists {
            return Err(StorageError::Conflict);
        }
        let progress = Progress::start(
            ProgressId::new(self.next_id()),
            record.user_id,
            record.assignment_id,
            record.max_score,
            record.started_at,
        );
        guard.insert(progress.id(), progress.clone());
        Ok(progress)
    }

    async fn list_progress_for_user(&self, user_id: UserId) -> Result<Vec<Progress>, StorageError> {
        self.collect_progress(|p| p.user_id() == user_id)
    }

    async fn list_progress_for_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Progress>, StorageError> {
        self.collect_progress(|p| p.assignment_id() == assignment_id)
    }

    async fn list_progress_for_subordinates(
        &self,
        manager_id: UserId,
    ) -> Result<Vec<Progress>, StorageError> {
        let reports: HashSet<UserId> = lock(&self.users)?
            .values()
            .filter(|u| u.reports_to(manager_id))
            .map(User::id)
            .collect();
        self.collect_progress(|p| reports.contains(&p.user_id()))
    }
}

#[async_trait]
impl SubmissionPersistence for InMemoryRepository {
    async fn complete_submission(
        &self,
        progress: &Progress,
        answers: &[NewAnswerRecord],
    ) -> Result<Vec<Answer>, StorageError> {
        // Holding the progress lock for the whole call makes the check-and-set atomic.
        let mut stored = lock(&self.progress)?;
        let slot = stored.get_mut(&progress.id()).ok_or(StorageError::NotFound)?;
        if slot.status() != ProgressStatus::InProgress {
            return Err(StorageError::Conflict);
        }

        let mut table = lock(&self.answers)?;
        let mut quiz_ids = HashSet::with_capacity(answers.len());
        if !answers.iter().all(|a| quiz_ids.insert(a.quiz_id)) {
            return Err(StorageError::Conflict);
        }

        let created: Vec<Answer> = answers
            .iter()
            .cloned()
            .map(|record| record.into_answer(AnswerId::new(self.next_id()), progress.id()))
            .collect();
        for answer in &created {
            table.insert(answer.id, answer.clone());
        }

        let mut updated = progress.clone();
        updated.set_answers(Vec::new());
        *slot = updated;
        Ok(created)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserDirectory>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub submissions: Arc<dyn SubmissionPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    pub(crate) fn from_repository<R>(repo: R) -> Self
    where
        R: UserDirectory
            + AssignmentRepository
            + QuizRepository
            + ProgressRepository
            + SubmissionPersistence
            + Clone
            + 'static,
    {
        Self {
            users: Arc::new(repo.clone()),
            assignments: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            submissions: Arc::new(repo),
        }
    }
}
