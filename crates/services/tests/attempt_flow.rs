use std::sync::Arc;

use chrono::Duration;
use lms_core::model::{
    AssignmentId, AttemptStatus, Material, OptionLetter, ProgressStatus, QuizId, Role, User,
    UserId,
};
use lms_core::scoring::SubmittedAnswer;
use lms_core::time::fixed_now;
use services::{
    AppServices, AssignmentDraft, AttemptError, Clock, ErrorKind, QuizDraft, StartOutcome,
};
use storage::repository::{ProgressRepository, Storage, UserDirectory};

struct World {
    storage: Storage,
    services: AppServices,
    manager: User,
    learner: User,
    assignment_id: AssignmentId,
    quizzes: Vec<QuizId>,
}

async fn world(db: &str, points: &[u32]) -> World {
    let storage = Storage::sqlite(&format!("sqlite:file:{db}?mode=memory&cache=shared"))
        .await
        .expect("connect sqlite");
    let services = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));

    let manager = User::new(
        UserId::generate(),
        "mgr",
        "Mia",
        "Manager",
        Role::Manager,
        None,
        fixed_now(),
    )
    .unwrap();
    let learner = User::new(
        UserId::generate(),
        "lea",
        "Lea",
        "Learner",
        Role::Learner,
        Some(manager.id()),
        fixed_now(),
    )
    .unwrap();
    storage.users.upsert_user(&manager).await.unwrap();
    storage.users.upsert_user(&learner).await.unwrap();

    let drafts = points
        .iter()
        .enumerate()
        .map(|(i, p)| QuizDraft {
            question: format!("Question {}", i + 1),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct: OptionLetter::A,
            points: *p,
            order_index: i32::try_from(i).unwrap(),
        })
        .collect();
    let details = services
        .catalog()
        .create_assignment(
            manager.id(),
            AssignmentDraft {
                title: "Security basics".into(),
                description: "Read and answer".into(),
                material: Material::text("Lock your screen."),
                due_date: Some(fixed_now() + Duration::days(3)),
            },
            drafts,
        )
        .await
        .expect("create assignment");

    World {
        storage,
        services,
        manager,
        learner,
        assignment_id: details.overview.id,
        quizzes: details.quizzes.iter().map(|q| q.id).collect(),
    }
}

#[tokio::test]
async fn three_of_five_correct_scores_sixty() {
    let w = world("memdb_flow_sixty", &[20; 5]).await;
    let attempts = w.services.attempts();
    attempts
        .start_attempt(w.assignment_id, w.learner.id())
        .await
        .unwrap();

    let picks = ["A", "a", "B", "A", "D"];
    let answers = w
        .quizzes
        .iter()
        .zip(picks)
        .map(|(id, pick)| SubmittedAnswer::new(*id, pick))
        .collect();
    let view = attempts
        .submit_attempt(w.assignment_id, w.learner.id(), answers)
        .await
        .unwrap();

    assert_eq!(view.total_score, 60);
    assert_eq!(view.max_score, 100);
    assert_eq!(view.status, ProgressStatus::Completed);
    assert_eq!(view.user_full_name, "Lea Learner");
    assert!((view.score_percentage() - 60.0).abs() < f64::EPSILON);
    assert_eq!(view.answers.iter().filter(|a| a.is_correct).count(), 3);
    assert!(view
        .answers
        .iter()
        .all(|a| a.points_earned == if a.is_correct { 20 } else { 0 }));

    let stored = w
        .storage
        .progress
        .get_progress(w.learner.id(), w.assignment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.answers().len(), 5);
    assert_eq!(stored.total_score(), 60);
}

#[tokio::test]
async fn double_submit_keeps_first_score() {
    let w = world("memdb_flow_double_submit", &[20; 2]).await;
    let attempts = w.services.attempts();
    attempts
        .start_attempt(w.assignment_id, w.learner.id())
        .await
        .unwrap();
    attempts
        .submit_attempt(
            w.assignment_id,
            w.learner.id(),
            vec![SubmittedAnswer::new(w.quizzes[0], "A")],
        )
        .await
        .unwrap();

    let err = attempts
        .submit_attempt(
            w.assignment_id,
            w.learner.id(),
            w.quizzes
                .iter()
                .map(|id| SubmittedAnswer::new(*id, "A"))
                .collect(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AttemptError::AlreadyCompleted));
    assert_eq!(err.kind(), ErrorKind::AlreadyCompleted);

    let stored = w
        .storage
        .progress
        .get_progress(w.learner.id(), w.assignment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.total_score(), 20);
    assert_eq!(stored.answers().len(), 1);
}

#[tokio::test]
async fn double_start_keeps_original_start_time() {
    let w = world("memdb_flow_double_start", &[20]).await;
    let first = w
        .services
        .attempts()
        .start_attempt(w.assignment_id, w.learner.id())
        .await
        .unwrap();
    assert!(first.is_started());

    let mut later = Clock::fixed(fixed_now());
    later.advance(Duration::hours(2));
    let second = AppServices::from_storage(&w.storage, later)
        .attempts()
        .start_attempt(w.assignment_id, w.learner.id())
        .await
        .unwrap();

    let StartOutcome::AlreadyStarted(existing) = second else {
        panic!("second start must not create a new attempt");
    };
    assert_eq!(existing.id(), first.progress().id());
    assert_eq!(existing.started_at(), fixed_now());
    assert_eq!(
        w.storage
            .progress
            .list_progress_for_user(w.learner.id())
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn unknown_quiz_ids_are_dropped() {
    let w = world("memdb_flow_unknown_quiz", &[20; 2]).await;
    let attempts = w.services.attempts();
    attempts
        .start_attempt(w.assignment_id, w.learner.id())
        .await
        .unwrap();

    let view = attempts
        .submit_attempt(
            w.assignment_id,
            w.learner.id(),
            vec![
                SubmittedAnswer::new(w.quizzes[0], "A"),
                SubmittedAnswer::new(QuizId::new(987_654), "A"),
                SubmittedAnswer::new(w.quizzes[1], "c"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(view.total_score, 20);
    assert_eq!(view.answers.len(), 2);
    assert!(view.answers.iter().all(|a| w.quizzes.contains(&a.quiz_id)));
}

#[tokio::test]
async fn concurrent_submits_only_one_wins() {
    let w = world("memdb_flow_concurrent_submit", &[20; 3]).await;
    let attempts = w.services.attempts();
    attempts
        .start_attempt(w.assignment_id, w.learner.id())
        .await
        .unwrap();

    let answers: Vec<SubmittedAnswer> = w
        .quizzes
        .iter()
        .map(|id| SubmittedAnswer::new(*id, "A"))
        .collect();
    let spawn = |answers: Vec<SubmittedAnswer>| {
        let attempts = Arc::clone(&attempts);
        let (assignment_id, user_id) = (w.assignment_id, w.learner.id());
        tokio::spawn(async move {
            attempts
                .submit_attempt(assignment_id, user_id, answers)
                .await
        })
    };
    let (a, b) = tokio::join!(spawn(answers.clone()), spawn(answers));
    let results = [a.unwrap(), b.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AttemptError::AlreadyCompleted))));
    assert!(w
        .services
        .attempts()
        .has_completed(w.assignment_id, w.learner.id())
        .await
        .unwrap());
}

#[tokio::test]
async fn two_instances_over_shared_storage_agree_on_one_attempt() {
    let storage = Storage::in_memory();
    let manager = User::new(
        UserId::generate(),
        "mgr",
        "",
        "",
        Role::Admin,
        None,
        fixed_now(),
    )
    .unwrap();
    storage.users.upsert_user(&manager).await.unwrap();

    let one = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));
    let two = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));
    let details = one
        .catalog()
        .create_assignment(
            manager.id(),
            AssignmentDraft {
                title: "Backstop".into(),
                description: "Two processes".into(),
                material: Material::text("-"),
                due_date: None,
            },
            vec![QuizDraft {
                question: "Q".into(),
                options: ["a".into(), "b".into(), "c".into(), "d".into()],
                correct: OptionLetter::D,
                points: 20,
                order_index: 0,
            }],
        )
        .await
        .unwrap();
    let assignment_id = details.overview.id;
    let learner = UserId::generate();

    let one_attempts = one.attempts();
    let two_attempts = two.attempts();
    let starts = tokio::join!(
        one_attempts.start_attempt(assignment_id, learner),
        two_attempts.start_attempt(assignment_id, learner),
    );
    let started = [starts.0.unwrap(), starts.1.unwrap()];
    assert_eq!(started.iter().filter(|s| s.is_started()).count(), 1);

    let answer = vec![SubmittedAnswer::new(details.quizzes[0].id, "d")];
    let submits = tokio::join!(
        one_attempts.submit_attempt(assignment_id, learner, answer.clone()),
        two_attempts.submit_attempt(assignment_id, learner, answer),
    );
    let results = [submits.0, submits.1];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        one.attempts()
            .attempt_status(assignment_id, learner)
            .await
            .unwrap(),
        AttemptStatus::Completed
    );
}

#[tokio::test]
async fn manager_reports_see_direct_reports_only() {
    let w = world("memdb_flow_reports", &[20]).await;
    w.services
        .attempts()
        .start_attempt(w.assignment_id, w.learner.id())
        .await
        .unwrap();

    let reporting = w.services.reporting();
    let team = reporting
        .list_subordinate_progress(w.manager.id())
        .await
        .unwrap();
    assert_eq!(team.len(), 1);
    assert_eq!(team[0].user_name, "lea");

    let by_assignment = reporting
        .assignment_progress_report(w.assignment_id, w.manager.id())
        .await
        .unwrap();
    assert_eq!(by_assignment.len(), 1);

    let outsider = UserId::generate();
    assert!(reporting
        .list_subordinate_progress(outsider)
        .await
        .unwrap()
        .is_empty());
}
