#![forbid(unsafe_code)]

mod args;
mod config;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use lms_core::model::{Material, OptionLetter, Role, User, UserId};
use lms_core::time::Clock;
use services::{AppServices, AssignmentDraft, ProgressView, QuizDraft};
use storage::repository::UserDirectory;

use crate::args::{Args, Command, normalize_sqlite_url, print_usage};
use crate::config::Config;

fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(fmt::layer().with_target(false))
        .init();
}

/// A progress view plus its derived percentage.
fn progress_json(view: &ProgressView) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(view)?;
    if let Value::Object(map) = &mut value {
        map.insert("score_percentage".into(), json!(view.score_percentage()));
    }
    Ok(value)
}

fn progress_list_json(views: &[ProgressView]) -> anyhow::Result<Value> {
    Ok(Value::Array(
        views.iter().map(progress_json).collect::<anyhow::Result<_>>()?,
    ))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Demo directory: one admin, one manager and two learners reporting to them.
fn demo_users(now: DateTime<Utc>) -> Result<(User, User, Vec<User>), lms_core::Error> {
    let admin = User::new(UserId::generate(), "admin", "Ada", "Admin", Role::Admin, None, now)?;
    let manager = User::new(
        UserId::generate(),
        "manager",
        "Morgan",
        "Lead",
        Role::Manager,
        None,
        now,
    )?;
    let mut learners = Vec::new();
    for (user_name, first, last) in [("alice", "Alice", "Archer"), ("bob", "Bob", "Baker")] {
        learners.push(User::new(
            UserId::generate(),
            user_name,
            first,
            last,
            Role::Learner,
            Some(manager.id()),
            now,
        )?);
    }
    Ok((admin, manager, learners))
}

async fn seed(services: &AppServices, clock: Clock) -> anyhow::Result<Value> {
    let users = services.users();
    let (admin, manager, learners) = demo_users(clock.now())?;

    users.upsert_user(&admin).await?;
    users.upsert_user(&manager).await?;
    for learner in &learners {
        users.upsert_user(learner).await?;
    }

    let draft = AssignmentDraft {
        title: "Workplace security basics".into(),
        description: "Read the handbook section, then answer five questions.".into(),
        material: Material::text(
            "Lock your screen when you step away. Report suspicious email to the security desk.",
        ),
        due_date: None,
    };
    let questions = [
        ("What should you do when leaving your desk?", OptionLetter::A),
        ("Where do suspicious emails get reported?", OptionLetter::C),
        ("Which password is strongest?", OptionLetter::D),
        ("Who may borrow your badge?", OptionLetter::B),
        ("When should software updates be installed?", OptionLetter::A),
    ];
    let quizzes = questions
        .into_iter()
        .enumerate()
        .map(|(index, (question, correct))| QuizDraft {
            question: question.into(),
            options: [
                "Option A".into(),
                "Option B".into(),
                "Option C".into(),
                "Option D".into(),
            ],
            correct,
            points: 20,
            order_index: i32::try_from(index).unwrap_or(i32::MAX),
        })
        .collect();

    let assignment = services
        .catalog()
        .create_assignment(manager.id(), draft, quizzes)
        .await?;

    info!(
        assignment = %assignment.overview.id,
        learners = learners.len(),
        "seed data created"
    );

    Ok(json!({
        "admin": admin.id(),
        "manager": manager.id(),
        "learners": learners.iter().map(User::id).collect::<Vec<_>>(),
        "assignment": assignment.overview.id,
        "quizzes": assignment.quizzes.iter().map(|q| q.id).collect::<Vec<_>>(),
    }))
}

async fn execute(command: Command, services: &AppServices, clock: Clock) -> anyhow::Result<()> {
    match command {
        Command::Migrate => {
            info!("migrations applied");
        }
        Command::Seed => print_json(&seed(services, clock).await?)?,
        Command::Assignments { user } => {
            let list = services.catalog().active_assignments(user).await?;
            print_json(&serde_json::to_value(list)?)?;
        }
        Command::Start { user, assignment } => {
            let outcome = services.attempts().start_attempt(assignment, user).await?;
            let progress = outcome.progress();
            print_json(&json!({
                "outcome": if outcome.is_started() { "started" } else { "already_started" },
                "progress_id": progress.id(),
                "started_at": progress.started_at(),
                "max_score": progress.max_score(),
                "status": progress.status(),
            }))?;
        }
        Command::Submit {
            user,
            assignment,
            answers,
        } => {
            let view = services
                .attempts()
                .submit_attempt(assignment, user, answers)
                .await?;
            print_json(&progress_json(&view)?)?;
        }
        Command::Progress {
            user,
            viewer,
            assignment: Some(assignment),
        } => {
            let view = services
                .reporting()
                .progress_details(viewer.unwrap_or(user), user, assignment)
                .await?;
            print_json(&progress_json(&view)?)?;
        }
        Command::Progress {
            user,
            assignment: None,
            ..
        } => {
            let views = services.reporting().list_user_progress(user).await?;
            print_json(&progress_list_json(&views)?)?;
        }
        Command::Report {
            manager,
            assignment,
        } => {
            let reporting = services.reporting();
            let views = match assignment {
                Some(assignment) => reporting.assignment_progress_report(assignment, manager).await?,
                None => reporting.list_subordinate_progress(manager).await?,
            };
            print_json(&progress_list_json(&views)?)?;
        }
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(&config.rust_log);

    let Some(args) = Args::parse(std::env::args().skip(1))? else {
        print_usage();
        return Ok(());
    };

    let db_url = normalize_sqlite_url(args.db_url.as_deref().unwrap_or(&config.database_url));
    let clock = Clock::default();
    let services = AppServices::new_sqlite(&db_url, clock)
        .await
        .with_context(|| format!("opening database {db_url}"))?;
    info!(db = %db_url, "storage ready");

    execute(args.command, &services, clock).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        if err.downcast_ref::<args::ArgsError>().is_some() {
            eprintln!();
            print_usage();
        }
        std::process::exit(2);
    }
}
