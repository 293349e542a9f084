use std::fmt;

use lms_core::model::{AssignmentId, QuizId, UserId};
use lms_core::scoring::SubmittedAnswer;

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingFlag { command: &'static str, flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUserId { flag: &'static str, raw: String },
    InvalidAssignmentId { raw: String },
    InvalidAnswer { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "a subcommand is required"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { command, flag } => write!(f, "{command} requires {flag}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUserId { flag, raw } => {
                write!(f, "invalid {flag} value (expected UUID): {raw}")
            }
            ArgsError::InvalidAssignmentId { raw } => {
                write!(f, "invalid --assignment value: {raw}")
            }
            ArgsError::InvalidAnswer { raw } => {
                write!(f, "invalid --answer value (expected <quiz_id>=<letter>): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Migrate,
    Seed,
    Assignments {
        user: UserId,
    },
    Start {
        user: UserId,
        assignment: AssignmentId,
    },
    Submit {
        user: UserId,
        assignment: AssignmentId,
        answers: Vec<SubmittedAnswer>,
    },
    Progress {
        user: UserId,
        viewer: Option<UserId>,
        assignment: Option<AssignmentId>,
    },
    Report {
        manager: UserId,
        assignment: Option<AssignmentId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Overrides `LMS_DB_URL` when given.
    pub db_url: Option<String>,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app migrate     [--db <sqlite_url>]");
    eprintln!("  app seed        [--db <sqlite_url>]");
    eprintln!("  app assignments --user <uuid>");
    eprintln!("  app start       --user <uuid> --assignment <id>");
    eprintln!("  app submit      --user <uuid> --assignment <id> --answer <quiz_id>=<letter>...");
    eprintln!("  app progress    --user <uuid> [--assignment <id> [--viewer <uuid>]]");
    eprintln!("  app report      --manager <uuid> [--assignment <id>]");
    eprintln!();
    eprintln!("Every subcommand accepts --db; it defaults to LMS_DB_URL, then sqlite://lms.sqlite3.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LMS_DB_URL, RUST_LOG (read from .env when present)");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_user(flag: &'static str, raw: String) -> Result<UserId, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidUserId { flag, raw })
}

fn parse_answer(raw: String) -> Result<SubmittedAnswer, ArgsError> {
    let Some((quiz, letter)) = raw.split_once('=') else {
        return Err(ArgsError::InvalidAnswer { raw });
    };
    let Ok(quiz_id) = quiz.trim().parse::<QuizId>() else {
        return Err(ArgsError::InvalidAnswer { raw });
    };
    Ok(SubmittedAnswer::new(quiz_id, letter.trim()))
}

#[derive(Default)]
struct Flags {
    db_url: Option<String>,
    user: Option<UserId>,
    viewer: Option<UserId>,
    manager: Option<UserId>,
    assignment: Option<AssignmentId>,
    answers: Vec<SubmittedAnswer>,
}

impl Args {
    /// Parse `<subcommand> [flags...]`. Returns `Ok(None)` when help was requested.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown subcommands or flags, missing required
    /// flags, and malformed values.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut args = args.into_iter();
        let name = match args.next() {
            None => return Err(ArgsError::MissingCommand),
            Some(first) if first == "--help" || first == "-h" => return Ok(None),
            Some(first) => first,
        };

        let mut flags = Flags::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    flags.db_url = Some(value);
                }
                "--user" => flags.user = Some(parse_user("--user", require_value(&mut args, "--user")?)?),
                "--viewer" => {
                    flags.viewer = Some(parse_user("--viewer", require_value(&mut args, "--viewer")?)?);
                }
                "--manager" => {
                    flags.manager =
                        Some(parse_user("--manager", require_value(&mut args, "--manager")?)?);
                }
                "--assignment" => {
                    let value = require_value(&mut args, "--assignment")?;
                    let parsed = value
                        .trim()
                        .parse::<AssignmentId>()
                        .map_err(|_| ArgsError::InvalidAssignmentId { raw: value.clone() })?;
                    flags.assignment = Some(parsed);
                }
                "--answer" => flags.answers.push(parse_answer(require_value(&mut args, "--answer")?)?),
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = Self::command(&name, &mut flags)?;
        Ok(Some(Self {
            db_url: flags.db_url,
            command,
        }))
    }

    fn command(name: &str, flags: &mut Flags) -> Result<Command, ArgsError> {
        let need_user = |command: &'static str, flags: &Flags| {
            flags.user.ok_or(ArgsError::MissingFlag {
                command,
                flag: "--user",
            })
        };
        let need_assignment = |command: &'static str, flags: &Flags| {
            flags.assignment.ok_or(ArgsError::MissingFlag {
                command,
                flag: "--assignment",
            })
        };

        Ok(match name {
            "migrate" => Command::Migrate,
            "seed" => Command::Seed,
            "assignments" => Command::Assignments {
                user: need_user("assignments", flags)?,
            },
            "start" => Command::Start {
                user: need_user("start", flags)?,
                assignment: need_assignment("start", flags)?,
            },
            "submit" => Command::Submit {
                user: need_user("submit", flags)?,
                assignment: need_assignment("submit", flags)?,
                answers: std::mem::take(&mut flags.answers),
            },
            "progress" => Command::Progress {
                user: need_user("progress", flags)?,
                viewer: flags.viewer,
                assignment: flags.assignment,
            },
            "report" => Command::Report {
                manager: flags.manager.ok_or(ArgsError::MissingFlag {
                    command: "report",
                    flag: "--manager",
                })?,
                assignment: flags.assignment,
            },
            other => return Err(ArgsError::UnknownCommand(other.to_owned())),
        })
    }
}

/// Normalize a user-supplied database location into a `SQLite` URL.
///
/// Bare paths become absolute `sqlite://` URLs and get `?mode=rwc` so the file
/// is created on first use. In-memory URLs pass through untouched.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite:file:") {
        return trimmed.to_owned();
    }

    let url = if trimmed.starts_with("sqlite://") {
        trimmed.to_owned()
    } else {
        let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
        let path = std::path::Path::new(path_str);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| std::path::PathBuf::from("."))
                .join(path)
        };
        format!("sqlite://{}", absolute.display())
    };

    if url.contains('?') {
        url
    } else {
        format!("{url}?mode=rwc")
    }
}
