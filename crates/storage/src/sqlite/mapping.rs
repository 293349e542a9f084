use lms_core::model::{
    Answer, AnswerId, Assignment, AssignmentId, Material, MaterialType, OptionLetter, Progress,
    ProgressId, ProgressStatus, Quiz, QuizId, Role, User, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps a failed write: unique violations become `Conflict`, missing parents `NotFound`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn assignment_id_from_i64(v: i64) -> Result<AssignmentId, StorageError> {
    Ok(AssignmentId::new(i64_to_u64("assignment_id", v)?))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn progress_id_from_i64(v: i64) -> Result<ProgressId, StorageError> {
    Ok(ProgressId::new(i64_to_u64("progress_id", v)?))
}

pub(crate) fn answer_id_from_i64(v: i64) -> Result<AnswerId, StorageError> {
    Ok(AnswerId::new(i64_to_u64("answer_id", v)?))
}

fn user_id_from_str(s: &str) -> Result<UserId, StorageError> {
    s.parse::<UserId>().map_err(ser)
}

pub(crate) fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::Learner => "learner",
        Role::Manager => "manager",
        Role::Admin => "admin",
    }
}

pub(crate) fn parse_role(s: &str) -> Result<Role, StorageError> {
    match s {
        "learner" => Ok(Role::Learner),
        "manager" => Ok(Role::Manager),
        "admin" => Ok(Role::Admin),
        _ => Err(StorageError::Serialization(format!("invalid role: {s}"))),
    }
}

pub(crate) fn material_type_to_str(kind: MaterialType) -> &'static str {
    match kind {
        MaterialType::Text => "text",
        MaterialType::Pdf => "pdf",
        MaterialType::Video => "video",
        MaterialType::Link => "link",
    }
}

pub(crate) fn parse_material_type(s: &str) -> Result<MaterialType, StorageError> {
    match s {
        "text" => Ok(MaterialType::Text),
        "pdf" => Ok(MaterialType::Pdf),
        "video" => Ok(MaterialType::Video),
        "link" => Ok(MaterialType::Link),
        _ => Err(StorageError::Serialization(format!(
            "invalid material type: {s}"
        ))),
    }
}

/// Stored status text. `NotStarted` is never persisted: absence of a row means it.
pub(crate) fn status_to_str(status: ProgressStatus) -> &'static str {
    match status {
        ProgressStatus::InProgress => "in_progress",
        ProgressStatus::Completed => "completed",
        ProgressStatus::Submitted => "submitted",
    }
}

pub(crate) fn parse_status(s: &str) -> Result<ProgressStatus, StorageError> {
    match s {
        "in_progress" => Ok(ProgressStatus::InProgress),
        "completed" => Ok(ProgressStatus::Completed),
        "submitted" => Ok(ProgressStatus::Submitted),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let manager_id = row
        .try_get::<Option<String>, _>("manager_id")
        .map_err(ser)?
        .as_deref()
        .map(user_id_from_str)
        .transpose()?;
    let role: String = row.try_get("role").map_err(ser)?;

    User::new(
        user_id_from_str(&id)?,
        row.try_get::<String, _>("user_name").map_err(ser)?,
        row.try_get::<String, _>("first_name").map_err(ser)?,
        row.try_get::<String, _>("last_name").map_err(ser)?,
        parse_role(&role)?,
        manager_id,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_assignment_row(row: &SqliteRow) -> Result<Assignment, StorageError> {
    let kind: String = row.try_get("material_type").map_err(ser)?;
    let material = Material {
        content: row.try_get("material_content").map_err(ser)?,
        url: row.try_get("material_url").map_err(ser)?,
        kind: parse_material_type(&kind)?,
    };
    let created_by: String = row.try_get("created_by").map_err(ser)?;

    Assignment::from_persisted(
        assignment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        material,
        user_id_from_str(&created_by)?,
        row.try_get("due_date").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get::<i64, _>("is_active").map_err(ser)? != 0,
    )
    .map_err(ser)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let correct: String = row.try_get("correct_answer").map_err(ser)?;
    let options = [
        row.try_get::<String, _>("option_a").map_err(ser)?,
        row.try_get::<String, _>("option_b").map_err(ser)?,
        row.try_get::<String, _>("option_c").map_err(ser)?,
        row.try_get::<String, _>("option_d").map_err(ser)?,
    ];
    let order_index: i64 = row.try_get("order_index").map_err(ser)?;

    Quiz::new(
        quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        assignment_id_from_i64(row.try_get::<i64, _>("assignment_id").map_err(ser)?)?,
        row.try_get::<String, _>("question").map_err(ser)?,
        options,
        correct.parse::<OptionLetter>().map_err(ser)?,
        i64_to_u32("points", row.try_get::<i64, _>("points").map_err(ser)?)?,
        i32::try_from(order_index)
            .map_err(|_| StorageError::Serialization(format!("invalid order_index: {order_index}")))?,
    )
    .map_err(ser)
}

/// Maps a progress row; answers are attached separately.
pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<Progress, StorageError> {
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    let status: String = row.try_get("status").map_err(ser)?;

    Progress::from_persisted(
        progress_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_str(&user_id)?,
        assignment_id_from_i64(row.try_get::<i64, _>("assignment_id").map_err(ser)?)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        i64_to_u32("total_score", row.try_get::<i64, _>("total_score").map_err(ser)?)?,
        i64_to_u32("max_score", row.try_get::<i64, _>("max_score").map_err(ser)?)?,
        parse_status(&status)?,
        Vec::new(),
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<Answer, StorageError> {
    Ok(Answer {
        id: answer_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        quiz_id: quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        progress_id: progress_id_from_i64(row.try_get::<i64, _>("progress_id").map_err(ser)?)?,
        selected: row.try_get("selected_answer").map_err(ser)?,
        is_correct: row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
        points_earned: i64_to_u32(
            "points_earned",
            row.try_get::<i64, _>("points_earned").map_err(ser)?,
        )?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}
