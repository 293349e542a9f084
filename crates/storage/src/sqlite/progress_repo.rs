use std::collections::HashMap;

use lms_core::model::{Answer, AssignmentId, Progress, ProgressId, ProgressStatus, UserId};
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    answer_id_from_i64, id_i64, map_answer_row, map_progress_row, progress_id_from_i64,
    status_to_str, write_err,
};
use crate::repository::{
    NewAnswerRecord, NewProgressRecord, ProgressRepository, StorageError,
    SubmissionPersistence,
};

impl SqliteRepository {
    /// Map progress rows and attach their answers with a single extra query.
    async fn with_answers(&self, rows: Vec<SqliteRow>) -> Result<Vec<Progress>, StorageError> {
        let mut progress = rows
            .iter()
            .map(map_progress_row)
            .collect::<Result<Vec<_>, _>>()?;
        if progress.is_empty() {
            return Ok(progress);
        }

        let placeholders = (1..=progress.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, progress_id, quiz_id, selected_answer, is_correct, points_earned, answered_at
             FROM quiz_answers
             WHERE progress_id IN ({placeholders})
             ORDER BY id ASC"
        );
        let mut query = sqlx::query(&sql);
        for p in &progress {
            query = query.bind(id_i64("progress_id", p.id().value())?);
        }
        let answer_rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut by_progress: HashMap<ProgressId, Vec<Answer>> = HashMap::new();
        for row in &answer_rows {
            let answer = map_answer_row(row)?;
            by_progress.entry(answer.progress_id).or_default().push(answer);
        }
        for p in &mut progress {
            p.set_answers(by_progress.remove(&p.id()).unwrap_or_default());
        }
        Ok(progress)
    }
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        assignment_id: AssignmentId,
    ) -> Result<Option<Progress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, assignment_id, started_at, completed_at,
                   total_score, max_score, status
            FROM assignment_progress
            WHERE user_id = ?1 AND assignment_id = ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(id_i64("assignment_id", assignment_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(self
            .with_answers(row.into_iter().collect())
            .await?
            .into_iter()
            .next())
    }

    async fn create_progress(&self, record: NewProgressRecord) -> Result<Progress, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO assignment_progress (
                user_id, assignment_id, started_at, completed_at, total_score, max_score, status
            )
            VALUES (?1, ?2, ?3, NULL, 0, ?4, ?5)
            ",
        )
        .bind(record.user_id.to_string())
        .bind(id_i64("assignment_id", record.assignment_id.value())?)
        .bind(record.started_at)
        .bind(i64::from(record.max_score))
        .bind(status_to_str(ProgressStatus::InProgress))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(Progress::start(
            progress_id_from_i64(res.last_insert_rowid())?,
            record.user_id,
            record.assignment_id,
            record.max_score,
            record.started_at,
        ))
    }

    async fn list_progress_for_user(&self, user_id: UserId) -> Result<Vec<Progress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, assignment_id, started_at, completed_at,
                   total_score, max_score, status
            FROM assignment_progress
            WHERE user_id = ?1
            ORDER BY started_at DESC, id DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.with_answers(rows).await
    }

    async fn list_progress_for_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Progress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, assignment_id, started_at, completed_at,
                   total_score, max_score, status
            FROM assignment_progress
            WHERE assignment_id = ?1
            ORDER BY started_at DESC, id DESC
            ",
        )
        .bind(id_i64("assignment_id", assignment_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.with_answers(rows).await
    }

    async fn list_progress_for_subordinates(
        &self,
        manager_id: UserId,
    ) -> Result<Vec<Progress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT p.id, p.user_id, p.assignment_id, p.started_at, p.completed_at,
                   p.total_score, p.max_score, p.status
            FROM assignment_progress p
            JOIN users u ON u.id = p.user_id
            WHERE u.manager_id = ?1
            ORDER BY p.started_at DESC, p.id DESC
            ",
        )
        .bind(manager_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.with_answers(rows).await
    }
}

#[async_trait::async_trait]
impl SubmissionPersistence for SqliteRepository {
    async fn complete_submission(
        &self,
        progress: &Progress,
        answers: &[NewAnswerRecord],
    ) -> Result<Vec<Answer>, StorageError> {
        let progress_id = id_i64("progress_id", progress.id().value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Only an in-progress row may be completed; a concurrent submit loses here.
        let res = sqlx::query(
            r"
            UPDATE assignment_progress
            SET total_score = ?1, completed_at = ?2, status = ?3
            WHERE id = ?4 AND status = 'in_progress'
            ",
        )
        .bind(i64::from(progress.total_score()))
        .bind(progress.completed_at())
        .bind(status_to_str(progress.status()))
        .bind(progress_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM assignment_progress WHERE id = ?1")
                .bind(progress_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            return Err(if exists.is_some() {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }

        let mut created = Vec::with_capacity(answers.len());
        for record in answers {
            let res = sqlx::query(
                r"
                INSERT INTO quiz_answers (
                    progress_id, quiz_id, selected_answer, is_correct, points_earned, answered_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(progress_id)
            .bind(id_i64("quiz_id", record.quiz_id.value())?)
            .bind(record.selected.clone())
            .bind(i64::from(record.is_correct))
            .bind(i64::from(record.points_earned))
            .bind(record.answered_at)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

            created.push(Answer {
                id: answer_id_from_i64(res.last_insert_rowid())?,
                quiz_id: record.quiz_id,
                progress_id: progress.id(),
                selected: record.selected.clone(),
                is_correct: record.is_correct,
                points_earned: record.points_earned,
                answered_at: record.answered_at,
            });
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(created)
    }
}
