use lms_core::model::{Assignment, AssignmentId, OptionLetter, Quiz, QuizId};

use super::SqliteRepository;
use super::mapping::{
    assignment_id_from_i64, id_i64, map_assignment_row, map_quiz_row, material_type_to_str,
    quiz_id_from_i64, write_err,
};
use crate::repository::{
    AssignmentRepository, NewAssignmentRecord, NewQuizRecord, QuizRepository, StorageError,
};

#[async_trait::async_trait]
impl AssignmentRepository for SqliteRepository {
    async fn insert_assignment(
        &self,
        record: NewAssignmentRecord,
    ) -> Result<AssignmentId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO assignments (
                title, description, material_content, material_url, material_type,
                created_by, due_date, created_at, is_active
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(record.title)
        .bind(record.description)
        .bind(record.material.content)
        .bind(record.material.url)
        .bind(material_type_to_str(record.material.kind))
        .bind(record.created_by.to_string())
        .bind(record.due_date)
        .bind(record.created_at)
        .bind(i64::from(record.is_active))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        assignment_id_from_i64(res.last_insert_rowid())
    }

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, material_content, material_url, material_type,
                   created_by, due_date, created_at, is_active
            FROM assignments
            WHERE id = ?1
            ",
        )
        .bind(id_i64("assignment_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_assignment_row).transpose()
    }

    async fn list_active_assignments(&self) -> Result<Vec<Assignment>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, material_content, material_url, material_type,
                   created_by, due_date, created_at, is_active
            FROM assignments
            WHERE is_active = 1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_assignment_row).collect()
    }
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_quiz(&self, record: NewQuizRecord) -> Result<QuizId, StorageError> {
        let assignment_id = id_i64("assignment_id", record.assignment_id.value())?;
        let [a, b, c, d] = record.options;

        let res = sqlx::query(
            r"
            INSERT INTO quizzes (
                assignment_id, question, option_a, option_b, option_c, option_d,
                correct_answer, points, order_index
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(assignment_id)
        .bind(record.question)
        .bind(a)
        .bind(b)
        .bind(c)
        .bind(d)
        .bind(OptionLetter::as_str(record.correct))
        .bind(i64::from(record.points))
        .bind(i64::from(record.order_index))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        quiz_id_from_i64(res.last_insert_rowid())
    }

    async fn list_quizzes(&self, assignment_id: AssignmentId) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, assignment_id, question, option_a, option_b, option_c, option_d,
                   correct_answer, points, order_index
            FROM quizzes
            WHERE assignment_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(id_i64("assignment_id", assignment_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_quiz_row).collect()
    }
}
