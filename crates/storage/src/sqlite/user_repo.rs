use lms_core::model::{User, UserId};

use super::SqliteRepository;
use super::mapping::{map_user_row, role_to_str, write_err};
use crate::repository::{StorageError, UserDirectory};

#[async_trait::async_trait]
impl UserDirectory for SqliteRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (id, user_name, first_name, last_name, role, manager_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                user_name = excluded.user_name,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                role = excluded.role,
                manager_id = excluded.manager_id
            ",
        )
        .bind(user.id().to_string())
        .bind(user.user_name().to_owned())
        .bind(user.first_name().to_owned())
        .bind(user.last_name().to_owned())
        .bind(role_to_str(user.role()))
        .bind(user.manager_id().map(|m| m.to_string()))
        .bind(user.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_name, first_name, last_name, role, manager_id, created_at
            FROM users
            WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn list_subordinates(&self, manager_id: UserId) -> Result<Vec<User>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_name, first_name, last_name, role, manager_id, created_at
            FROM users
            WHERE manager_id = ?1
            ORDER BY user_name ASC
            ",
        )
        .bind(manager_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_user_row).collect()
    }
}
