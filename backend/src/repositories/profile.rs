//! Profile lookups against the identity provider's user mirror.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{error::AppError, models::user::Profile, types::UserId};

const SELECT_COLUMNS: &str = "id, username, full_name, email, role, roll_id";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepositoryTrait: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Profile>, AppError>;

    async fn find_many(&self, ids: Vec<UserId>) -> Result<Vec<Profile>, AppError>;

    /// Saves the roll identifier and returns the updated profile.
    async fn set_roll_id(&self, id: UserId, roll_id: &str) -> Result<Option<Profile>, AppError>;

    /// Students whose id, username, email or roll id equals `lookup`
    /// (username and email case-insensitively). At most two rows, enough to
    /// detect ambiguity.
    async fn find_students_by_lookup(&self, lookup: &str) -> Result<Vec<Profile>, AppError>;
}

#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepositoryTrait for ProfileRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Profile>, AppError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_many(&self, ids: Vec<UserId>) -> Result<Vec<Profile>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = ids.into_iter().map(String::from).collect();
        let query = format!("SELECT {} FROM users WHERE id = ANY($1)", SELECT_COLUMNS);
        let rows = sqlx::query_as::<_, Profile>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn set_roll_id(&self, id: UserId, roll_id: &str) -> Result<Option<Profile>, AppError> {
        let query = format!(
            "UPDATE users SET roll_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .bind(roll_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_students_by_lookup(&self, lookup: &str) -> Result<Vec<Profile>, AppError> {
        let query = format!(
            "SELECT {} FROM users WHERE role = 'student' AND (id = $1 \
             OR LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1) OR roll_id = $1) \
             ORDER BY username LIMIT 2",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Profile>(&query)
            .bind(lookup)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
