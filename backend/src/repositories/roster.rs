//! Roster provider: which attendees belong to a lecture's group.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{error::AppError, models::user::Profile, types::GroupId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn students_in_group(&self, group_id: GroupId) -> Result<Vec<Profile>, AppError>;
}

#[derive(Debug, Clone)]
pub struct PgRosterProvider {
    pool: PgPool,
}

impl PgRosterProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterProvider for PgRosterProvider {
    async fn students_in_group(&self, group_id: GroupId) -> Result<Vec<Profile>, AppError> {
        let rows = sqlx::query_as::<_, Profile>(
            "SELECT u.id, u.username, u.full_name, u.email, u.role, u.roll_id \
             FROM group_members gm JOIN users u ON u.id = gm.user_id \
             WHERE gm.group_id = $1 AND u.role = 'student' \
             ORDER BY u.full_name, u.username",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
