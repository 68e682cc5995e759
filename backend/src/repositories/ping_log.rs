//! Append-only ping audit trail.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{error::AppError, models::ping_log::PingLog, types::LectureId};

const SELECT_COLUMNS: &str = "id, lecture_id, student_id, lat, lon, distance_m, valid, logged_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PingLogRepositoryTrait: Send + Sync {
    async fn append(&self, entry: &PingLog) -> Result<(), AppError>;

    /// Oldest first.
    async fn list_by_lecture(
        &self,
        lecture_id: LectureId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PingLog>, AppError>;

    async fn count_by_lecture(&self, lecture_id: LectureId) -> Result<i64, AppError>;
}

#[derive(Debug, Clone)]
pub struct PingLogRepository {
    pool: PgPool,
}

impl PingLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PingLogRepositoryTrait for PingLogRepository {
    async fn append(&self, entry: &PingLog) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO ping_logs (id, lecture_id, student_id, lat, lon, distance_m, valid, logged_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.id)
        .bind(entry.lecture_id)
        .bind(entry.student_id)
        .bind(entry.lat)
        .bind(entry.lon)
        .bind(entry.distance_m)
        .bind(entry.valid)
        .bind(entry.logged_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_by_lecture(
        &self,
        lecture_id: LectureId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PingLog>, AppError> {
        let query = format!(
            "SELECT {} FROM ping_logs WHERE lecture_id = $1 \
             ORDER BY logged_at, id LIMIT $2 OFFSET $3",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, PingLog>(&query)
            .bind(lecture_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_by_lecture(&self, lecture_id: LectureId) -> Result<i64, AppError> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM ping_logs WHERE lecture_id = $1")
            .bind(lecture_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
