//! Lecture repository: the session row and its lifecycle transitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::lecture::Lecture,
    repositories::transaction::{begin_transaction, commit_transaction},
    types::{LectureId, UserId},
};

const SELECT_COLUMNS: &str = "id, owner_id, group_id, title, anchor_lat, anchor_lon, \
     join_radius_m, presence_radius_m, state, duration_minutes, passcode, \
     passcode_rotated_at, created_at, ended_at";

/// Result of the `active -> ended` transition.
#[derive(Debug, Clone, PartialEq)]
pub struct EndedLecture {
    pub lecture: Lecture,
    /// Records moved from `incomplete` to `absent`.
    pub swept: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LectureRepositoryTrait: Send + Sync {
    async fn create(&self, lecture: &Lecture) -> Result<Lecture, AppError>;

    async fn find_by_id(&self, id: LectureId) -> Result<Option<Lecture>, AppError>;

    /// Newest first.
    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Lecture>, AppError>;

    /// Applies edits only while the lecture is active. `None` when it is missing or ended.
    async fn update_details(
        &self,
        id: LectureId,
        title: Option<String>,
        duration_minutes: Option<i32>,
    ) -> Result<Option<Lecture>, AppError>;

    /// Ends an active lecture and sweeps its `incomplete` records to `absent`
    /// as one unit. `None` when the lecture is missing or already ended.
    async fn end(&self, id: LectureId, now: DateTime<Utc>)
        -> Result<Option<EndedLecture>, AppError>;

    /// Removes an ended lecture after its ping logs and attendance records.
    /// Returns false when no ended lecture with this id exists.
    async fn delete_ended(&self, id: LectureId) -> Result<bool, AppError>;

    /// Stores `code` only if the stored passcode and its rotation time still
    /// equal `expected` and `expected_rotated_at`. Returns the lecture as
    /// stored after the attempt.
    async fn rotate_passcode(
        &self,
        id: LectureId,
        expected: Option<String>,
        expected_rotated_at: Option<DateTime<Utc>>,
        code: String,
        now: DateTime<Utc>,
    ) -> Result<Option<Lecture>, AppError>;
}

#[derive(Debug, Clone)]
pub struct LectureRepository {
    pool: PgPool,
}

impl LectureRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LectureRepositoryTrait for LectureRepository {
    async fn create(&self, lecture: &Lecture) -> Result<Lecture, AppError> {
        let query = format!(
            "INSERT INTO lectures (id, owner_id, group_id, title, anchor_lat, anchor_lon, \
             join_radius_m, presence_radius_m, state, duration_minutes, passcode, \
             passcode_rotated_at, created_at, ended_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Lecture>(&query)
            .bind(lecture.id)
            .bind(lecture.owner_id)
            .bind(lecture.group_id)
            .bind(&lecture.title)
            .bind(lecture.anchor_lat)
            .bind(lecture.anchor_lon)
            .bind(lecture.join_radius_m)
            .bind(lecture.presence_radius_m)
            .bind(lecture.state.as_str())
            .bind(lecture.duration_minutes)
            .bind(&lecture.passcode)
            .bind(lecture.passcode_rotated_at)
            .bind(lecture.created_at)
            .bind(lecture.ended_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: LectureId) -> Result<Option<Lecture>, AppError> {
        let query = format!("SELECT {} FROM lectures WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, Lecture>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Lecture>, AppError> {
        let query = format!(
            "SELECT {} FROM lectures WHERE owner_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Lecture>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_details(
        &self,
        id: LectureId,
        title: Option<String>,
        duration_minutes: Option<i32>,
    ) -> Result<Option<Lecture>, AppError> {
        let query = format!(
            "UPDATE lectures SET title = COALESCE($2, title), \
             duration_minutes = COALESCE($3, duration_minutes) \
             WHERE id = $1 AND state = 'active' RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Lecture>(&query)
            .bind(id)
            .bind(title)
            .bind(duration_minutes)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn end(
        &self,
        id: LectureId,
        now: DateTime<Utc>,
    ) -> Result<Option<EndedLecture>, AppError> {
        let mut tx = begin_transaction(&self.pool).await?;

        let query = format!(
            "UPDATE lectures SET state = 'ended', ended_at = $2 \
             WHERE id = $1 AND state = 'active' RETURNING {}",
            SELECT_COLUMNS
        );
        let Some(lecture) = sqlx::query_as::<_, Lecture>(&query)
            .bind(id)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?
        else {
            // Dropping the transaction rolls it back.
            return Ok(None);
        };

        let swept = sqlx::query(
            "UPDATE attendance SET verdict = 'absent', updated_at = $2 \
             WHERE lecture_id = $1 AND verdict = 'incomplete'",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        commit_transaction(tx).await?;
        Ok(Some(EndedLecture { lecture, swept }))
    }

    async fn delete_ended(&self, id: LectureId) -> Result<bool, AppError> {
        let mut tx = begin_transaction(&self.pool).await?;

        let ended: Option<String> =
            sqlx::query_scalar("SELECT state FROM lectures WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if ended.as_deref() != Some("ended") {
            return Ok(false);
        }

        sqlx::query("DELETE FROM ping_logs WHERE lecture_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM attendance WHERE lecture_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM lectures WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        commit_transaction(tx).await?;
        Ok(true)
    }

    async fn rotate_passcode(
        &self,
        id: LectureId,
        expected: Option<String>,
        expected_rotated_at: Option<DateTime<Utc>>,
        code: String,
        now: DateTime<Utc>,
    ) -> Result<Option<Lecture>, AppError> {
        let query = format!(
            "UPDATE lectures SET passcode = $4, passcode_rotated_at = $5 \
             WHERE id = $1 AND passcode IS NOT DISTINCT FROM $2 \
             AND passcode_rotated_at IS NOT DISTINCT FROM $3 RETURNING {}",
            SELECT_COLUMNS
        );
        let rotated = sqlx::query_as::<_, Lecture>(&query)
            .bind(id)
            .bind(expected)
            .bind(expected_rotated_at)
            .bind(code)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        if rotated.is_some() {
            return Ok(rotated);
        }
        // Another request rotated first; hand back what it stored.
        self.find_by_id(id).await
    }
}
