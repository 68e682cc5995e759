//! Attendance repository.
//!
//! Every mutation is a single statement so that concurrent pings, submits and
//! the end-of-lecture sweep never interleave inside one record update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{attendance::AttendanceRecord, location::LocationSnapshot},
    types::{LectureId, UserId},
};

const SELECT_COLUMNS: &str = "id, lecture_id, student_id, joined_at, submitted_at, check_score, \
     verdict, method, last_lat, last_lon, last_accuracy, created_at, updated_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttendanceRepositoryTrait: Send + Sync {
    /// Inserts `record` unless one already exists for its lecture and student.
    /// Returns the stored record and whether this call created it.
    async fn insert_if_absent(
        &self,
        record: &AttendanceRecord,
    ) -> Result<(AttendanceRecord, bool), AppError>;

    async fn find(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    /// Adds one passed check and returns the new score, or `None` without a record.
    async fn increment_score(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<i32>, AppError>;

    /// Stamps the submission and derives the verdict from the score at write
    /// time: `present` when it reaches `min_required`, otherwise `incomplete`.
    /// A `present` record is never demoted, and a swept `absent` record only
    /// changes when the score qualifies.
    async fn finalize(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
        min_required: i32,
        snapshot: LocationSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    /// Creates or upgrades the record to a manual `present` with at least `max_score`.
    async fn mark_manual_present(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
        max_score: i32,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AppError>;

    async fn list_by_lecture(&self, lecture_id: LectureId)
        -> Result<Vec<AttendanceRecord>, AppError>;
}

#[derive(Debug, Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepositoryTrait for AttendanceRepository {
    async fn insert_if_absent(
        &self,
        record: &AttendanceRecord,
    ) -> Result<(AttendanceRecord, bool), AppError> {
        let query = format!(
            "INSERT INTO attendance (id, lecture_id, student_id, joined_at, submitted_at, \
             check_score, verdict, method, last_lat, last_lon, last_accuracy, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (lecture_id, student_id) DO NOTHING \
             RETURNING {}",
            SELECT_COLUMNS
        );
        let inserted = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(record.id)
            .bind(record.lecture_id)
            .bind(record.student_id)
            .bind(record.joined_at)
            .bind(record.submitted_at)
            .bind(record.check_score)
            .bind(record.verdict.as_str())
            .bind(record.method.as_str())
            .bind(record.last_lat)
            .bind(record.last_lon)
            .bind(record.last_accuracy)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok((row, true));
        }

        let existing = self
            .find(record.lecture_id, record.student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))?;
        Ok((existing, false))
    }

    async fn find(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM attendance WHERE lecture_id = $1 AND student_id = $2",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(lecture_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn increment_score(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<i32>, AppError> {
        let score = sqlx::query_scalar::<_, i32>(
            "UPDATE attendance SET check_score = check_score + 1, updated_at = $3 \
             WHERE lecture_id = $1 AND student_id = $2 RETURNING check_score",
        )
        .bind(lecture_id)
        .bind(student_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(score)
    }

    async fn finalize(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
        min_required: i32,
        snapshot: LocationSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let query = format!(
            "UPDATE attendance SET submitted_at = $3, updated_at = $3, \
             last_lat = $4, last_lon = $5, last_accuracy = $6, \
             verdict = CASE WHEN check_score >= $7 OR verdict = 'present' THEN 'present' \
                 WHEN verdict = 'absent' THEN 'absent' ELSE 'incomplete' END \
             WHERE lecture_id = $1 AND student_id = $2 RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(lecture_id)
            .bind(student_id)
            .bind(now)
            .bind(snapshot.lat)
            .bind(snapshot.lon)
            .bind(snapshot.accuracy)
            .bind(min_required)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn mark_manual_present(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
        max_score: i32,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AppError> {
        let fresh = AttendanceRecord::manual(lecture_id, student_id, max_score, now);
        let query = format!(
            "INSERT INTO attendance (id, lecture_id, student_id, joined_at, submitted_at, \
             check_score, verdict, method, created_at, updated_at) \
             VALUES ($1, $2, $3, NULL, $4, $5, 'present', 'manual', $4, $4) \
             ON CONFLICT (lecture_id, student_id) DO UPDATE SET \
             method = 'manual', verdict = 'present', \
             check_score = GREATEST(attendance.check_score, EXCLUDED.check_score), \
             submitted_at = EXCLUDED.submitted_at, updated_at = EXCLUDED.updated_at \
             RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(fresh.id)
            .bind(lecture_id)
            .bind(student_id)
            .bind(now)
            .bind(fresh.check_score)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_by_lecture(
        &self,
        lecture_id: LectureId,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM attendance WHERE lecture_id = $1 ORDER BY created_at",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(lecture_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
