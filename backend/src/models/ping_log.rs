use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{LectureId, PingLogId, UserId};

/// Append-only audit row written for every ping, counted or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PingLog {
    pub id: PingLogId,
    pub lecture_id: LectureId,
    pub student_id: UserId,
    pub lat: f64,
    pub lon: f64,
    /// Missing when the lecture could not be found.
    pub distance_m: Option<f64>,
    pub valid: bool,
    pub logged_at: DateTime<Utc>,
}

impl PingLog {
    pub fn new(
        lecture_id: LectureId,
        student_id: UserId,
        lat: f64,
        lon: f64,
        distance_m: Option<f64>,
        valid: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PingLogId::new(),
            lecture_id,
            student_id,
            lat,
            lon,
            distance_m,
            valid,
            logged_at: now,
        }
    }
}
