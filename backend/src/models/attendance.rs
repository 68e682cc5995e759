use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    models::{
        lecture::LectureResponse, location::LocationSnapshot, user::Profile, UnknownVariant,
    },
    types::{AttendanceId, LectureId, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Incomplete,
    Present,
    Absent,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Incomplete => "incomplete",
            Verdict::Present => "present",
            Verdict::Absent => "absent",
        }
    }
}

impl FromStr for Verdict {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incomplete" => Ok(Verdict::Incomplete),
            "present" => Ok(Verdict::Present),
            "absent" => Ok(Verdict::Absent),
            other => Err(UnknownVariant::new("verdict", other)),
        }
    }
}

impl TryFrom<String> for Verdict {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// How a record reached its verdict.
pub enum AttendanceMethod {
    /// Location checks.
    Auto,
    /// Presenter override.
    Manual,
}

impl AttendanceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceMethod::Auto => "auto",
            AttendanceMethod::Manual => "manual",
        }
    }
}

impl FromStr for AttendanceMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(AttendanceMethod::Auto),
            "manual" => Ok(AttendanceMethod::Manual),
            other => Err(UnknownVariant::new("attendance method", other)),
        }
    }
}

impl TryFrom<String> for AttendanceMethod {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One attendee's record for one lecture. Unique on `(lecture_id, student_id)`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub lecture_id: LectureId,
    pub student_id: UserId,
    pub joined_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub check_score: i32,
    #[sqlx(try_from = "String")]
    pub verdict: Verdict,
    #[sqlx(try_from = "String")]
    pub method: AttendanceMethod,
    pub last_lat: Option<f64>,
    pub last_lon: Option<f64>,
    pub last_accuracy: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Record created by a successful join; the join counts as the first check.
    pub fn joined(lecture_id: LectureId, student_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: AttendanceId::new(),
            lecture_id,
            student_id,
            joined_at: Some(now),
            submitted_at: None,
            check_score: 1,
            verdict: Verdict::Incomplete,
            method: AttendanceMethod::Auto,
            last_lat: None,
            last_lon: None,
            last_accuracy: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record created by a presenter override for someone who never joined.
    pub fn manual(
        lecture_id: LectureId,
        student_id: UserId,
        max_score: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AttendanceId::new(),
            lecture_id,
            student_id,
            joined_at: None,
            submitted_at: Some(now),
            check_score: max_score,
            verdict: Verdict::Present,
            method: AttendanceMethod::Manual,
            last_lat: None,
            last_lon: None,
            last_accuracy: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn last_location(&self) -> Option<LocationSnapshot> {
        match (self.last_lat, self.last_lon) {
            (Some(lat), Some(lon)) => Some(LocationSnapshot {
                lat,
                lon,
                accuracy: self.last_accuracy.unwrap_or(0.0),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceResponse {
    pub id: AttendanceId,
    pub lecture_id: LectureId,
    pub student_id: UserId,
    pub joined_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub check_score: i32,
    pub verdict: Verdict,
    pub method: AttendanceMethod,
    pub last_location: Option<LocationSnapshot>,
}

impl From<AttendanceRecord> for AttendanceResponse {
    fn from(record: AttendanceRecord) -> Self {
        let last_location = record.last_location();
        Self {
            id: record.id,
            lecture_id: record.lecture_id,
            student_id: record.student_id,
            joined_at: record.joined_at,
            submitted_at: record.submitted_at,
            check_score: record.check_score,
            verdict: record.verdict,
            method: record.method,
            last_location,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct JoinRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
    /// Saved to the attendee's profile for future joins when non-blank.
    #[serde(default)]
    #[validate(length(max = 64))]
    pub roll_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PingRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// Presenter override. `lookup` matches a user id, username, email or roll id.
pub struct ManualAddRequest {
    #[validate(length(min = 1, max = 100))]
    pub lookup: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinResponse {
    pub record: AttendanceResponse,
    pub profile: Profile,
    /// False when the attendee had already joined and the record was returned as-is.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    pub record: AttendanceResponse,
    /// Human-readable score summary, e.g. "passed 3/7 checks, need 4".
    pub message: String,
    pub checks_passed: i32,
    pub check_budget: i32,
    pub min_required: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PingAck {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
/// One line of the presenter's roster view. Absentees without a record are synthesized.
pub struct AttendanceViewEntry {
    pub student_id: UserId,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub roll_id: Option<String>,
    /// False for attendees who joined but are not in the lecture's group.
    pub in_roster: bool,
    pub verdict: Verdict,
    pub method: Option<AttendanceMethod>,
    pub check_score: i32,
    pub joined_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub incomplete: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceView {
    pub lecture: LectureResponse,
    pub summary: AttendanceSummary,
    pub entries: Vec<AttendanceViewEntry>,
}
