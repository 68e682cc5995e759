use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    models::{location::Coordinates, UnknownVariant},
    types::{GroupId, LectureId, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// Lifecycle of a lecture. Only `active -> ended` is possible.
pub enum LectureState {
    Active,
    Ended,
}

impl LectureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LectureState::Active => "active",
            LectureState::Ended => "ended",
        }
    }
}

impl FromStr for LectureState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LectureState::Active),
            "ended" => Ok(LectureState::Ended),
            other => Err(UnknownVariant::new("lecture state", other)),
        }
    }
}

impl TryFrom<String> for LectureState {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A presenter's session, anchored at the location it was opened from.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Lecture {
    pub id: LectureId,
    pub owner_id: UserId,
    pub group_id: GroupId,
    pub title: String,
    pub anchor_lat: f64,
    pub anchor_lon: f64,
    /// Lenient radius checked on join.
    pub join_radius_m: f64,
    /// Strict radius checked on ping and submit.
    pub presence_radius_m: f64,
    #[sqlx(try_from = "String")]
    pub state: LectureState,
    pub duration_minutes: i32,
    pub passcode: Option<String>,
    pub passcode_rotated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Lecture {
    pub fn new(
        owner_id: UserId,
        payload: &CreateLectureRequest,
        join_radius_m: f64,
        presence_radius_m: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LectureId::new(),
            owner_id,
            group_id: payload.group_id,
            title: payload.title.trim().to_string(),
            anchor_lat: payload.lat,
            anchor_lon: payload.lon,
            join_radius_m,
            presence_radius_m,
            state: LectureState::Active,
            duration_minutes: payload.duration_minutes,
            passcode: None,
            passcode_rotated_at: None,
            created_at: now,
            ended_at: None,
        }
    }

    pub fn anchor(&self) -> Coordinates {
        Coordinates::new(self.anchor_lat, self.anchor_lon)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, LectureState::Active)
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// Payload for opening a lecture at the presenter's current position.
pub struct CreateLectureRequest {
    pub group_id: GroupId,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
    /// Expected length; informational only.
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i32,
    /// Overrides the configured join radius.
    #[serde(default)]
    #[validate(range(min = 1.0, max = 100000.0))]
    pub join_radius_m: Option<f64>,
    /// Overrides the configured ping/submit radius.
    #[serde(default)]
    #[validate(range(min = 1.0, max = 100000.0))]
    pub presence_radius_m: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
/// Editable fields. Location and radii are fixed at creation.
pub struct UpdateLectureRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LectureResponse {
    pub id: LectureId,
    pub owner_id: UserId,
    pub group_id: GroupId,
    pub title: String,
    pub anchor: Coordinates,
    pub join_radius_m: f64,
    pub presence_radius_m: f64,
    pub state: LectureState,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<Lecture> for LectureResponse {
    fn from(lecture: Lecture) -> Self {
        Self {
            id: lecture.id,
            owner_id: lecture.owner_id,
            group_id: lecture.group_id,
            title: lecture.title,
            anchor: Coordinates::new(lecture.anchor_lat, lecture.anchor_lon),
            join_radius_m: lecture.join_radius_m,
            presence_radius_m: lecture.presence_radius_m,
            state: lecture.state,
            duration_minutes: lecture.duration_minutes,
            created_at: lecture.created_at,
            ended_at: lecture.ended_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PasscodeResponse {
    pub code: String,
    pub rotated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RedeemPasscodeRequest {
    #[validate(length(equal = 4))]
    pub code: String,
}
