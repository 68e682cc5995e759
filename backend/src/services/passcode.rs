//! Short-lived codes a presenter reads aloud after a lecture ends so that
//! latecomers can be reconciled one at a time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        attendance::AttendanceResponse,
        lecture::{Lecture, PasscodeResponse},
        user::Actor,
    },
    repositories::Repositories,
    services::{
        find_lecture, find_owned_lecture,
        notifier::{Notifier, ATTENDANCE_UPDATED, PASSCODE_ROTATED},
        require_student,
        scoring::ScoringPolicy,
    },
    types::LectureId,
};

/// Seconds a code stays live after it was generated.
pub const PASSCODE_ROTATION_SECONDS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasscodeRotator {
    window: Duration,
}

impl Default for PasscodeRotator {
    fn default() -> Self {
        Self::new(PASSCODE_ROTATION_SECONDS)
    }
}

impl PasscodeRotator {
    pub fn new(window_seconds: i64) -> Self {
        Self {
            window: Duration::seconds(window_seconds),
        }
    }

    /// True when there is no code yet or the current one is strictly older
    /// than the window.
    pub fn needs_rotation(&self, lecture: &Lecture, now: DateTime<Utc>) -> bool {
        match (&lecture.passcode, lecture.passcode_rotated_at) {
            (Some(_), Some(rotated_at)) => now - rotated_at > self.window,
            _ => true,
        }
    }

    /// Uniform 4-digit code in `1000..=9999`, never equal to `previous`.
    pub fn generate(&self, previous: Option<&str>) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = rng.gen_range(1000..=9999).to_string();
            if previous != Some(code.as_str()) {
                return code;
            }
        }
    }

    /// Whether `code` is the lecture's current, unexpired code.
    pub fn accepts(&self, lecture: &Lecture, code: &str, now: DateTime<Utc>) -> bool {
        lecture.passcode.as_deref() == Some(code.trim()) && !self.needs_rotation(lecture, now)
    }

    pub fn expires_at(&self, rotated_at: DateTime<Utc>) -> DateTime<Utc> {
        rotated_at + self.window
    }
}

#[derive(Clone)]
pub struct PasscodeService {
    repos: Repositories,
    notifier: Arc<dyn Notifier>,
    rotator: PasscodeRotator,
    policy: ScoringPolicy,
}

impl PasscodeService {
    pub fn new(
        repos: Repositories,
        notifier: Arc<dyn Notifier>,
        rotator: PasscodeRotator,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            repos,
            notifier,
            rotator,
            policy,
        }
    }

    pub async fn get_passcode(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
    ) -> Result<PasscodeResponse, AppError> {
        self.get_passcode_at(actor, lecture_id, Utc::now()).await
    }

    /// Returns the live code, rotating it first when it is missing or stale.
    pub async fn get_passcode_at(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
        now: DateTime<Utc>,
    ) -> Result<PasscodeResponse, AppError> {
        let lecture = find_owned_lecture(self.repos.lectures.as_ref(), actor, lecture_id).await?;
        if lecture.is_active() {
            return Err(AppError::InvalidState(
                "Passcodes are available once the lecture has ended".into(),
            ));
        }

        if !self.rotator.needs_rotation(&lecture, now) {
            return self.respond(&lecture);
        }

        let code = self.rotator.generate(lecture.passcode.as_deref());
        let stored = self
            .repos
            .lectures
            .rotate_passcode(
                lecture_id,
                lecture.passcode.clone(),
                lecture.passcode_rotated_at,
                code.clone(),
                now,
            )
            .await?
            .ok_or_else(|| AppError::NotFound("Lecture not found".into()))?;

        // A concurrent request may have rotated first; its code wins.
        if stored.passcode.as_deref() == Some(code.as_str()) {
            tracing::info!(%lecture_id, "Passcode rotated");
            self.notifier.publish(
                lecture_id,
                PASSCODE_ROTATED,
                json!({
                    "rotated_at": now,
                    "expires_at": self.rotator.expires_at(now),
                }),
            );
        }
        self.respond(&stored)
    }

    pub async fn redeem(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
        code: &str,
    ) -> Result<AttendanceResponse, AppError> {
        self.redeem_at(actor, lecture_id, code, Utc::now()).await
    }

    /// Marks the caller present when they present the code currently live.
    pub async fn redeem_at(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<AttendanceResponse, AppError> {
        require_student(actor)?;
        let lecture = find_lecture(self.repos.lectures.as_ref(), lecture_id).await?;
        if lecture.is_active() {
            return Err(AppError::InvalidState(
                "Passcodes are available once the lecture has ended".into(),
            ));
        }
        if !self.rotator.accepts(&lecture, code, now) {
            tracing::warn!(%lecture_id, student_id = %actor.id, "Rejected passcode");
            return Err(AppError::Forbidden("Passcode is invalid or has expired".into()));
        }

        let record = self
            .repos
            .attendance
            .mark_manual_present(lecture_id, actor.id, self.policy.manual_score(), now)
            .await?;

        tracing::info!(%lecture_id, student_id = %actor.id, "Passcode redeemed");
        self.notifier.publish(
            lecture_id,
            ATTENDANCE_UPDATED,
            json!({
                "student_id": actor.id,
                "verdict": record.verdict,
                "method": record.method,
                "via": "passcode",
            }),
        );
        Ok(record.into())
    }

    fn respond(&self, lecture: &Lecture) -> Result<PasscodeResponse, AppError> {
        match (&lecture.passcode, lecture.passcode_rotated_at) {
            (Some(code), Some(rotated_at)) => Ok(PasscodeResponse {
                code: code.clone(),
                rotated_at,
                expires_at: self.rotator.expires_at(rotated_at),
            }),
            _ => Err(AppError::InternalServerError(anyhow::anyhow!(
                "lecture {} has no passcode after rotation",
                lecture.id
            ))),
        }
    }
}
