//! Attendee-facing presence flow: join, periodic pings and the final submit.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        attendance::{
            AttendanceRecord, AttendanceResponse, JoinRequest, JoinResponse, PingAck,
            PingRequest, SubmitRequest, SubmitResponse,
        },
        location::{Coordinates, LocationSnapshot},
        ping_log::PingLog,
        user::{Actor, Profile},
    },
    repositories::Repositories,
    services::{
        find_lecture,
        geofence::GeofenceCheck,
        notifier::{Notifier, PRESENCE_ANNOUNCED},
        require_student,
        scoring::ScoringPolicy,
    },
    types::LectureId,
};

#[derive(Clone)]
pub struct PresenceService {
    repos: Repositories,
    notifier: Arc<dyn Notifier>,
    policy: ScoringPolicy,
}

impl PresenceService {
    pub fn new(repos: Repositories, notifier: Arc<dyn Notifier>, policy: ScoringPolicy) -> Self {
        Self {
            repos,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    /// Opens the caller's record for an active lecture, or returns the one
    /// they already have untouched.
    pub async fn join(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
        payload: JoinRequest,
    ) -> Result<JoinResponse, AppError> {
        require_student(actor)?;
        let lecture = find_lecture(self.repos.lectures.as_ref(), lecture_id).await?;
        if !lecture.is_active() {
            return Err(AppError::InvalidState("Lecture has already ended".into()));
        }

        let check = GeofenceCheck::evaluate(
            lecture.anchor(),
            Coordinates::new(payload.lat, payload.lon),
            lecture.join_radius_m,
        );
        if let Err(violation) = check.enforce() {
            tracing::info!(
                %lecture_id,
                student_id = %actor.id,
                distance_m = violation.distance_m,
                radius_m = violation.radius_m,
                "Join rejected outside geofence"
            );
            return Err(violation.into());
        }

        let profile = self.remember_roll_id(actor, payload.roll_id.as_deref()).await?;

        let now = Utc::now();
        let (record, created) = self
            .repos
            .attendance
            .insert_if_absent(&AttendanceRecord::joined(lecture_id, actor.id, now))
            .await?;

        if created {
            tracing::info!(
                %lecture_id,
                student_id = %actor.id,
                distance_m = check.distance_m,
                "Attendee joined"
            );
        } else {
            tracing::debug!(%lecture_id, student_id = %actor.id, "Repeated join");
        }

        self.notifier.publish(
            lecture_id,
            PRESENCE_ANNOUNCED,
            json!({
                "student_id": actor.id,
                "username": profile.username,
                "full_name": profile.full_name,
                "roll_id": profile.roll_id,
                "check_score": record.check_score,
                "created": created,
            }),
        );

        Ok(JoinResponse {
            record: record.into(),
            profile,
            created,
        })
    }

    /// Best-effort presence sample. Failures are logged and swallowed.
    pub async fn ping(&self, actor: &Actor, lecture_id: LectureId, payload: PingRequest) -> PingAck {
        if !actor.is_student() {
            tracing::debug!(%lecture_id, user_id = %actor.id, "Ignoring ping from non-attendee");
            return PingAck { ok: true };
        }
        if let Err(err) = self.record_ping(actor, lecture_id, payload).await {
            tracing::warn!(
                %lecture_id,
                student_id = %actor.id,
                code = err.code(),
                error = ?err,
                "Ping dropped"
            );
        }
        PingAck { ok: true }
    }

    async fn record_ping(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
        payload: PingRequest,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let location = Coordinates::new(payload.lat, payload.lon);
        let lecture = self.repos.lectures.find_by_id(lecture_id).await?;
        let check = lecture
            .as_ref()
            .map(|l| GeofenceCheck::evaluate(l.anchor(), location, l.presence_radius_m));
        let valid = check.is_some_and(|c| c.is_inside());

        let entry = PingLog::new(
            lecture_id,
            actor.id,
            payload.lat,
            payload.lon,
            check.map(|c| c.distance_m),
            valid,
            now,
        );
        // The audit trail never holds back scoring.
        if let Err(err) = self.repos.ping_logs.append(&entry).await {
            tracing::warn!(%lecture_id, student_id = %actor.id, error = ?err, "Ping log write failed");
        }

        if !valid {
            tracing::debug!(%lecture_id, student_id = %actor.id, "Ping outside geofence");
            return Ok(());
        }

        match self
            .repos
            .attendance
            .increment_score(lecture_id, actor.id, now)
            .await?
        {
            Some(score) => {
                tracing::debug!(%lecture_id, student_id = %actor.id, score, "Ping counted")
            }
            None => tracing::debug!(%lecture_id, student_id = %actor.id, "Ping without a record"),
        }
        Ok(())
    }

    /// Finalizes the caller's record from the score accumulated so far.
    pub async fn submit(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
        payload: SubmitRequest,
    ) -> Result<SubmitResponse, AppError> {
        require_student(actor)?;
        let lecture = find_lecture(self.repos.lectures.as_ref(), lecture_id).await?;
        if self
            .repos
            .attendance
            .find(lecture_id, actor.id)
            .await?
            .is_none()
        {
            return Err(not_joined());
        }

        let check = GeofenceCheck::evaluate(
            lecture.anchor(),
            Coordinates::new(payload.lat, payload.lon),
            lecture.presence_radius_m,
        )
        .enforce()?;

        let snapshot = LocationSnapshot {
            lat: payload.lat,
            lon: payload.lon,
            accuracy: payload.accuracy.unwrap_or(0.0),
        };
        let record = self
            .repos
            .attendance
            .finalize(
                lecture_id,
                actor.id,
                self.policy.min_required(),
                snapshot,
                Utc::now(),
            )
            .await?
            .ok_or_else(not_joined)?;

        tracing::info!(
            %lecture_id,
            student_id = %actor.id,
            score = record.check_score,
            verdict = record.verdict.as_str(),
            distance_m = check.distance_m,
            "Attendance submitted"
        );

        Ok(SubmitResponse {
            message: self.policy.summary(record.check_score),
            checks_passed: record.check_score,
            check_budget: self.policy.check_budget(),
            min_required: self.policy.min_required(),
            record: record.into(),
        })
    }

    pub async fn my_record(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
    ) -> Result<AttendanceResponse, AppError> {
        find_lecture(self.repos.lectures.as_ref(), lecture_id).await?;
        self.repos
            .attendance
            .find(lecture_id, actor.id)
            .await?
            .map(AttendanceResponse::from)
            .ok_or_else(not_joined)
    }

    pub async fn profile(&self, actor: &Actor) -> Result<Profile, AppError> {
        self.repos
            .profiles
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".into()))
    }

    /// Persists a non-blank roll id onto the profile and returns the profile.
    async fn remember_roll_id(
        &self,
        actor: &Actor,
        roll_id: Option<&str>,
    ) -> Result<Profile, AppError> {
        let roll_id = roll_id.map(str::trim).filter(|r| !r.is_empty());
        let profile = match roll_id {
            Some(roll_id) => self.repos.profiles.set_roll_id(actor.id, roll_id).await?,
            None => self.repos.profiles.find_by_id(actor.id).await?,
        };
        profile.ok_or_else(|| AppError::NotFound("Profile not found".into()))
    }
}

fn not_joined() -> AppError {
    AppError::RecordNotFound("No attendance record; join the lecture first".into())
}
