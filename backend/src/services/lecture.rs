//! Lecture lifecycle: `active -> ended`, with edits only while active and
//! deletion only once ended.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        lecture::{CreateLectureRequest, Lecture, LectureResponse, UpdateLectureRequest},
        user::Actor,
    },
    repositories::Repositories,
    services::{
        find_lecture, find_owned_lecture,
        notifier::{Notifier, SESSION_ENDED},
        require_teacher,
    },
    types::LectureId,
};

#[derive(Clone)]
pub struct LectureService {
    repos: Repositories,
    notifier: Arc<dyn Notifier>,
    join_radius_m: f64,
    presence_radius_m: f64,
}

impl LectureService {
    pub fn new(
        repos: Repositories,
        notifier: Arc<dyn Notifier>,
        join_radius_m: f64,
        presence_radius_m: f64,
    ) -> Self {
        Self {
            repos,
            notifier,
            join_radius_m,
            presence_radius_m,
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        payload: CreateLectureRequest,
    ) -> Result<LectureResponse, AppError> {
        require_teacher(actor)?;
        let lecture = Lecture::new(
            actor.id,
            &payload,
            payload.join_radius_m.unwrap_or(self.join_radius_m),
            payload.presence_radius_m.unwrap_or(self.presence_radius_m),
            Utc::now(),
        );
        let lecture = self.repos.lectures.create(&lecture).await?;
        tracing::info!(
            lecture_id = %lecture.id,
            owner_id = %actor.id,
            join_radius_m = lecture.join_radius_m,
            presence_radius_m = lecture.presence_radius_m,
            "Lecture opened"
        );
        Ok(lecture.into())
    }

    pub async fn get(&self, lecture_id: LectureId) -> Result<LectureResponse, AppError> {
        Ok(find_lecture(self.repos.lectures.as_ref(), lecture_id)
            .await?
            .into())
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<LectureResponse>, AppError> {
        require_teacher(actor)?;
        let lectures = self.repos.lectures.list_by_owner(actor.id).await?;
        Ok(lectures.into_iter().map(LectureResponse::from).collect())
    }

    pub async fn update(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
        payload: UpdateLectureRequest,
    ) -> Result<LectureResponse, AppError> {
        let lecture = find_owned_lecture(self.repos.lectures.as_ref(), actor, lecture_id).await?;
        if !lecture.is_active() {
            return Err(ended_error("edited"));
        }
        let title = payload
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let updated = self
            .repos
            .lectures
            .update_details(lecture_id, title, payload.duration_minutes)
            .await?
            // Ended between the read and the write.
            .ok_or_else(|| ended_error("edited"))?;
        Ok(updated.into())
    }

    /// Ends the lecture and sweeps every unfinished record to `absent`.
    pub async fn end(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
    ) -> Result<LectureResponse, AppError> {
        let lecture = find_owned_lecture(self.repos.lectures.as_ref(), actor, lecture_id).await?;
        if !lecture.is_active() {
            return Err(AppError::InvalidState("Lecture has already ended".into()));
        }

        let ended = self
            .repos
            .lectures
            .end(lecture_id, Utc::now())
            .await?
            .ok_or_else(|| AppError::InvalidState("Lecture has already ended".into()))?;

        tracing::info!(%lecture_id, swept = ended.swept, "Lecture ended");
        self.notifier.publish(
            lecture_id,
            SESSION_ENDED,
            json!({
                "ended_at": ended.lecture.ended_at,
                "swept": ended.swept,
            }),
        );
        Ok(ended.lecture.into())
    }

    pub async fn delete(&self, actor: &Actor, lecture_id: LectureId) -> Result<(), AppError> {
        let lecture = find_owned_lecture(self.repos.lectures.as_ref(), actor, lecture_id).await?;
        if lecture.is_active() {
            return Err(AppError::InvalidState(
                "End the lecture before deleting it".into(),
            ));
        }
        if !self.repos.lectures.delete_ended(lecture_id).await? {
            return Err(AppError::NotFound("Lecture not found".into()));
        }
        tracing::info!(%lecture_id, "Lecture deleted");
        Ok(())
    }
}

fn ended_error(action: &str) -> AppError {
    AppError::InvalidState(format!("Lecture has ended and can no longer be {}", action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{lecture::LectureState, user::UserRole},
        repositories::{
            attendance::MockAttendanceRepositoryTrait,
            lecture::{EndedLecture, MockLectureRepositoryTrait},
            ping_log::MockPingLogRepositoryTrait,
            profile::MockProfileRepositoryTrait,
            roster::MockRosterProvider,
        },
        services::notifier::MockNotifier,
        types::{GroupId, UserId},
    };

    fn service(lectures: MockLectureRepositoryTrait, notifier: MockNotifier) -> LectureService {
        LectureService::new(
            Repositories {
                lectures: Arc::new(lectures),
                attendance: Arc::new(MockAttendanceRepositoryTrait::new()),
                ping_logs: Arc::new(MockPingLogRepositoryTrait::new()),
                profiles: Arc::new(MockProfileRepositoryTrait::new()),
                roster: Arc::new(MockRosterProvider::new()),
            },
            Arc::new(notifier),
            5000.0,
            200.0,
        )
    }

    fn lecture_owned_by(owner: UserId) -> Lecture {
        let payload = CreateLectureRequest {
            group_id: GroupId::new(),
            title: "Databases".into(),
            lat: 10.0,
            lon: 20.0,
            duration_minutes: 90,
            join_radius_m: None,
            presence_radius_m: Some(150.0),
        };
        Lecture::new(owner, &payload, 5000.0, 150.0, Utc::now())
    }

    #[tokio::test]
    async fn end_publishes_session_ended_with_sweep_count() {
        let owner = Actor::new(UserId::new(), UserRole::Teacher);
        let lecture = lecture_owned_by(owner.id);
        let lecture_id = lecture.id;
        let found = lecture.clone();

        let mut lectures = MockLectureRepositoryTrait::new();
        lectures
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        lectures.expect_end().times(1).returning(move |_, now| {
            let mut ended = lecture.clone();
            ended.state = LectureState::Ended;
            ended.ended_at = Some(now);
            Ok(Some(EndedLecture {
                lecture: ended,
                swept: 3,
            }))
        });
        let mut notifier = MockNotifier::new();
        notifier
            .expect_publish()
            .withf(move |id, event, payload| {
                *id == lecture_id && event == SESSION_ENDED && payload["swept"] == 3
            })
            .times(1)
            .return_const(());

        let response = service(lectures, notifier)
            .end(&owner, lecture_id)
            .await
            .unwrap();
        assert_eq!(response.state, LectureState::Ended);
        assert!(response.ended_at.is_some());
    }

    #[tokio::test]
    async fn end_by_non_owner_is_forbidden() {
        let lecture = lecture_owned_by(UserId::new());
        let lecture_id = lecture.id;
        let mut lectures = MockLectureRepositoryTrait::new();
        lectures
            .expect_find_by_id()
            .returning(move |_| Ok(Some(lecture.clone())));
        lectures.expect_end().never();

        let intruder = Actor::new(UserId::new(), UserRole::Teacher);
        let err = service(lectures, MockNotifier::new())
            .end(&intruder, lecture_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn lost_end_race_reports_invalid_state() {
        let owner = Actor::new(UserId::new(), UserRole::Teacher);
        let lecture = lecture_owned_by(owner.id);
        let lecture_id = lecture.id;
        let mut lectures = MockLectureRepositoryTrait::new();
        lectures
            .expect_find_by_id()
            .returning(move |_| Ok(Some(lecture.clone())));
        lectures.expect_end().returning(|_, _| Ok(None));

        let mut notifier = MockNotifier::new();
        notifier.expect_publish().never();
        let err = service(lectures, notifier)
            .end(&owner, lecture_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn create_uses_configured_radius_unless_overridden() {
        let owner = Actor::new(UserId::new(), UserRole::Teacher);
        let mut lectures = MockLectureRepositoryTrait::new();
        lectures
            .expect_create()
            .returning(|lecture| Ok(lecture.clone()));

        let payload = CreateLectureRequest {
            group_id: GroupId::new(),
            title: "Optics".into(),
            lat: 0.0,
            lon: 0.0,
            duration_minutes: 30,
            join_radius_m: None,
            presence_radius_m: Some(80.0),
        };
        let response = service(lectures, MockNotifier::new())
            .create(&owner, payload)
            .await
            .unwrap();
        assert_eq!(response.join_radius_m, 5000.0);
        assert_eq!(response.presence_radius_m, 80.0);
        assert_eq!(response.state, LectureState::Active);
    }
}
