use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::parse_lecture_id,
    models::{
        attendance::{
            AttendanceResponse, JoinRequest, JoinResponse, PingAck, PingRequest, SubmitRequest,
            SubmitResponse,
        },
        user::Actor,
    },
    state::AppState,
};

pub async fn join_lecture(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    payload.validate()?;
    Ok(Json(state.presence.join(&actor, lecture_id, payload).await?))
}

/// Always answers `{"ok": true}`; background clients must never see a failure.
pub async fn ping_lecture(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
    payload: Result<Json<PingRequest>, JsonRejection>,
) -> Json<PingAck> {
    let lecture_id = match parse_lecture_id(&lecture_id) {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(user_id = %actor.id, error = ?err, "Ping for malformed lecture id");
            return Json(PingAck { ok: true });
        }
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!(
                %lecture_id,
                user_id = %actor.id,
                error = %rejection,
                "Ping with unreadable body"
            );
            return Json(PingAck { ok: true });
        }
    };
    if let Err(errors) = payload.validate() {
        tracing::warn!(
            %lecture_id,
            user_id = %actor.id,
            error = %errors,
            "Ping with impossible coordinates"
        );
        return Json(PingAck { ok: true });
    }
    Json(state.presence.ping(&actor, lecture_id, payload).await)
}

pub async fn submit_attendance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    payload.validate()?;
    Ok(Json(state.presence.submit(&actor, lecture_id, payload).await?))
}

pub async fn my_attendance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    Ok(Json(state.presence.my_record(&actor, lecture_id).await?))
}
