use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::parse_lecture_id,
    models::{
        lecture::{CreateLectureRequest, LectureResponse, UpdateLectureRequest},
        user::Actor,
    },
    state::AppState,
};

pub async fn create_lecture(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateLectureRequest>,
) -> Result<(StatusCode, Json<LectureResponse>), AppError> {
    payload.validate()?;
    let lecture = state.lectures.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(lecture)))
}

pub async fn list_lectures(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<LectureResponse>>, AppError> {
    Ok(Json(state.lectures.list(&actor).await?))
}

pub async fn get_lecture(
    State(state): State<AppState>,
    Path(lecture_id): Path<String>,
) -> Result<Json<LectureResponse>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    Ok(Json(state.lectures.get(lecture_id).await?))
}

pub async fn update_lecture(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
    Json(payload): Json<UpdateLectureRequest>,
) -> Result<Json<LectureResponse>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    payload.validate()?;
    Ok(Json(state.lectures.update(&actor, lecture_id, payload).await?))
}

pub async fn delete_lecture(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    state.lectures.delete(&actor, lecture_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn end_lecture(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
) -> Result<Json<LectureResponse>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    Ok(Json(state.lectures.end(&actor, lecture_id).await?))
}
