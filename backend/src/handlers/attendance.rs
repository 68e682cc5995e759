use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::parse_lecture_id,
    models::{
        attendance::{AttendanceResponse, AttendanceView, ManualAddRequest},
        ping_log::PingLog,
        user::Actor,
        PaginatedResponse, PaginationQuery,
    },
    state::AppState,
};

pub async fn get_attendance_view(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
) -> Result<Json<AttendanceView>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    Ok(Json(
        state
            .reconciliation
            .attendance_view(&actor, lecture_id)
            .await?,
    ))
}

pub async fn export_attendance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    let csv_data = state.reconciliation.export_csv(&actor, lecture_id).await?;
    Ok(Json(json!({
        "csv_data": csv_data,
        "filename": format!("attendance_{}.csv", lecture_id),
    })))
}

pub async fn manual_add(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
    Json(payload): Json<ManualAddRequest>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    payload.validate()?;
    if payload.lookup.trim().is_empty() {
        return Err(AppError::BadRequest("Lookup must not be blank".into()));
    }
    Ok(Json(
        state
            .reconciliation
            .manual_add(&actor, lecture_id, &payload.lookup)
            .await?,
    ))
}

pub async fn list_pings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<PingLog>>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    Ok(Json(
        state
            .reconciliation
            .ping_log(&actor, lecture_id, &page)
            .await?,
    ))
}
