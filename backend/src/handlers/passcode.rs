use axum::{
    extract::{Extension, Path, State},
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::parse_lecture_id,
    models::{
        attendance::AttendanceResponse,
        lecture::{PasscodeResponse, RedeemPasscodeRequest},
        user::Actor,
    },
    state::AppState,
};

pub async fn get_passcode(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
) -> Result<Json<PasscodeResponse>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    Ok(Json(state.passcodes.get_passcode(&actor, lecture_id).await?))
}

pub async fn redeem_passcode(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(lecture_id): Path<String>,
    Json(payload): Json<RedeemPasscodeRequest>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let lecture_id = parse_lecture_id(&lecture_id)?;
    payload.validate()?;
    Ok(Json(
        state
            .passcodes
            .redeem(&actor, lecture_id, &payload.code)
            .await?,
    ))
}
