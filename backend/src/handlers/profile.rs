use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    models::user::{Actor, Profile},
    state::AppState,
};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.presence.profile(&actor).await?))
}
