use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError, models::user::Actor, state::AppState, utils::jwt::verify_access_token,
};

/// Resolves the bearer token into an [`Actor`] request extension.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = authenticate(request.headers(), &state.config.jwt_secret)?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

fn authenticate(headers: &HeaderMap, secret: &str) -> Result<Actor, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".into()))?;

    let claims = verify_access_token(token, secret).map_err(|err| {
        tracing::debug!(error = %err, "Rejected access token");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    claims
        .actor()
        .map_err(|_| AppError::Unauthorized("Invalid token subject".into()))
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}
