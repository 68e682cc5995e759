use axum::{
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{docs::ApiDoc, handlers, middleware, state::AppState};

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/api/health", get(handlers::profile::health));

    let user_routes = Router::new()
        .route("/api/me", get(handlers::profile::me))
        .route(
            "/api/lectures",
            get(handlers::lectures::list_lectures).post(handlers::lectures::create_lecture),
        )
        .route(
            "/api/lectures/{id}",
            get(handlers::lectures::get_lecture)
                .put(handlers::lectures::update_lecture)
                .delete(handlers::lectures::delete_lecture),
        )
        .route("/api/lectures/{id}/end", post(handlers::lectures::end_lecture))
        .route(
            "/api/lectures/{id}/join",
            post(handlers::presence::join_lecture),
        )
        .route(
            "/api/lectures/{id}/ping",
            post(handlers::presence::ping_lecture),
        )
        .route(
            "/api/lectures/{id}/submit",
            post(handlers::presence::submit_attendance),
        )
        .route(
            "/api/lectures/{id}/attendance/me",
            get(handlers::presence::my_attendance),
        )
        .route(
            "/api/lectures/{id}/attendance",
            get(handlers::attendance::get_attendance_view),
        )
        .route(
            "/api/lectures/{id}/attendance/export",
            get(handlers::attendance::export_attendance),
        )
        .route(
            "/api/lectures/{id}/attendance/manual",
            post(handlers::attendance::manual_add),
        )
        .route(
            "/api/lectures/{id}/passcode",
            get(handlers::passcode::get_passcode),
        )
        .route(
            "/api/lectures/{id}/passcode/redeem",
            post(handlers::passcode::redeem_passcode),
        )
        .route("/api/lectures/{id}/pings", get(handlers::attendance::list_pings))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth,
        ));

    let cors = cors_layer(&state.config.cors_allow_origins);

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(24 * 60 * 60));

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
