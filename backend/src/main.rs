use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall_backend::{config::Config, db::connection::create_pool, routes, state::AppState};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        jwt_secret = %mask_secret(&config.jwt_secret),
        bind_addr = %config.bind_addr,
        join_radius_m = config.join_radius_m,
        presence_radius_m = config.presence_radius_m,
        check_budget = config.check_budget,
        min_required_checks = config.min_required_checks,
        passcode_rotation_seconds = config.passcode_rotation_seconds,
        "Loaded configuration from environment/.env"
    );

    let pool = create_pool(&config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    let bind_addr = config.bind_addr;
    let app = routes::build_router(AppState::postgres(config, pool));

    tracing::info!("Server listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
