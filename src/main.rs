mod app;
mod auth;
mod config;
mod db;
mod error;
mod mail;
mod memory;
mod posts;
mod state;

/// `RUST_LOG` picks the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "quillboard=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    if json_logs {
        builder.with_target(false).json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let app_state = state::AppState::init().await?;
    tracing::info!(
        per_page = app_state.config.posts_per_page,
        reset_ttl_secs = app_state.config.jwt.reset_ttl_secs,
        "configuration loaded"
    );
    app::serve(app::build_app(app_state)).await
}
