use anyhow::Context;

mod app;
mod auth;
mod config;
mod state;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "userbase=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    // Seeding finishes (or is skipped) before the listener accepts traffic.
    users::seed::seed_on_startup(&app_state.config.seed, app_state.store.clone())
        .await
        .context("startup seeding")?;

    app::serve(app::build_app(app_state)).await
}
