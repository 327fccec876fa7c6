use sea_orm::Database;
use tracing::info;

use trashback_core::config::Config;
use trashback_core::tracing::init_tracing;

use trashback_rewards::config::RewardsConfig;
use trashback_rewards::router::build_router;
use trashback_rewards::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = RewardsConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let state = AppState {
        db,
        reward_points: config.reward_points,
    };

    let router = build_router(state);
    let http_addr = format!("0.0.0.0:{}", config.rewards_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .expect("failed to bind");

    info!(
        reward_points = config.reward_points,
        "rewards service listening on {http_addr}"
    );
    axum::serve(listener, router).await.expect("server error");
}
