use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use trashback_core::health::healthz;
use trashback_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::{
    admin::{get_stats, reset_ledger},
    health::readyz,
    scan::scan_code,
    user::get_user,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Redemption
        .route("/scan", post(scan_code))
        // Users
        .route("/user/{user_id}", get(get_user))
        // Admin
        .route("/admin/stats", get(get_stats))
        .route("/admin/reset", post(reset_ledger))
        .with_state(state)
        .layer(propagate_request_id_layer())
        .layer(trace_layer())
        .layer(request_id_layer())
        // The web client is served from another origin.
        .layer(CorsLayer::permissive())
}
