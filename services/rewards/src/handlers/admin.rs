use axum::{Json, extract::State};
use serde::Serialize;

use crate::error::RewardsServiceError;
use crate::state::AppState;
use crate::usecase::reset::ResetLedgerUseCase;
use crate::usecase::stats::GetLedgerStatsUseCase;

// ── GET /admin/stats ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_disposals: u64,
    pub total_points_issued: i64,
    pub used_codes: u64,
    pub unused_codes: u64,
}

pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, RewardsServiceError> {
    let usecase = GetLedgerStatsUseCase {
        store: state.ledger_store(),
    };
    let stats = usecase.execute().await?;
    Ok(Json(StatsResponse {
        total_disposals: stats.total_disposals,
        total_points_issued: stats.total_points_issued,
        used_codes: stats.used_codes,
        unused_codes: stats.unused_codes,
    }))
}

// ── POST /admin/reset ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ResetResponse {
    pub message: &'static str,
}

pub async fn reset_ledger(
    State(state): State<AppState>,
) -> Result<Json<ResetResponse>, RewardsServiceError> {
    let usecase = ResetLedgerUseCase {
        store: state.ledger_store(),
    };
    usecase.execute().await?;
    Ok(Json(ResetResponse {
        message: "Demo data reset successfully",
    }))
}
