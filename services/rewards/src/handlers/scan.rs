use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::RewardsServiceError;
use crate::state::AppState;
use crate::usecase::redeem::{RedeemCodeInput, RedeemCodeUseCase};

// ── POST /scan ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ScanRequest {
    pub user_id: i64,
    pub code: String,
}

#[derive(Serialize)]
pub struct ScanResponse {
    pub message: &'static str,
    pub points_awarded: i32,
    pub new_total: i64,
}

pub async fn scan_code(
    State(state): State<AppState>,
    Json(body): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, RewardsServiceError> {
    let usecase = RedeemCodeUseCase {
        store: state.ledger_store(),
        reward_points: state.reward_points,
    };
    let redeemed = usecase
        .execute(RedeemCodeInput {
            user_id: body.user_id,
            code: body.code,
        })
        .await?;
    Ok(Json(ScanResponse {
        message: "Success",
        points_awarded: redeemed.points_awarded,
        new_total: redeemed.new_total,
    }))
}
