use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::error::RewardsServiceError;
use crate::state::AppState;
use crate::usecase::profile::GetUserProfileUseCase;

// ── GET /user/{user_id} ──────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HistoryItem {
    pub id: i64,
    pub code: String,
    pub points_awarded: i32,
    #[serde(serialize_with = "trashback_core::serde::to_rfc3339_ms")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub points: i64,
    /// Newest first.
    pub history: Vec<HistoryItem>,
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, RewardsServiceError> {
    let usecase = GetUserProfileUseCase {
        store: state.ledger_store(),
    };
    let profile = usecase.execute(user_id).await?;
    let history = profile
        .history
        .into_iter()
        .map(|entry| HistoryItem {
            id: entry.id,
            code: entry.code,
            points_awarded: entry.points_awarded,
            timestamp: entry.timestamp,
        })
        .collect();
    Ok(Json(UserResponse {
        id: profile.user.id,
        name: profile.user.name,
        points: profile.user.points,
        history,
    }))
}
