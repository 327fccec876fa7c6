use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rewards service error variants.
///
/// `InvalidCode` and `CodeAlreadyRedeemed` are expected outcomes of a
/// redemption attempt, not faults. Only `StorageUnavailable` is logged.
#[derive(Debug, thiserror::Error)]
pub enum RewardsServiceError {
    #[error("Invalid code")]
    InvalidCode,
    #[error("Code already used")]
    CodeAlreadyRedeemed,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid request")]
    InvalidRequest,
    #[error("Storage unavailable")]
    StorageUnavailable(#[from] anyhow::Error),
}

impl RewardsServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCode => "INVALID_CODE",
            Self::CodeAlreadyRedeemed => "CODE_ALREADY_REDEEMED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCode | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::CodeAlreadyRedeemed | Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for RewardsServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::StorageUnavailable(ref e) = self {
            tracing::error!(error = %format!("{e:#}"), kind = self.kind(), "storage failure");
        }
        let message = self.to_string();
        // `detail` duplicates `message` for web clients that read that field.
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": message,
            "detail": message,
        });
        (status, axum::Json(body)).into_response()
    }
}
