use axum::http::StatusCode;

/// Handler for `GET /healthz` (liveness). The process is up if it can answer.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Map the outcome of a dependency probe to a readiness status.
///
/// Services build their `GET /readyz` handler on top of this, passing the
/// result of pinging whatever they cannot serve without.
pub fn readiness<E: std::fmt::Display>(probe: Result<(), E>) -> StatusCode {
    match probe {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            ::tracing::warn!(error = %e, "readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
