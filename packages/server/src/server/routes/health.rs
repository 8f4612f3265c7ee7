use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    session_storage: StorageHealth,
}

#[derive(Serialize)]
pub struct StorageHealth {
    status: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Checks that the session storage directory exists or can be created.
///
/// Returns 200 OK if storage is usable, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let storage_health = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state.sessions.ensure_exists(),
    )
    .await
    {
        Ok(Ok(())) => StorageHealth {
            status: "ok".to_string(),
            path: state.sessions.root().display().to_string(),
            error: None,
        },
        Ok(Err(e)) => StorageHealth {
            status: "error".to_string(),
            path: state.sessions.root().display().to_string(),
            error: Some(format!("Cannot create directory: {}", e)),
        },
        Err(_) => StorageHealth {
            status: "error".to_string(),
            path: state.sessions.root().display().to_string(),
            error: Some("Filesystem timeout (>5s)".to_string()),
        },
    };

    let is_healthy = storage_health.status == "ok";

    let overall_status = if is_healthy {
        "healthy"
    } else {
        "unhealthy"
    };

    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall_status.to_string(),
            session_storage: storage_health,
        }),
    )
}
