use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::error_response;
use crate::domains::session::SessionFile;
use crate::server::app::AppState;

pub const NO_SESSION_MESSAGE: &str = "No session found. Pair first.";

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session: Vec<SessionFile>,
}

/// GET /session
///
/// "Not paired yet" is a normal state and is reported with 200.
pub async fn session_handler(Extension(state): Extension<AppState>) -> Response {
    match state.sessions.read_all().await {
        Ok(Some(session)) => Json(SessionResponse {
            success: true,
            session,
        })
        .into_response(),
        Ok(None) => error_response(StatusCode::OK, NO_SESSION_MESSAGE),
        Err(e) => e.into_response(),
    }
}
