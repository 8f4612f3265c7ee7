use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domains::pairing::PairingError;
use crate::domains::session::SessionError;

/// JSON body for every failed request: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

impl PairingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PairingError::InvalidPhoneNumber => StatusCode::BAD_REQUEST,
            PairingError::PairingInProgress => StatusCode::CONFLICT,
            PairingError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
            PairingError::StorageUnavailable(_)
            | PairingError::SessionReadFailure(_)
            | PairingError::AuthenticationFailure(_)
            | PairingError::UnhandledInitError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PairingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Pairing request failed");
        }
        error_response(status, self.to_string())
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Session read failed");
        PairingError::SessionReadFailure(self.to_string()).into_response()
    }
}
