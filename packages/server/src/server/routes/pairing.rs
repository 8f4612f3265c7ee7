use axum::{
    async_trait,
    extract::{Extension, Form, FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{error_response, SessionResponse};
use crate::domains::pairing::{PairingError, PairingOutcome};
use crate::server::app::AppState;

pub const PAIRING_INSTRUCTIONS: &str =
    "Enter this code in WhatsApp: Settings > Linked Devices > Link a Device > Link with phone number instead.";

#[derive(Debug, Deserialize)]
pub struct PairForm {
    #[serde(default)]
    pub phone: String,
}

/// `PairForm` from either a urlencoded form or a JSON object, picked by
/// `Content-Type`. Rejections are JSON 400s.
pub struct PairRequest(pub PairForm);

#[async_trait]
impl<S> FromRequest<S> for PairRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        let form = if is_json {
            Json::<PairForm>::from_request(req, state)
                .await
                .map(|Json(form)| form)
                .map_err(|rejection| rejection.body_text())
        } else {
            Form::<PairForm>::from_request(req, state)
                .await
                .map(|Form(form)| form)
                .map_err(|rejection| rejection.body_text())
        };

        form.map(Self)
            .map_err(|message| error_response(StatusCode::BAD_REQUEST, message))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingCodeResponse {
    pub success: bool,
    pub pairing_code: String,
    pub message: String,
}

/// POST /pair
///
/// Field `phone`, form-encoded or JSON. Answers with whichever terminal result the pairing
/// attempt reaches first: a pairing code, the freshly persisted session, or
/// the library's authentication failure.
pub async fn pair_handler(
    Extension(state): Extension<AppState>,
    PairRequest(form): PairRequest,
) -> Response {
    match state.coordinator.initiate_pairing(&form.phone).await {
        Ok(PairingOutcome::PairingCodeIssued(code)) => Json(PairingCodeResponse {
            success: true,
            pairing_code: code,
            message: PAIRING_INSTRUCTIONS.to_string(),
        })
        .into_response(),
        Ok(PairingOutcome::Authenticated(session)) => Json(SessionResponse {
            success: true,
            session,
        })
        .into_response(),
        Ok(PairingOutcome::Failed(reason)) => {
            PairingError::AuthenticationFailure(reason).into_response()
        }
        Err(e) => e.into_response(),
    }
}
