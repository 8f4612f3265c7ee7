use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub data_path: String,
    pub headless: bool,
    pub disable_sandbox: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingCodeRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairingCodeResponse {
    pub code: String,
}

/// Lifecycle event pushed by the bridge on a session's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    Qr {
        qr: String,
    },
    Authenticated,
    Ready,
    AuthFailure {
        #[serde(default)]
        message: String,
    },
    /// Anything this client does not know about (message, disconnected, ...)
    #[serde(other)]
    Unknown,
}
