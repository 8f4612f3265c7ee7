// Client for the WhatsApp automation bridge: a sidecar that runs the headless
// browser session and exposes it over HTTP + an NDJSON event stream.

pub mod models;

use reqwest::{Client, RequestBuilder, Response};
use thiserror::Error;

pub use crate::models::BridgeEvent;
use crate::models::{
    CreateSessionRequest, CreateSessionResponse, PairingCodeRequest, PairingCodeResponse,
};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Request to bridge failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Bridge returned an error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Error parsing bridge payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub base_url: String,
    pub api_key: Option<String>,
}

/// Options forwarded to the bridge when a session is created.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub data_path: String,
    pub headless: bool,
    pub disable_sandbox: bool,
}

#[derive(Debug, Clone)]
pub struct BridgeService {
    options: BridgeOptions,
    http: Client,
}

impl BridgeService {
    pub fn new(options: BridgeOptions) -> Self {
        Self {
            options,
            http: Client::new(),
        }
    }

    pub async fn create_session(
        &self,
        session_options: &SessionOptions,
    ) -> Result<BridgeSession, BridgeError> {
        let url = format!("{}/sessions", self.base_url());
        let body = CreateSessionRequest {
            data_path: session_options.data_path.clone(),
            headless: session_options.headless,
            disable_sandbox: session_options.disable_sandbox,
        };

        let response = self.authorized(self.http.post(url)).json(&body).send().await?;
        let created = ensure_success(response)
            .await?
            .json::<CreateSessionResponse>()
            .await?;

        tracing::debug!(session_id = %created.id, "Bridge session created");

        Ok(BridgeSession {
            service: self.clone(),
            id: created.id,
        })
    }

    fn base_url(&self) -> &str {
        self.options.base_url.trim_end_matches('/')
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.options.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        }
    }
}

/// One browser session living inside the bridge.
#[derive(Debug, Clone)]
pub struct BridgeSession {
    service: BridgeService,
    id: String,
}

impl BridgeSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Open the session's event stream. Call before `start` so no event is lost.
    pub async fn events(&self) -> Result<EventStream, BridgeError> {
        let response = self
            .service
            .authorized(self.service.http.get(self.url("events")))
            .send()
            .await?;

        Ok(EventStream {
            response: ensure_success(response).await?,
            decoder: LineDecoder::default(),
        })
    }

    pub async fn start(&self) -> Result<(), BridgeError> {
        let response = self
            .service
            .authorized(self.service.http.post(self.url("start")))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    pub async fn request_pairing_code(&self, phone_number: &str) -> Result<String, BridgeError> {
        let body = PairingCodeRequest {
            phone_number: phone_number.to_string(),
        };
        let response = self
            .service
            .authorized(self.service.http.post(self.url("pairing-code")))
            .json(&body)
            .send()
            .await?;

        let data = ensure_success(response)
            .await?
            .json::<PairingCodeResponse>()
            .await?;
        Ok(data.code)
    }

    /// Tear the session down. A session the bridge already forgot counts as destroyed.
    pub async fn destroy(&self) -> Result<(), BridgeError> {
        let url = format!("{}/sessions/{}", self.service.base_url(), self.id);
        let response = self
            .service
            .authorized(self.service.http.delete(url))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    fn url(&self, action: &str) -> String {
        format!("{}/sessions/{}/{}", self.service.base_url(), self.id, action)
    }
}

async fn ensure_success(response: Response) -> Result<Response, BridgeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), body = %body, "Bridge returned an error");
    Err(BridgeError::Status {
        status: status.as_u16(),
        body,
    })
}

/// NDJSON event stream for a single session.
pub struct EventStream {
    response: Response,
    decoder: LineDecoder,
}

impl EventStream {
    /// Next decoded event, or `None` once the bridge closes the stream.
    pub async fn next_event(&mut self) -> Result<Option<BridgeEvent>, BridgeError> {
        loop {
            if let Some(line) = self.decoder.next_line() {
                return Ok(Some(serde_json::from_str(&line)?));
            }

            match self.response.chunk().await? {
                Some(bytes) => self.decoder.push(&bytes),
                None => {
                    return match self.decoder.finish() {
                        Some(line) => Ok(Some(serde_json::from_str(&line)?)),
                        None => Ok(None),
                    };
                }
            }
        }
    }
}

/// Splits a byte stream into non-empty, trimmed lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn next_line(&mut self) -> Option<String> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if let Some(line) = self.next_line() {
            return Some(line);
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_holds_partial_lines_until_newline() {
        let mut decoder = LineDecoder::default();
        decoder.push(br#"{"type":"re"#);
        assert_eq!(decoder.next_line(), None);

        decoder.push(b"ady\"}\n\n{\"type\":\"authenticated\"}\n");
        assert_eq!(decoder.next_line().as_deref(), Some(r#"{"type":"ready"}"#));
        assert_eq!(
            decoder.next_line().as_deref(),
            Some(r#"{"type":"authenticated"}"#)
        );
        assert_eq!(decoder.next_line(), None);
    }

    #[test]
    fn decoder_flushes_unterminated_tail() {
        let mut decoder = LineDecoder::default();
        decoder.push(b"{\"type\":\"ready\"}\r\n  {\"type\":\"qr\",\"qr\":\"abc\"}");
        assert_eq!(decoder.finish().as_deref(), Some(r#"{"type":"ready"}"#));
        assert_eq!(
            decoder.finish().as_deref(),
            Some(r#"{"type":"qr","qr":"abc"}"#)
        );
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn events_decode_by_type_tag() {
        let qr: BridgeEvent = serde_json::from_str(r#"{"type":"qr","qr":"2@xyz"}"#).unwrap();
        assert_eq!(qr, BridgeEvent::Qr { qr: "2@xyz".into() });

        let failure: BridgeEvent =
            serde_json::from_str(r#"{"type":"auth_failure","message":"bad creds"}"#).unwrap();
        assert_eq!(
            failure,
            BridgeEvent::AuthFailure {
                message: "bad creds".into()
            }
        );

        let bare_failure: BridgeEvent = serde_json::from_str(r#"{"type":"auth_failure"}"#).unwrap();
        assert_eq!(
            bare_failure,
            BridgeEvent::AuthFailure {
                message: String::new()
            }
        );
    }

    #[test]
    fn unknown_event_types_are_tolerated() {
        let event: BridgeEvent =
            serde_json::from_str(r#"{"type":"message","body":"hi"}"#).unwrap();
        assert_eq!(event, BridgeEvent::Unknown);
    }

    #[test]
    fn base_url_ignores_trailing_slash() {
        let service = BridgeService::new(BridgeOptions {
            base_url: "http://bridge.local:8085/".into(),
            api_key: None,
        });
        let session = BridgeSession {
            service,
            id: "abc".into(),
        };
        assert_eq!(
            session.url("pairing-code"),
            "http://bridge.local:8085/sessions/abc/pairing-code"
        );
    }
}
