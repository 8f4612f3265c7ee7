// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The pairing handshake lives in domains/pairing and talks to the
// messaging automation library exclusively through these seams.
//
// Naming convention: Base* for trait names (e.g., BaseMessagingClient)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// Messaging Client Trait (Infrastructure - external automation library)
// =============================================================================

/// Construction options for an external messaging client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Directory the library persists its authentication state into
    pub data_path: PathBuf,
    pub headless: bool,
    pub disable_sandbox: bool,
}

impl ClientOptions {
    /// Headless, sandboxless client bound to `data_path`.
    pub fn headless(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            headless: true,
            disable_sandbox: true,
        }
    }
}

/// Lifecycle events emitted by the external client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// QR payload for the manual scan fallback
    Qr(String),
    Authenticated,
    Ready,
    AuthFailure(String),
}

pub type EventListener = Arc<dyn Fn(ClientEvent) + Send + Sync>;

#[async_trait]
pub trait BaseMessagingClient: Send + Sync {
    /// Register a listener. Must be called before `initialize` to see every event.
    fn on_event(&self, listener: EventListener);

    /// Bring the client up (browser launch, session restore)
    async fn initialize(&self) -> Result<()>;

    /// Ask the library for a phone-number pairing code
    async fn request_pairing_code(&self, phone_number: &str) -> Result<String>;

    /// Release the client and everything it holds
    async fn destroy(&self) -> Result<()>;
}

#[async_trait]
pub trait BaseMessagingClientFactory: Send + Sync {
    async fn create(&self, options: ClientOptions) -> Result<Arc<dyn BaseMessagingClient>>;
}
