// Server dependencies and the production adapters behind the kernel traits.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use wa_bridge::{BridgeError, BridgeEvent, BridgeService, BridgeSession, SessionOptions};

use super::{
    BaseMessagingClient, BaseMessagingClientFactory, ClientEvent, ClientOptions, EventListener,
};
use crate::domains::pairing::PairingSettings;
use crate::domains::session::SessionStore;

// =============================================================================
// Bridge adapters
// =============================================================================

/// Creates one bridge session per pairing attempt.
pub struct BridgeClientFactory(pub Arc<BridgeService>);

impl BridgeClientFactory {
    pub fn new(service: Arc<BridgeService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseMessagingClientFactory for BridgeClientFactory {
    async fn create(&self, options: ClientOptions) -> Result<Arc<dyn BaseMessagingClient>> {
        let session = self
            .0
            .create_session(&SessionOptions {
                data_path: options.data_path.to_string_lossy().into_owned(),
                headless: options.headless,
                disable_sandbox: options.disable_sandbox,
            })
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(Arc::new(BridgeMessagingClient::new(session)))
    }
}

pub struct BridgeMessagingClient {
    session: BridgeSession,
    listeners: Arc<Mutex<Vec<EventListener>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeMessagingClient {
    pub fn new(session: BridgeSession) -> Self {
        Self {
            session,
            listeners: Arc::new(Mutex::new(Vec::new())),
            pump: Mutex::new(None),
        }
    }
}

fn into_client_event(event: BridgeEvent) -> Option<ClientEvent> {
    match event {
        BridgeEvent::Qr { qr } => Some(ClientEvent::Qr(qr)),
        BridgeEvent::Authenticated => Some(ClientEvent::Authenticated),
        BridgeEvent::Ready => Some(ClientEvent::Ready),
        BridgeEvent::AuthFailure { message } => Some(ClientEvent::AuthFailure(message)),
        BridgeEvent::Unknown => None,
    }
}

fn dispatch(listeners: &Mutex<Vec<EventListener>>, event: ClientEvent) {
    // Clone out so a listener can never deadlock against registration
    let current: Vec<EventListener> = listeners
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    for listener in current {
        listener(event.clone());
    }
}

#[async_trait]
impl BaseMessagingClient for BridgeMessagingClient {
    fn on_event(&self, listener: EventListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    async fn initialize(&self) -> Result<()> {
        // Stream first, start second: events emitted during bring-up must reach us
        let mut events = self
            .session
            .events()
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        let listeners = self.listeners.clone();
        let session_id = self.session.id().to_string();
        let handle = tokio::spawn(async move {
            loop {
                match events.next_event().await {
                    Ok(Some(event)) => {
                        if let Some(event) = into_client_event(event) {
                            dispatch(&listeners, event);
                        }
                    }
                    Ok(None) => {
                        debug!(session_id = %session_id, "Bridge event stream closed");
                        break;
                    }
                    Err(BridgeError::Decode(e)) => {
                        warn!(session_id = %session_id, error = %e, "Skipping undecodable bridge event");
                    }
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Bridge event stream failed");
                        break;
                    }
                }
            }
        });
        *self.pump.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        self.session
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn request_pairing_code(&self, phone_number: &str) -> Result<String> {
        self.session
            .request_pairing_code(phone_number)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn destroy(&self) -> Result<()> {
        let pump = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = pump {
            handle.abort();
        }

        self.session
            .destroy()
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies shared by every request (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub clients: Arc<dyn BaseMessagingClientFactory>,
    pub sessions: SessionStore,
    pub settings: PairingSettings,
}

impl ServerDeps {
    pub fn new(
        clients: Arc<dyn BaseMessagingClientFactory>,
        sessions: SessionStore,
        settings: PairingSettings,
    ) -> Self {
        Self {
            clients,
            sessions,
            settings,
        }
    }
}
