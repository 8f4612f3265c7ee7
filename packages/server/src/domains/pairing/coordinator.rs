//! Pairing coordinator.
//!
//! Bridges the external client's event-driven lifecycle to a single result:
//!
//! ```text
//! Idle -> Initializing -> AwaitingPairingCode -> PairingCodeIssued
//!                                             -> Authenticated
//!                                             -> AuthFailed
//! ```
//!
//! `qr` and `ready` are informational and never end an attempt.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use qrcode::render::unicode;
use qrcode::QrCode;
use tokio::sync::{mpsc, oneshot, Mutex, OwnedMutexGuard};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use super::{OutcomeResolver, PairingError, PairingOutcome, PhoneNumber};
use crate::domains::session::SessionStore;
use crate::kernel::{
    BaseMessagingClient, BaseMessagingClientFactory, ClientEvent, ClientOptions, EventListener,
    ServerDeps,
};

#[derive(Debug, Clone)]
pub struct PairingSettings {
    /// Upper bound for one attempt to reach a terminal result. Client
    /// teardown gets the same budget.
    pub timeout: Duration,
    /// How long an issued code keeps its client alive waiting for the phone
    pub linger: Duration,
    /// Refuse to pair when the storage directory cannot be created
    pub require_session_dir: bool,
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            linger: Duration::from_secs(180),
            require_session_dir: false,
        }
    }
}

/// Terminal signals raced into the resolver
#[derive(Debug)]
enum Signal {
    CodeIssued(String),
    Authenticated,
    AuthFailed(String),
    InitFailed(String),
}

pub struct PairingCoordinator {
    attempt: Attempt,
    // One attempt per process; the storage directory is shared
    in_flight: Arc<Mutex<()>>,
}

impl PairingCoordinator {
    pub fn new(deps: &ServerDeps) -> Self {
        Self {
            attempt: Attempt {
                clients: deps.clients.clone(),
                sessions: deps.sessions.clone(),
                settings: deps.settings.clone(),
            },
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    pub async fn initiate_pairing(
        &self,
        phone_number: &str,
    ) -> Result<PairingOutcome, PairingError> {
        let phone = PhoneNumber::parse(phone_number)?;

        let guard = self
            .in_flight
            .clone()
            .try_lock_owned()
            .map_err(|_| PairingError::PairingInProgress)?;

        // Detached: a caller that goes away must not skip client teardown
        let attempt = tokio::spawn(self.attempt.clone().run(phone, guard));
        attempt
            .await
            .map_err(|e| PairingError::UnhandledInitError(e.to_string()))?
    }
}

/// Everything one attempt needs, owned so it can outlive the request.
#[derive(Clone)]
struct Attempt {
    clients: Arc<dyn BaseMessagingClientFactory>,
    sessions: SessionStore,
    settings: PairingSettings,
}

impl Attempt {
    async fn run(
        self,
        phone: PhoneNumber,
        guard: OwnedMutexGuard<()>,
    ) -> Result<PairingOutcome, PairingError> {
        info!(phone = %phone, "Starting pairing attempt");

        if let Err(e) = self.sessions.ensure_exists().await {
            if self.settings.require_session_dir {
                return Err(PairingError::StorageUnavailable(e.to_string()));
            }
            warn!(
                error = %e,
                dir = %self.sessions.root().display(),
                "Could not create session directory, continuing anyway"
            );
        }

        let deadline = Instant::now() + self.settings.timeout;

        let created = timeout_at(
            deadline,
            self.clients
                .create(ClientOptions::headless(self.sessions.root())),
        )
        .await;
        let client = match created {
            Ok(client) => client.map_err(|e| PairingError::UnhandledInitError(e.to_string()))?,
            Err(_) => return Err(self.timed_out(&phone)),
        };

        let (resolver, outcome) = OutcomeResolver::new();
        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
        // Registered before initialize so nothing emitted during start-up is missed
        client.on_event(event_listener(resolver.clone(), lifecycle_tx));

        let attempt = race(client.as_ref(), &phone, resolver, outcome);
        let signal = match timeout_at(deadline, attempt).await {
            Ok(signal) => signal,
            Err(_) => {
                let err = self.timed_out(&phone);
                release(client.as_ref(), self.settings.timeout).await;
                return Err(err);
            }
        };

        match signal {
            Signal::CodeIssued(code) => {
                info!(phone = %phone, "Pairing code issued");
                self.linger(client, lifecycle_rx, guard);
                Ok(PairingOutcome::PairingCodeIssued(code))
            }
            Signal::Authenticated => {
                let read = self.sessions.read_all().await;
                release(client.as_ref(), self.settings.timeout).await;
                let files = read
                    .map_err(|e| PairingError::SessionReadFailure(e.to_string()))?
                    .unwrap_or_default();
                Ok(PairingOutcome::Authenticated(files))
            }
            Signal::AuthFailed(reason) => {
                release(client.as_ref(), self.settings.timeout).await;
                Ok(PairingOutcome::Failed(reason))
            }
            Signal::InitFailed(message) => {
                warn!(phone = %phone, error = %message, "Client initialization failed");
                release(client.as_ref(), self.settings.timeout).await;
                Err(PairingError::UnhandledInitError(message))
            }
        }
    }

    fn timed_out(&self, phone: &PhoneNumber) -> PairingError {
        warn!(phone = %phone, timeout = ?self.settings.timeout, "Pairing attempt timed out");
        PairingError::TimedOut(self.settings.timeout)
    }

    /// Keep the client alive until the phone accepts or rejects the code.
    fn linger(
        &self,
        client: Arc<dyn BaseMessagingClient>,
        mut lifecycle: mpsc::UnboundedReceiver<ClientEvent>,
        guard: OwnedMutexGuard<()>,
    ) {
        let linger = self.settings.linger;
        let teardown = self.settings.timeout;
        tokio::spawn(async move {
            match timeout(linger, lifecycle.recv()).await {
                Ok(Some(ClientEvent::Authenticated)) => info!("Device linked with pairing code"),
                Ok(Some(ClientEvent::AuthFailure(reason))) => {
                    warn!(reason = %reason, "Authentication failed after pairing code was issued")
                }
                Ok(_) => debug!("Client stopped reporting before the code was used"),
                Err(_) => info!(linger = ?linger, "Pairing code not used in time, releasing client"),
            }
            release(client.as_ref(), teardown).await;
            drop(guard);
        });
    }
}

/// Start the client, ask for a code, and return whichever terminal signal
/// reaches the resolver first.
async fn race(
    client: &dyn BaseMessagingClient,
    phone: &PhoneNumber,
    resolver: OutcomeResolver<Signal>,
    mut outcome: oneshot::Receiver<Signal>,
) -> Signal {
    let drive = async {
        let signal = match request_code(client, phone).await {
            Ok(code) => Signal::CodeIssued(code),
            Err(e) => Signal::InitFailed(format!("{:#}", e)),
        };
        if !resolver.resolve(signal) {
            debug!("Pairing code path finished after an event had already resolved the attempt");
        }
    };
    tokio::pin!(drive);

    let received = tokio::select! {
        received = &mut outcome => received,
        () = &mut drive => outcome.await,
    };

    received.unwrap_or_else(|_| Signal::InitFailed("pairing attempt ended without a result".into()))
}

async fn request_code(client: &dyn BaseMessagingClient, phone: &PhoneNumber) -> Result<String> {
    client.initialize().await?;
    debug!("Messaging client started, requesting pairing code");
    client.request_pairing_code(phone.as_str()).await
}

/// Terminal-friendly QR block, two modules per character row.
fn render_qr(payload: &str) -> Option<String> {
    let code = QrCode::new(payload.as_bytes()).ok()?;
    Some(
        code.render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build(),
    )
}

fn event_listener(
    resolver: OutcomeResolver<Signal>,
    lifecycle: mpsc::UnboundedSender<ClientEvent>,
) -> EventListener {
    Arc::new(move |event: ClientEvent| match event {
        ClientEvent::Qr(qr) => match render_qr(&qr) {
            Some(block) => info!(
                "QR code received, scan it under Linked Devices as a fallback\n{}",
                block
            ),
            None => warn!(qr = %qr, "QR code received but could not be rendered"),
        },
        ClientEvent::Ready => info!("Messaging client is ready"),
        ClientEvent::Authenticated => {
            info!("Messaging client authenticated");
            resolver.resolve(Signal::Authenticated);
            let _ = lifecycle.send(ClientEvent::Authenticated);
        }
        ClientEvent::AuthFailure(reason) => {
            warn!(reason = %reason, "Messaging client authentication failed");
            resolver.resolve(Signal::AuthFailed(reason.clone()));
            let _ = lifecycle.send(ClientEvent::AuthFailure(reason));
        }
    })
}

/// Destroy the client, giving up after `limit` so a stuck shutdown cannot
/// hold the attempt slot.
async fn release(client: &dyn BaseMessagingClient, limit: Duration) {
    match timeout(limit, client.destroy()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Failed to destroy messaging client"),
        Err(_) => warn!(limit = ?limit, "Messaging client did not shut down in time, abandoning it"),
    }
}
