// TestDependencies - mock implementations for testing
//
// Provides a scripted messaging client that can be injected into ServerDeps
// in place of the bridge.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use super::{
    BaseMessagingClient, BaseMessagingClientFactory, ClientEvent, ClientOptions, EventListener,
};

// =============================================================================
// Mock Messaging Client
// =============================================================================

/// What `request_pairing_code` does once called
#[derive(Debug, Clone)]
pub enum PairingCodeBehavior {
    Code(String),
    Error(String),
    /// Never returns, like a library that only ever reports via events
    Pending,
}

/// Script shared by every client a `MockClientFactory` hands out
#[derive(Debug, Clone)]
pub struct MockScript {
    /// Emitted in order at the end of `initialize`
    pub events_on_initialize: Vec<ClientEvent>,
    /// Emitted while `request_pairing_code` is in flight, just before it returns
    pub events_during_code_call: Vec<ClientEvent>,
    pub init_error: Option<String>,
    pub pairing_code: PairingCodeBehavior,
    /// `destroy` records the call and then never returns
    pub hang_on_destroy: bool,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            events_on_initialize: Vec::new(),
            events_during_code_call: Vec::new(),
            init_error: None,
            pairing_code: PairingCodeBehavior::Code("ABCD-1234".to_string()),
            hang_on_destroy: false,
        }
    }
}

pub struct MockMessagingClient {
    script: MockScript,
    listeners: Mutex<Vec<EventListener>>,
    pairing_calls: Mutex<Vec<String>>,
    initialized: AtomicBool,
    destroy_calls: AtomicUsize,
}

impl MockMessagingClient {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            listeners: Mutex::new(Vec::new()),
            pairing_calls: Mutex::new(Vec::new()),
            initialized: AtomicBool::new(false),
            destroy_calls: AtomicUsize::new(0),
        }
    }

    /// Fire an event at every registered listener
    pub fn emit(&self, event: ClientEvent) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener(event.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn pairing_calls(&self) -> Vec<String> {
        self.pairing_calls.lock().unwrap().clone()
    }

    pub fn was_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn was_destroyed(&self) -> bool {
        self.destroy_calls() > 0
    }
}

#[async_trait]
impl BaseMessagingClient for MockMessagingClient {
    fn on_event(&self, listener: EventListener) {
        self.listeners.lock().unwrap().push(listener);
    }

    async fn initialize(&self) -> Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        if let Some(message) = &self.script.init_error {
            return Err(anyhow::anyhow!("{}", message));
        }
        for event in self.script.events_on_initialize.clone() {
            self.emit(event);
        }
        Ok(())
    }

    async fn request_pairing_code(&self, phone_number: &str) -> Result<String> {
        self.pairing_calls
            .lock()
            .unwrap()
            .push(phone_number.to_string());

        let result = match &self.script.pairing_code {
            PairingCodeBehavior::Code(code) => Ok(code.clone()),
            PairingCodeBehavior::Error(message) => Err(anyhow::anyhow!("{}", message)),
            PairingCodeBehavior::Pending => std::future::pending().await,
        };

        for event in self.script.events_during_code_call.clone() {
            self.emit(event);
        }
        result
    }

    async fn destroy(&self) -> Result<()> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        if self.script.hang_on_destroy {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

// =============================================================================
// Mock Client Factory
// =============================================================================

pub struct MockClientFactory {
    script: Mutex<MockScript>,
    created: Mutex<Vec<(ClientOptions, Arc<MockMessagingClient>)>>,
}

impl MockClientFactory {
    pub fn new(script: MockScript) -> Self {
        Self {
            script: Mutex::new(script),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Replace the script used for clients created from now on
    pub fn set_script(&self, script: MockScript) {
        *self.script.lock().unwrap() = script;
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn clients(&self) -> Vec<Arc<MockMessagingClient>> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|(_, client)| client.clone())
            .collect()
    }

    pub fn last_client(&self) -> Option<Arc<MockMessagingClient>> {
        self.clients().pop()
    }

    pub fn last_options(&self) -> Option<ClientOptions> {
        self.created
            .lock()
            .unwrap()
            .last()
            .map(|(options, _)| options.clone())
    }
}

impl Default for MockClientFactory {
    fn default() -> Self {
        Self::new(MockScript::default())
    }
}

#[async_trait]
impl BaseMessagingClientFactory for MockClientFactory {
    async fn create(&self, options: ClientOptions) -> Result<Arc<dyn BaseMessagingClient>> {
        let script = self.script.lock().unwrap().clone();
        let client = Arc::new(MockMessagingClient::new(script));
        self.created
            .lock()
            .unwrap()
            .push((options, client.clone()));
        Ok(client)
    }
}
