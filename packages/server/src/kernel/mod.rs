//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod test_dependencies;
pub mod traits;

pub use deps::{BridgeClientFactory, BridgeMessagingClient, ServerDeps};
pub use test_dependencies::{
    MockClientFactory, MockMessagingClient, MockScript, PairingCodeBehavior,
};
pub use traits::*;
