//! Pairing domain - links a device session to a phone number through the
//! external messaging library and reports the first terminal result.

pub mod coordinator;
pub mod errors;
pub mod models;
pub mod resolver;

pub use coordinator::{PairingCoordinator, PairingSettings};
pub use errors::PairingError;
pub use models::{PairingOutcome, PhoneNumber};
pub use resolver::OutcomeResolver;
