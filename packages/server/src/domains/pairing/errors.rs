use std::time::Duration;

use thiserror::Error;

/// Everything that can stop a pairing attempt from producing an outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairingError {
    #[error("Invalid phone number. Use 10-15 digits including country code, no symbols.")]
    InvalidPhoneNumber,

    #[error("A pairing attempt is already in progress. Try again shortly.")]
    PairingInProgress,

    #[error("Session storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Failed to read session: {0}")]
    SessionReadFailure(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Failed to initialize client: {0}")]
    UnhandledInitError(String),

    #[error("Pairing timed out after {0:?} without a result")]
    TimedOut(Duration),
}
