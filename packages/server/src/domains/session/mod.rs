//! Session domain - read-only view over the directory the messaging library
//! persists its authentication state into.

pub mod store;

pub use store::{SessionError, SessionFile, SessionStore};
