// WhatsApp Pairing Server - Core
//
// Drives an external WhatsApp automation bridge over HTTP: starts a headless
// client session, turns its lifecycle events into exactly one pairing result
// per request, and exposes the session files the library persists.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
