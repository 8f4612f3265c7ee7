use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub session_dir: PathBuf,
    pub bridge_url: String,
    pub bridge_api_key: Option<String>,
    pub pairing_timeout: Duration,
    pub pairing_linger: Duration,
    pub require_session_dir: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            session_dir: env::var("SESSION_DIR")
                .unwrap_or_else(|_| ".wwebjs_auth".to_string())
                .into(),
            bridge_url: env::var("BRIDGE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8085".to_string()),
            bridge_api_key: env::var("BRIDGE_API_KEY").ok().filter(|k| !k.is_empty()),
            pairing_timeout: Duration::from_secs(
                env::var("PAIRING_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()
                    .context("PAIRING_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            pairing_linger: Duration::from_secs(
                env::var("PAIRING_LINGER_SECS")
                    .unwrap_or_else(|_| "180".to_string())
                    .parse()
                    .context("PAIRING_LINGER_SECS must be a whole number of seconds")?,
            ),
            require_session_dir: env::var("SESSION_DIR_REQUIRED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("SESSION_DIR_REQUIRED must be true or false")?,
        })
    }
}
