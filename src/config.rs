//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::dispatch::HttpMethod;

/// Controller endpoint of the MKZ4 car in access-point mode
pub const DEFAULT_ENDPOINT: &str = "http://192.168.4.1:8080";

const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Base URL of the car controller
    pub endpoint: String,

    /// Locale tag selecting the trigger vocabulary
    pub locale: String,

    /// Per-request timeout for controller calls
    pub request_timeout: Duration,

    /// HTTP method used for controller calls
    pub http_method: HttpMethod,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("voice-commander");

        let socket_path = data_dir.join("daemon.sock");

        let endpoint = lookup("VOICE_COMMANDER_ENDPOINT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let locale = lookup("VOICE_COMMANDER_LOCALE")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| lookup("LANG"))
            .unwrap_or_default();

        let request_timeout = match lookup("VOICE_COMMANDER_TIMEOUT_MS") {
            Some(ms) => {
                let millis = ms
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid VOICE_COMMANDER_TIMEOUT_MS: {ms}"))?;
                if millis == 0 {
                    bail!("VOICE_COMMANDER_TIMEOUT_MS must be greater than zero");
                }
                Duration::from_millis(millis)
            }
            None => Duration::from_millis(DEFAULT_TIMEOUT_MS),
        };

        let http_method = match lookup("VOICE_COMMANDER_HTTP_METHOD") {
            Some(method) => method.parse::<HttpMethod>().map_err(anyhow::Error::msg)?,
            None => HttpMethod::default(),
        };

        Ok(Self {
            socket_path,
            data_dir,
            endpoint,
            locale,
            request_timeout,
            http_method,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
