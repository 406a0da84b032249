//! Configuration
//!
//! Command line and environment settings, grouped the way they are flattened
//! into the binary's arguments.

use std::{path::PathBuf, time::Duration};

use clap::Args;

use crate::{api::ApiConfig, discount::FileStore};

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,
}

/// Storefront API settings.
#[derive(Debug, Args)]
pub struct ApiSettings {
    /// Storefront API base URL
    #[arg(long, env = "TAILWAG_API_URL", default_value = "http://localhost:8000/api")]
    pub api_url: String,

    /// Customer bearer token
    #[arg(long, env = "TAILWAG_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "TAILWAG_API_TIMEOUT_SECONDS", default_value_t = 15_u64)]
    pub api_timeout_seconds: u64,
}

impl ApiSettings {
    /// Client configuration for these settings.
    #[must_use]
    pub fn client_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_url.clone(),
            token: self.api_token.clone().filter(|token| !token.is_empty()),
            timeout: Duration::from_secs(self.api_timeout_seconds),
        }
    }
}

/// Local state settings.
#[derive(Debug, Args)]
pub struct StorageConfig {
    /// Directory holding the applied voucher between runs
    #[arg(long, env = "TAILWAG_STATE_DIR", default_value = ".tailwag")]
    pub state_dir: PathBuf,
}

impl StorageConfig {
    /// A file store rooted at the state directory.
    #[must_use]
    pub fn store(&self) -> FileStore {
        FileStore::new(&self.state_dir)
    }
}

/// Checkout settings.
#[derive(Debug, Args)]
pub struct CheckoutConfig {
    /// Nominal QR session lifetime in seconds, used when the gateway sends none
    #[arg(long, env = "TAILWAG_QR_EXPIRY_SECONDS", default_value_t = 600_u64)]
    pub qr_expiry_seconds: u64,
}

impl CheckoutConfig {
    /// The QR expiry as a duration.
    #[must_use]
    pub fn qr_expiry(&self) -> Duration {
        Duration::from_secs(self.qr_expiry_seconds)
    }
}
