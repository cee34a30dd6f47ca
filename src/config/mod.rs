//! Configuration module

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub band_lock: Option<BandLockConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Measured reboot time plus a safety margin
    #[serde(default = "default_quiescence_secs")]
    pub quiescence_secs: u64,
    /// goformIds that restart the router
    #[serde(default)]
    pub reboot_commands: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            password: String::new(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            quiescence_secs: default_quiescence_secs(),
            reboot_commands: Vec::new(),
        }
    }
}

impl RouterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn quiescence(&self) -> Duration {
        Duration::from_secs(self.quiescence_secs)
    }
}

/// `TZ_SET_LOCK_BAND` payload. Values are opaque to the client.
#[derive(Debug, Clone, Deserialize)]
pub struct BandLockConfig {
    pub band_state: String,
    pub band_list: String,
    pub wcdma_list: String,
    pub tds_list: String,
    pub zeact: String,
    /// The lock only takes effect after the router restarts
    #[serde(default = "default_true")]
    pub reboot_after: bool,
}

fn default_base_url() -> String {
    "http://192.168.0.1".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_quiescence_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("GOFORM").separator("__"))
            .build()?;

        // Missing router keys fall back to defaults; a partial band_lock is an error
        let config: Config = settings.try_deserialize()?;

        Ok(config)
    }
}
