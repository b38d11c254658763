//! `intake.toml` loading.
//!
//! Every section is optional. After the file is parsed, `BOT_TOKEN` and
//! `ADMIN_CHAT_ID` from the environment take precedence over it.

use intake_core::{IntakeError, IntakeResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Chat that receives summaries when nothing else is configured.
pub const DEFAULT_ADMIN_CHAT_ID: i64 = 1660333700;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntakeConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_admin_chat_id")]
    pub admin_chat_id: i64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Long-poll timeout for `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admin_chat_id: default_admin_chat_id(),
            api_base_url: default_api_base_url(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// How long a session lane worker waits for more events before exiting.
    #[serde(default = "default_lane_idle")]
    pub lane_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_secret: None,
            lane_idle_secs: default_lane_idle(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl SessionsConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn default_admin_chat_id() -> i64 {
    DEFAULT_ADMIN_CHAT_ID
}
fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_lane_idle() -> u64 {
    60
}
fn default_idle_ttl() -> u64 {
    86_400
}
fn default_sweep_interval() -> u64 {
    300
}

impl IntakeConfig {
    /// Load `path`, apply process environment overrides and validate.
    ///
    /// A missing file yields the defaults, so a deployment can be configured
    /// through the environment alone.
    pub fn load(path: &Path) -> IntakeResult<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(IntakeError::Config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                )))
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(raw: &str) -> IntakeResult<Self> {
        toml::from_str(raw).map_err(|e| IntakeError::Config(format!("Invalid config: {e}")))
    }

    /// Overrides the token and the admin chat from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> IntakeResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("BOT_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token.trim().to_string();
        }
        if let Some(raw) = lookup("ADMIN_CHAT_ID").filter(|v| !v.trim().is_empty()) {
            self.telegram.admin_chat_id = raw.trim().parse().map_err(|_| {
                IntakeError::Config(format!("ADMIN_CHAT_ID is not a chat id: {raw:?}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> IntakeResult<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(IntakeError::Config(
                "No bot token: set telegram.bot_token or BOT_TOKEN".into(),
            ));
        }
        if self.telegram.api_base_url.trim().is_empty() {
            return Err(IntakeError::Config("telegram.api_base_url is empty".into()));
        }
        Ok(())
    }
}
