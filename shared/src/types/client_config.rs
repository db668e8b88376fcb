use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::role::Role;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// REST root, e.g. `https://api.coconnect.example`
    pub base_url: String,
    /// Realtime endpoint root. Derived from `base_url` when absent.
    #[serde(default)]
    pub socket_url: Option<String>,
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for REST calls and the socket handshake.
    ///
    /// Prefer the `COCONNECT_TOKEN` environment variable; this field is the
    /// fallback for headless setups that write the token to disk.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub channel_token: Option<String>,
    /// Where the guest id / per-role UUID cache lives.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconnectConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full WebSocket URL, e.g. `"wss://api.coconnect.example/socket"`.
    ///
    /// `http`/`https` roots are rewritten to `ws`/`wss`.
    pub fn websocket_url(&self) -> String {
        let root = self.socket_url.as_deref().unwrap_or(&self.base_url);
        let root = if root.starts_with("ws://") || root.starts_with("wss://") {
            root.to_string()
        } else {
            root.replacen("https://", "wss://", 1)
                .replacen("http://", "ws://", 1)
        };
        format!("{}{}", root.trim_end_matches('/'), self.socket_path)
    }
}

impl AuthConfig {
    /// Resolve the bearer token with `COCONNECT_TOKEN` taking priority over
    /// the config file field.
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var("COCONNECT_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.token.clone())
            .filter(|s| !s.is_empty())
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            user_id: None,
            channel_token: None,
            cache_path: None,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_socket_path() -> String {
    "/socket".to_string()
}

pub fn default_role() -> Role {
    Role::Agent
}

pub fn default_max_attempts() -> u32 {
    5
}

pub fn default_delay_ms() -> u64 {
    3000
}

pub fn default_log_level() -> String {
    "info".to_string()
}
