use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use crate::types::client_config::{ClientConfig, ConfigError};

pub fn load_config(path: impl AsRef<Path>) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path.display());

    parse_config(&contents)
}

/// Parse and validate configuration text.
pub fn parse_config(contents: &str) -> Result<ClientConfig, ConfigError> {
    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: ClientConfig = toml::from_str(contents)?;

    info!("Configuration loaded successfully");
    // The auth section may carry a token; keep it out of the logs.
    debug!(
        "Config: server={:?} identity={:?} reconnect={:?}",
        config.server, config.identity, config.reconnect
    );

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    let base = config.server.base_url.trim();
    if base.is_empty() {
        return Err(ConfigError::InvalidConfig("base_url cannot be empty".into()));
    }

    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ConfigError::InvalidConfig(
            "base_url must start with http:// or https://".into(),
        ));
    }

    if let Some(socket) = &config.server.socket_url {
        let ok = ["ws://", "wss://", "http://", "https://"]
            .iter()
            .any(|scheme| socket.starts_with(scheme));
        if !ok {
            return Err(ConfigError::InvalidConfig(
                "socket_url must use ws, wss, http or https".into(),
            ));
        }
    }

    if !config.server.socket_path.starts_with('/') {
        return Err(ConfigError::InvalidConfig(
            "socket_path must start with '/'".into(),
        ));
    }

    if config.reconnect.max_attempts == 0 {
        return Err(ConfigError::InvalidConfig(
            "max_attempts must be greater than 0".into(),
        ));
    }

    Ok(())
}
