//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.chatter/config.json`) and environment.
//! Only the server addresses are configurable; everything else is fixed client behaviour.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Message server addresses.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Login and realtime endpoints of the message server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Base URL for `POST /login` (default "http://localhost:3001"). Overridden by CHATTER_SERVER_URL env.
    #[serde(default = "default_server_url")]
    pub url: String,

    /// WebSocket URL. When absent, derived from `url` (http → ws, https → wss, path `/ws`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_url: Option<String>,
}

fn default_server_url() -> String {
    "http://localhost:3001".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            realtime_url: None,
        }
    }
}

/// Env var that overrides `server.url` when set to a non-blank value.
pub const SERVER_URL_ENV: &str = "CHATTER_SERVER_URL";

/// Resolve the server base URL: env CHATTER_SERVER_URL overrides config.
pub fn resolve_server_url(config: &Config) -> String {
    server_url_with_override(config, std::env::var(SERVER_URL_ENV).ok())
}

fn server_url_with_override(config: &Config, env_url: Option<String>) -> String {
    env_url
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.server.url.trim().to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve the realtime WebSocket URL: `server.realtimeUrl` if set, else derived from the server URL.
pub fn resolve_realtime_url(config: &Config) -> Result<String> {
    if let Some(url) = config
        .server
        .realtime_url
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        return Ok(url.to_string());
    }
    realtime_url_from_server(&resolve_server_url(config))
}

fn realtime_url_from_server(server_url: &str) -> Result<String> {
    let mut url = reqwest::Url::parse(server_url)
        .with_context(|| format!("parsing server url {}", server_url))?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => anyhow::bail!("unsupported server url scheme: {}", other),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("cannot switch {} to {}", server_url, scheme))?;
    url.set_path("/ws");
    Ok(url.to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CHATTER_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".chatter").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or CHATTER_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
