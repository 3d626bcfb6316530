use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use vigil_client::notify::NOTIFICATIONS_PATH;
use vigil_client::streams::DEFAULT_STREAM_PREFIX;
use vigil_client::{probe, ListenerOptions, ServerEndpoint, UrlStrategy};

use crate::storage::{KvStore, SERVER_IP, SERVER_PORT};

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "vigil")
}

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| match option_env!("VIGIL_CONFIG_PATH") {
    Some(path) => PathBuf::from(path),
    None => project_dirs()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("vigil.toml")),
});

pub static STORE_PATH: Lazy<PathBuf> = Lazy::new(|| match option_env!("VIGIL_STORE_PATH") {
    Some(path) => PathBuf::from(path),
    None => project_dirs()
        .map(|d| d.data_dir().join("store.bin"))
        .unwrap_or_else(|| PathBuf::from("vigil-store.bin")),
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overall HTTP timeout; unset keeps the transport default.
    pub request_timeout_secs: Option<u64>,
    pub stream_urls: UrlStrategy,
    pub stream_path_prefix: String,
    pub notifications_path: String,
    /// Unset disables escalation; unknown identities are only counted.
    pub unknown_alert_threshold: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            stream_urls: UrlStrategy::default(),
            stream_path_prefix: DEFAULT_STREAM_PREFIX.to_string(),
            notifications_path: NOTIFICATIONS_PATH.to_string(),
            unknown_alert_threshold: None,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn listener_options(&self) -> ListenerOptions {
        ListenerOptions {
            path: self.notifications_path.clone(),
            unknown_alert_threshold: self.unknown_alert_threshold,
            ..ListenerOptions::default()
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

/// Stored backend address; empty strings when never set.
pub fn server_endpoint(store: &KvStore) -> ServerEndpoint {
    ServerEndpoint::new(
        store.get(SERVER_IP).unwrap_or_default(),
        store.get(SERVER_PORT).unwrap_or_default(),
    )
}

/// Persist a new backend address, but only after it answers the health
/// probe. On any failure the stored address is left untouched.
pub async fn save_server_endpoint(
    store: &mut KvStore,
    host: &str,
    port: &str,
    timeout: Option<Duration>,
) -> Result<ServerEndpoint> {
    let endpoint = ServerEndpoint::new(host.trim(), port.trim());
    probe::probe(&endpoint, timeout).await?;
    store
        .set_many(&[(SERVER_IP, endpoint.host.as_str()), (SERVER_PORT, endpoint.port.as_str())])
        .context("saving server address")?;
    log::info!("server set to {}:{}", endpoint.host, endpoint.port);
    Ok(endpoint)
}
