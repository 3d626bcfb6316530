//! Remote device/stream map.
//!
//! The backend owns the map; the registry only mirrors it. Entries are keyed
//! by name, every read replaces the whole local list, and every successful
//! mutation is followed by a fresh read rather than a local insert/remove.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::context::{ApiClient, ServerEndpoint};
use crate::error::Result;
use crate::validate;
use crate::wire;

pub const LIST_PATH: &str = "/api/getDevicesurl";
pub const UPDATE_PATH: &str = "/api/updatedevices";
pub const DELETE_PATH: &str = "/api/deleteDevice";
pub const DEFAULT_STREAM_PREFIX: &str = "/vidstr/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamEntry {
    pub name: String,
    pub url: String,
}

/// How a playable URL is derived from the backend's raw map value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlStrategy {
    /// The map value is the URL.
    Verbatim,
    /// The backend proxies every stream at `<prefix><name>` on itself.
    #[default]
    Synthesized,
}

#[derive(Debug, Clone)]
pub struct StreamRegistry {
    strategy: UrlStrategy,
    prefix: String,
    entries: Vec<StreamEntry>,
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new(UrlStrategy::default())
    }
}

impl StreamRegistry {
    pub fn new(strategy: UrlStrategy) -> Self {
        Self {
            strategy,
            prefix: DEFAULT_STREAM_PREFIX.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Entries from the last successful read, sorted by name.
    pub fn entries(&self) -> &[StreamEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&StreamEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Fetch the map and replace the local list with it.
    pub async fn list(&mut self, api: &ApiClient) -> Result<&[StreamEntry]> {
        let resp = api.authed(Method::GET, LIST_PATH)?.send().await?;
        let resp = wire::check(resp).await?;
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&resp.text().await?)?;

        self.entries = raw
            .into_iter()
            .map(|(name, value)| {
                let url = self.resolve_url(api.endpoint(), &name, &value);
                StreamEntry { name, url }
            })
            .collect();
        log::debug!("stream list refreshed: {} entries", self.entries.len());
        Ok(&self.entries)
    }

    /// Add or overwrite one stream, then re-read the map.
    pub async fn add(&mut self, api: &ApiClient, name: &str, url: &str) -> Result<&[StreamEntry]> {
        validate::required("Stream name", name)?;
        validate::required("Stream URL", url)?;

        let mut device_url = BTreeMap::new();
        device_url.insert(name.trim(), url.trim());
        let body = serde_json::json!({ "device_url": device_url });

        let resp = api.authed(Method::PUT, UPDATE_PATH)?.json(&body).send().await?;
        wire::check(resp).await?;
        log::info!("stream {} added", name.trim());
        self.list(api).await
    }

    /// Remove one stream by name, then re-read the map.
    pub async fn delete(&mut self, api: &ApiClient, name: &str) -> Result<&[StreamEntry]> {
        validate::required("Stream name", name)?;
        let name = name.trim();

        let body = serde_json::json!({ "key": name });
        let resp = api.authed(Method::POST, DELETE_PATH)?.json(&body).send().await?;
        wire::check(resp).await?;
        log::info!("stream {name} deleted");
        self.list(api).await
    }

    fn resolve_url(&self, endpoint: &ServerEndpoint, name: &str, raw: &serde_json::Value) -> String {
        match (self.strategy, raw) {
            (UrlStrategy::Verbatim, serde_json::Value::String(url)) if !url.trim().is_empty() => {
                url.trim().to_string()
            }
            (UrlStrategy::Verbatim, other) => {
                log::debug!("stream {name} has no usable url ({other}), synthesizing one");
                self.synthesize(endpoint, name)
            }
            (UrlStrategy::Synthesized, _) => self.synthesize(endpoint, name),
        }
    }

    fn synthesize(&self, endpoint: &ServerEndpoint, name: &str) -> String {
        endpoint.http_url(&format!("{}{}", self.prefix, name))
    }
}
