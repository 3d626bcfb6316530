use reqwest::Method;

use crate::context::ApiClient;
use crate::error::Result;
use crate::validate;
use crate::wire;

pub const LIST_PATH: &str = "/api/GetTrainedData";
pub const DELETE_PATH: &str = "/api/deleteImage";

/// Names of the people the backend holds face data for.
#[derive(Debug, Clone, Default)]
pub struct TrainedData {
    names: Vec<String>,
}

impl TrainedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub async fn list(&mut self, api: &ApiClient) -> Result<&[String]> {
        let resp = api.authed(Method::GET, LIST_PATH)?.send().await?;
        let resp = wire::check(resp).await?;
        self.names = serde_json::from_str(&resp.text().await?)?;
        Ok(&self.names)
    }

    /// Drop a person's enrollment. On success the name is filtered out of
    /// the local list without a re-read.
    pub async fn delete(&mut self, api: &ApiClient, name: &str) -> Result<()> {
        validate::required("Name", name)?;
        let body = serde_json::json!({ "name": name });
        let resp = api.authed(Method::POST, DELETE_PATH)?.json(&body).send().await?;
        wire::check(resp).await?;
        self.names.retain(|n| n != name);
        log::info!("trained data for {name} deleted");
        Ok(())
    }
}
