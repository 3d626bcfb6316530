use std::time::Duration;

use reqwest::Method;

use crate::context::{ApiClient, ServerEndpoint};
use crate::error::{ClientError, Result};
use crate::validate;

pub const HEALTH_PATH: &str = "/api/test";

/// Check that `endpoint` answers its health route with a success status.
///
/// Any failure, including a non-success status, comes back as
/// [`ClientError::Unreachable`] so callers can keep their current settings.
pub async fn probe(endpoint: &ServerEndpoint, timeout: Option<Duration>) -> Result<()> {
    validate::required("Server IP", &endpoint.host)?;
    validate::required("Server port", &endpoint.port)?;

    let unreachable_err = |reason: String| ClientError::Unreachable {
        host: endpoint.host.clone(),
        port: endpoint.port.clone(),
        reason,
    };

    let api = ApiClient::with_timeout(endpoint.clone(), None, timeout)?;
    let resp = api
        .request(Method::GET, HEALTH_PATH)?
        .send()
        .await
        .map_err(|e| unreachable_err(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(unreachable_err(format!("health check returned {status}")));
    }
    log::info!("server {}:{} is reachable", endpoint.host, endpoint.port);
    Ok(())
}
