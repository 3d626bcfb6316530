//! The context every networked component receives explicitly: where the
//! backend lives and who we are authenticated as.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const USER_ID_HEADER: &str = "id";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: String,
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty() && !self.port.trim().is_empty()
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.host.trim(), self.port.trim(), path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}:{}{}", self.host.trim(), self.port.trim(), path)
    }
}

/// Credentials issued by the backend at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub csrf_token: String,
    pub device_token: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            csrf_token: csrf_token.into(),
            device_token: None,
        }
    }

    /// Both the user id and the CSRF token are present.
    pub fn is_complete(&self) -> bool {
        !self.user_id.is_empty() && !self.csrf_token.is_empty()
    }
}

/// HTTP handle bound to one backend endpoint and, optionally, one session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: ServerEndpoint,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(endpoint: ServerEndpoint, session: Option<Session>) -> Result<Self> {
        Self::with_timeout(endpoint, session, None)
    }

    /// `None` leaves the transport default in place.
    pub fn with_timeout(
        endpoint: ServerEndpoint,
        session: Option<Session>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            endpoint,
            session,
        })
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn set_session(&mut self, session: Option<Session>) {
        self.session = session;
    }

    pub fn url(&self, path: &str) -> String {
        self.endpoint.http_url(path)
    }

    pub(crate) fn require_session(&self) -> Result<&Session> {
        match &self.session {
            Some(session) if session.is_complete() => Ok(session),
            _ => Err(ClientError::MissingSession),
        }
    }

    /// Unauthenticated JSON request.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        if !self.endpoint.is_configured() {
            return Err(ClientError::NotConfigured);
        }
        let url = self.url(path);
        log::debug!("{} {}", method, url);
        Ok(self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json"))
    }

    /// Authenticated JSON request. Fails before anything is sent when the
    /// session is incomplete.
    pub(crate) fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let session = self.require_session()?;
        Ok(self
            .request(method, path)?
            .header(CSRF_HEADER, &session.csrf_token)
            .header(USER_ID_HEADER, &session.user_id))
    }

    /// Authenticated request whose content type is left to the body, as
    /// multipart needs its own boundary parameter.
    pub(crate) fn authed_raw(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let session = self.require_session()?;
        if !self.endpoint.is_configured() {
            return Err(ClientError::NotConfigured);
        }
        let url = self.url(path);
        log::debug!("{} {}", method, url);
        Ok(self
            .http
            .request(method, url)
            .header(CSRF_HEADER, &session.csrf_token)
            .header(USER_ID_HEADER, &session.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_host_and_port() {
        let ep = ServerEndpoint::new(" 10.0.0.5 ", "5000");
        assert_eq!(ep.http_url("/api/test"), "http://10.0.0.5:5000/api/test");
        assert_eq!(
            ep.ws_url("/ws/notifications/"),
            "ws://10.0.0.5:5000/ws/notifications/"
        );
    }

    #[test]
    fn incomplete_session_is_rejected_locally() {
        let ep = ServerEndpoint::new("localhost", "1");
        let api = ApiClient::new(ep.clone(), Some(Session::new("42", ""))).unwrap();
        assert!(matches!(
            api.authed(Method::GET, "/api/getDevicesurl"),
            Err(ClientError::MissingSession)
        ));

        let api = ApiClient::new(ep, None).unwrap();
        assert!(matches!(
            api.require_session(),
            Err(ClientError::MissingSession)
        ));
    }

    #[test]
    fn unconfigured_endpoint_is_a_precondition_failure() {
        let api = ApiClient::new(ServerEndpoint::default(), None).unwrap();
        let err = api.request(Method::GET, "/api/test").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Precondition);
    }
}
