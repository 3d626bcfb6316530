//! Login, signup, logout and device-token registration.
//!
//! [`AuthFlow`] tracks where the user is in the
//! `Unauthenticated -> Authenticating -> Authenticated` sequence, with a
//! `Registering` detour that always lands back on `Unauthenticated`.
//! Failures never retry; the flow falls back to `Unauthenticated` and the
//! error is handed to the caller.

use reqwest::Method;
use serde::Deserialize;

use crate::context::{ApiClient, Session};
use crate::error::{ClientError, Result};
use crate::validate;
use crate::wire;

pub const LOGIN_PATH: &str = "/api/login";
pub const REGISTER_PATH: &str = "/api/register";
pub const LOGOUT_PATH: &str = "/api/logout";
pub const SEND_TOKEN_PATH: &str = "/api/sendToken";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        validate::email(&self.email)?;
        validate::password(&self.password)
    }
}

#[derive(Debug, Clone)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    fn validate(&self) -> Result<()> {
        validate::email(&self.email)?;
        validate::password(&self.password)?;
        validate::password_confirmation(&self.password, &self.confirm_password)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Registering,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(deserialize_with = "wire::string_or_number")]
    id: String,
    csrf: String,
}

#[derive(Debug, Default)]
pub struct AuthFlow {
    state: AuthState,
}

impl AuthFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a session restored from local storage.
    pub fn restored(session: Option<&Session>) -> Self {
        let state = match session {
            Some(s) if s.is_complete() => AuthState::Authenticated,
            _ => AuthState::Unauthenticated,
        };
        Self { state }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Exchange credentials for a session. Malformed credentials are
    /// rejected without touching the network.
    pub async fn login(&mut self, api: &ApiClient, creds: &Credentials) -> Result<Session> {
        creds.validate()?;
        self.state = AuthState::Authenticating;
        match request_login(api, creds).await {
            Ok(session) => {
                log::info!("logged in as user {}", session.user_id);
                self.state = AuthState::Authenticated;
                Ok(session)
            }
            Err(e) => {
                log::warn!("login failed: {e}");
                self.state = AuthState::Unauthenticated;
                Err(e)
            }
        }
    }

    /// Create an account. Returns the message to show the user.
    pub async fn register(&mut self, api: &ApiClient, form: &SignupForm) -> Result<String> {
        form.validate()?;
        self.state = AuthState::Registering;
        let result = request_register(api, form).await;
        self.state = AuthState::Unauthenticated;
        if let Err(e) = &result {
            log::warn!("signup failed: {e}");
        }
        result
    }

    /// Forget the session after a logout.
    pub fn reset(&mut self) {
        self.state = AuthState::Unauthenticated;
    }
}

async fn request_login(api: &ApiClient, creds: &Credentials) -> Result<Session> {
    let body = serde_json::json!({
        "email": creds.email.trim(),
        "password": creds.password,
    });
    let resp = api.request(Method::POST, LOGIN_PATH)?.json(&body).send().await?;
    let resp = wire::check(resp).await?;
    let body: LoginResponse = serde_json::from_str(&resp.text().await?)?;
    let session = Session::new(body.id, body.csrf);
    if !session.is_complete() {
        return Err(ClientError::Protocol(
            "login response is missing id or csrf".to_string(),
        ));
    }
    Ok(session)
}

async fn request_register(api: &ApiClient, form: &SignupForm) -> Result<String> {
    let body = serde_json::json!({
        "email": form.email.trim(),
        "password": form.password,
    });
    let resp = api.request(Method::POST, REGISTER_PATH)?.json(&body).send().await?;
    let resp = wire::check(resp).await?;
    Ok(wire::success_message(resp)
        .await
        .unwrap_or_else(|| "Signup successful! You can now log in.".to_string()))
}

/// Tell the backend the session is over. The caller owns the local
/// deletion; this only reports whether the server heard about it.
pub async fn logout(api: &ApiClient) -> Result<String> {
    let session = api.require_session()?;
    let body = serde_json::json!({ "token": session.device_token });
    let resp = api.authed(Method::POST, LOGOUT_PATH)?.json(&body).send().await?;
    let resp = wire::check(resp).await?;
    Ok(wire::success_message(resp)
        .await
        .unwrap_or_else(|| "Logged out".to_string()))
}

/// Register this device's push token with the backend.
pub async fn send_device_token(api: &ApiClient, token: &str) -> Result<()> {
    validate::required("Device token", token)?;
    let body = serde_json::json!({ "token": token });
    let resp = api
        .authed(Method::POST, SEND_TOKEN_PATH)?
        .json(&body)
        .send()
        .await?;
    wire::check(resp).await?;
    log::info!("device token registered");
    Ok(())
}
