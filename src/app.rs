//! Local state plus the backend client, handed to each command.
//!
//! `App` is the only place that reads or writes the persisted store; the
//! network components receive an [`ApiClient`] built from it instead of
//! looking anything up themselves.

use anyhow::{Context, Result};
use std::path::Path;

use vigil_client::{
    auth, ApiClient, AuthFlow, AuthState, ClientError, Credentials, Enrollment,
    NotificationListener, ServerEndpoint, Session, SignupForm, StreamRegistry,
    validate,
};

use crate::config::{self, Config, STORE_PATH};
use crate::session;
use crate::storage::KvStore;

pub struct App {
    config: Config,
    store: KvStore,
    auth: AuthFlow,
}

impl App {
    pub fn open(config_path: Option<&Path>, store_path: Option<&Path>) -> Result<Self> {
        let config = config::load_config(config_path)?;
        let store = KvStore::open(store_path.unwrap_or(STORE_PATH.as_path())).context("opening local store")?;
        let auth = AuthFlow::restored(session::load(&store).as_ref());
        Ok(Self {
            config,
            store,
            auth,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    pub fn server(&self) -> ServerEndpoint {
        config::server_endpoint(&self.store)
    }

    /// Switch backends after a successful health probe.
    pub async fn set_server(&mut self, host: &str, port: &str) -> Result<ServerEndpoint> {
        config::save_server_endpoint(&mut self.store, host, port, self.config.request_timeout())
            .await
    }

    pub fn session(&self) -> Option<Session> {
        session::load(&self.store)
    }

    /// A client for the stored backend, carrying the stored session.
    pub fn client(&self) -> Result<ApiClient> {
        Ok(ApiClient::with_timeout(
            self.server(),
            self.session(),
            self.config.request_timeout(),
        )?)
    }

    pub fn stream_registry(&self) -> StreamRegistry {
        StreamRegistry::new(self.config.stream_urls).with_prefix(self.config.stream_path_prefix.clone())
    }

    pub async fn login(&mut self, creds: &Credentials) -> Result<Session> {
        let api = self.client()?;
        let session = self.auth.login(&api, creds).await?;
        if let Err(e) = session::save(&mut self.store, &session) {
            self.auth.reset();
            return Err(e);
        }
        Ok(session)
    }

    pub async fn signup(&mut self, form: &SignupForm) -> Result<String> {
        let api = self.client()?;
        Ok(self.auth.register(&api, form).await?)
    }

    /// End the session. The local session is removed whether or not the
    /// backend acknowledges; `None` means it did not.
    pub async fn logout(&mut self) -> Result<Option<String>> {
        if self.session().is_none() {
            return Err(ClientError::MissingSession.into());
        }
        let api = self.client()?;
        let acknowledged = match auth::logout(&api).await {
            Ok(message) => Some(message),
            Err(e) => {
                log::warn!("logout not acknowledged by server: {e}");
                None
            }
        };
        session::clear(&mut self.store)?;
        self.auth.reset();
        Ok(acknowledged)
    }

    /// Remember this device's push token and hand it to the backend.
    pub async fn register_device(&mut self, token: &str) -> Result<()> {
        validate::required("Device token", token)?;
        session::save_device_token(&mut self.store, token)?;
        let api = self.client()?;
        auth::send_device_token(&api, token).await?;
        Ok(())
    }

    pub async fn upload(&self, enrollment: &mut Enrollment) -> Result<()> {
        let api = self.client()?;
        enrollment.upload(&api).await?;
        Ok(())
    }

    pub async fn listen(&self) -> Result<NotificationListener> {
        Ok(NotificationListener::connect(&self.server(), self.config.listener_options()).await?)
    }
}
