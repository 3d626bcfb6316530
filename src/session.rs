use anyhow::{Context, Result};
use vigil_client::Session;

use crate::storage::{KvStore, CSRF, DEVICE_TOKEN, USER_ID};

/// The stored session, if both the user id and CSRF token are present.
pub fn load(store: &KvStore) -> Option<Session> {
    let user_id = store.get(USER_ID).filter(|v| !v.is_empty())?;
    let csrf = store.get(CSRF).filter(|v| !v.is_empty())?;
    let mut session = Session::new(user_id, csrf);
    session.device_token = store.get(DEVICE_TOKEN).map(str::to_owned);
    Some(session)
}

pub fn save(store: &mut KvStore, session: &Session) -> Result<()> {
    store
        .set_many(&[
            (USER_ID, session.user_id.as_str()),
            (CSRF, session.csrf_token.as_str()),
        ])
        .context("saving session")
}

pub fn save_device_token(store: &mut KvStore, token: &str) -> Result<()> {
    store.set(DEVICE_TOKEN, token).context("saving device token")
}

pub fn clear(store: &mut KvStore) -> Result<()> {
    store
        .remove(&[USER_ID, CSRF, DEVICE_TOKEN])
        .context("clearing session")
}
