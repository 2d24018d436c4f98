use std::sync::Arc;

use tokio::sync::watch;

use crate::auth::dto::{AuthUser, Session};
use crate::error::{Error, Result};

/// Holds the current authentication session and notifies observers when it
/// changes. Owned by [`crate::state::AppState`] and passed explicitly; there
/// is no ambient global session.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current session, if signed in.
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Caller identity every domain service derives its user id from.
    pub fn current_user(&self) -> Result<AuthUser> {
        self.current().map(|s| s.user).ok_or(Error::NotSignedIn)
    }

    pub fn access_token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|s| s.access_token.clone())
    }

    pub fn set(&self, session: Session) {
        self.tx.send_replace(Some(session));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Observer handle; `changed().await` resolves on every sign-in,
    /// sign-out and refresh.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
