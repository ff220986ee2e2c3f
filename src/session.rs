//! Signed-in user state shared by the request client and the controllers.
//!
//! The identity provider lives outside this crate; whatever signs the user in
//! hands the resulting [`Session`] to [`SessionStore::sign_in`]. Interested
//! parties subscribe and are notified on every sign-in and sign-out.

use std::{fmt, sync::Arc};

use tokio::sync::watch;
use tracing::info;

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    access_token: String,
}

impl Session {
    pub fn new(email: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            photo_url: None,
            access_token: access_token.into(),
        }
    }

    pub fn with_profile(
        mut self,
        display_name: Option<String>,
        photo_url: Option<String>,
    ) -> Self {
        self.display_name = display_name;
        self.photo_url = photo_url;
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Ownership is plain string equality against a movie's `addedBy`.
    pub fn owns(&self, added_by: &str) -> bool {
        self.email == added_by
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("photo_url", &self.photo_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

pub type SessionReceiver = watch::Receiver<Option<Arc<Session>>>;

/// Cheap to clone; all clones observe the same session.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Option<Arc<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn sign_in(&self, session: Session) {
        info!(email = %session.email, "signed in");
        self.tx.send_replace(Some(Arc::new(session)));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.tx.send_replace(None) {
            info!(email = %previous.email, "signed out");
        }
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.tx.borrow().clone()
    }

    pub fn email(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|s| s.email.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|s| s.access_token.clone()).filter(|t| !t.is_empty())
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// The receiver starts marked as seen; `changed()` resolves on the next
    /// sign-in or sign-out.
    pub fn subscribe(&self) -> SessionReceiver {
        self.tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").field("session", &*self.tx.borrow()).finish()
    }
}
