//! The signed-in session, mirrored to local storage across runs.

use std::sync::Arc;

use super::{AuthError, Authenticator};
use crate::models::User;
use crate::notify::{Notification, Notifier};
use crate::prefs::LocalStorage;

/// Local storage key holding the serialized [`User`].
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Persisted state has not been read yet.
    Loading,
    Authenticated(User),
    Unauthenticated,
}

pub struct AuthSession {
    authenticator: Arc<dyn Authenticator>,
    storage: Arc<LocalStorage>,
    notifier: Arc<dyn Notifier>,
    state: SessionState,
}

impl AuthSession {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        storage: Arc<LocalStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            authenticator,
            storage,
            notifier,
            state: SessionState::Loading,
        }
    }

    /// Restores a persisted session. Unreadable data is dropped and the
    /// session becomes unauthenticated.
    pub fn restore(&mut self) -> &SessionState {
        self.state = match self.storage.get_json::<User>(USER_KEY) {
            Ok(Some(user)) => {
                tracing::debug!(email = %user.email, "Session restored");
                SessionState::Authenticated(user)
            }
            Ok(None) => SessionState::Unauthenticated,
            Err(e) => {
                tracing::warn!("Discarding stored session: {}", e);
                if let Err(e) = self.storage.remove(USER_KEY) {
                    tracing::warn!("Failed to clear stored session: {}", e);
                }
                SessionState::Unauthenticated
            }
        };
        &self.state
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    /// Signs in, persisting and activating the session on success. Failures
    /// are reported to the notifier and returned.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        let result = match self.authenticator.sign_in(email, password).await {
            Ok(user) => self
                .storage
                .set_json(USER_KEY, &user)
                .map(|_| user)
                .map_err(AuthError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(user) => {
                tracing::info!(email = %user.email, "Logged in");
                self.state = SessionState::Authenticated(user.clone());
                self.notifier
                    .notify(Notification::success("Successfully logged in!"));
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(email, "Login failed: {}", e);
                self.notifier.notify(Notification::error(e.user_message()));
                Err(e)
            }
        }
    }

    /// Ends the session. Storage failures are logged, never returned.
    pub fn logout(&mut self) {
        self.state = SessionState::Unauthenticated;
        if let Err(e) = self.storage.remove(USER_KEY) {
            tracing::warn!("Failed to clear stored session: {}", e);
        }
        tracing::info!("Logged out");
        self.notifier
            .notify(Notification::info("Logged out successfully"));
    }
}
