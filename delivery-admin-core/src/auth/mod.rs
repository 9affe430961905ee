//! Authentication: the sign-in boundary, a store-backed admin directory,
//! and the session state the panel consults.

mod directory;
mod session;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::User;
use crate::prefs::LocalStorageError;
use crate::store::StoreError;

pub use directory::{AdminDirectory, MIN_PASSWORD_LEN};
pub use session::{AuthSession, SessionState, USER_KEY};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No admin account for {0}")]
    UserNotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Admin account already exists: {0}")]
    AlreadyExists(String),

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    LocalStorage(#[from] LocalStorageError),
}

impl AuthError {
    /// Short message suitable for showing to the person signing in.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::UserNotFound(_) => "No user found with this email.",
            AuthError::InvalidCredentials => "Incorrect password.",
            AuthError::InvalidEmail(_) => "Invalid email address.",
            _ => "Failed to login. Please try again.",
        }
    }
}

/// Exchanges credentials for a user profile.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;
}
