//! Admin accounts kept in the `admins` collection, keyed by email.
//!
//! Passwords are stored as Argon2 PHC strings, which carry their own salt
//! and parameters.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::{AuthError, Authenticator};
use crate::models::{User, ADMINS};
use crate::store::{DocumentStore, FieldValue, Fields};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct AdminDirectory {
    store: Arc<dyn DocumentStore>,
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(email)
        }
        _ => Err(AuthError::InvalidEmail(email)),
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Unparseable stored hashes never verify.
fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

impl AdminDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Registers an admin account and returns its profile.
    pub async fn add_admin(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }
        if self.store.get(ADMINS, &email).await?.is_some() {
            return Err(AuthError::AlreadyExists(email));
        }

        let mut user = User::new(Uuid::new_v4().simple().to_string(), email.clone());
        if let Some(name) = display_name {
            user = user.with_display_name(name);
        }

        let password_hash = hash_password(password)?;
        let mut fields = Fields::new();
        fields.insert("uid".into(), user.uid.clone().into());
        fields.insert("email".into(), email.clone().into());
        fields.insert("displayName".into(), user.display_name.clone().into());
        fields.insert("role".into(), user.role.clone().into());
        fields.insert("passwordHash".into(), password_hash.into());
        fields.insert("createdAt".into(), FieldValue::ServerTimestamp);

        self.store.set(ADMINS, &email, fields).await?;
        tracing::info!(email = %email, "Admin account added");
        Ok(user)
    }
}

#[async_trait]
impl Authenticator for AdminDirectory {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        let doc = self
            .store
            .get(ADMINS, &email)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(email.clone()))?;

        let stored = doc.get_str("passwordHash").unwrap_or_default();
        if !verify_password(password, stored) {
            return Err(AuthError::InvalidCredentials);
        }

        let mut user = User::new(doc.get_str("uid").unwrap_or(&doc.id), email);
        if let Some(name) = doc.get_str("displayName") {
            user = user.with_display_name(name);
        }
        if let Some(role) = doc.get_str("role") {
            user = user.with_role(role);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;

    fn directory() -> AdminDirectory {
        AdminDirectory::new(Arc::new(LocalStore::in_memory()))
    }

    #[test]
    fn test_hash_is_salted_argon2() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(verify_password("secret", &a));
        assert!(verify_password("secret", &b));
        assert!(!verify_password("Secret", &a));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("secret", ""));
        assert!(!verify_password("secret", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_stored_hash_is_phc_without_separate_salt() {
        let store = Arc::new(LocalStore::in_memory());
        let directory = AdminDirectory::new(store.clone());
        directory
            .add_admin("ops@example.com", "hunter22", None)
            .await
            .unwrap();

        let doc = store.get(ADMINS, "ops@example.com").await.unwrap().unwrap();
        let stored = doc.get_str("passwordHash").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("hunter22"));
        assert!(doc.get("salt").is_none());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ops@Example.COM ").unwrap(), "ops@example.com");
        for bad in ["", "nobody", "@example.com", "a@", "a@b@c"] {
            assert!(matches!(normalize_email(bad), Err(AuthError::InvalidEmail(_))));
        }
    }

    #[tokio::test]
    async fn test_sign_in_round_trip() {
        let directory = directory();
        let added = directory
            .add_admin("ops@example.com", "hunter22", Some("Ops"))
            .await
            .unwrap();

        let user = directory.sign_in("OPS@example.com", "hunter22").await.unwrap();
        assert_eq!(user, added);
        assert_eq!(user.display_name.as_deref(), Some("Ops"));
    }

    #[tokio::test]
    async fn test_sign_in_failures() {
        let directory = directory();
        directory
            .add_admin("ops@example.com", "hunter22", None)
            .await
            .unwrap();

        assert!(matches!(
            directory.sign_in("ops@example.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            directory.sign_in("ghost@example.com", "hunter22").await,
            Err(AuthError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_admin_rejects_duplicates_and_weak_passwords() {
        let directory = directory();
        directory
            .add_admin("ops@example.com", "hunter22", None)
            .await
            .unwrap();

        assert!(matches!(
            directory.add_admin("Ops@Example.com", "another1", None).await,
            Err(AuthError::AlreadyExists(_))
        ));
        assert!(matches!(
            directory.add_admin("new@example.com", "abc", None).await,
            Err(AuthError::WeakPassword(MIN_PASSWORD_LEN))
        ));
    }
}
