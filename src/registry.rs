//! Account creation and existence queries.

use std::sync::Arc;

use serde::Serialize;
use validator::Validate;

use crate::crypto::{CredentialHasher, CryptoError};
use crate::database::AccountStore;
use crate::error::{AccountError, Result};
use crate::model::body::RegistrationForm;
use crate::telemetry::{ACCOUNTS_REGISTERED, record_rejection};
use crate::user::User;

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub username: String,
}

/// Gatekeeper for account creation.
#[derive(Clone)]
pub struct AccountRegistry {
    store: Arc<dyn AccountStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl AccountRegistry {
    /// Create a new [`AccountRegistry`].
    pub fn new(
        store: Arc<dyn AccountStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self { store, hasher }
    }

    /// Validate the form, then create an account holding the default role.
    ///
    /// Lookups before the write are early exits only; a conflict reported
    /// by the store at write time is authoritative.
    ///
    /// # Errors
    ///
    /// - [`AccountError::Validation`] on a malformed form;
    /// - [`AccountError::DuplicateUsername`] if the username is taken;
    /// - [`AccountError::DuplicateEmail`] if the email is taken.
    #[tracing::instrument(skip_all, fields(username = %form.username))]
    pub async fn register(&self, form: &RegistrationForm) -> Result<Registration> {
        match self.try_register(form).await {
            Ok(registration) => {
                metrics::counter!(ACCOUNTS_REGISTERED).increment(1);
                tracing::info!("account registered");
                Ok(registration)
            },
            Err(err) => {
                record_rejection(err.kind());
                tracing::warn!(reason = err.kind(), "registration rejected");
                Err(err)
            },
        }
    }

    async fn try_register(&self, form: &RegistrationForm) -> Result<Registration> {
        form.validate()?;

        if self.store.find_by_username(&form.username).await?.is_some() {
            return Err(AccountError::DuplicateUsername(form.username.clone()));
        }
        if self.store.find_by_email(&form.email).await?.is_some() {
            return Err(AccountError::DuplicateEmail);
        }

        let hash = self.hasher.hash(&form.password)?;
        let user = User::builder()
            .username(form.username.as_str())
            .email(form.email.as_str())
            .password(hash)
            .build();

        self.store.save(&user).await?;

        Ok(Registration {
            username: user.username().to_owned(),
        })
    }

    /// Whether an account is keyed by `username`.
    ///
    /// # Errors
    ///
    /// Store failures are returned as errors, never read as "absent".
    pub async fn exists_by_username(&self, username: &str) -> Result<bool> {
        let exists = self.store.find_by_username(username).await?.is_some();
        tracing::debug!(%username, exists, "username lookup");
        Ok(exists)
    }

    /// Whether an account uses `email`.
    ///
    /// # Errors
    ///
    /// Store failures are returned as errors, never read as "absent".
    pub async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let exists = self.store.find_by_email(email).await?.is_some();
        tracing::debug!(exists, "email lookup");
        Ok(exists)
    }

    /// See [`crate::password::is_password_strong`].
    pub fn is_password_strong(password: &str) -> bool {
        crate::password::is_password_strong(password)
    }

    /// Load an account.
    pub async fn find(&self, username: &str) -> Result<Option<User>> {
        self.store.find_by_username(username).await
    }

    /// Write back mutations made on a loaded [`User`].
    pub async fn persist(&self, user: &User) -> Result<()> {
        self.store.update(user).await
    }

    /// Delete an account together with its ownership links.
    pub async fn delete(&self, username: &str) -> Result<()> {
        self.store.delete(username).await?;
        tracing::info!(%username, "account deleted");
        Ok(())
    }

    /// Verify a plaintext password against the stored credential.
    ///
    /// Returns `false` for unknown accounts and wrong passwords.
    ///
    /// # Errors
    ///
    /// [`AccountError::Crypto`] when the stored hash is unusable or hashing
    /// fails.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool> {
        let Some(user) = self.store.find_by_username(username).await? else {
            return Ok(false);
        };

        match self.hasher.verify(password, user.credential_hash()) {
            Ok(()) => Ok(true),
            Err(CryptoError::Mismatch) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Argon2;
    use crate::crypto::{PasswordHash, PasswordManager};
    use crate::database::MemoryStore;
    use crate::role::Role;
    use crate::user::{FAVORITE_LIMIT, FavoriteId, PostId};
    use async_trait::async_trait;

    fn hasher() -> Arc<PasswordManager> {
        Arc::new(
            PasswordManager::new(Some(Argon2 {
                memory_cost: 1024,
                iterations: 1,
                parallelism: 1,
                hash_length: 32,
            }))
            .unwrap(),
        )
    }

    fn registry() -> (AccountRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AccountRegistry::new(store.clone(), hasher()), store)
    }

    fn form(username: &str) -> RegistrationForm {
        RegistrationForm::new(
            username,
            "Abcdef1!",
            format!("{username}@actionprice.com"),
        )
    }

    #[tokio::test]
    async fn test_register() {
        let (registry, _) = registry();

        assert!(!registry.exists_by_username("johndoe").await.unwrap());
        let registration = registry.register(&form("johndoe")).await.unwrap();
        assert_eq!(registration.username, "johndoe");

        assert!(registry.exists_by_username("johndoe").await.unwrap());
        assert!(
            registry
                .exists_by_email("johndoe@actionprice.com")
                .await
                .unwrap()
        );
        assert!(!registry.exists_by_email("other@actionprice.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_registered_account_state() {
        let (registry, _) = registry();
        registry.register(&form("johndoe")).await.unwrap();

        let user = registry.find("johndoe").await.unwrap().unwrap();
        assert_eq!(user.roles().len(), 1);
        assert!(user.has_role(Role::User));
        assert!(user.posts().is_empty());
        assert!(user.favorites().is_empty());
        assert!(user.refresh_token().is_none());
        assert_ne!(user.credential_hash().as_str(), "Abcdef1!");

        assert!(registry.verify_credentials("johndoe", "Abcdef1!").await.unwrap());
        assert!(!registry.verify_credentials("johndoe", "Abcdef1?").await.unwrap());
        assert!(!registry.verify_credentials("janedoe", "Abcdef1!").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let (registry, store) = registry();
        registry.register(&form("johndoe")).await.unwrap();
        let before = registry.find("johndoe").await.unwrap();

        let again = RegistrationForm::new("johndoe", "Xyz12345$", "new@actionprice.com");
        let err = registry.register(&again).await.unwrap_err();
        assert!(matches!(err, AccountError::DuplicateUsername(name) if name == "johndoe"));

        assert_eq!(registry.find("johndoe").await.unwrap(), before);
        assert!(!registry.exists_by_email("new@actionprice.com").await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let (registry, store) = registry();
        registry.register(&form("johndoe")).await.unwrap();

        let other =
            RegistrationForm::new("janedoe", "Abcdef1!", "johndoe@actionprice.com");
        assert!(matches!(
            registry.register(&other).await,
            Err(AccountError::DuplicateEmail)
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_validation_before_store() {
        let (registry, store) = registry();

        for form in [
            RegistrationForm::new("john", "Abcdef1!", "john@actionprice.com"),
            RegistrationForm::new("johndoe", "short", "john@actionprice.com"),
            RegistrationForm::new("johndoe", "Abcdefgh1!123456x", "john@actionprice.com"),
            RegistrationForm::new("johndoe", "Abcdef1!", "not-an-email"),
        ] {
            assert!(matches!(
                registry.register(&form).await,
                Err(AccountError::Validation(_))
            ));
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_register_weak_password() {
        let (registry, _) = registry();
        assert!(!AccountRegistry::is_password_strong("abcdefgh12"));

        let form =
            RegistrationForm::new("johndoe", "abcdefgh12", "john@actionprice.com");
        registry.register(&form).await.unwrap();
        assert!(registry.exists_by_username("johndoe").await.unwrap());
        assert!(
            registry
                .verify_credentials("johndoe", "abcdefgh12")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_register_at_bounds() {
        let (registry, _) = registry();

        for (username, password) in [
            ("johndo", "abcdefgh"),
            ("johndoe_actionprice1", "abcdefghijklmnop"),
            ("janedo", "Abcdefghijklmn1!"),
            ("janedoe_actionprice", "Abcdef1!"),
        ] {
            assert_eq!(
                registry
                    .register(&RegistrationForm::new(
                        username,
                        password,
                        format!("{username}@actionprice.com"),
                    ))
                    .await
                    .unwrap()
                    .username,
                username
            );
            assert!(registry.exists_by_username(username).await.unwrap());
        }

        for (username, password) in [
            ("johnd", "abcdefgh"),
            ("johndoe_actionprice12", "abcdefgh"),
            ("johndoe", "abcdefg"),
            ("johndoe", "abcdefghijklmnopq"),
        ] {
            let form = RegistrationForm::new(
                username,
                password,
                format!("{username}@actionprice.com"),
            );
            assert!(matches!(
                registry.register(&form).await,
                Err(AccountError::Validation(_))
            ));
        }
    }

    /// Hasher whose verification always fails internally.
    struct BrokenHasher(PasswordManager);

    impl CredentialHasher for BrokenHasher {
        fn hash(&self, password: &str) -> std::result::Result<PasswordHash, CryptoError> {
            self.0.hash(password)
        }

        fn verify(
            &self,
            _: &str,
            _: &PasswordHash,
        ) -> std::result::Result<(), CryptoError> {
            Err(CryptoError::Argon2("memory cost too high".into()))
        }
    }

    #[tokio::test]
    async fn test_verify_propagates_hashing_errors() {
        let store = Arc::new(MemoryStore::new());
        let broken = Arc::new(BrokenHasher(
            PasswordManager::new(Some(Argon2 {
                memory_cost: 1024,
                iterations: 1,
                parallelism: 1,
                hash_length: 32,
            }))
            .unwrap(),
        ));
        let registry = AccountRegistry::new(store, broken);
        registry.register(&form("johndoe")).await.unwrap();

        assert!(matches!(
            registry.verify_credentials("johndoe", "Abcdef1!").await,
            Err(AccountError::Crypto(CryptoError::Argon2(_)))
        ));
        assert!(!registry.verify_credentials("janedoe", "Abcdef1!").await.unwrap());
    }

    #[test]
    fn test_is_password_strong() {
        assert!(AccountRegistry::is_password_strong("Abcdef1!"));
        assert!(!AccountRegistry::is_password_strong("abcdefgh"));
        assert!(!AccountRegistry::is_password_strong("Ab1!"));
    }

    #[tokio::test]
    async fn test_persist_and_delete() {
        let (registry, _) = registry();
        registry.register(&form("johndoe")).await.unwrap();

        let mut user = registry.find("johndoe").await.unwrap().unwrap();
        user.add_post(PostId(1));
        for id in 0..FAVORITE_LIMIT as i64 {
            user.add_favorite(FavoriteId(id)).unwrap();
        }
        assert!(user.add_favorite(FavoriteId(99)).is_err());
        registry.persist(&user).await.unwrap();

        let stored = registry.find("johndoe").await.unwrap().unwrap();
        assert_eq!(stored.favorites().len(), FAVORITE_LIMIT);
        assert!(stored.posts().contains(&PostId(1)));

        registry.delete("johndoe").await.unwrap();
        assert!(!registry.exists_by_username("johndoe").await.unwrap());
    }

    /// Store whose lookups always miss, as under a concurrent registration.
    struct RacyStore(MemoryStore);

    #[async_trait]
    impl AccountStore for RacyStore {
        async fn find_by_username(&self, _: &str) -> Result<Option<User>> {
            Ok(None)
        }

        async fn find_by_email(&self, _: &str) -> Result<Option<User>> {
            Ok(None)
        }

        async fn save(&self, user: &User) -> Result<()> {
            self.0.save(user).await
        }

        async fn update(&self, user: &User) -> Result<()> {
            self.0.update(user).await
        }

        async fn delete(&self, username: &str) -> Result<()> {
            self.0.delete(username).await
        }
    }

    #[tokio::test]
    async fn test_write_time_conflict_wins() {
        let store = Arc::new(RacyStore(MemoryStore::new()));
        let registry = AccountRegistry::new(store.clone(), hasher());

        registry.register(&form("johndoe")).await.unwrap();
        assert!(matches!(
            registry.register(&form("johndoe")).await,
            Err(AccountError::DuplicateUsername(_))
        ));
        assert_eq!(store.0.len().await, 1);
    }
}
