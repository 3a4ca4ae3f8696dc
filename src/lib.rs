//! User account registry: registration, uniqueness checks on username and
//! email, password policy and the user aggregate owning posts, comments and
//! favorites.

#![forbid(unsafe_code)]

pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod model;
pub mod password;
pub mod registry;
pub mod role;
pub mod telemetry;
pub mod user;

use std::sync::Arc;

pub use database::{AccountStore, MemoryStore, PgAccountStore};
pub use error::{AccountError, FieldError};
pub use model::body::{LoginForm, RegistrationForm};
pub use password::is_password_strong;
pub use registry::{AccountRegistry, Registration};
pub use role::Role;
pub use user::{CommentId, FAVORITE_LIMIT, FavoriteId, PostId, User};

/// Build an [`AccountRegistry`] from configuration.
///
/// Uses PostgreSQL, after running migrations, when a `postgres` entry is
/// present. Accounts are kept in memory otherwise.
pub async fn initialize(
    config: &config::Configuration,
) -> Result<AccountRegistry, Box<dyn std::error::Error>> {
    telemetry::describe_metrics();

    let hasher = Arc::new(crypto::PasswordManager::new(config.argon2.clone())?);

    let store: Arc<dyn AccountStore> = match config.postgres {
        Some(ref postgres) => {
            let store = PgAccountStore::connect(postgres).await?;
            store.migrate().await?;
            Arc::new(store)
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on configuration, accounts are kept in memory"
            );
            Arc::new(MemoryStore::new())
        },
    };

    Ok(AccountRegistry::new(store, hasher))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_in_memory() {
        let mut config = config::Configuration::default();
        config.argon2 = Some(config::Argon2 {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        });

        let registry = initialize(&config).await.unwrap();
        let form = RegistrationForm::new("johndoe", "Abcdef1!", "john@actionprice.com");
        registry.register(&form).await.unwrap();
        assert!(registry.exists_by_username("johndoe").await.unwrap());
    }
}
