//! Account persistence port and its adapters.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{
    DEFAULT_CREDENTIALS, DEFAULT_DATABASE_NAME, DEFAULT_POOL_SIZE, PgAccountStore,
};

use async_trait::async_trait;

use crate::error::Result;
use crate::user::User;

/// Port for account persistence.
///
/// Implementations own the uniqueness of usernames and emails: `save` and
/// `update` must fail with [`crate::AccountError::DuplicateUsername`] or
/// [`crate::AccountError::DuplicateEmail`] on conflict, atomically with the
/// write.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account by its username key.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Find an account by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new account. Never overwrites.
    async fn save(&self, user: &User) -> Result<()>;

    /// Replace a stored account with `user`.
    async fn update(&self, user: &User) -> Result<()>;

    /// Remove an account and every ownership link it holds.
    async fn delete(&self, username: &str) -> Result<()>;
}
