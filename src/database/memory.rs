//! In-process account store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::AccountStore;
use crate::error::{AccountError, Result};
use crate::user::User;

/// Accounts kept in a map keyed by username.
///
/// Uniqueness checks and inserts happen under one write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn email_taken<'a>(
    mut users: impl Iterator<Item = &'a User>,
    email: &str,
    except: Option<&str>,
) -> bool {
    users.any(|u| u.email() == email && Some(u.username()) != except)
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email() == email)
            .cloned())
    }

    async fn save(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;

        if users.contains_key(user.username()) {
            return Err(AccountError::DuplicateUsername(
                user.username().to_owned(),
            ));
        }
        if email_taken(users.values(), user.email(), None) {
            return Err(AccountError::DuplicateEmail);
        }

        users.insert(user.username().to_owned(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;

        if !users.contains_key(user.username()) {
            return Err(AccountError::AccountNotFound(
                user.username().to_owned(),
            ));
        }
        if email_taken(users.values(), user.email(), Some(user.username())) {
            return Err(AccountError::DuplicateEmail);
        }

        users.insert(user.username().to_owned(), user.clone());
        Ok(())
    }

    async fn delete(&self, username: &str) -> Result<()> {
        match self.users.write().await.remove(username) {
            Some(_) => Ok(()),
            None => Err(AccountError::AccountNotFound(username.to_owned())),
        }
    }
}
