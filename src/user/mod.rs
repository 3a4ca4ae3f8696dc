mod builder;
mod ownership;

pub use builder::*;
pub use ownership::*;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::crypto::PasswordHash;
use crate::error::{AccountError, Result};
use crate::role::Role;

/// Maximum number of favorites an account can hold.
pub const FAVORITE_LIMIT: usize = 10;

/// One account: identity, credential, roles and owned objects.
///
/// Mutators take `&mut self`; the aggregate does no locking of its own.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct User {
    username: String,
    #[serde(skip)]
    email: String,
    #[serde(skip)]
    password: PasswordHash,
    #[serde(skip)]
    refresh_token: Option<String>,
    roles: BTreeSet<Role>,
    posts: BTreeSet<PostId>,
    comments: BTreeSet<CommentId>,
    favorites: BTreeSet<FavoriteId>,
    created_at: DateTime<Utc>,
}

impl User {
    /// Start building a new [`User`].
    pub fn builder() -> UserBuilder<Missing, Missing, Missing> {
        UserBuilder::new()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn credential_hash(&self) -> &PasswordHash {
        &self.password
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn posts(&self) -> &BTreeSet<PostId> {
        &self.posts
    }

    pub fn comments(&self) -> &BTreeSet<CommentId> {
        &self.comments
    }

    pub fn favorites(&self) -> &BTreeSet<FavoriteId> {
        &self.favorites
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Add `role` if absent. Returns whether roles changed.
    pub fn grant_role(&mut self, role: Role) -> bool {
        self.roles.insert(role)
    }

    /// Remove `role` if present. Returns whether roles changed.
    pub fn revoke_role(&mut self, role: Role) -> bool {
        self.roles.remove(&role)
    }

    pub fn add_post(&mut self, post: PostId) -> bool {
        self.posts.insert(post)
    }

    pub fn remove_post(&mut self, post: PostId) -> bool {
        self.posts.remove(&post)
    }

    pub fn add_comment(&mut self, comment: CommentId) -> bool {
        self.comments.insert(comment)
    }

    pub fn remove_comment(&mut self, comment: CommentId) -> bool {
        self.comments.remove(&comment)
    }

    /// Add a favorite, keeping at most [`FAVORITE_LIMIT`] entries.
    ///
    /// Adding an already present favorite is a no-op, even when full.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::FavoriteLimitExceeded`] when the set is full
    /// and `favorite` is new. The set is left untouched.
    pub fn add_favorite(&mut self, favorite: FavoriteId) -> Result<bool> {
        if self.favorites.contains(&favorite) {
            return Ok(false);
        }

        if self.favorites.len() >= FAVORITE_LIMIT {
            return Err(AccountError::FavoriteLimitExceeded {
                limit: FAVORITE_LIMIT,
            });
        }

        Ok(self.favorites.insert(favorite))
    }

    pub fn remove_favorite(&mut self, favorite: FavoriteId) -> bool {
        self.favorites.remove(&favorite)
    }

    /// Replace the stored hash. Caller must hash beforehand.
    pub fn set_credential_hash(&mut self, hash: PasswordHash) {
        self.password = hash;
    }

    /// Replace the refresh token. Reserved to token issuance.
    pub fn set_refresh_token(&mut self, token: Option<String>) {
        self.refresh_token = token;
    }

    /// Replace the email. Uniqueness is checked by the store on write.
    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }
}

/// Flat, persisted form of a [`User`]. Used by store adapters.
#[derive(Clone, Debug, PartialEq)]
pub struct UserSnapshot {
    pub username: String,
    pub email: String,
    pub password: PasswordHash,
    pub refresh_token: Option<String>,
    pub roles: BTreeSet<Role>,
    pub posts: BTreeSet<PostId>,
    pub comments: BTreeSet<CommentId>,
    pub favorites: BTreeSet<FavoriteId>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserSnapshot {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            refresh_token: user.refresh_token.clone(),
            roles: user.roles.clone(),
            posts: user.posts.clone(),
            comments: user.comments.clone(),
            favorites: user.favorites.clone(),
            created_at: user.created_at,
        }
    }
}

impl TryFrom<UserSnapshot> for User {
    type Error = AccountError;

    fn try_from(snapshot: UserSnapshot) -> Result<Self> {
        if snapshot.favorites.len() > FAVORITE_LIMIT {
            return Err(AccountError::FavoriteLimitExceeded {
                limit: FAVORITE_LIMIT,
            });
        }

        Ok(Self {
            username: snapshot.username,
            email: snapshot.email,
            password: snapshot.password,
            refresh_token: snapshot.refresh_token,
            roles: snapshot.roles,
            posts: snapshot.posts,
            comments: snapshot.comments,
            favorites: snapshot.favorites,
            created_at: snapshot.created_at,
        })
    }
}
