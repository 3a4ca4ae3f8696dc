//! Typed builder for `User`.

use std::collections::BTreeSet;

use crate::crypto::PasswordHash;
use crate::role::Role;
use crate::user::User;

/// Marker type for missing value.
#[derive(Debug, Clone)]
pub struct Missing;

/// Marker type for present value.
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

/// A builder to track presence of `Username`, `Email` and `Password`.
///
/// [`UserBuilder::build`] only exists once all three are set.
#[derive(Debug, Clone)]
pub struct UserBuilder<Username, Email, Password> {
    username: Username,
    email: Email,
    password: Password,
    roles: BTreeSet<Role>,
}

impl UserBuilder<Missing, Missing, Missing> {
    /// Creates a new [`UserBuilder`] holding the default role.
    pub fn new() -> Self {
        Self {
            username: Missing,
            email: Missing,
            password: Missing,
            roles: BTreeSet::from([Role::DEFAULT]),
        }
    }
}

impl Default for UserBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Email, Password> UserBuilder<Missing, Email, Password> {
    /// Sets the immutable account key.
    pub fn username(
        self,
        username: impl Into<String>,
    ) -> UserBuilder<Present<String>, Email, Password> {
        UserBuilder {
            username: Present(username.into()),
            email: self.email,
            password: self.password,
            roles: self.roles,
        }
    }
}

impl<Username, Password> UserBuilder<Username, Missing, Password> {
    /// Sets the account email.
    pub fn email(
        self,
        email: impl Into<String>,
    ) -> UserBuilder<Username, Present<String>, Password> {
        UserBuilder {
            username: self.username,
            email: Present(email.into()),
            password: self.password,
            roles: self.roles,
        }
    }
}

impl<Username, Email> UserBuilder<Username, Email, Missing> {
    /// Sets the hashed password.
    pub fn password(
        self,
        password: PasswordHash,
    ) -> UserBuilder<Username, Email, Present<PasswordHash>> {
        UserBuilder {
            username: self.username,
            email: self.email,
            password: Present(password),
            roles: self.roles,
        }
    }
}

impl<Username, Email, Password> UserBuilder<Username, Email, Password> {
    /// Grants an additional role at creation.
    pub fn role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }
}

impl UserBuilder<Present<String>, Present<String>, Present<PasswordHash>> {
    /// Finalizes build with empty ownership collections.
    pub fn build(self) -> User {
        let UserBuilder {
            username: Present(username),
            email: Present(email),
            password: Present(password),
            roles,
        } = self;

        User {
            username,
            email,
            password,
            refresh_token: None,
            roles,
            posts: BTreeSet::new(),
            comments: BTreeSet::new(),
            favorites: BTreeSet::new(),
            created_at: chrono::Utc::now(),
        }
    }
}
