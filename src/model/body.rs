//! Request bodies accepted from the web layer.

use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Registration request.
#[derive(Clone, Serialize, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct RegistrationForm {
    #[validate(
        length(
            min = 6,
            max = 20,
            message = "Username must be between 6 and 20 characters."
        ),
        custom(
            function = "crate::password::validate_not_blank",
            message = "Username is required."
        )
    )]
    pub username: String,
    #[validate(
        length(
            min = 8,
            max = 16,
            message = "Password must be between 8 and 16 characters."
        ),
        custom(
            function = "crate::password::validate_not_blank",
            message = "Password is required."
        )
    )]
    pub password: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
}

impl RegistrationForm {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
        }
    }
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("email", &self.email)
            .finish()
    }
}

/// Login request. Only its shape is checked here; authentication belongs to
/// the caller.
#[derive(Clone, Serialize, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    #[validate(
        length(
            min = 6,
            max = 20,
            message = "Username must be between 6 and 20 characters."
        ),
        custom(
            function = "crate::password::validate_not_blank",
            message = "Username is required."
        )
    )]
    pub username: String,
    #[validate(
        length(
            min = 8,
            max = 16,
            message = "Password must be between 8 and 16 characters."
        ),
        custom(
            function = "crate::password::validate_not_blank",
            message = "Password is required."
        )
    )]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}
