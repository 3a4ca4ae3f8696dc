//! Error handler for account management.

use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

use crate::crypto::CryptoError;

pub type Result<T> = std::result::Result<T, AccountError>;

/// Enum representing account-related errors.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("username `{0}` already exists")]
    DuplicateUsername(String),

    #[error("email is already used by another account")]
    DuplicateEmail,

    #[error("favorites are limited to {limit} entries")]
    FavoriteLimitExceeded { limit: usize },

    #[error("account `{0}` not found")]
    AccountNotFound(String),

    #[error("unknown role `{0}`")]
    UnknownRole(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),
}

impl AccountError {
    /// Short, stable label of the error kind. Used as metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            AccountError::Validation(_) => "validation",
            AccountError::DuplicateUsername(_) => "duplicate_username",
            AccountError::DuplicateEmail => "duplicate_email",
            AccountError::FavoriteLimitExceeded { .. } => "favorite_limit",
            AccountError::AccountNotFound(_) => "not_found",
            AccountError::UnknownRole(_) => "unknown_role",
            AccountError::Crypto(_) => "crypto",
            AccountError::Sql(_) => "sql",
        }
    }

    /// Flatten validation errors into `{field, message}` pairs.
    ///
    /// Returns an empty list for every other kind.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            AccountError::Validation(errors) => parse_validation_errors(errors),
            _ => Vec::new(),
        }
    }
}

/// A single invalid field, ready to be serialized by the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue.to_string(),
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}
