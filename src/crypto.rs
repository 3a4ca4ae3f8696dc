//! Credential hashing.

use std::sync::LazyLock;

use argon2::password_hash::{
    PasswordHash as PhcHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;
use regex_lite::Regex;

use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CryptoError>;

static PHC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\$([a-z0-9-]{1,32})(?:\$v=(\d+))?(?:\$([^$]+))?\$([^$]+)\$([^$]+)$",
    )
    .expect("PHC pattern is valid")
});

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
    #[error("hash is not a PHC string")]
    Malformed,
    #[error("password does not match")]
    Mismatch,
}

/// One-way hashed representation of a password, in PHC string format.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Converts a [`String`] into a valid [`PasswordHash`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the string is not in PHC format.
    pub fn parse(phc_string: impl Into<String>) -> Result<Self> {
        let phc = phc_string.into();
        if !PHC_RE.is_match(&phc) {
            return Err(CryptoError::Malformed);
        }

        Ok(Self(phc))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHash")
            .field("phc_string", &"[REDACTED]")
            .finish()
    }
}

/// One-way, salted password hashing.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password.
    fn hash(&self, password: &str) -> Result<PasswordHash>;

    /// Verify a plaintext password against a stored hash.
    fn verify(&self, password: &str, hash: &PasswordHash) -> Result<()>;
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }
}

impl CredentialHasher for PasswordManager {
    fn hash(&self, password: &str) -> Result<PasswordHash> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        PasswordHash::parse(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &PasswordHash) -> Result<()> {
        let parsed =
            PhcHash::new(hash.as_str()).map_err(|_| CryptoError::Malformed)?;

        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|err| match err {
                argon2::password_hash::Error::Password => CryptoError::Mismatch,
                err => CryptoError::Argon2(err.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordManager {
        PasswordManager::new(Some(ArgonConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .unwrap()
    }

    #[test]
    fn test_argon2() {
        let pwd = cheap();
        let hash = pwd.hash("Abcdef1!").unwrap();

        assert!(hash.as_str().starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert!(pwd.verify("Abcdef1!", &hash).is_ok());
        assert!(matches!(
            pwd.verify("Abcdef1?", &hash),
            Err(CryptoError::Mismatch)
        ));
    }

    #[test]
    fn test_salted() {
        let pwd = cheap();
        assert_ne!(pwd.hash("Abcdef1!").unwrap(), pwd.hash("Abcdef1!").unwrap());
    }

    #[test]
    fn test_parse_phc() {
        assert!(PasswordHash::parse("plaintext").is_err());
        assert!(
            PasswordHash::parse("$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA")
                .is_ok()
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let hash = cheap().hash("Abcdef1!").unwrap();
        let debug = format!("{hash:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("argon2id"));
    }

    #[test]
    fn test_invalid_params() {
        let config = ArgonConfig {
            memory_cost: 1,
            ..Default::default()
        };
        assert!(matches!(
            PasswordManager::new(Some(config)),
            Err(CryptoError::Argon2(_))
        ));
    }
}
