//! Password policy.

use std::sync::LazyLock;

use regex_lite::Regex;
use validator::ValidationError;

/// Minimum length of a strong password.
pub const MIN_LENGTH: usize = 8;
/// Maximum length of a strong password.
pub const MAX_LENGTH: usize = 20;

static LENGTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^.{{{MIN_LENGTH},{MAX_LENGTH}}}$"))
        .expect("length pattern is valid")
});
static LETTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[a-zA-Z]").expect("letter pattern is valid"));
static DIGIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d").expect("digit pattern is valid"));
static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W").expect("symbol pattern is valid"));

/// Whether `password` is 8 to 20 characters long and mixes at least one
/// letter, one digit and one non-word character.
///
/// ```
/// assert!(accounts::is_password_strong("Abcdef1!"));
/// assert!(!accounts::is_password_strong("abcdefgh"));
/// ```
pub fn is_password_strong(password: &str) -> bool {
    LENGTH_RE.is_match(password)
        && LETTER_RE.is_match(password)
        && DIGIT_RE.is_match(password)
        && SYMBOL_RE.is_match(password)
}

/// Validator hook rejecting whitespace-only values.
pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}
