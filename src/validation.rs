//! GitHub username validation, applied before any request leaves the process.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// GitHub caps usernames at 39 characters.
pub const MAX_USERNAME_LEN: usize = 39;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username is required")]
    Empty,

    #[error("Username must be 39 characters or less")]
    TooLong,

    #[error("Invalid GitHub username format")]
    InvalidFormat,
}

/// Checks `username` against GitHub's naming rules: ASCII alphanumerics and
/// single hyphens, never leading or trailing.
pub fn validate(username: &str) -> Option<ValidationError> {
    if username.trim().is_empty() {
        return Some(ValidationError::Empty);
    }

    if username.chars().count() > MAX_USERNAME_LEN {
        return Some(ValidationError::TooLong);
    }

    let bytes = username.as_bytes();
    if !bytes[0].is_ascii_alphanumeric() {
        return Some(ValidationError::InvalidFormat);
    }

    for (i, b) in bytes.iter().enumerate().skip(1) {
        match b {
            b if b.is_ascii_alphanumeric() => {}
            b'-' => {
                // A hyphen must be followed by an alphanumeric character.
                let next = bytes.get(i + 1);
                if !next.is_some_and(|n| n.is_ascii_alphanumeric()) {
                    return Some(ValidationError::InvalidFormat);
                }
            }
            _ => return Some(ValidationError::InvalidFormat),
        }
    }

    None
}

/// A username that passed [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match validate(raw) {
            Some(err) => Err(err),
            None => Ok(Self(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Username {
    type Error = ValidationError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        let longest = "a".repeat(MAX_USERNAME_LEN);
        for name in ["octocat", "a", "A1", "foo-bar", "f-o-o", "0day", longest.as_str()] {
            assert_eq!(validate(name), None, "{name} should be valid");
        }
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(validate(""), Some(ValidationError::Empty));
        assert_eq!(validate("   "), Some(ValidationError::Empty));
        assert_eq!(validate("\t\n"), Some(ValidationError::Empty));
    }

    #[test]
    fn test_too_long() {
        assert_eq!(validate(&"a".repeat(40)), Some(ValidationError::TooLong));
    }

    #[test]
    fn test_invalid_format() {
        for name in [
            "-octocat",
            "octocat-",
            "octo--cat",
            "octo_cat",
            "octo.cat",
            "octo cat",
            " octocat",
            "octocat ",
            "ökto",
            "-",
        ] {
            assert_eq!(
                validate(name),
                Some(ValidationError::InvalidFormat),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_username_parse() {
        let name = Username::parse("octocat").unwrap();
        assert_eq!(name.as_str(), "octocat");
        assert_eq!(name.to_string(), "octocat");
        assert_eq!(Username::parse("bad_name"), Err(ValidationError::InvalidFormat));
        assert!(Username::try_from("").is_err());
    }
}
