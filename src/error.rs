use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid GitHub username: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("GitHub API rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimitExceeded { reset_at: Option<DateTime<Utc>> },

    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("At most {max} users can be compared, got {got}")]
    TooManyIdentifiers { max: usize, got: usize },
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(". Resets at {}", at.to_rfc3339()),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Only transport failures are retried inside the client; everything else
    /// is a definitive answer from GitHub or from local validation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// Seconds until the rate-limit window resets, if known.
    pub fn retry_after(&self, now: DateTime<Utc>) -> Option<u64> {
        match self {
            Error::RateLimitExceeded {
                reset_at: Some(reset_at),
            } => Some((*reset_at - now).num_seconds().max(0) as u64),
            _ => None,
        }
    }
}
