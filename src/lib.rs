pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod models;
pub mod validation;

pub use analysis::{AnalysisDepth, ProfileAnalyzer};
pub use cache::{Cache, MemoryCache, SqliteCache};
pub use config::{AnalyzerConfig, ClientConfig, Config};
pub use error::{Error, Result};
pub use github::GitHubClient;
pub use validation::{validate, Username, ValidationError};
