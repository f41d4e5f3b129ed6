use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::analysis::AnalysisDepth;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub cache_database_path: Option<String>,
    pub repos_per_page: u32,
    pub analysis_depth: AnalysisDepth,
    pub weigh_account_age: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let github_token = env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty());

        let base_url = env::var("GITHUB_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_secs = parse_var("GITHUB_TIMEOUT_SECS", 30)?;
        let cache_ttl_secs = parse_var("CACHE_TTL_SECS", 300)?;
        let repos_per_page = parse_var("REPOS_PER_PAGE", 100)?;
        let analysis_depth = parse_var("ANALYSIS_DEPTH", AnalysisDepth::Standard)?;

        let cache_database_path = env::var("CACHE_DATABASE_PATH").ok();

        let weigh_account_age = env::var("WEIGH_ACCOUNT_AGE")
            .ok()
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Self {
            github_token,
            base_url,
            timeout_secs,
            cache_ttl_secs,
            cache_database_path,
            repos_per_page,
            analysis_depth,
            weigh_account_age,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            cache_ttl_secs: 300,
            cache_database_path: None,
            repos_per_page: 100,
            analysis_depth: AnalysisDepth::Standard,
            weigh_account_age: false,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub repos_per_page: u32,
    pub retry_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.github_token.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            repos_per_page: config.repos_per_page,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub depth: AnalysisDepth,
    pub weigh_account_age: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AnalyzerConfig {
    fn from(config: &Config) -> Self {
        Self {
            depth: config.analysis_depth,
            weigh_account_age: config.weigh_account_age,
        }
    }
}
