//! Payloads returned by the GitHub REST endpoints the client reads.
//!
//! Only the fields the analyzer consumes are declared; counts and flags that
//! GitHub may omit default to zero/false.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `GET /users/{username}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub public_repos: u32,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
}

/// One element of `GET /users/{username}/repos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    pub language: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub has_issues: bool,
    #[serde(default)]
    pub has_wiki: bool,
    #[serde(default)]
    pub fork: bool,
    /// Size in KB.
    #[serde(default)]
    pub size: u64,
}

/// `GET /repos/{owner}/{repo}/languages`: language name to byte count.
pub type LanguageBytes = HashMap<String, u64>;

/// One element of `GET /users/{username}/events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub repo: Option<EventRepo>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRepo {
    pub name: String,
}

/// One element of `GET /orgs/{org}/members`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgMember {
    pub login: String,
    pub id: u64,
    pub avatar_url: Option<String>,
}
