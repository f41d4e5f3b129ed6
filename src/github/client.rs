use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::{cache_key, normalize_endpoint, Cache, MemoryCache, SqliteCache};
use crate::config::{ClientConfig, Config};
use crate::error::{Error, Result};
use crate::github::rate_limiter::{is_rate_limited, RateLimitSnapshot, RateLimiter};
use crate::github::transport::{HttpResponse, ReqwestTransport, Transport};
use crate::models::{Event, GitHubUser, LanguageBytes, OrgMember, Repository};

/// Attempts per request, the first one included.
pub const MAX_ATTEMPTS: u32 = 3;

const BODY_EXCERPT_LEN: usize = 200;

pub struct GitHubClient {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn Cache>,
    rate_limiter: RateLimiter,
    config: ClientConfig,
}

impl GitHubClient {
    pub fn new(config: ClientConfig, cache: Arc<dyn Cache>) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport), cache))
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            transport,
            cache,
            rate_limiter: RateLimiter::new(),
            config,
        }
    }

    /// Builds a client and its cache backend from application config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache: Arc<dyn Cache> = match &config.cache_database_path {
            Some(path) => Arc::new(SqliteCache::open(path)?),
            None => Arc::new(MemoryCache::new()),
        };
        tracing::debug!("Using {} cache", cache.name());
        Self::new(ClientConfig::from(config), cache)
    }

    /// Fetches `endpoint` (relative to the API base URL), serving it from the
    /// cache when allowed and storing successful responses for `ttl`.
    pub async fn request(&self, endpoint: &str, use_cache: bool, ttl: Duration) -> Result<Value> {
        self.fetch(endpoint, use_cache, ttl).await
    }

    /// Like [`request`](Self::request), decoding into `T`. Only bodies that
    /// decode are cached.
    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        use_cache: bool,
        ttl: Duration,
    ) -> Result<T> {
        let endpoint = normalize_endpoint(endpoint);
        let key = cache_key(&endpoint);

        if use_cache {
            match self.cache.get(&key).await {
                Some(cached) => match T::deserialize(&cached) {
                    Ok(data) => {
                        tracing::debug!("Cache hit for {}", endpoint);
                        return Ok(data);
                    }
                    Err(e) => {
                        tracing::warn!("Dropping stale cache entry for {}: {}", endpoint, e);
                        self.cache.delete(&key).await;
                    }
                },
                None => tracing::debug!("Cache miss for {}", endpoint),
            }
        }

        let url = format!("{}{}", self.config.base_url, endpoint);
        let response = self.send_with_retry(&url).await?;
        let raw = self.handle_response(&endpoint, response)?;

        let data = T::deserialize(&raw).map_err(|e| Error::Api {
            status: StatusCode::OK.as_u16(),
            message: format!("Unexpected response shape for {}: {}", endpoint, e),
        })?;

        if use_cache && !self.cache.set(&key, &raw, ttl).await {
            tracing::debug!("Response for {} was not cached", endpoint);
        }

        Ok(data)
    }

    async fn send_with_retry(&self, url: &str) -> Result<HttpResponse> {
        let mut attempt = 1;
        loop {
            tracing::debug!("GET {} (attempt {})", url, attempt);

            match self.transport.get(url).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!("Request to {} failed (attempt {}): {}", url, attempt, e);
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    return Err(Error::Network(format!("{} after {} attempts", e, MAX_ATTEMPTS)));
                }
                Err(e) => return Err(Error::Network(e.to_string())),
            }
        }
    }

    fn handle_response(&self, endpoint: &str, response: HttpResponse) -> Result<Value> {
        let snapshot: Option<RateLimitSnapshot> =
            self.rate_limiter.update_from_headers(&response.headers);

        if is_rate_limited(response.status, snapshot.as_ref()) {
            return Err(Error::RateLimitExceeded {
                reset_at: snapshot.and_then(|s| s.reset_at),
            });
        }

        match response.status {
            StatusCode::OK => serde_json::from_str(&response.body).map_err(|e| Error::Api {
                status: StatusCode::OK.as_u16(),
                message: format!("Invalid JSON response for {}: {}", endpoint, e),
            }),
            StatusCode::UNAUTHORIZED => Err(Error::Authentication(
                "Invalid or missing GitHub token".to_string(),
            )),
            StatusCode::FORBIDDEN => Err(Error::Api {
                status: StatusCode::FORBIDDEN.as_u16(),
                message: "API forbidden - check token permissions".to_string(),
            }),
            StatusCode::NOT_FOUND if endpoint.starts_with("/users/") => {
                Err(Error::UserNotFound(resource_name(endpoint)))
            }
            StatusCode::NOT_FOUND => Err(Error::RepositoryNotFound(resource_name(endpoint))),
            status => Err(Error::Api {
                status: status.as_u16(),
                message: excerpt(&response.body),
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.fetch(endpoint, true, self.config.cache_ttl).await
    }

    pub async fn user(&self, username: &str) -> Result<GitHubUser> {
        tracing::info!("Fetching user: {}", username);
        self.get_json(&format!("/users/{}", username)).await
    }

    /// Repositories sorted by most recent update, first page only.
    pub async fn repositories(&self, username: &str) -> Result<Vec<Repository>> {
        self.repositories_page(username, self.config.repos_per_page).await
    }

    pub async fn repositories_page(&self, username: &str, per_page: u32) -> Result<Vec<Repository>> {
        tracing::info!("Fetching repositories for: {}", username);
        self.get_json(&format!(
            "/users/{}/repos?sort=updated&per_page={}",
            username, per_page
        ))
        .await
    }

    pub async fn repository_languages(&self, owner: &str, repo: &str) -> Result<LanguageBytes> {
        tracing::debug!("Fetching languages for: {}/{}", owner, repo);
        self.get_json(&format!("/repos/{}/{}/languages", owner, repo)).await
    }

    pub async fn events(&self, username: &str) -> Result<Vec<Event>> {
        self.get_json(&format!("/users/{}/events?per_page=50", username)).await
    }

    pub async fn organization_members(&self, org: &str) -> Result<Vec<OrgMember>> {
        self.get_json(&format!("/orgs/{}/members", org)).await
    }

    /// Latest quota reported by GitHub, if any response carried one.
    pub fn rate_limit(&self) -> Option<RateLimitSnapshot> {
        self.rate_limiter.snapshot()
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Releases pooled HTTP and cache connections. Idempotent.
    pub async fn close(&self) {
        self.transport.close().await;
        self.cache.close().await;
    }
}

/// The user login, `owner/repo`, or bare path an endpoint addresses.
fn resource_name(endpoint: &str) -> String {
    let path = endpoint.split('?').next().unwrap_or(endpoint);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["users", login, ..] => login.to_string(),
        ["repos", owner, repo, ..] => format!("{}/{}", owner, repo),
        _ => path.to_string(),
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
