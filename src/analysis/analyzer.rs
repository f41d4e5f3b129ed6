use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::analysis::scoring::{language_percentages, RepositoryTotals, ScoringEngine};
use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::github::GitHubClient;
use crate::models::{
    ComparisonEntry, ComparisonOutcome, DeveloperProfile, Repository, RepositoryAnalysis,
};
use crate::validation::Username;

/// Most usernames a single comparison accepts.
pub const MAX_COMPARISON_USERS: usize = 5;

/// How many of the most recently updated repositories get a per-repository
/// language breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Quick,
    Standard,
    Deep,
}

impl AnalysisDepth {
    pub fn repository_limit(self) -> usize {
        match self {
            AnalysisDepth::Quick => 5,
            AnalysisDepth::Standard => 10,
            AnalysisDepth::Deep => 15,
        }
    }
}

impl fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisDepth::Quick => write!(f, "quick"),
            AnalysisDepth::Standard => write!(f, "standard"),
            AnalysisDepth::Deep => write!(f, "deep"),
        }
    }
}

impl FromStr for AnalysisDepth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(AnalysisDepth::Quick),
            "standard" => Ok(AnalysisDepth::Standard),
            "deep" => Ok(AnalysisDepth::Deep),
            other => Err(Error::Config(format!("Unknown analysis depth: {}", other))),
        }
    }
}

pub struct ProfileAnalyzer {
    github: Arc<GitHubClient>,
    scoring: ScoringEngine,
    config: AnalyzerConfig,
}

impl ProfileAnalyzer {
    pub fn new(github: Arc<GitHubClient>, config: AnalyzerConfig) -> Self {
        Self {
            github,
            scoring: ScoringEngine::new(),
            config,
        }
    }

    pub fn with_scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    /// Validates `raw` and analyzes it.
    pub async fn analyze_raw(&self, raw: &str) -> Result<DeveloperProfile> {
        let username = Username::parse(raw)?;
        self.analyze(&username).await
    }

    pub async fn analyze(&self, username: &Username) -> Result<DeveloperProfile> {
        let name = username.as_str();
        tracing::info!("Analyzing GitHub profile: {}", name);

        // Both primary fetches must succeed; the first failure aborts the analysis.
        let (user, repos) =
            tokio::try_join!(self.github.user(name), self.github.repositories(name))?;
        tracing::info!("Found {} repositories for {}", repos.len(), name);

        let repository_analysis = self.analyze_repositories(name, &repos).await;

        let now = Utc::now();
        let totals = RepositoryTotals::from_repositories(&repos);
        let account_age = self
            .config
            .weigh_account_age
            .then(|| now - user.created_at);

        let profile = DeveloperProfile {
            username: user.login.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            joined_date: user.created_at,
            public_repos: user.public_repos,
            followers: user.followers,
            following: user.following,
            primary_languages: self.scoring.primary_languages(&repos),
            skill_level: self.scoring.skill_level(totals, account_age),
            repository_analysis,
            activity_score: self.scoring.activity_score(&repos, now).clamp(0.0, 100.0),
            community_impact: self.scoring.community_impact(&user, totals).clamp(0.0, 100.0),
            metrics: self.scoring.metrics(&repos),
        };

        tracing::info!(
            "Finished analysis for {}: {} ({} repositories analyzed)",
            name,
            profile.skill_level,
            profile.repository_analysis.len()
        );
        Ok(profile)
    }

    /// Fetches language breakdowns for the most recently updated repositories.
    /// A repository whose breakdown cannot be fetched is left out.
    async fn analyze_repositories(
        &self,
        owner: &str,
        repos: &[Repository],
    ) -> Vec<RepositoryAnalysis> {
        let limit = self.config.depth.repository_limit();

        let futures = repos.iter().take(limit).map(|repo| async move {
            match self.github.repository_languages(owner, &repo.name).await {
                Ok(bytes) => Some(RepositoryAnalysis {
                    name: repo.name.clone(),
                    stars: repo.stargazers_count,
                    forks: repo.forks_count,
                    language: repo.language.clone(),
                    language_percentages: language_percentages(&bytes),
                    last_updated: repo.updated_at,
                    has_issues: repo.has_issues,
                    has_wiki: repo.has_wiki,
                    is_fork: repo.fork,
                    size_kb: repo.size,
                }),
                Err(e) => {
                    tracing::warn!("Skipping {}/{}: {}", owner, repo.name, e);
                    None
                }
            }
        });

        join_all(futures).await.into_iter().flatten().collect()
    }

    /// Analyzes up to [`MAX_COMPARISON_USERS`] usernames concurrently. Each
    /// username's failure is reported in its own entry; entries keep input order.
    pub async fn compare<S: AsRef<str>>(&self, usernames: &[S]) -> Result<Vec<ComparisonEntry>> {
        if usernames.len() > MAX_COMPARISON_USERS {
            return Err(Error::TooManyIdentifiers {
                max: MAX_COMPARISON_USERS,
                got: usernames.len(),
            });
        }

        let futures = usernames.iter().map(|raw| async move {
            let raw = raw.as_ref();
            let outcome = match self.analyze_raw(raw).await {
                Ok(profile) => ComparisonOutcome::Success(Box::new(profile)),
                Err(e) => {
                    tracing::warn!("Comparison entry {} failed: {}", raw, e);
                    ComparisonOutcome::Failure(e)
                }
            };
            ComparisonEntry {
                username: raw.to_string(),
                outcome,
            }
        });

        Ok(join_all(futures).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::ClientConfig;
    use crate::github::testing::{json_response, response, ScriptedTransport};
    use crate::models::SkillLevel;
    use crate::validation::ValidationError;
    use chrono::Duration;
    use serde_json::{json, Value};

    const BASE: &str = "https://api.test";

    fn analyzer(transport: &Arc<ScriptedTransport>, depth: AnalysisDepth) -> ProfileAnalyzer {
        analyzer_with(
            transport,
            AnalyzerConfig {
                depth,
                weigh_account_age: false,
            },
        )
    }

    fn analyzer_with(transport: &Arc<ScriptedTransport>, config: AnalyzerConfig) -> ProfileAnalyzer {
        let client_config = ClientConfig {
            base_url: BASE.to_string(),
            ..ClientConfig::default()
        };
        let client = GitHubClient::with_transport(
            client_config,
            transport.clone(),
            Arc::new(MemoryCache::new()),
        );
        ProfileAnalyzer::new(Arc::new(client), config)
    }

    fn user_json(login: &str, followers: u32) -> Value {
        json!({
            "login": login,
            "name": "The Octocat",
            "avatar_url": "https://avatars.example/u/1",
            "created_at": "2011-01-01T00:00:00Z",
            "public_repos": 2,
            "followers": followers,
            "following": 10
        })
    }

    fn repo_json(name: &str, language: Option<&str>, stars: u32) -> Value {
        json!({
            "name": name,
            "stargazers_count": stars,
            "forks_count": 0,
            "language": language,
            "updated_at": (Utc::now() - Duration::days(3)).to_rfc3339(),
            "has_issues": true,
            "has_wiki": false,
            "fork": false,
            "size": 120
        })
    }

    fn script_user(transport: &ScriptedTransport, login: &str, repos: Vec<Value>) {
        transport.respond(&format!("{BASE}/users/{login}"), json_response(user_json(login, 100)));
        transport.respond(
            &format!("{BASE}/users/{login}/repos?sort=updated&per_page=100"),
            json_response(Value::Array(repos)),
        );
    }

    fn script_languages(transport: &ScriptedTransport, owner: &str, repo: &str, body: Value) {
        transport.respond(
            &format!("{BASE}/repos/{owner}/{repo}/languages"),
            json_response(body),
        );
    }

    #[tokio::test]
    async fn test_new_account_without_stars_is_beginner() {
        let transport = Arc::new(ScriptedTransport::new());
        script_user(
            &transport,
            "octocat",
            vec![repo_json("one", Some("Ruby"), 0), repo_json("two", None, 0)],
        );
        script_languages(&transport, "octocat", "one", json!({"Ruby": 300, "Shell": 100}));
        script_languages(&transport, "octocat", "two", json!({}));
        let analyzer = analyzer(&transport, AnalysisDepth::Standard);

        let profile = analyzer.analyze_raw("octocat").await.unwrap();

        assert_eq!(profile.username, "octocat");
        assert_eq!(profile.skill_level, SkillLevel::Beginner);
        assert!(profile.community_impact < 10.0);
        assert_eq!(profile.primary_languages, vec!["Ruby"]);
        assert_eq!(profile.repository_analysis.len(), 2);
        assert_eq!(profile.repository_analysis[0].language_percentages["Ruby"], 75.0);
        assert!(!profile.repository_analysis[0].has_wiki);
        assert_eq!(profile.metrics.most_starred_repo, "one");
        assert!((0.0..=100.0).contains(&profile.activity_score));
    }

    #[tokio::test]
    async fn test_account_age_lifts_old_account_when_weighed() {
        let transport = Arc::new(ScriptedTransport::new());
        script_user(
            &transport,
            "octocat",
            vec![repo_json("one", Some("Ruby"), 0), repo_json("two", None, 0)],
        );
        script_languages(&transport, "octocat", "one", json!({"Ruby": 300}));
        script_languages(&transport, "octocat", "two", json!({}));
        let analyzer = analyzer_with(
            &transport,
            AnalyzerConfig {
                depth: AnalysisDepth::Standard,
                weigh_account_age: true,
            },
        );

        let profile = analyzer.analyze_raw("octocat").await.unwrap();

        assert_eq!(profile.skill_level, SkillLevel::Intermediate);
        assert_eq!(profile.metrics.total_stars, 0);
    }

    #[tokio::test]
    async fn test_language_failure_skips_only_that_repository() {
        let transport = Arc::new(ScriptedTransport::new());
        script_user(
            &transport,
            "octocat",
            vec![repo_json("good", Some("Rust"), 5), repo_json("bad", Some("Go"), 9)],
        );
        script_languages(&transport, "octocat", "good", json!({"Rust": 10}));
        transport.respond(&format!("{BASE}/repos/octocat/bad/languages"), response(500, "boom"));
        let analyzer = analyzer(&transport, AnalysisDepth::Standard);

        let profile = analyzer.analyze_raw("octocat").await.unwrap();

        let names: Vec<_> = profile.repository_analysis.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["good"]);
        assert_eq!(profile.metrics.repo_count, 2);
        assert_eq!(profile.metrics.total_stars, 14);
        assert_eq!(profile.primary_languages, vec!["Rust", "Go"]);
    }

    #[tokio::test]
    async fn test_depth_bounds_repository_analysis() {
        let transport = Arc::new(ScriptedTransport::new());
        let repos: Vec<_> = (0..12).map(|i| repo_json(&format!("r{i}"), None, 0)).collect();
        script_user(&transport, "octocat", repos);
        for i in 0..12 {
            script_languages(&transport, "octocat", &format!("r{i}"), json!({}));
        }
        let analyzer = analyzer(&transport, AnalysisDepth::Quick);

        let profile = analyzer.analyze_raw("octocat").await.unwrap();

        let names: Vec<_> = profile.repository_analysis.iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["r0", "r1", "r2", "r3", "r4"]);
        assert_eq!(transport.calls(&format!("{BASE}/repos/octocat/r5/languages")), 0);
        assert_eq!(profile.metrics.repo_count, 12);
    }

    #[tokio::test]
    async fn test_primary_fetch_failure_fails_analysis() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(&format!("{BASE}/users/octocat"), json_response(user_json("octocat", 1)));
        transport.respond(
            &format!("{BASE}/users/octocat/repos?sort=updated&per_page=100"),
            response(500, "server error"),
        );
        let analyzer = analyzer(&transport, AnalysisDepth::Standard);

        let err = analyzer.analyze_raw("octocat").await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }), "got {err:?}");

        let err = analyzer.analyze_raw("ghost").await.unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_invalid_username_makes_no_requests() {
        let transport = Arc::new(ScriptedTransport::new());
        let analyzer = analyzer(&transport, AnalysisDepth::Standard);

        let err = analyzer.analyze_raw("-nope-").await.unwrap_err();

        assert!(matches!(
            err,
            Error::InvalidIdentifier(ValidationError::InvalidFormat)
        ));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_compare_isolates_failures() {
        let transport = Arc::new(ScriptedTransport::new());
        script_user(&transport, "a", vec![repo_json("x", Some("Rust"), 1)]);
        script_languages(&transport, "a", "x", json!({"Rust": 1}));
        let analyzer = analyzer(&transport, AnalysisDepth::Standard);

        let entries = analyzer.compare(&["a", "b"]).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].username, "a");
        assert!(entries[0].is_success());
        assert_eq!(entries[0].profile().unwrap().username, "a");
        assert_eq!(entries[1].username, "b");
        assert!(matches!(entries[1].error(), Some(Error::UserNotFound(_))));

        let value = serde_json::to_value(&entries[1]).unwrap();
        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_compare_rejects_too_many_users() {
        let transport = Arc::new(ScriptedTransport::new());
        let analyzer = analyzer(&transport, AnalysisDepth::Standard);

        let err = analyzer.compare(&["a", "b", "c", "d", "e", "f"]).await.unwrap_err();

        assert!(matches!(err, Error::TooManyIdentifiers { max: 5, got: 6 }));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_repeat_analysis_is_served_from_cache() {
        let transport = Arc::new(ScriptedTransport::new());
        script_user(
            &transport,
            "octocat",
            vec![repo_json("one", Some("Rust"), 40), repo_json("two", Some("Go"), 2)],
        );
        script_languages(&transport, "octocat", "one", json!({"Rust": 1}));
        script_languages(&transport, "octocat", "two", json!({"Go": 1}));
        let analyzer = analyzer(&transport, AnalysisDepth::Standard);

        let first = analyzer.analyze_raw("octocat").await.unwrap();
        let second = analyzer.analyze_raw("octocat").await.unwrap();

        // user + repos + two language breakdowns, each fetched once
        assert_eq!(transport.total_calls(), 4);
        assert_eq!(first.skill_level, second.skill_level);
        assert_eq!(first.activity_score, second.activity_score);
        assert_eq!(first.community_impact, second.community_impact);
        assert_eq!(first.metrics, second.metrics);
    }

    #[test]
    fn test_analysis_depth_parsing() {
        assert_eq!("DEEP".parse::<AnalysisDepth>().unwrap(), AnalysisDepth::Deep);
        assert_eq!(AnalysisDepth::Quick.repository_limit(), 5);
        assert!("everything".parse::<AnalysisDepth>().is_err());
    }
}
