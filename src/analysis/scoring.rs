use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::models::{GitHubUser, LanguageBytes, ProfileMetrics, Repository, SkillLevel};

pub const MAX_PRIMARY_LANGUAGES: usize = 5;

/// Repositories updated within this window count as recently active.
pub const RECENT_ACTIVITY_DAYS: i64 = 90;

#[derive(Debug, Clone)]
pub struct ScoreWeights {
    /// Points (out of 100) for the share of recently updated repositories.
    pub recent_activity: f64,
    /// Points (out of 100) for repository volume.
    pub repository_volume: f64,
    /// Repository count at which the volume component saturates.
    pub repository_volume_ceiling: f64,
    pub star_weight: f64,
    pub fork_weight: f64,
    pub follower_weight: f64,
    pub star_ceiling: f64,
    pub fork_ceiling: f64,
    pub follower_ceiling: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            recent_activity: 60.0,
            repository_volume: 40.0,
            repository_volume_ceiling: 50.0,
            star_weight: 0.4,
            fork_weight: 0.3,
            follower_weight: 0.3,
            star_ceiling: 1000.0,
            fork_ceiling: 500.0,
            follower_ceiling: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryTotals {
    pub stars: u64,
    pub forks: u64,
    pub count: usize,
}

impl RepositoryTotals {
    pub fn from_repositories(repos: &[Repository]) -> Self {
        Self {
            stars: repos.iter().map(|r| r.stargazers_count as u64).sum(),
            forks: repos.iter().map(|r| r.forks_count as u64).sum(),
            count: repos.len(),
        }
    }
}

pub struct ScoringEngine {
    weights: ScoreWeights,
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::with_weights(ScoreWeights::default())
    }

    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Most common primary languages across `repos`, most frequent first.
    /// Ties keep the order in which languages were first seen.
    pub fn primary_languages(&self, repos: &[Repository]) -> Vec<String> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for language in repos.iter().filter_map(|r| r.language.as_deref()) {
            match counts.iter_mut().find(|(name, _)| *name == language) {
                Some((_, count)) => *count += 1,
                None => counts.push((language, 1)),
            }
        }

        // Stable sort keeps first-seen order among equal counts.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
            .into_iter()
            .take(MAX_PRIMARY_LANGUAGES)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Additive point score over stars, forks, repository count and,
    /// when given, account age.
    pub fn skill_level(&self, totals: RepositoryTotals, account_age: Option<Duration>) -> SkillLevel {
        if totals.count == 0 {
            return SkillLevel::Beginner;
        }

        let mut score = 0;

        score += match totals.stars {
            s if s > 1000 => 3,
            s if s > 100 => 2,
            s if s > 10 => 1,
            _ => 0,
        };

        score += match totals.forks {
            f if f > 500 => 2,
            f if f > 50 => 1,
            _ => 0,
        };

        score += match totals.count {
            c if c > 20 => 2,
            c if c > 5 => 1,
            _ => 0,
        };

        if let Some(age) = account_age {
            score += match age.num_days() {
                d if d > 365 * 3 => 2,
                d if d > 365 => 1,
                _ => 0,
            };
        }

        match score {
            s if s >= 6 => SkillLevel::Expert,
            s if s >= 4 => SkillLevel::Advanced,
            s if s >= 2 => SkillLevel::Intermediate,
            _ => SkillLevel::Beginner,
        }
    }

    /// 0-100 blend of how many repositories were touched recently and how
    /// many repositories there are.
    pub fn activity_score(&self, repos: &[Repository], now: DateTime<Utc>) -> f64 {
        if repos.is_empty() {
            return 0.0;
        }

        let threshold = now - Duration::days(RECENT_ACTIVITY_DAYS);
        let recent = repos.iter().filter(|r| r.updated_at > threshold).count();
        let recent_ratio = recent as f64 / repos.len() as f64;

        let volume = (repos.len() as f64 / self.weights.repository_volume_ceiling).min(1.0);

        let score = recent_ratio * self.weights.recent_activity
            + volume * self.weights.repository_volume;
        score.clamp(0.0, 100.0)
    }

    /// 0-100 weighted blend of stars, forks and followers, each normalized
    /// against its ceiling.
    pub fn community_impact(&self, user: &GitHubUser, totals: RepositoryTotals) -> f64 {
        let w = &self.weights;
        let star_score = (totals.stars as f64 / w.star_ceiling).min(1.0) * 100.0;
        let fork_score = (totals.forks as f64 / w.fork_ceiling).min(1.0) * 100.0;
        let follower_score = (user.followers as f64 / w.follower_ceiling).min(1.0) * 100.0;

        let score = star_score * w.star_weight
            + fork_score * w.fork_weight
            + follower_score * w.follower_weight;
        score.clamp(0.0, 100.0)
    }

    pub fn metrics(&self, repos: &[Repository]) -> ProfileMetrics {
        let totals = RepositoryTotals::from_repositories(repos);
        let count = repos.len();

        let average = |total: u64| {
            if count == 0 {
                0.0
            } else {
                round2(total as f64 / count as f64)
            }
        };

        // First repository wins when several share the top star count.
        let most_starred_repo = repos
            .iter()
            .fold(None::<&Repository>, |best, repo| match best {
                Some(b) if b.stargazers_count >= repo.stargazers_count => Some(b),
                _ => Some(repo),
            })
            .map(|r| r.name.clone())
            .unwrap_or_else(|| "None".to_string());

        let total_size_kb: u64 = repos.iter().map(|r| r.size).sum();

        let languages_used = repos
            .iter()
            .filter_map(|r| r.language.as_deref())
            .collect::<HashSet<_>>()
            .len();

        ProfileMetrics {
            total_stars: totals.stars,
            total_forks: totals.forks,
            average_stars: average(totals.stars),
            average_forks: average(totals.forks),
            total_repo_size_mb: round2(total_size_kb as f64 / 1024.0),
            most_starred_repo,
            repo_count: count,
            languages_used,
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a byte-count breakdown into percentages of the total.
pub fn language_percentages(bytes: &LanguageBytes) -> BTreeMap<String, f64> {
    let total: u64 = bytes.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }

    bytes
        .iter()
        .map(|(language, count)| (language.clone(), round2(*count as f64 * 100.0 / total as f64)))
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
