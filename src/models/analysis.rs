use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl std::fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkillLevel::Beginner => write!(f, "Beginner"),
            SkillLevel::Intermediate => write!(f, "Intermediate"),
            SkillLevel::Advanced => write!(f, "Advanced"),
            SkillLevel::Expert => write!(f, "Expert"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryAnalysis {
    pub name: String,
    pub stars: u32,
    pub forks: u32,
    pub language: Option<String>,
    /// Share of the repository's bytes per language, in percent.
    pub language_percentages: BTreeMap<String, f64>,
    pub last_updated: DateTime<Utc>,
    pub has_issues: bool,
    pub has_wiki: bool,
    pub is_fork: bool,
    pub size_kb: u64,
}

impl RepositoryAnalysis {
    /// Stars weigh double; large repositories are discounted per MB.
    pub fn popularity_score(&self) -> f64 {
        (self.stars as f64 * 2.0 + self.forks as f64) / (self.size_kb as f64 / 1000.0 + 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileMetrics {
    pub total_stars: u64,
    pub total_forks: u64,
    pub average_stars: f64,
    pub average_forks: f64,
    pub total_repo_size_mb: f64,
    pub most_starred_repo: String,
    pub repo_count: usize,
    pub languages_used: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeveloperProfile {
    pub username: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub joined_date: DateTime<Utc>,
    pub public_repos: u32,
    pub followers: u32,
    pub following: u32,

    pub primary_languages: Vec<String>,
    pub skill_level: SkillLevel,
    pub repository_analysis: Vec<RepositoryAnalysis>,
    pub activity_score: f64,
    pub community_impact: f64,

    pub metrics: ProfileMetrics,
}

/// Result for one username of a comparison. Failures stay local to their entry.
#[derive(Debug)]
pub struct ComparisonEntry {
    pub username: String,
    pub outcome: ComparisonOutcome,
}

#[derive(Debug)]
pub enum ComparisonOutcome {
    Success(Box<DeveloperProfile>),
    Failure(Error),
}

impl ComparisonEntry {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ComparisonOutcome::Success(_))
    }

    pub fn profile(&self) -> Option<&DeveloperProfile> {
        match &self.outcome {
            ComparisonOutcome::Success(profile) => Some(profile),
            ComparisonOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            ComparisonOutcome::Success(_) => None,
            ComparisonOutcome::Failure(e) => Some(e),
        }
    }
}

impl Serialize for ComparisonEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ComparisonEntry", 3)?;
        state.serialize_field("username", &self.username)?;
        match &self.outcome {
            ComparisonOutcome::Success(profile) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", profile)?;
            }
            ComparisonOutcome::Failure(e) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", &e.to_string())?;
            }
        }
        state.end()
    }
}
