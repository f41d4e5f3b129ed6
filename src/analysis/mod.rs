pub mod analyzer;
pub mod scoring;

pub use analyzer::{AnalysisDepth, ProfileAnalyzer, MAX_COMPARISON_USERS};
pub use scoring::{ScoreWeights, ScoringEngine};
