use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use devprofile::models::{ComparisonEntry, ComparisonOutcome, DeveloperProfile};
use devprofile::{AnalysisDepth, AnalyzerConfig, Config, GitHubClient, ProfileAnalyzer};

#[derive(Parser, Debug)]
#[command(name = "devprofile")]
#[command(version)]
#[command(about = "Score GitHub developer profiles from their public repositories")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: Format,

    /// Override the configured analysis depth
    #[arg(long, global = true)]
    depth: Option<AnalysisDepth>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a single GitHub user
    Profile { username: String },

    /// Analyze up to five users side by side
    Compare {
        #[arg(required = true, num_args = 1..)]
        usernames: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("devprofile=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(depth) = args.depth {
        config.analysis_depth = depth;
    }
    if config.github_token.is_none() {
        tracing::warn!("GITHUB_TOKEN not set, using unauthenticated rate limits");
    }

    let github = Arc::new(GitHubClient::from_config(&config)?);
    let analyzer = ProfileAnalyzer::new(github.clone(), AnalyzerConfig::from(&config));

    let spinner = spinner();
    let result = match &args.command {
        Command::Profile { username } => {
            spinner.set_message(format!("Analyzing {}", username));
            analyzer
                .analyze_raw(username)
                .await
                .map(|profile| render_profile(&profile, args.format))
        }
        Command::Compare { usernames } => {
            spinner.set_message(format!("Comparing {} users", usernames.len()));
            analyzer
                .compare(usernames.as_slice())
                .await
                .map(|entries| render_comparison(&entries, args.format))
        }
    };
    spinner.finish_and_clear();

    if let Some(quota) = github.rate_limit() {
        tracing::debug!("GitHub quota remaining: {}", quota.remaining);
    }
    github.close().await;

    println!("{}", result??);
    Ok(())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn render_profile(profile: &DeveloperProfile, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(profile)?),
        Format::Text => Ok(format_text(profile)),
    }
}

fn render_comparison(entries: &[ComparisonEntry], format: Format) -> anyhow::Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(entries)?),
        Format::Text => {
            let mut output = String::new();
            for entry in entries {
                match &entry.outcome {
                    ComparisonOutcome::Success(profile) => output.push_str(&format_text(profile)),
                    ComparisonOutcome::Failure(e) => {
                        output.push_str(&format!("\n=== {} ===\n\nError: {}\n", entry.username, e));
                    }
                }
            }
            Ok(output)
        }
    }
}

fn format_text(profile: &DeveloperProfile) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n=== Profile Analysis: {} ===\n\n", profile.username));

    if let Some(ref name) = profile.name {
        output.push_str(&format!("Name: {}\n", name));
    }
    output.push_str(&format!(
        "Joined: {}\n",
        profile.joined_date.format("%Y-%m-%d")
    ));
    output.push_str(&format!(
        "Repositories: {}  Followers: {}  Following: {}\n",
        profile.public_repos, profile.followers, profile.following
    ));
    output.push_str(&format!("Skill Level: {}\n", profile.skill_level));
    output.push_str(&format!("Activity Score: {:.1}/100\n", profile.activity_score));
    output.push_str(&format!(
        "Community Impact: {:.1}/100\n",
        profile.community_impact
    ));

    if !profile.primary_languages.is_empty() {
        output.push_str(&format!(
            "\nPrimary Languages: {}\n",
            profile.primary_languages.join(", ")
        ));
    }

    let m = &profile.metrics;
    output.push_str("\nMetrics:\n");
    output.push_str(&format!(
        "  Stars: {} (avg {:.2})  Forks: {} (avg {:.2})\n",
        m.total_stars, m.average_stars, m.total_forks, m.average_forks
    ));
    output.push_str(&format!("  Most starred: {}\n", m.most_starred_repo));
    output.push_str(&format!(
        "  Languages used: {}  Total size: {:.2} MB\n",
        m.languages_used, m.total_repo_size_mb
    ));

    if !profile.repository_analysis.is_empty() {
        output.push_str("\nRecent Repositories:\n");
        for repo in &profile.repository_analysis {
            output.push_str(&format!(
                "  - {} [{}] ★{} ⑂{} popularity {:.1}\n",
                repo.name,
                repo.language.as_deref().unwrap_or("n/a"),
                repo.stars,
                repo.forks,
                repo.popularity_score()
            ));
        }
    }

    output
}
