// repopulse command line entry point.
// Runs a cached GitHub read and prints the result, optionally with cache diagnostics.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use repopulse::github::TimeWindow;
use repopulse::logging::{LogLevel, init_logging};
use repopulse::{CacheStore, CachedGitHub, Error, Result, Settings};

#[derive(Parser, Debug)]
#[command(name = "repopulse", version)]
#[command(about = "Cached GitHub reads for a personal repository dashboard")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache-bust token forcing a fresh fetch
    #[arg(long, global = true)]
    bust: Option<String>,

    /// Run the read this many times against the same cache
    #[arg(long, default_value_t = 1, global = true)]
    repeat: u32,

    /// Print cache stats and hit/miss metrics to stderr afterwards
    #[arg(long, global = true)]
    diagnostics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List repositories owned by the configured user
    Repos,
    /// List commits in a repository over the last N days
    Commits {
        owner: String,
        repo: String,
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(i64).range(1..=3650))]
        days: i64,
    },
    /// Print a file's text
    File {
        owner: String,
        repo: String,
        path: String,
    },
    /// List open pull requests
    Pulls { owner: String, repo: String },
    /// List recent events for the configured user
    Events,
    /// Show language byte counts
    Languages { owner: String, repo: String },
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

async fn run_once(service: &CachedGitHub, command: &Command, bust: Option<&str>) -> Result<String> {
    match command {
        Command::Repos => to_json(&service.list_user_repos(bust).await?),
        Command::Commits { owner, repo, days } => {
            let window = TimeWindow::last_days(*days);
            to_json(&service.list_repo_commits(owner, repo, &window, bust).await?)
        }
        Command::File { owner, repo, path } => service
            .get_file_text(owner, repo, path, bust)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{}/{}:{}", owner, repo, path))),
        Command::Pulls { owner, repo } => {
            to_json(&service.list_repo_pull_requests(owner, repo, bust).await?)
        }
        Command::Events => to_json(&service.list_user_events(bust).await?),
        Command::Languages { owner, repo } => {
            to_json(&service.get_repo_languages(owner, repo, bust).await?)
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let service = CachedGitHub::from_settings(&settings, Arc::new(CacheStore::new()))?;

    let mut output = String::new();
    for _ in 0..cli.repeat.max(1) {
        output = run_once(&service, &cli.command, cli.bust.as_deref()).await?;
    }
    println!("{}", output);

    if cli.diagnostics {
        let report = json!({
            "stats": service.cache_stats(),
            "metrics": service.cache_metrics(),
            "rate_limit": {
                "remaining": service.rate_limit().remaining,
                "reset": service.rate_limit().reset,
            },
        });
        eprintln!("{}", to_json(&report)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(LogLevel::from_verbosity(cli.verbose));

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            eprintln!("{}", err.user_hint());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_must_be_in_range() {
        let parsed = Cli::try_parse_from(["repopulse", "commits", "o", "r", "--days", "7"]).unwrap();
        assert!(matches!(parsed.command, Command::Commits { days: 7, .. }));

        assert!(Cli::try_parse_from(["repopulse", "commits", "o", "r", "--days", "0"]).is_err());
        assert!(Cli::try_parse_from(["repopulse", "commits", "o", "r", "--days", "99999999999"]).is_err());
    }
}
