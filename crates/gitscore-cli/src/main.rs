use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use gitscore_core::{
    Config, GitHubProvider, RepositoryResponse, ScoringService, SearchRequest,
    WeightedScoreCalculator,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gitscore")]
#[command(version, about = "Rank GitHub repositories by a configurable popularity score", long_about = None)]
struct Cli {
    /// Search term, e.g. "http client"
    query: String,

    /// Restrict results to one language
    #[arg(long)]
    language: Option<String>,

    /// Sort field: stars, forks or score
    #[arg(long, default_value = "stars")]
    sort_by: String,

    /// Sort order: asc or desc
    #[arg(long, default_value = "desc")]
    order: String,

    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Results per page (1-100)
    #[arg(long, default_value_t = 10)]
    per_page: u32,

    /// Only repositories created after this date (YYYY-MM-DD)
    #[arg(long)]
    created_after: Option<NaiveDate>,

    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gitscore=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let request = SearchRequest {
        search_query: cli.query,
        language: cli.language,
        sort_by: cli.sort_by.parse()?,
        sort_order: cli.order.parse()?,
        page_number: cli.page,
        page_size: cli.per_page,
        created_after: cli.created_after,
    };

    let provider = GitHubProvider::new(&config.github.client_config())?;
    let calculator = WeightedScoreCalculator::new(config.scoring.clone());
    let service = ScoringService::new(
        Arc::new(provider),
        Box::new(calculator),
        Duration::from_secs(config.cache.ttl_secs),
        config.cache.max_entries,
    );

    match service.search(&request).await {
        Ok(results) => {
            let responses = results.to_responses();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&responses)?);
            } else {
                print_table(&responses);
            }
            if results.degraded {
                eprintln!("warning: GitHub was unreachable, showing a degraded empty result");
            }
            Ok(())
        }
        Err(err) => {
            tracing::error!("search failed: {}", err);
            eprintln!("error ({}): {}", err.http_status(), err);
            std::process::exit(1);
        }
    }
}

fn print_table(responses: &[RepositoryResponse]) {
    if responses.is_empty() {
        println!("No repositories found.");
        return;
    }

    println!(
        "{:<40} {:>8} {:>8} {:<12} {:<12} {:>6}",
        "NAME", "STARS", "FORKS", "LANGUAGE", "UPDATED", "SCORE"
    );
    for repo in responses {
        println!(
            "{:<40} {:>8} {:>8} {:<12} {:<12} {:>6}",
            repo.name,
            repo.stars,
            repo.forks,
            repo.language.as_deref().unwrap_or("-"),
            repo.last_updated.format("%Y-%m-%d"),
            repo.score
        );
    }
}
