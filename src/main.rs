use vizsql::chart_recommender::ChartRecommender;
use vizsql::config::EngineConfig;
use vizsql::instruction::RequirementExtractor;
use vizsql::result_set::ResultSet;
use vizsql::sql_generator::SqlIntentGenerator;
use vizsql::sql_validator::SqlValidator;
use vizsql::summary::query_summary;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vizsql")]
#[command(about = "Natural-language SQL generation and chart recommendation")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract chart type and display hints from a request
    Intent {
        /// The request in natural language
        text: String,
    },
    /// Generate SQL for a request
    Sql {
        /// The request in natural language
        text: String,

        /// Skip the AI provider and use the rule-based builder only
        #[arg(long)]
        offline: bool,

        /// API key (or set DEEPSEEK_API_KEY env var)
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Check a statement's structure
    Validate {
        sql: String,
    },
    /// Recommend a chart for a JSON result set
    Chart {
        /// JSON file: {"columns": [...], "rows": [[...]]} or a list of row objects
        #[arg(short, long)]
        data: PathBuf,

        /// SQL that produced the result set
        #[arg(short, long, default_value = "")]
        query: String,

        /// The original request, scanned for chart hints
        #[arg(default_value = "")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Intent { text } => print_json(&RequirementExtractor::new().extract(&text)),
        Commands::Sql { text, offline, api_key } => run_sql(&text, offline, api_key).await,
        Commands::Validate { sql } => print_json(&SqlValidator::new().validate(&sql)),
        Commands::Chart { data, query, text } => run_chart(&data, &query, &text),
    }
}

async fn run_sql(text: &str, offline: bool, api_key: Option<String>) -> Result<()> {
    let mut config = EngineConfig::from_env()?;
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    info!("Using model {} (key {})", config.model, config.masked_key());

    let generator = SqlIntentGenerator::from_config(&config)?;
    let result = if offline {
        generator.generate_offline(text)
    } else {
        generator.generate(text).await
    };

    print_json(&result)
}

fn run_chart(data: &Path, query: &str, text: &str) -> Result<()> {
    let result = ResultSet::load(data)
        .with_context(|| format!("Failed to load result set from {:?}", data))?;
    let recommendation = ChartRecommender::new().analyze(&result, query, text);
    info!("{}", query_summary(result.row_count(), &recommendation));
    print_json(&recommendation)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
