mod export;
mod rules;
mod scrape;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::export::ExportFormat;
use crate::rules::RulesCommands;

#[derive(Debug, Parser)]
#[command(name = "mapscout")]
#[command(about = "Scrape business listings for a batch of search queries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape listings for one or more queries and export them
    Scrape {
        /// Search queries, e.g. "cafes in paris"
        queries: Vec<String>,
        /// Read additional queries from a file, one per line
        #[arg(long)]
        file: Option<PathBuf>,
        /// Write results here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
        /// Override the number of queries scraped at once
        #[arg(long)]
        concurrency: Option<usize>,
        /// Override the per-query record cap
        #[arg(long)]
        max_records: Option<usize>,
        /// Visit each website to look for contact emails
        #[arg(long)]
        enrich: bool,
        /// Extraction rules file replacing the built-in table
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Inspect extraction rule tables
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mapscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // stdout carries exported records
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scrape {
            queries,
            file,
            output,
            format,
            concurrency,
            max_records,
            enrich,
            rules,
        } => {
            let args = scrape::ScrapeArgs {
                queries,
                file,
                output,
                format,
                concurrency,
                max_records,
                enrich,
                rules,
            };
            scrape::run_scrape(config, args).await?;
        }
        Commands::Rules { command } => match command {
            RulesCommands::Check { path } => {
                rules::run_rules_check(path.as_deref().or(config.rules_path.as_deref()))?;
            }
        },
    }

    Ok(())
}
