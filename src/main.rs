//! # refharness CLI (`refs`)
//!
//! ## Usage
//!
//! ```bash
//! refs --config ./config/refs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `refs search` | Search references by keyword, author and year |
//! | `refs sync [source]` | Refresh the cached listing of one or all sources |
//! | `refs status` | Per-source file counts and last refresh |
//! | `refs authors` | Every known author |
//! | `refs years` | Every publication year, newest first |
//! | `refs stats` | Counts by source, type, year and author |
//! | `refs add <file>` | File a new reference into the local folder |
//! | `refs config` | Show the effective configuration |

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use refharness::config::{load_config, Config};
use refharness::connector_fs::LocalCollector;
use refharness::models::{Criteria, SourceSelector};
use refharness::search::{run_search, SearchEngine};
use refharness::sources::{run_status, run_sync};
use refharness::stats::{run_authors, run_stats, run_years};

/// refharness: search bibliographic references across Google Drive,
/// GitHub and local folders.
#[derive(Parser)]
#[command(name = "refs", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/refs.toml")]
    config: PathBuf,

    /// Log pipeline details to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search references.
    ///
    /// Results are ranked by relevance, then year (newest first), then
    /// author and title.
    Search {
        /// Source to search: `all`, `drive`, `github`, or `local`.
        #[arg(short, long, default_value = "all")]
        source: String,

        /// Keyword matched against title and author, then any field.
        #[arg(short, long)]
        keyword: Option<String>,

        /// Author name (substring, case-insensitive).
        #[arg(short, long)]
        author: Option<String>,

        /// Publication year.
        #[arg(short, long)]
        year: Option<String>,

        /// Maximum number of results (defaults to `search.default_limit`).
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Refresh cached listings.
    Sync {
        /// `all`, `drive`, `github`, or `local`.
        #[arg(default_value = "all")]
        source: String,
    },

    /// Show per-source status.
    Status,

    /// List every known author.
    Authors,

    /// List every publication year.
    Years,

    /// Show reference statistics.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Copy a file into the local references folder.
    ///
    /// The copy is named `Author_Year_Title.ext` so that searches recover
    /// the metadata from the filename.
    Add {
        /// File to add.
        file: PathBuf,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        author: Option<String>,
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Show the effective configuration (secrets masked).
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Search {
            source,
            keyword,
            author,
            year,
            limit,
        } => {
            let criteria =
                Criteria::from_input(keyword.as_deref(), author.as_deref(), year.as_deref())?;
            let engine = SearchEngine::from_config(&config);
            let limit = limit.unwrap_or(config.search.default_limit);
            run_search(&engine, &source, &criteria, limit).await?;
        }
        Commands::Sync { source } => {
            let selector: SourceSelector = source.parse()?;
            let engine = SearchEngine::from_config(&config);
            run_sync(engine.registry(), selector).await?;
        }
        Commands::Status => {
            let engine = SearchEngine::from_config(&config);
            run_status(&config, engine.registry())?;
        }
        Commands::Authors => run_authors(&SearchEngine::from_config(&config)).await?,
        Commands::Years => run_years(&SearchEngine::from_config(&config)).await?,
        Commands::Stats { json } => run_stats(&SearchEngine::from_config(&config), json).await?,
        Commands::Add {
            file,
            title,
            author,
            year,
        } => {
            let local = config
                .sources
                .local
                .clone()
                .context("No [sources.local] section in config")?;
            let collector = LocalCollector::new(local, &config.cache.dir)?;
            let dest =
                collector.add_reference(&file, title.as_deref(), author.as_deref(), year)?;
            println!("Added {}", dest.display());
            println!("Run `refs sync local` to include it in searches.");
        }
        Commands::Config => print_config(&config)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "refharness=debug,info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_config(config: &Config) -> Result<()> {
    println!("{}", toml::to_string_pretty(config)?);

    let mut token_vars = Vec::new();
    if let Some(drive) = &config.sources.drive {
        token_vars.push(drive.token_env.as_str());
    }
    if let Some(github) = &config.sources.github {
        token_vars.push(github.token_env.as_str());
    }
    if !token_vars.is_empty() {
        println!("# credentials");
        for var in token_vars {
            let state = match std::env::var(var) {
                Ok(v) if !v.trim().is_empty() => "***set***",
                _ => "not set",
            };
            println!("# {} = {}", var, state);
        }
    }
    Ok(())
}
