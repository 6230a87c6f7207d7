//! books CLI
//!
//! Command-line interface for importing, searching and editing an ebook library.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookshelf_core::{load_config, validate_config};

#[derive(Parser)]
#[command(name = "books", version)]
#[command(about = "Manage an ebook library", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/books/config.toml)
    #[arg(short, long, global = true, env = "BOOKS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the library database and content root
    Init,

    /// Import book files into the library
    Import {
        /// Move files into the library instead of copying them
        #[arg(long = "move", conflicts_with = "copy")]
        move_files: bool,

        /// Copy files into the library (overrides import.move_files)
        #[arg(long)]
        copy: bool,

        /// Where these books came from
        #[arg(long)]
        source: Option<String>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Full-text search, e.g. `title:dune` or `author:herbert`
    Search {
        /// Print results as JSON
        #[arg(long)]
        json: bool,

        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Show books by id
    Show {
        /// Print books as JSON
        #[arg(long)]
        json: bool,

        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Interactively edit a book
    Edit { id: i64 },

    /// Convert a book with the configured converter and print the cached path
    Convert { id: i64 },

    /// List books whose file is missing from the content root
    Check,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    match cli.command {
        Command::Init => commands::init(&config),
        Command::Import {
            move_files,
            copy,
            source,
            files,
        } => {
            let move_files = if copy {
                false
            } else {
                move_files || config.import.move_files
            };
            commands::import(&config, &files, move_files, source)
        }
        Command::Search { json, query } => commands::search(&config, &query.join(" "), json),
        Command::Show { json, ids } => commands::show(&config, &ids, json),
        Command::Edit { id } => commands::edit(&config, id),
        Command::Convert { id } => commands::convert(&config, id).await,
        Command::Check => commands::check(&config),
    }
}

fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .context("HOME is not set; pass --config or set BOOKS_CONFIG")?;
    Ok(PathBuf::from(home).join(".config/books/config.toml"))
}
