use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

mod config;
mod csv_store;
mod error;
mod extract;
mod firestore;
mod parse;
mod session;
mod sqlite_store;
mod types;
mod upload;

use config::{Config, CONFIG_FILE, CREDENTIALS_FILE, CSV_FILE};
use csv_store::CsvStore;
use firestore::FirestoreStore;
use session::HttpPageSession;
use sqlite_store::SqliteStore;

#[derive(Parser)]
#[command(name = "panchanga")]
#[command(about = "Panchanga scraper and document store loader")]
struct Cli {
    /// Settings file (CONL); defaults are used if it does not exist
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape each day in the configured range and append it to the CSV
    Extract {
        /// CSV file to append to
        #[arg(short, long, default_value = CSV_FILE)]
        output: PathBuf,
    },
    /// Upsert every CSV row into the document store, keyed by date
    Upload {
        /// CSV file produced by `extract`
        #[arg(short, long, default_value = CSV_FILE)]
        input: PathBuf,
        /// Service account key file for Firestore
        #[arg(long, default_value = CREDENTIALS_FILE)]
        credentials: PathBuf,
        /// Write to a local SQLite database instead of Firestore
        #[arg(long, value_name = "PATH")]
        sqlite: Option<PathBuf>,
    },
}

fn run_extract(config: &Config, output: &Path) -> Result<()> {
    let (start, end) = config.date_range()?;
    let mut session = HttpPageSession::new(
        &config.page_url,
        &config.date_param,
        &config.user_agent,
        config.cache_dir(),
    )?;
    let store = CsvStore::new(output);

    println!(
        "Extracting {} to {} into {}...",
        start,
        end,
        output.display()
    );
    let summary = extract::run_extract(&mut session, &store, start, end)?;
    println!("Done! Appended {} rows to {}", summary.rows, output.display());
    Ok(())
}

fn run_upload(
    config: &Config,
    input: &Path,
    credentials: &Path,
    sqlite: Option<&Path>,
) -> Result<()> {
    let rows = CsvStore::new(input).read_all()?;
    info!(rows = rows.len(), path = %input.display(), "read csv");

    let summary = match sqlite {
        Some(path) => {
            let mut store = SqliteStore::open(path)?;
            let summary =
                upload::upload_rows(&rows, &mut store, &config.collection, config.batch_size)?;
            info!(
                documents = store.count(&config.collection)?,
                path = %path.display(),
                "sqlite mirror updated"
            );
            summary
        }
        None => {
            let mut store = FirestoreStore::from_credentials(credentials, &config.user_agent)?;
            upload::upload_rows(&rows, &mut store, &config.collection, config.batch_size)?
        }
    };

    println!(
        "Success! {} records updated in {} batch(es).",
        summary.documents, summary.batches
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Extract { output } => run_extract(&config, &output),
        Commands::Upload {
            input,
            credentials,
            sqlite,
        } => run_upload(&config, &input, &credentials, sqlite.as_deref()),
    }
}
