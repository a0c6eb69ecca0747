use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tunevault::config::{AppConfig, FileConfig};
use tunevault::search::SearchAggregator;
use tunevault::store::{SongStore, SqliteMusicStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[clap(about = "Admin tooling for a tunevault music database")]
struct CliArgs {
    /// Path to a TOML config file.
    #[clap(long, value_parser = parse_path)]
    config: Option<PathBuf>,

    /// Path to the SQLite music database file.
    #[clap(long, value_parser = parse_path)]
    db: Option<PathBuf>,

    /// Number of read-only connections to keep open.
    #[clap(long)]
    read_pool_size: Option<usize>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database (or migrate an existing one) and exit.
    Init,
    /// Search songs, artists, albums and public playlists.
    Search { query: String },
    /// Print row counts per table.
    Stats,
    /// Print the best-rated songs.
    TopSongs {
        #[clap(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = AppConfig::resolve(cli_args.db, cli_args.read_pool_size, file_config)?;

    let store = Arc::new(SqliteMusicStore::new(
        &config.db_path,
        config.read_pool_size,
    )?);

    match cli_args.command {
        Command::Init => {
            info!("Database at {:?} is ready", config.db_path);
        }
        Command::Search { query } => {
            let aggregator = SearchAggregator::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store,
            );
            let bundle = aggregator.search(&query)?;
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        }
        Command::Stats => {
            let counts = store.counts()?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        Command::TopSongs { limit } => {
            let songs = store.top_rated_songs(limit)?;
            println!("{}", serde_json::to_string_pretty(&songs)?);
        }
    }
    Ok(())
}
