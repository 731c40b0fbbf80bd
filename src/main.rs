//! # Moviate Loader CLI (`moviate`)
//!
//! ## Usage
//!
//! ```bash
//! moviate --config ./config/moviate.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `moviate import` | Merge the datasets, recreate the class and upload every row |
//! | `moviate schema` | Print the class definition as JSON |
//! | `moviate count` | Print the number of objects in the remote class |
//!
//! Credentials come from `WEAVIATE_URL`, `WEAVIATE_API_KEY` and
//! `OPENAI_API_KEY`. Logs go to stderr and are controlled by `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use moviate_loader::config;
use moviate_loader::ingest::{self, ImportOptions};
use moviate_loader::progress::ProgressMode;
use moviate_loader::schema;
use moviate_loader::summary;
use moviate_loader::weaviate::WeaviateClient;

/// Moviate loader: imports merged movie datasets into Weaviate.
#[derive(Parser)]
#[command(name = "moviate", version)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/moviate.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge both datasets and upload them, replacing any existing class.
    ///
    /// Deleting the existing class removes all of its objects.
    Import {
        /// Movie table CSV (overrides `data.movies_csv`).
        #[arg(long)]
        movies: Option<PathBuf>,

        /// Wikipedia plot table CSV (overrides `data.plots_csv`).
        #[arg(long)]
        plots: Option<PathBuf>,

        /// Upload only the first N merged rows.
        #[arg(long)]
        limit: Option<usize>,

        /// Load and merge only; print counts without contacting Weaviate.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Print the class definition that `import` would create.
    Schema,

    /// Print the number of objects in the remote class.
    Count,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Import {
            movies,
            plots,
            limit,
            dry_run,
            progress,
        } => {
            let options = ImportOptions {
                movies,
                plots,
                limit,
                dry_run,
            };
            let reporter = progress
                .unwrap_or_else(ProgressMode::default_for_tty)
                .reporter();
            ingest::run_import(&cfg, &options, reporter.as_ref()).await?;
        }
        Commands::Schema => {
            let class = schema::movie_class(&cfg.collection);
            println!("{}", serde_json::to_string_pretty(&class)?);
        }
        Commands::Count => {
            let client = WeaviateClient::new(&cfg.weaviate, &cfg.batch)?;
            let count = summary::fetch_count(&client, &cfg.collection.name).await?;
            println!("{}", count);
        }
    }

    Ok(())
}
