//! # docrag CLI
//!
//! ## Usage
//!
//! ```bash
//! docrag --config ./config/docrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docrag init` | Create the SQLite store and schema |
//! | `docrag index <file>` | Extract, chunk and store a document as a collection |
//! | `docrag ask "<question>"` | Answer a question from a collection |
//! | `docrag collections` | List indexed collections |
//! | `docrag drop <collection>` | Delete a collection |
//! | `docrag status` | Show store, embedding and completion settings |
//! | `docrag serve` | Start the HTTP API |
//!
//! Logs go to stderr; `RUST_LOG` overrides the default `info` level.
//! A `.env` file in the working directory is loaded before anything else,
//! so the completion credential can live there.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use doc_rag::{ask, collections, config, db, ingest, migrate, server, status};

const DEFAULT_CONFIG: &str = "./config/docrag.toml";

/// docrag: ask questions about a document.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the default path does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "docrag",
    about = "Index a document and ask questions about it with retrieval-augmented generation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store file and schema. Safe to run repeatedly.
    Init,

    /// Index a document as a collection, replacing any collection of that name.
    ///
    /// Supported formats: PDF, DOCX, PPTX. The type is detected from the file
    /// extension or contents unless `--content-type` is given.
    Index {
        /// Path to the document.
        file: PathBuf,

        /// Collection name (defaults to `[retrieval].collection`).
        #[arg(long)]
        collection: Option<String>,

        /// Characters per chunk (defaults to `[chunking].chunk_size`).
        #[arg(long)]
        chunk_size: Option<usize>,

        /// MIME type of the document, e.g. `application/pdf`.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Answer a question using the chunks of a collection.
    Ask {
        /// The question.
        question: String,

        /// Collection to search (defaults to `[retrieval].collection`).
        #[arg(long)]
        collection: Option<String>,

        /// Number of chunks to retrieve (defaults to `[retrieval].k`).
        #[arg(short, long)]
        k: Option<usize>,

        /// Completion model identifier (defaults to `[completion].model`).
        #[arg(long)]
        model: Option<String>,

        /// Print the retrieved chunks before the answer.
        #[arg(long)]
        show_context: bool,
    },

    /// List indexed collections.
    Collections,

    /// Delete a collection. Dropping a missing collection is not an error.
    Drop {
        collection: String,
    },

    /// Show store, embedding and completion settings.
    Status,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let allow_missing = cli.config == PathBuf::from(DEFAULT_CONFIG);
    let cfg = config::load_or_minimal(&cli.config, allow_missing)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.store).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Store initialized at {}.", cfg.store.path.display());
        }
        Commands::Index {
            file,
            collection,
            chunk_size,
            content_type,
        } => {
            ingest::run_index(&cfg, &file, collection, chunk_size, content_type).await?;
        }
        Commands::Ask {
            question,
            collection,
            k,
            model,
            show_context,
        } => {
            ask::run_ask(&cfg, &question, collection, k, model, show_context).await?;
        }
        Commands::Collections => {
            collections::run_collections(&cfg).await?;
        }
        Commands::Drop { collection } => {
            collections::run_drop(&cfg, &collection).await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
