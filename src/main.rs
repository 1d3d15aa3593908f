//! # clausecite CLI (`cite`)
//!
//! Ingest contracts, ask questions with exact page citations, and run the
//! heuristic extraction and audit passes. `cite serve` exposes the same
//! operations over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! cite --config ./config/cite.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cite init` | Create the SQLite database and run schema migrations |
//! | `cite ingest <files..>` | Store `.pdf` / `.txt` files and reindex |
//! | `cite list` | List stored documents |
//! | `cite search "<query>"` | Ranked matching sentences |
//! | `cite ask "<question>"` | Answer span with its citation |
//! | `cite extract <id>` | Heuristic contract fields as JSON |
//! | `cite audit <id>` | Risk findings as JSON |
//! | `cite serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clausecite::{answer, config, ingest, migrate, retrieve, rules, server};

/// Contract question answering with verifiable citations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cite.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cite",
    about = "Contract question answering with verifiable page citations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cite.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Store one or more `.pdf` / `.txt` files and rebuild the index.
    ///
    /// In text files a form feed character separates pages.
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List stored documents.
    List,

    /// Show the sentences that best match a query.
    Search {
        query: String,

        /// Maximum number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question with a cited span.
    Ask { question: String },

    /// Print heuristic contract fields for a document.
    Extract { document_id: i64 },

    /// Print audit findings for a document.
    Audit { document_id: i64 },

    /// Start the HTTP server on `server.bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clausecite=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { files } => {
            ingest::run_ingest(&cfg, &files).await?;
        }
        Commands::List => {
            ingest::run_list(&cfg).await?;
        }
        Commands::Search { query, limit } => {
            retrieve::run_search(&cfg, &query, limit).await?;
        }
        Commands::Ask { question } => {
            answer::run_ask(&cfg, &question).await?;
        }
        Commands::Extract { document_id } => {
            rules::run_extract(&cfg, document_id).await?;
        }
        Commands::Audit { document_id } => {
            rules::run_audit(&cfg, document_id).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
