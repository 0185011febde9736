use std::path::PathBuf;

use catalog_rag::Result;
use catalog_rag::commands::{ask, clear_docs_table, init_db, load_docs, search, show_config};
use catalog_rag::config::Config;
use catalog_rag::rag::DEFAULT_LIMIT;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "catalog-rag")]
#[command(about = "Dataset catalog ingestion and retrieval-augmented question answering")]
#[command(version)]
struct Cli {
    /// TOML settings file; defaults to catalog-rag.toml when that file exists
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the metadata file into the document table
    LoadDocs,
    /// Empty the document table and reset its identity
    ClearDocsTbl,
    /// Create the vector extension and document table if missing
    InitDb,
    /// Show the nearest catalog chunks for a query
    Search {
        query: String,
        /// Maximum number of chunks to return
        #[arg(long, short, default_value_t = DEFAULT_LIMIT, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },
    /// Answer a question from the catalog using the chat model
    Ask {
        question: String,
        /// Maximum number of chunks handed to the model
        #[arg(long, short, default_value_t = DEFAULT_LIMIT, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::LoadDocs => {
            load_docs(&config).await?;
        }
        Commands::ClearDocsTbl => {
            clear_docs_table(&config).await?;
        }
        Commands::InitDb => {
            init_db(&config).await?;
        }
        Commands::Search { query, limit } => {
            search(&config, &query, limit).await?;
        }
        Commands::Ask { question, limit } => {
            ask(&config, &question, limit).await?;
        }
        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}
