use anyhow::{Context, Result};
use console::style;
use tracing::{error, info};

use crate::config::Config;
use crate::database::Database;
use crate::ingest;
use crate::openai::OpenAiClient;
use crate::rag::{self, Librarian};

/// Populate the document table from the configured metadata file
#[inline]
pub async fn load_docs(config: &Config) -> Result<()> {
    let database = Database::connect(config)
        .await
        .context("Failed to initialize database")?;

    let result = ingest::load_docs(&database, &config.paths.metadata_file).await;
    database.close().await;

    let report = result.inspect_err(|e| error!("Ingestion failed: {:#}", e))?;

    println!(
        "{} Loaded {} documents from {}",
        style("✓").green(),
        report.rows_inserted,
        config.paths.metadata_file.display()
    );

    Ok(())
}

/// Empty the document table and reset its identity sequence
#[inline]
pub async fn clear_docs_table(config: &Config) -> Result<()> {
    let database = Database::connect(config)
        .await
        .context("Failed to initialize database")?;

    let result = database.clear_documents().await;
    database.close().await;
    result?;

    println!("{} Document table cleared", style("✓").green());
    Ok(())
}

/// Create the vector extension and document table if they are missing
#[inline]
pub async fn init_db(config: &Config) -> Result<()> {
    let database = Database::connect(config)
        .await
        .context("Failed to initialize database")?;

    let result = database.run_migrations().await;
    database.close().await;
    result?;

    println!("{} Database schema is up to date", style("✓").green());
    Ok(())
}

/// Print the chunks nearest to `query`
#[inline]
pub async fn search(config: &Config, query: &str, limit: i64) -> Result<()> {
    let client = OpenAiClient::new(config).context("Failed to initialize model client")?;
    let database = Database::connect(config)
        .await
        .context("Failed to initialize database")?;

    let result = rag::find_relevant_chunks(&database, &client, query, limit).await;
    database.close().await;
    let results = result?;

    if results.is_empty() {
        println!("No matching catalog entries.");
        return Ok(());
    }

    println!("Search results ({} of at most {}):", results.len(), limit);
    println!();

    for result in &results {
        println!(
            "{} {} (ID: {})",
            style(format!("{:.4}", result.distance)).cyan(),
            style(&result.title).bold(),
            result.id
        );
        println!("   Similarity: {:.1}%", result.similarity() * 100.0);
        println!("   {}", result.chunk);
        println!();
    }

    Ok(())
}

/// Answer `question` from the catalog and print the model's reply
#[inline]
pub async fn ask(config: &Config, question: &str, limit: i64) -> Result<()> {
    let system_prompt = rag::load_prompt(&config.paths.prompt_file)?;
    let client = OpenAiClient::new(config).context("Failed to initialize model client")?;
    let database = Database::connect(config)
        .await
        .context("Failed to initialize database")?;

    info!("Answering question with model {}", client.chat_model());

    let librarian = Librarian::new(database, client, system_prompt);
    let result = librarian.answer(question, limit).await;
    librarian.into_source().close().await;
    let answer = result?;

    println!("RAG response:");
    println!("{}", answer.reply);

    Ok(())
}

/// Print the effective configuration with secrets masked
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", style("Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Database:").bold().yellow());
    println!("  URL: {}", config.postgres.redacted_url()?);
    println!(
        "  Pool size: {}..{}",
        config.database.min_connections, config.database.max_connections
    );
    println!();

    println!("{}", style("Model API:").bold().yellow());
    println!("  Base URL: {}", config.openai.api_url()?);
    println!(
        "  API key: {}",
        if config.openai.api_key.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!("  Embedding model: {}", config.openai.embedding_model);
    println!("  Chat model: {}", config.openai.chat_model);
    println!("  Timeout: {}s", config.openai.timeout_secs);
    println!("  Retry attempts: {}", config.openai.retry_attempts);
    println!();

    println!("{}", style("Files:").bold().yellow());
    println!("  Metadata: {}", config.paths.metadata_file.display());
    println!("  Prompt: {}", config.paths.prompt_file.display());

    Ok(())
}
