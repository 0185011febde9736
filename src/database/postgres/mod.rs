use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};

use crate::CatalogError;
use crate::config::{Config, PoolConfig};

pub mod models;
pub mod queries;

pub use models::*;
pub use queries::*;

pub type DbPool = PgPool;

/// Process-wide handle on the connection pool. Close it with [`Database::close`].
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn connect(config: &Config) -> Result<Self> {
        let url = config
            .database_url()
            .context("Failed to compose database URL")?;

        debug!(
            "Connecting to {}",
            config.postgres.redacted_url().unwrap_or_default()
        );

        Self::connect_url(&url, &config.database).await
    }

    #[inline]
    pub async fn connect_url(url: &str, pool_config: &PoolConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(pool_config.min_connections)
            .max_connections(pool_config.max_connections)
            .connect(url)
            .await
            .map_err(|e| {
                CatalogError::Database(format!("Failed to create database connection pool: {}", e))
            })?;

        info!(
            "Database pool ready ({}..{} connections)",
            pool_config.min_connections, pool_config.max_connections
        );

        Ok(Self { pool })
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Apply the bundled schema: the `vector` extension and the `document` table
    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/postgres/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .context("Failed to start transaction")
    }

    // Document operations
    #[inline]
    pub async fn insert_document(&self, document: &NewDocument) -> Result<Document> {
        DocumentQueries::create(&self.pool, document).await
    }

    #[inline]
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        DocumentQueries::list_all(&self.pool).await
    }

    #[inline]
    pub async fn count_documents(&self) -> Result<i64> {
        DocumentQueries::count(&self.pool).await
    }

    #[inline]
    pub async fn clear_documents(&self) -> Result<()> {
        info!("Clearing document table");
        DocumentQueries::truncate(&self.pool).await
    }

    // Embedding operations
    #[inline]
    pub async fn nearest_chunks(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<DocumentSearchResult>> {
        EmbeddingQueries::nearest(&self.pool, embedding, limit).await
    }

    /// Wait for checked-out connections to return, then shut the pool down
    #[inline]
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Database pool closed");
    }
}
