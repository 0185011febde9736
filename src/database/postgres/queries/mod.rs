use super::models::*;
use anyhow::{Context, Result};
use pgvector::Vector;
use sqlx::{PgExecutor, PgPool};
use tracing::debug;

pub struct DocumentQueries;

impl DocumentQueries {
    /// Insert one row. Accepts a pool or an open transaction.
    #[inline]
    pub async fn create<'e, E>(executor: E, new_document: &NewDocument) -> Result<Document>
    where
        E: PgExecutor<'e>,
    {
        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO document (title, description)
            VALUES ($1, $2)
            RETURNING id::int8 AS id, title, description
            "#,
        )
        .bind(&new_document.title)
        .bind(&new_document.description)
        .fetch_one(executor)
        .await
        .context("Failed to insert document")?;

        Ok(document)
    }

    #[inline]
    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(
            "SELECT id::int8 AS id, title, description FROM document WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get document by id")?;

        Ok(document)
    }

    #[inline]
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT id::int8 AS id, title, description FROM document ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list documents")?;

        Ok(documents)
    }

    #[inline]
    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document")
            .fetch_one(pool)
            .await
            .context("Failed to count documents")?;

        Ok(count)
    }

    /// Empty the table and restart its identity sequence. Cascades to dependents.
    #[inline]
    pub async fn truncate(pool: &PgPool) -> Result<()> {
        sqlx::query("TRUNCATE TABLE document RESTART IDENTITY CASCADE")
            .execute(pool)
            .await
            .context("Failed to truncate document table")?;

        debug!("Document table truncated");
        Ok(())
    }
}

pub struct EmbeddingQueries;

impl EmbeddingQueries {
    /// The `limit` chunks closest to `embedding` by cosine distance, closest first
    #[inline]
    pub async fn nearest(
        pool: &PgPool,
        embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<DocumentSearchResult>> {
        let query_vector = Vector::from(embedding.to_vec());

        let results = sqlx::query_as::<_, DocumentSearchResult>(
            r#"
            SELECT d.id::int8 AS id,
                   d.title,
                   d.description,
                   d.chunk,
                   (d.embedding <=> $1)::float8 AS distance
            FROM document_embedding d
            ORDER BY distance
            LIMIT $2
            "#,
        )
        .bind(query_vector)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to query nearest document chunks")?;

        debug!(
            "Nearest-neighbour query returned {} of at most {} chunks",
            results.len(),
            limit
        );

        Ok(results)
    }
}
