//! Retrieval-augmented answering over the catalog.
//!
//! A question is embedded, the nearest document chunks are fetched from the
//! vector-enabled store, and the chunks are handed to the chat model together
//! with the librarian system prompt.

#[cfg(test)]
mod tests;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use itertools::Itertools;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::database::{Database, DocumentSearchResult};
use crate::openai::{ChatMessage, OpenAiClient};

pub const DEFAULT_LIMIT: i64 = 1;

/// Anything that can answer a nearest-neighbour query over stored chunk embeddings
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// At most `limit` chunks ordered by non-decreasing distance to `embedding`
    async fn nearest_chunks(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<DocumentSearchResult>>;
}

#[async_trait]
impl ChunkSource for Database {
    async fn nearest_chunks(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<DocumentSearchResult>> {
        Database::nearest_chunks(self, embedding, limit).await
    }
}

/// Embed `query` and return the `limit` closest chunks, closest first
#[inline]
pub async fn find_relevant_chunks<S>(
    source: &S,
    client: &OpenAiClient,
    query: &str,
    limit: i64,
) -> Result<Vec<DocumentSearchResult>>
where
    S: ChunkSource + ?Sized,
{
    if limit < 1 {
        bail!("Result limit must be at least 1, got {}", limit);
    }

    debug!("Finding up to {} chunks for query '{}'", limit, query);

    let embed_client = client.clone();
    let text = query.to_string();
    let query_embedding =
        tokio::task::spawn_blocking(move || embed_client.generate_embedding(&text))
            .await
            .context("Embedding task failed")??;

    debug!(
        "Embedded query with {} ({} dimensions)",
        query_embedding.model,
        query_embedding.embedding.len()
    );

    source
        .nearest_chunks(&query_embedding.embedding, limit)
        .await
}

/// Join chunks as `"{title}:\n{description}"` separated by a blank line
#[inline]
pub fn build_context(chunks: &[DocumentSearchResult]) -> String {
    chunks
        .iter()
        .map(DocumentSearchResult::context_entry)
        .join("\n\n")
}

#[inline]
pub fn build_user_message(question: &str, context: &str) -> String {
    format!("Question: {question}\n\nAvailable catalog data:\n\n{context}")
}

/// Read the system prompt verbatim
#[inline]
pub fn load_prompt<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt file: {}", path.display()))
}

/// The model's reply plus the chunks it was given
#[derive(Debug, Clone, PartialEq)]
pub struct RagAnswer {
    pub reply: String,
    pub chunks: Vec<DocumentSearchResult>,
}

/// Answers catalog questions with a fixed system prompt
pub struct Librarian<S> {
    source: S,
    client: OpenAiClient,
    system_prompt: String,
}

impl<S: ChunkSource> Librarian<S> {
    #[inline]
    pub fn new(source: S, client: OpenAiClient, system_prompt: String) -> Self {
        Self {
            source,
            client,
            system_prompt,
        }
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[inline]
    pub fn into_source(self) -> S {
        self.source
    }

    /// Retrieve context for `question` and ask the chat model once
    #[inline]
    pub async fn answer(&self, question: &str, limit: i64) -> Result<RagAnswer> {
        let chunks = find_relevant_chunks(&self.source, &self.client, question, limit)
            .await
            .context("Failed to retrieve relevant chunks")?;

        info!("Retrieved {} chunks for question", chunks.len());

        let context = build_context(&chunks);
        let messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(build_user_message(question, &context)),
        ];

        let client = self.client.clone();
        let reply = tokio::task::spawn_blocking(move || client.chat_completion(&messages))
            .await
            .context("Chat completion task failed")??;

        Ok(RagAnswer { reply, chunks })
    }
}
