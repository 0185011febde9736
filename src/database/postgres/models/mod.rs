#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A catalog entry as stored in the `document` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub description: String,
}

/// One row of a nearest-neighbour query against `document_embedding`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DocumentSearchResult {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub chunk: String,
    /// Cosine distance to the query vector; lower is closer
    pub distance: f64,
}

impl NewDocument {
    #[inline]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

impl DocumentSearchResult {
    /// Context entry handed to the chat model: `"{title}:\n{description}"`
    #[inline]
    pub fn context_entry(&self) -> String {
        format!("{}:\n{}", self.title, self.description)
    }

    /// Cosine similarity derived from the distance
    #[inline]
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}
