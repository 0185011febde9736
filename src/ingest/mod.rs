// Metadata ingestion
// Reads the catalog export, strips markup and writes the document table


use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::database::{Database, DocumentQueries, NewDocument};

/// On-disk shape of the catalog export: `{"dataset": [{"title", "description"}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFile {
    pub dataset: Vec<DatasetRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub records_read: usize,
    pub rows_inserted: u64,
}

impl From<&DatasetRecord> for NewDocument {
    #[inline]
    fn from(record: &DatasetRecord) -> Self {
        NewDocument::new(
            strip_html_tags(&record.title),
            strip_html_tags(&record.description),
        )
    }
}

/// Text content of an HTML fragment with every newline turned into a space.
///
/// Entities are decoded, so `"<p>Soil &amp; Water</p>\nData"` becomes
/// `"Soil & Water Data"`.
#[inline]
pub fn strip_html_tags(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    let stripped: String = fragment.root_element().text().collect();
    stripped.replace('\n', " ")
}

/// Read and parse the metadata export. A missing or malformed file is an error.
#[inline]
pub fn load_metadata<P: AsRef<Path>>(path: P) -> Result<MetadataFile> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read metadata file: {}", path.display()))?;

    let metadata: MetadataFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse metadata file: {}", path.display()))?;

    debug!(
        "Loaded {} dataset records from {}",
        metadata.dataset.len(),
        path.display()
    );
    Ok(metadata)
}

/// Strip markup from every record, preserving order
#[inline]
pub fn prepare_documents(metadata: &MetadataFile) -> Vec<NewDocument> {
    metadata.dataset.iter().map(NewDocument::from).collect()
}

/// Insert all documents in one transaction; any failed row rolls back the run.
///
/// Rows are never deduplicated against what is already stored.
#[inline]
pub async fn store_documents(database: &Database, documents: &[NewDocument]) -> Result<u64> {
    let progress = ProgressBar::new(documents.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} documents")
            .context("Invalid progress bar template")?
            .progress_chars("=> "),
    );

    let insert_all = async {
        let mut tx = database.begin().await?;
        let mut inserted = 0_u64;

        for (index, document) in documents.iter().enumerate() {
            DocumentQueries::create(&mut *tx, document)
                .await
                .with_context(|| {
                    format!("Failed to insert record {} ({:?})", index, document.title)
                })?;
            inserted += 1;
            progress.inc(1);
        }

        tx.commit()
            .await
            .context("Failed to commit ingestion transaction")?;
        Ok::<_, anyhow::Error>(inserted)
    };

    track_progress(&progress, insert_all).await
}

/// Drive `work` to completion, then clear `progress` on success or leave it
/// abandoned at its last position on failure
async fn track_progress<T, F>(progress: &ProgressBar, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match work.await {
        Ok(value) => {
            progress.finish_and_clear();
            Ok(value)
        }
        Err(error) => {
            progress.abandon();
            Err(error)
        }
    }
}

/// Populate the document table from the metadata file at `path`
#[inline]
pub async fn load_docs<P: AsRef<Path>>(database: &Database, path: P) -> Result<IngestReport> {
    let path = path.as_ref();
    info!("Loading catalog metadata from {}", path.display());

    let metadata = load_metadata(path)?;
    let documents = prepare_documents(&metadata);
    let rows_inserted = store_documents(database, &documents).await?;

    info!("Inserted {} documents", rows_inserted);

    Ok(IngestReport {
        records_read: metadata.dataset.len(),
        rows_inserted,
    })
}
