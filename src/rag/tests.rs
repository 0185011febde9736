use super::*;
use crate::config::Config;
use serde_json::json;
use std::sync::Mutex;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory store returning canned chunks, trimmed to the requested limit
struct FakeSource {
    chunks: Vec<DocumentSearchResult>,
    calls: Mutex<Vec<(Vec<f32>, i64)>>,
}

impl FakeSource {
    fn new(chunks: Vec<DocumentSearchResult>) -> Self {
        Self {
            chunks,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(Vec<f32>, i64)> {
        self.calls.lock().expect("lock should not be poisoned").clone()
    }
}

#[async_trait]
impl ChunkSource for FakeSource {
    async fn nearest_chunks(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<DocumentSearchResult>> {
        self.calls
            .lock()
            .expect("lock should not be poisoned")
            .push((embedding.to_vec(), limit));

        let take = usize::try_from(limit).unwrap_or(0);
        Ok(self.chunks.iter().take(take).cloned().collect())
    }
}

fn chunk(id: i64, title: &str, description: &str, distance: f64) -> DocumentSearchResult {
    DocumentSearchResult {
        id,
        title: title.to_string(),
        description: description.to_string(),
        chunk: description.to_string(),
        distance,
    }
}

fn sample_chunks() -> Vec<DocumentSearchResult> {
    vec![
        chunk(7, "Soil Erosion Survey", "Sheet and rill erosion by county", 0.11),
        chunk(3, "Rainfall Totals", "Daily rainfall by station", 0.19),
        chunk(9, "Land Cover", "Satellite-derived land cover classes", 0.27),
    ]
}

fn test_client(server: &MockServer) -> OpenAiClient {
    let mut config = Config::default();
    config.openai.base_url = format!("{}/v1", server.uri());
    config.openai.api_key = Some("sk-test".to_string());

    OpenAiClient::new(&config)
        .expect("Failed to create client")
        .with_retry_attempts(1)
}

async fn mount_embedding(server: &MockServer, embedding: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": embedding}]
        })))
        .mount(server)
        .await;
}

#[test]
fn context_joins_chunks_in_order() {
    let context = build_context(&sample_chunks());

    assert_eq!(
        context,
        "Soil Erosion Survey:\nSheet and rill erosion by county\n\n\
         Rainfall Totals:\nDaily rainfall by station\n\n\
         Land Cover:\nSatellite-derived land cover classes"
    );
}

#[test]
fn context_for_single_and_no_chunks() {
    let chunks = sample_chunks();
    assert_eq!(
        build_context(&chunks[..1]),
        "Soil Erosion Survey:\nSheet and rill erosion by county"
    );
    assert_eq!(build_context(&[]), "");
}

#[test]
fn user_message_layout() {
    let message = build_user_message("What tables might have erosion data?", "A:\nB");
    assert_eq!(
        message,
        "Question: What tables might have erosion data?\n\nAvailable catalog data:\n\nA:\nB"
    );
}

#[test]
fn prompt_loaded_verbatim() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let prompt_path = temp_dir.path().join("librarian-prompt.md");
    let prompt = "# Librarian\n\nAnswer only from the catalog.\n";
    fs::write(&prompt_path, prompt).expect("should write prompt");

    assert_eq!(load_prompt(&prompt_path).expect("prompt should load"), prompt);
    assert!(load_prompt(temp_dir.path().join("missing.md")).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn find_relevant_chunks_embeds_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"input": "erosion"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.5, 0.25]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = FakeSource::new(sample_chunks());
    let client = test_client(&server);

    let results = find_relevant_chunks(&source, &client, "erosion", 2)
        .await
        .expect("retrieval should succeed");

    assert_eq!(results.len(), 2);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert_eq!(source.calls(), vec![(vec![0.5, 0.25], 2)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn find_relevant_chunks_rejects_zero_limit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let source = FakeSource::new(sample_chunks());
    let client = test_client(&server);

    assert!(find_relevant_chunks(&source, &client, "erosion", 0).await.is_err());
    assert!(source.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn librarian_answers_with_context() {
    let server = MockServer::start().await;
    mount_embedding(&server, json!([0.1, 0.2, 0.3])).await;

    let expected_user = build_user_message(
        "What tables might have erosion data?",
        "Soil Erosion Survey:\nSheet and rill erosion by county",
    );

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                {"role": "system", "content": "You are the catalog librarian."},
                {"role": "user", "content": expected_user}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Try the Soil Erosion Survey."}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let librarian = Librarian::new(
        FakeSource::new(sample_chunks()),
        test_client(&server),
        "You are the catalog librarian.".to_string(),
    );

    let answer = librarian
        .answer("What tables might have erosion data?", DEFAULT_LIMIT)
        .await
        .expect("answer should succeed");

    assert_eq!(answer.reply, "Try the Soil Erosion Survey.");
    assert_eq!(answer.chunks.len(), 1);
    assert_eq!(answer.chunks[0].id, 7);
    assert_eq!(librarian.source().calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn librarian_propagates_chat_failure() {
    let server = MockServer::start().await;
    mount_embedding(&server, json!([0.1, 0.2, 0.3])).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let librarian = Librarian::new(
        FakeSource::new(sample_chunks()),
        test_client(&server),
        "prompt".to_string(),
    );

    assert!(librarian.answer("anything", 3).await.is_err());
}
