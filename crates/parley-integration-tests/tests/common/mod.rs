//! Shared harness for relay integration tests.

use parley_llm::CompletionClient;
use parley_memory::ConversationStore;
use parley_render::StreamingRenderer;
use tempfile::TempDir;

/// Model name sent by the harness client.
#[allow(dead_code)]
pub const TEST_MODEL: &str = "test-model";

/// A mock completion endpoint, a renderer pointed at it, and a conversation
/// store in a temp directory.
#[allow(dead_code)]
pub struct RelayHarness {
    /// The mock endpoint.
    pub server: mockito::ServerGuard,
    /// Renderer using a client for `server`.
    pub renderer: StreamingRenderer<CompletionClient>,
    /// Conversation store with a six-turn window.
    pub store: ConversationStore,
    /// Held so the store file outlives the test.
    dir: TempDir,
}

#[allow(dead_code)]
impl RelayHarness {
    /// Start a mock server and open an empty store.
    pub async fn new() -> Self {
        let server = mockito::Server::new_async().await;
        let client = CompletionClient::new(&server.url(), Some("sk-test"), TEST_MODEL)
            .with_max_tokens(256);
        let dir = TempDir::new().expect("failed to create tempdir");
        let store = ConversationStore::open(dir.path().join("memory.json"), 6)
            .expect("failed to open store");
        Self {
            server,
            renderer: StreamingRenderer::new(client),
            store,
            dir,
        }
    }

    /// Path of the conversation file.
    pub fn store_path(&self) -> std::path::PathBuf {
        self.dir.path().join("memory.json")
    }

    /// Serve `body` as a successful event stream for the next request.
    pub async fn serve_stream(&mut self, body: String) -> mockito::Mock {
        self.server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await
    }
}

/// Encode each delta as a `data:` event and append the end sentinel.
pub fn sse_stream(deltas: &[&str]) -> String {
    let mut body = String::new();
    for text in deltas {
        let event = serde_json::json!({"choices": [{"delta": {"content": text}}]});
        body.push_str(&format!("data: {event}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}
