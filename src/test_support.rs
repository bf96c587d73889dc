//! Throwaway upstreams and collaborator fakes shared by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::completion::CompletionProvider;
use crate::db::TranscriptStore;
use crate::errors::AppError;
use crate::models::{CompletionResult, MessageRecord};

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("captured body is not JSON")
    }
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: &'static str,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

/// Answers every request with a fixed status and body, recording what it saw.
pub struct MockUpstream {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockUpstream {
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        Self::start_with_delay(status, body, None).await
    }

    pub async fn start_with_delay(
        status: StatusCode,
        body: &'static str,
        delay: Option<Duration>,
    ) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState { status, body, delay, requests: requests.clone() };
        let app = Router::new().fallback(capture).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock upstream");
        let addr = listener.local_addr().expect("mock upstream address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { base_url: format!("http://{addr}"), requests, handle }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn capture(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.requests.lock().expect("requests lock").push(CapturedRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }
    (state.status, [(header::CONTENT_TYPE, "application/json")], state.body).into_response()
}

/// An address nothing is listening on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{addr}")
}

/// Serves one connection: reads the whole request, then answers with
/// `status_line` and a body that ends well short of its `content-length`.
pub async fn truncated_upstream(status_line: &'static str) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind truncated upstream");
    let addr = listener.local_addr().expect("truncated upstream address");

    let handle = tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else { return };
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            request.extend_from_slice(&chunk[..n]);
            if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + body_len {
                    break;
                }
            }
        }

        let response = format!(
            "{status_line}\r\ncontent-type: application/json\r\ncontent-length: 1000\r\n\r\n{{\"error\":"
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    (format!("http://{addr}"), handle)
}

// ── Collaborator fakes ────────────────────────────────────────────────────────

/// Completion provider returning a canned reply verbatim or a canned failure.
pub struct FakeCompletion {
    reply: Option<String>,
    failure: fn() -> AppError,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            failure: || AppError::Internal("unused".into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(failure: fn() -> AppError) -> Self {
        Self { reply: None, failure, calls: Mutex::new(Vec::new()) }
    }

    /// `(message, model)` pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn complete(&self, message: &str, model: &str) -> Result<CompletionResult, AppError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((message.to_string(), model.to_string()));
        match &self.reply {
            Some(reply) => Ok(CompletionResult { reply: reply.clone() }),
            None => Err((self.failure)()),
        }
    }
}

/// Store that records every batch, optionally failing each insert.
#[derive(Default)]
pub struct RecordingStore {
    fail: bool,
    batches: Mutex<Vec<Vec<MessageRecord>>>,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self { fail: true, batches: Mutex::new(Vec::new()) }
    }

    pub fn batches(&self) -> Vec<Vec<MessageRecord>> {
        self.batches.lock().expect("batches lock").clone()
    }
}

#[async_trait]
impl TranscriptStore for RecordingStore {
    async fn insert_transcript(&self, records: &[MessageRecord]) -> Result<(), AppError> {
        self.batches.lock().expect("batches lock").push(records.to_vec());
        if self.fail {
            return Err(AppError::persistence("relation \"messages\" does not exist"));
        }
        Ok(())
    }
}
