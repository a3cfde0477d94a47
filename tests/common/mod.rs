//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::Response;

/// A request captured by [`TestServer`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    /// Decode the body as JSON
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }

    /// Header value as a string
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// A scripted reply
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl CannedResponse {
    pub fn json(value: &serde_json::Value) -> Self {
        Self::raw(200, Some("application/json"), value.to_string())
    }

    pub fn text(body: &str) -> Self {
        Self::raw(200, Some("text/plain; charset=utf-8"), body)
    }

    pub fn raw(status: u16, content_type: Option<&'static str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }
}

#[derive(Default)]
struct ServerState {
    responses: Mutex<VecDeque<CannedResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// HTTP server on an ephemeral port that records requests and replays
/// canned responses in order
pub struct TestServer {
    pub base_url: String,
    state: Arc<ServerState>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(responses: Vec<CannedResponse>) -> Self {
        let state = Arc::new(ServerState {
            responses: Mutex::new(responses.into()),
            requests: Mutex::default(),
        });
        let app = Router::new()
            .fallback(record)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test server");
        let addr = listener.local_addr().expect("test server address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("lock").clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record(
    State(state): State<Arc<ServerState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.requests.lock().expect("lock").push(RecordedRequest {
        path: uri.path().to_string(),
        headers,
        body,
    });

    let canned = state.responses.lock().expect("lock").pop_front();
    let Some(canned) = canned else {
        return Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from("no canned response left"))
            .expect("response");
    };

    let mut builder = Response::builder().status(canned.status);
    if let Some(content_type) = canned.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(canned.body)).expect("response")
}

/// Write an `llms.txt` with a single `Local` endpoint
pub fn write_llms_file(dir: &Path, url: &str) -> PathBuf {
    let path = dir.join("llms.txt");
    std::fs::write(&path, format!("## LLM Endpoints\n- [Local]({url})\n"))
        .expect("failed to write llms.txt");
    path
}

/// An address nothing is listening on
pub async fn unused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);
    format!("http://{addr}")
}
