//! In-process stub of the analysis API
//!
//! Records every request body with its arrival time and answers with one
//! topic per file, optionally after a fixed delay.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub at: Instant,
    pub project_id: String,
    pub body: Value,
}

impl RecordedRequest {
    pub fn file_path(&self) -> &str {
        self.body["file_path"].as_str().unwrap_or_default()
    }
}

#[derive(Clone, Default)]
struct StubState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    delay: Duration,
}

pub struct StubServer {
    pub api_url: String,
    state: StubState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubServer {
    pub async fn spawn() -> Self {
        Self::spawn_with_delay(Duration::ZERO).await
    }

    /// Stub that holds every response for `delay` after recording the request
    pub async fn spawn_with_delay(delay: Duration) -> Self {
        let state = StubState {
            delay,
            ..StubState::default()
        };
        let app = Router::new()
            .route(
                "/api/project/:project_id/analyze_code_change/",
                post(analyze),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            api_url: format!("http://{addr}/api"),
            state,
            shutdown: Some(shutdown),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.file_path().to_string())
            .collect()
    }

    /// Wait until at least `count` requests have arrived
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.state.requests.lock().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.state.requests.lock().len() >= count
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn analyze(
    State(state): State<StubState>,
    Path(project_id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let file_path = body["file_path"].as_str().unwrap_or_default().to_string();
    state.requests.lock().push(RecordedRequest {
        at: Instant::now(),
        project_id,
        body,
    });
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "topics_extracted": 1,
            "topics": [{"title": format!("Learning from {file_path}")}],
        })),
    )
}
