//! HTTP client for the analysis endpoint

use crate::error::{AnalysisError, Result};
use crate::types::{AnalysisResponse, AnalyzeRequest, Topic};
use bv_core::{IgnoreRules, TrackSettings};
use reqwest::Client;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-flush summary
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    /// Requests issued
    pub sent: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Paths excluded by the analysis filter
    pub skipped: usize,
    pub topics: Vec<Topic>,
}

pub struct AnalysisClient {
    http: Client,
    api_url: String,
    project_id: String,
    change_source: String,
}

impl AnalysisClient {
    pub fn new(
        api_url: &str,
        project_id: &str,
        change_source: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AnalysisError::Build)?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            change_source: change_source.to_string(),
        })
    }

    pub fn from_settings(settings: &TrackSettings) -> Result<Self> {
        Self::new(
            &settings.project.api_url,
            &settings.project.project_id,
            &settings.change_source,
            settings.request_timeout,
        )
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/project/{}/analyze_code_change/",
            self.api_url, self.project_id
        )
    }

    /// Send one file's analysis request
    pub async fn analyze_file(&self, file_path: &str, diff: &str) -> Result<AnalysisResponse> {
        let url = self.endpoint();
        let body = AnalyzeRequest {
            file_path,
            diff_content: diff,
            change_source: &self.change_source,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| AnalysisError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| AnalysisError::Transport { url, source })?;

        if !status.is_success() {
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Send `diff` once for every path in `changed_paths` that is not
    /// excluded for analysis
    ///
    /// Requests are sequential and independent: a failure is logged and the
    /// remaining files are still sent. Nothing is retried.
    pub async fn analyze(
        &self,
        diff: &str,
        changed_paths: &[PathBuf],
        rules: &IgnoreRules,
    ) -> AnalysisReport {
        let mut report = AnalysisReport::default();

        for path in changed_paths {
            if rules.is_ignored_for_analysis(path) {
                info!("Skipping {} (ignored for analysis)", path.display());
                report.skipped += 1;
                continue;
            }

            let file_path = wire_path(path);
            info!("Analyzing {}", file_path);
            report.sent += 1;

            match self.analyze_file(&file_path, diff).await {
                Ok(response) => {
                    report.succeeded += 1;
                    info!(
                        "Analysis complete for {}: {} topic(s) extracted",
                        file_path, response.topics_extracted
                    );
                    for topic in &response.topics {
                        info!("  Topic: {}", topic.title);
                    }
                    if let Some(message) = response.message.as_deref() {
                        debug!("{}: {}", file_path, message);
                    }
                    report.topics.extend(response.topics);
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("Analysis failed for {}: {}", file_path, e);
                }
            }
        }

        report
    }
}

/// Root-relative path with `/` separators on every platform
fn wire_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path as UrlPath, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Stub {
        requests: Arc<Mutex<Vec<(String, Value)>>>,
    }

    impl Stub {
        fn file_paths(&self) -> Vec<String> {
            self.requests
                .lock()
                .iter()
                .filter_map(|(_, body)| body["file_path"].as_str().map(str::to_string))
                .collect()
        }
    }

    async fn analyze_handler(
        State(stub): State<Stub>,
        UrlPath(project_id): UrlPath<String>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let file_path = body["file_path"].as_str().unwrap_or_default().to_string();
        stub.requests.lock().push((project_id, body));

        if file_path == "bad.py" {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "analysis failed"})),
            );
        }

        (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "topics_extracted": 1,
                "topics": [{"title": format!("Topic for {file_path}")}],
            })),
        )
    }

    async fn spawn_stub() -> (String, Stub) {
        let stub = Stub::default();
        let app = Router::new()
            .route(
                "/api/project/:project_id/analyze_code_change/",
                post(analyze_handler),
            )
            .with_state(stub.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/api"), stub)
    }

    fn client(api_url: &str) -> AnalysisClient {
        AnalysisClient::new(api_url, "42", "cli", Duration::from_secs(5)).unwrap()
    }

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = client("http://localhost:8000/api/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:8000/api/project/42/analyze_code_change/"
        );
    }

    #[test]
    fn test_wire_path_uses_forward_slashes() {
        let path: PathBuf = ["src", "pkg", "mod.py"].iter().collect();
        assert_eq!(wire_path(&path), "src/pkg/mod.py");
    }

    #[tokio::test]
    async fn test_analyze_file_sends_expected_body() {
        let (api_url, stub) = spawn_stub().await;
        let client = client(&api_url);

        let response = client.analyze_file("a.py", "+print(1)\n").await.unwrap();
        assert_eq!(response.topics_extracted, 1);
        assert_eq!(response.topics[0].title, "Topic for a.py");

        let requests = stub.requests.lock().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "42");
        assert_eq!(
            requests[0].1,
            json!({
                "file_path": "a.py",
                "diff_content": "+print(1)\n",
                "change_source": "cli",
            })
        );
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let (api_url, _stub) = spawn_stub().await;
        let err = client(&api_url)
            .analyze_file("bad.py", "diff")
            .await
            .unwrap_err();

        match err {
            AnalysisError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("analysis failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failed_file_does_not_stop_batch() {
        let (api_url, stub) = spawn_stub().await;
        let dir = TempDir::new().unwrap();
        let rules = IgnoreRules::defaults(dir.path());

        let report = client(&api_url)
            .analyze("diff", &paths(&["a.py", "bad.py", "c.py"]), &rules)
            .await;

        assert_eq!(report.sent, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.topics.len(), 2);
        assert_eq!(stub.file_paths(), vec!["a.py", "bad.py", "c.py"]);
    }

    #[tokio::test]
    async fn test_analysis_ignored_paths_are_not_sent() {
        let (api_url, stub) = spawn_stub().await;
        let dir = TempDir::new().unwrap();
        let rules = IgnoreRules::defaults(dir.path());

        let report = client(&api_url)
            .analyze(
                "diff",
                &paths(&[
                    "src/app.py",
                    "package-lock.json",
                    "README.md",
                    "dist/bundle.js",
                    "static/app.min.js",
                ]),
                &rules,
            )
            .await;

        assert_eq!(report.sent, 1);
        assert_eq!(report.skipped, 4);
        assert_eq!(stub.file_paths(), vec!["src/app.py"]);
    }

    #[tokio::test]
    async fn test_unreachable_service_counts_failures() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = TempDir::new().unwrap();
        let rules = IgnoreRules::defaults(dir.path());
        let report = client(&format!("http://{addr}/api"))
            .analyze("diff", &paths(&["a.py", "b.py"]), &rules)
            .await;

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.succeeded, 0);
    }
}
