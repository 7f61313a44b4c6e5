//! HTTP implementation of the [`Backend`] trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::{Backend, BackendError};
use crate::data::{ConditionReport, Metric, PastAlert, Range, Reading, SeriesPoint};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend client over the telemetry HTTP API.
///
/// Paths are resolved against a base URL, e.g.
/// `http://raspberry.local:5000/api`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    description: String,
}

impl HttpBackend {
    /// Create a client for the given base URL (trailing slash optional).
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let description = format!("http: {base_url}");
        Ok(Self {
            client,
            base_url,
            description,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                url,
            });
        }
        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn probes(&self) -> Result<Vec<String>, BackendError> {
        self.get_json("/probes", &[]).await
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Reading>, BackendError> {
        let limit = limit.to_string();
        self.get_json("/latest", &[("limit", limit.as_str())]).await
    }

    async fn series(
        &self,
        probe_id: &str,
        metric: Metric,
        range: Range,
    ) -> Result<Vec<SeriesPoint>, BackendError> {
        self.get_json(
            "/series",
            &[
                ("probe", probe_id),
                ("metric", metric.as_str()),
                ("range", range.as_str()),
            ],
        )
        .await
    }

    async fn active_alerts(&self) -> Result<Vec<ConditionReport>, BackendError> {
        self.get_json("/alerts/active", &[]).await
    }

    async fn alert_history(&self, limit: usize) -> Result<Vec<PastAlert>, BackendError> {
        let limit = limit.to_string();
        self.get_json("/alerts/history", &[("limit", limit.as_str())])
            .await
    }

    async fn ack_all(&self) -> Result<(), BackendError> {
        let url = self.url("/alerts/ack_all");
        let response = self.client.post(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let backend = HttpBackend::new("http://localhost:5000/api/").unwrap();
        assert_eq!(backend.url("/probes"), "http://localhost:5000/api/probes");
        assert_eq!(backend.description(), "http: http://localhost:5000/api");
    }

    /// Bind an ephemeral port answering every request with the canned
    /// status and body; returns a base URL pointing at it.
    async fn serve_canned(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = stream.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        format!("http://{addr}/api")
    }

    #[tokio::test]
    async fn test_success_body_decodes() {
        let base = serve_canned("200 OK", r#"["sonde1","sonde2"]"#).await;
        let backend = HttpBackend::new(&base).unwrap();
        let probes = backend.probes().await.unwrap();
        assert_eq!(probes, vec!["sonde1", "sonde2"]);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let base = serve_canned("500 Internal Server Error", "").await;
        let backend = HttpBackend::new(&base).unwrap();

        // A 5xx must surface as a status error, never as an empty list.
        let err = backend.probes().await.unwrap_err();
        match err {
            BackendError::Status { status, url } => {
                assert_eq!(status, 500);
                assert!(url.ends_with("/api/probes"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ack_all_rejects_non_success() {
        let base = serve_canned("503 Service Unavailable", "").await;
        let backend = HttpBackend::new(&base).unwrap();

        let err = backend.ack_all().await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503, .. }));
    }
}
