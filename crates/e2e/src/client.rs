//! Transport client for the service under test
//!
//! Two calls: the side-effecting regeneration trigger (`GET /?...`) and the
//! export (`POST {export_path}`, form-encoded). Error statuses from export
//! come back as `ExportOutcome::Rejected`; only connection failures and
//! timeouts are errors.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use docfactory_qa_common::{ExportOutcome, ExportRequest, ExportResponse, TriggerQuery};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{QaError, QaResult};

/// The two service operations every scenario is built from.
#[async_trait]
pub trait DocService: Send + Sync {
    /// Base URL the service was configured with.
    fn base_url(&self) -> &str;

    /// Ask the service to (re)generate a layout for the given parameters.
    async fn trigger(&self, query: &TriggerQuery) -> QaResult<()>;

    /// Submit an export and normalize whatever comes back.
    async fn export(&self, request: &ExportRequest) -> QaResult<ExportOutcome>;
}

/// Build `{base}{path}?{query}`.
pub fn service_url(base_url: &str, path: &str, query: &TriggerQuery) -> QaResult<Url> {
    let joined = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut url = Url::parse(&joined).map_err(|e| QaError::Config(format!("invalid URL '{}': {}", joined, e)))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.pairs().iter());
    }
    Ok(url)
}

/// HTTP implementation of [`DocService`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    export_path: String,
    trigger_timeout: Duration,
    export_timeout: Duration,
    trigger_prefix: usize,
    success_prefix: usize,
}

impl HttpTransport {
    pub fn new(config: &ServiceConfig) -> QaResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("docfactory-qa/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            export_path: config.export_path.clone(),
            trigger_timeout: config.trigger_timeout(),
            export_timeout: config.export_timeout(),
            trigger_prefix: config.trigger_body_prefix_bytes,
            success_prefix: config.success_body_prefix_bytes,
        })
    }

    fn fault(operation: &str, timeout: Duration, err: reqwest::Error) -> QaError {
        if err.is_timeout() {
            QaError::Timeout {
                operation: operation.to_string(),
                seconds: timeout.as_secs(),
            }
        } else {
            QaError::Transport {
                operation: operation.to_string(),
                source: err,
            }
        }
    }
}

/// Read at most `limit` bytes of the body and drop the rest.
async fn read_prefix(response: &mut reqwest::Response, limit: usize) -> Result<Vec<u8>, reqwest::Error> {
    let mut buf = Vec::new();
    while buf.len() < limit {
        match response.chunk().await? {
            Some(chunk) => buf.extend_from_slice(&chunk),
            None => break,
        }
    }
    buf.truncate(limit);
    Ok(buf)
}

#[async_trait]
impl DocService for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn trigger(&self, query: &TriggerQuery) -> QaResult<()> {
        let url = service_url(&self.base_url, "/", query)?;
        let start = Instant::now();
        debug!(url = %url, "Triggering regeneration");

        let mut response = self
            .client
            .get(url.clone())
            .timeout(self.trigger_timeout)
            .send()
            .await
            .map_err(|e| Self::fault("trigger", self.trigger_timeout, e))?;

        let status = response.status();
        read_prefix(&mut response, self.trigger_prefix)
            .await
            .map_err(|e| Self::fault("trigger", self.trigger_timeout, e))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), url = %url, "Regeneration trigger failed");
            return Err(QaError::TriggerStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        info!(
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Regeneration triggered"
        );
        Ok(())
    }

    async fn export(&self, request: &ExportRequest) -> QaResult<ExportOutcome> {
        let url = format!("{}{}", self.base_url, self.export_path);
        let start = Instant::now();
        debug!(url = %url, job_id = request.get("jobId").unwrap_or(""), "Posting export");

        let mut response = self
            .client
            .post(&url)
            .form(request.pairs())
            .timeout(self.export_timeout)
            .send()
            .await
            .map_err(|e| Self::fault("export", self.export_timeout, e))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = if response.status().is_success() {
            read_prefix(&mut response, self.success_prefix).await
        } else {
            response.bytes().await.map(|bytes| bytes.to_vec())
        }
        .map_err(|e| Self::fault("export", self.export_timeout, e))?;

        let normalized = ExportResponse::from_parts(status, headers, Some(body.as_slice()));
        info!(
            status,
            request_hash = normalized.request_hash().unwrap_or("-"),
            audit_hash = normalized.audit_hash().unwrap_or("-"),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Export finished"
        );
        Ok(ExportOutcome::classify(normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfactory_qa_common::PageSize;

    #[test]
    fn test_service_url_encodes_query() {
        let query = TriggerQuery::new()
            .with("jobId", "qa-complete-friend")
            .with("prompt", "친구 소개 포스터 만들어줘")
            .with("size", "A4P");
        let url = service_url("http://127.0.0.1:3000/", "/", &query).unwrap();
        assert!(url.as_str().starts_with("http://127.0.0.1:3000/?jobId=qa-complete-friend&prompt="));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[1].1, "친구 소개 포스터 만들어줘");
    }

    #[test]
    fn test_control_page_url() {
        let query = TriggerQuery::control_page(1, Some(&PageSize::custom(80.0, 80.0)));
        let url = service_url("http://127.0.0.1:3000", "/", &query).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/?v=1&size=CUSTOM&w=80&h=80");
    }

    #[test]
    fn test_empty_query_has_no_question_mark() {
        let url = service_url("http://127.0.0.1:3000", "/", &TriggerQuery::new()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/");
    }

    #[test]
    fn test_transport_trims_base_url() {
        let config = ServiceConfig {
            base_url: "http://localhost:3000/".into(),
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_transport_takes_configured_timeouts() {
        let config = ServiceConfig {
            trigger_timeout_secs: 45,
            export_timeout_secs: 90,
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.trigger_timeout, Duration::from_secs(45));
        assert_eq!(transport.export_timeout, Duration::from_secs(90));
    }
}
