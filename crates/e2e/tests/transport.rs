//! Wire-level tests against an in-process mock of the service
//!
//! The mock answers the regeneration trigger and the export endpoint the
//! way the real service does: hashes in headers on success, a JSON issue
//! body on refusal.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use docfactory_qa::catalog;
use docfactory_qa::{
    CaseRunner, DocService, HttpTransport, InspectOptions, PageInspector, QaConfig, QaError, QaResult,
};
use docfactory_qa_common::ui::PageObservation;
use docfactory_qa_common::{ExportOutcome, ExportRequest, GateKind, PageSize, TriggerQuery};
use parking_lot::Mutex;
use serde_json::json;
use sha2::{Digest, Sha256};

type Params = HashMap<String, String>;

#[derive(Clone, Default)]
struct MockState {
    triggers: Arc<Mutex<Vec<Params>>>,
    exports: Arc<Mutex<Vec<Params>>>,
}

fn digest(parts: &[&str]) -> String {
    hex::encode(Sha256::digest(parts.join("|").as_bytes()))[..16].to_string()
}

fn field<'a>(params: &'a Params, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or("")
}

async fn trigger(State(state): State<MockState>, Query(query): Query<Params>) -> Response {
    let fail = query.contains_key("fail");
    state.triggers.lock().push(query);
    if fail {
        (StatusCode::INTERNAL_SERVER_ERROR, "regeneration failed").into_response()
    } else {
        (StatusCode::OK, "<html>control page</html>").into_response()
    }
}

async fn export(State(state): State<MockState>, Form(form): Form<Params>) -> Response {
    state.exports.lock().push(form.clone());

    let request_hash = digest(&[
        field(&form, "jobId"),
        field(&form, "seed"),
        field(&form, "pageSizePreset"),
    ]);
    let audit_hash = digest(&[&request_hash, field(&form, "variantIndex")]);

    if field(&form, "pageSizePreset") == "CUSTOM" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "export blocked",
                "requestHash": request_hash,
                "exportAuditHash": audit_hash,
                "exportAuditIssues": [{"code": "page-size", "message": "page size below minimum"}]
            })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [
            ("x-docfactory-request-hash", request_hash),
            ("x-docfactory-audit-hash", audit_hash),
            (
                "content-type",
                "application/vnd.openxmlformats-officedocument.presentationml.presentation".to_string(),
            ),
        ],
        vec![0u8; 256 * 1024],
    )
        .into_response()
}

async fn spawn_mock() -> (String, MockState) {
    let state = MockState::default();
    let app = Router::new()
        .route("/", get(trigger))
        .route("/api/export/pptx", post(export))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn transport(base_url: &str) -> HttpTransport {
    let mut config = QaConfig::default();
    config.service.base_url = base_url.to_string();
    config.service.export_timeout_secs = 10;
    config.service.trigger_timeout_secs = 10;
    HttpTransport::new(&config.service).unwrap()
}

/// Inspector for runs that never reach the browser.
struct NoBrowser;

#[async_trait]
impl PageInspector for NoBrowser {
    async fn inspect(&self, _url: &str, _options: &InspectOptions) -> QaResult<PageObservation> {
        Err(QaError::PlaywrightNotFound)
    }
}

#[tokio::test]
async fn test_export_success_reads_hash_headers() {
    let (base_url, state) = spawn_mock().await;
    let client = transport(&base_url);

    let request = ExportRequest::new("qa-determinism-1", 1, "424242", &PageSize::a4_portrait())
        .with("prompt", "포스터 2장 만들어줘");
    let outcome = client.export(&request).await.unwrap();

    assert!(outcome.is_accepted());
    let response = outcome.response();
    assert_eq!(response.status, 200);
    assert_eq!(response.request_hash().map(str::len), Some(16));
    assert!(response.audit_hash().is_some());
    assert!(response.body.is_none());

    let exports = state.exports.lock();
    assert_eq!(exports[0]["prompt"], "포스터 2장 만들어줘");
    assert_eq!(exports[0]["pageWidthMm"], "210");
}

#[tokio::test]
async fn test_error_status_is_rejected_outcome() {
    let (base_url, _state) = spawn_mock().await;
    let client = transport(&base_url);

    let request = ExportRequest::new("qa-size", 1, "1", &PageSize::custom(80.0, 80.0));
    let outcome = client.export(&request).await.unwrap();

    let ExportOutcome::Rejected(response) = outcome else {
        panic!("expected a rejected outcome");
    };
    assert_eq!(response.status, 422);
    assert!(response.request_hash().is_some());
    assert!(response.has_issue_containing("page size below minimum"));
}

#[tokio::test]
async fn test_trigger_sends_query_and_checks_status() {
    let (base_url, state) = spawn_mock().await;
    let client = transport(&base_url);

    let query = TriggerQuery::new().with("jobId", "qa-job-a").with("size", "A4P");
    client.trigger(&query).await.unwrap();
    assert_eq!(state.triggers.lock()[0]["jobId"], "qa-job-a");

    let err = client.trigger(&query.with("fail", "1")).await.unwrap_err();
    assert!(matches!(err, QaError::TriggerStatus { status: 500, .. }));
    assert!(err.is_transport_fault());
}

#[tokio::test]
async fn test_unreachable_service_is_transport_fault() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = transport(&format!("http://{}", addr));
    let request = ExportRequest::new("job", 1, "1", &PageSize::a4_portrait());
    let err = client.export(&request).await.unwrap_err();
    assert!(err.is_transport_fault(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_runner_against_mock_service() {
    let (base_url, state) = spawn_mock().await;
    let root = tempfile::tempdir().unwrap();

    let mut config = QaConfig::default();
    config.service.base_url = base_url.clone();
    config.paths.root = root.path().to_path_buf();
    config.paths.output_dir = root.path().join("qa-results");

    let runner = CaseRunner::with_parts(&config, Box::new(transport(&base_url)), Box::new(NoBrowser)).unwrap();
    let cases: Vec<_> = catalog::builtin()
        .into_iter()
        .filter(|c| matches!(c.gate(), GateKind::Determinism | GateKind::ExportSize))
        .collect();

    let report = runner.run_selected(&cases, None).await.unwrap();
    assert!(report.passed, "{}", report.to_json().unwrap());
    assert_eq!(report.total, 2);
    assert_eq!(report.base_url, base_url);

    // One trigger for determinism; the size case only exports.
    assert_eq!(state.triggers.lock().len(), 1);
    assert_eq!(state.exports.lock().len(), 4);

    let path = runner.write_report(&report).unwrap();
    assert!(path.ends_with("qa-results/qa-report.json"));
}

#[tokio::test]
async fn test_ui_case_without_browser_is_a_fault() {
    let (base_url, _state) = spawn_mock().await;
    let root = tempfile::tempdir().unwrap();
    let mut config = QaConfig::default();
    config.paths.root = root.path().to_path_buf();

    let runner = CaseRunner::with_parts(&config, Box::new(transport(&base_url)), Box::new(NoBrowser)).unwrap();
    let cases = catalog::builtin();
    let report = runner.run_selected(&cases, Some(GateKind::UiRuntime)).await.unwrap();

    assert!(!report.passed);
    let case = &report.results[0];
    assert!(case.verdict.is_none());
    assert!(case.fault.as_deref().unwrap().contains("Playwright not found"));
}
