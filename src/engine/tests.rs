//! Tests for engine module

use super::*;
use crate::budget::BudgetStrategy;
use crate::decode::JsonDecoder;
use crate::fetch::Cancellation;
use crate::flatten::EntitySchema;
use crate::http::{ScriptedTransport, TransportResponse};
use crate::output::{JsonlSink, MemorySink, RecordSink, MANIFEST_FILE};
use crate::pagination::{PageRequestBuilder, PaginationConfig, RequestTemplate};
use crate::provider::RestAdapter;
use crate::retry::RetryPolicy;
use crate::sleep::RecordingSleeper;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn returns_page(ids: &[&str], cursor: Option<&str>) -> TransportResponse {
    let returns: Vec<_> = ids
        .iter()
        .map(|id| json!({"id": id, "line_items": [{"sku": "A"}, {"sku": "B"}]}))
        .collect();
    TransportResponse::new(200, json!({"returns": returns, "nextPageUrl": cursor}))
}

fn schema() -> EntitySchema {
    EntitySchema::new("returns").child_with_key(
        "line_items",
        "return_id",
        EntitySchema::new("return_line_items"),
    )
}

fn fetcher(transport: Arc<ScriptedTransport>) -> PagedFetcher {
    PagedFetcher::new(
        "returns",
        transport,
        Arc::new(RestAdapter),
        PageRequestBuilder::new(
            RequestTemplate::Rest {
                path: "/warehouse/reporting/returns".to_string(),
                params: Vec::new(),
            },
            "page",
        ),
        RetryPolicy::new(2, Duration::from_secs(1)),
    )
    .paginator(PaginationConfig::body_cursor("nextPageUrl").build())
    .decoder(Arc::new(JsonDecoder::with_path("returns")))
    .budget(BudgetStrategy::fixed(Duration::ZERO))
    .sleeper(Arc::new(RecordingSleeper::new()))
}

// ============================================================================
// run_stream Tests
// ============================================================================

#[tokio::test]
async fn test_run_stream_completed() {
    let transport = ScriptedTransport::new(vec![
        returns_page(&["r1", "r2"], Some("p2")),
        returns_page(&["r3"], None),
    ]);
    let mut engine = ExtractEngine::new("loop_returns");
    let mut sink = MemorySink::new();

    let outcome = engine
        .run_stream(fetcher(transport), &schema(), &mut sink)
        .await;

    assert!(outcome.error.is_none());
    let report = outcome.into_result().unwrap();
    assert_eq!(report.status, StreamStatus::Completed);
    assert_eq!(report.pages, 2);
    assert_eq!(report.records_for("returns"), 3);
    assert_eq!(report.records_for("return_line_items"), 6);
    assert_eq!(report.source, "loop_returns");

    assert_eq!(sink.records("return_line_items")[0].primary_key, "r1_line_items_0");
    assert_eq!(sink.reports().len(), 1);

    let stats = engine.stats();
    assert_eq!(stats.records, 9);
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.streams_completed, 1);
}

#[tokio::test]
async fn test_run_stream_aborted_keeps_earlier_pages() {
    let transport = ScriptedTransport::new(vec![
        returns_page(&["r1"], Some("p2")),
        TransportResponse::new(403, json!({"error": "forbidden"})),
    ]);
    let mut engine = ExtractEngine::new("loop_returns");
    let mut sink = MemorySink::new();

    let outcome = engine
        .run_stream(fetcher(transport), &schema(), &mut sink)
        .await;

    assert_eq!(outcome.report.status, StreamStatus::Aborted);
    assert_eq!(outcome.report.pages, 1);
    assert!(outcome
        .report
        .error
        .as_deref()
        .unwrap()
        .contains("Authentication failed"));
    assert!(matches!(
        outcome.error,
        Some(Error::Authentication { .. })
    ));
    assert_eq!(sink.records("returns").len(), 1);
    assert_eq!(sink.reports()[0].status, StreamStatus::Aborted);
    assert_eq!(engine.stats().streams_aborted, 1);
}

#[tokio::test]
async fn test_run_stream_malformed_record_aborts() {
    let transport = ScriptedTransport::new(vec![TransportResponse::new(
        200,
        json!({"returns": [{"state": "open"}]}),
    )]);
    let mut engine = ExtractEngine::new("loop_returns");
    let mut sink = MemorySink::new();

    let outcome = engine
        .run_stream(fetcher(transport), &schema(), &mut sink)
        .await;

    assert!(matches!(
        outcome.error,
        Some(Error::MalformedResponse { .. })
    ));
    assert_eq!(outcome.report.pages, 0);
    assert!(sink.records("returns").is_empty());
}

#[tokio::test]
async fn test_run_stream_cancelled() {
    let transport = ScriptedTransport::new(vec![returns_page(&["r1"], Some("p2"))]);
    let cancellation = Cancellation::new();
    cancellation.cancel();
    let mut engine = ExtractEngine::new("loop_returns");
    let mut sink = MemorySink::new();

    let outcome = engine
        .run_stream(
            fetcher(transport.clone()).cancellation(cancellation),
            &schema(),
            &mut sink,
        )
        .await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.report.status, StreamStatus::Cancelled);
    assert_eq!(transport.calls(), 0);
    assert_eq!(engine.stats().streams_cancelled, 1);
    assert_eq!(engine.stats().failed(), 1);
}

#[tokio::test]
async fn test_run_stream_to_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new(vec![returns_page(&["r1"], None)]);
    let mut engine = ExtractEngine::new("loop_returns");
    let mut sink = JsonlSink::new(dir.path(), "loop_returns").unwrap();

    let report = engine
        .run_stream(fetcher(transport), &schema(), &mut sink as &mut dyn RecordSink)
        .await
        .into_result()
        .unwrap();

    assert_eq!(report.total_records(), 3);
    let items =
        std::fs::read_to_string(dir.path().join("loop_returns/return_line_items.jsonl")).unwrap();
    assert_eq!(items.lines().count(), 2);
    assert!(dir.path().join("loop_returns").join(MANIFEST_FILE).exists());
}

#[tokio::test]
async fn test_skip_stream_records_cancelled_without_touching_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("loop_returns");
    let mut engine = ExtractEngine::new("loop_returns");
    let mut sink = JsonlSink::new(dir.path(), "loop_returns").unwrap();
    std::fs::write(out.join("returns.jsonl"), "{\"id\":\"old\"}\n").unwrap();

    let outcome = engine.skip_stream("returns", &schema(), &mut sink as &mut dyn RecordSink);

    assert!(outcome.error.is_none());
    assert_eq!(outcome.report.status, StreamStatus::Cancelled);
    assert_eq!(outcome.report.pages, 0);
    assert_eq!(engine.stats().streams_cancelled, 1);
    assert_eq!(engine.stats().failed(), 1);

    let previous = std::fs::read_to_string(out.join("returns.jsonl")).unwrap();
    assert_eq!(previous.lines().count(), 1);
    let manifest: crate::output::Manifest =
        serde_json::from_str(&std::fs::read_to_string(out.join(MANIFEST_FILE)).unwrap()).unwrap();
    let entry = &manifest.streams["returns"];
    assert_eq!(entry.status, StreamStatus::Cancelled);
    assert_eq!(entry.entities.len(), 2);
}

// ============================================================================
// check Tests
// ============================================================================

#[tokio::test]
async fn test_check_fetches_one_page() {
    let transport = ScriptedTransport::new(vec![
        returns_page(&["r1"], Some("p2")),
        returns_page(&["r2"], None),
    ]);

    let page = check(fetcher(transport.clone())).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_check_reports_auth_failure() {
    let transport = ScriptedTransport::new(vec![TransportResponse::new(
        401,
        json!({"error": "invalid key"}),
    )]);

    let err = check(fetcher(transport)).await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

// ============================================================================
// Stats Tests
// ============================================================================

#[test]
fn test_extract_stats_merge() {
    let mut report = StreamReport::start("faire", "orders");
    report.pages = 3;
    report.records.insert("orders".to_string(), 10);
    report.records.insert("order_items".to_string(), 25);

    let mut stats = ExtractStats::new();
    stats.add(&report);
    assert_eq!(stats.records, 35);

    let mut total = ExtractStats::new();
    total.merge(&stats);
    total.merge(&stats);
    assert_eq!(total.records, 70);
    assert_eq!(total.pages, 6);
    assert_eq!(total.streams_completed, 2);
    assert_eq!(total.failed(), 0);
}

#[test]
fn test_stream_status_display() {
    assert_eq!(StreamStatus::Aborted.to_string(), "aborted");
    assert_eq!(
        serde_json::to_value(StreamStatus::Cancelled).unwrap(),
        json!("cancelled")
    );
}
