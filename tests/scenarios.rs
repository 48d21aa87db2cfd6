//! End-to-end behaviour of the data-access core through its public API.

use realty_resilience::adapters::http::{ScriptedTransport, Step};
use realty_resilience::adapters::platform::ManualReachability;
use realty_resilience::adapters::storage::{JsonFileStore, MemoryStore};
use realty_resilience::adapters::telemetry::MemoryTelemetry;
use realty_resilience::domain::{ErrorKind, ErrorRecord, HttpRequest, classify};
use realty_resilience::shared::{Environment, ManualClock};
use realty_resilience::usecases::{
    BoundaryState, ConnectivityMonitor, ErrorReporter, PersistentCache, QueryExecutor,
    QueryPolicy, RecoveryBoundary, Rendered, RequestConfig, ResilientExecutor,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn production_reporter() -> (Arc<ErrorReporter>, Arc<MemoryTelemetry>) {
    let telemetry = Arc::new(MemoryTelemetry::new());
    let reporter = Arc::new(ErrorReporter::new(
        Environment::Production,
        Some(telemetry.clone()),
    ));
    (reporter, telemetry)
}

#[test]
fn classification_is_idempotent() {
    let record = ErrorRecord::validation("Bad input", Default::default())
        .with_context("form", "contact");
    assert_eq!(classify(record.clone()), record);
    assert_eq!(classify(classify(record.clone())), record);
}

#[test]
fn status_codes_map_to_kinds() {
    assert_eq!(classify(404u16).kind, ErrorKind::NotFound);
    for status in 500..=504u16 {
        assert_eq!(classify(status).kind, ErrorKind::ServerError);
    }
    assert_eq!(classify(401u16).kind, ErrorKind::Unauthorized);
    assert_eq!(classify(403u16).kind, ErrorKind::Forbidden);
    assert_eq!(classify(400u16).kind, ErrorKind::Validation);
}

#[tokio::test]
async fn zero_ttl_is_already_expired_and_no_ttl_never_expires() {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let cache = PersistentCache::new(Arc::new(MemoryStore::new()), "realty_cache_")
        .with_clock(clock.clone());

    cache.save("k", &json!({"v": 1}), Some(0)).await;
    assert_eq!(cache.get::<Value>("k").await, None);

    cache.save("forever", &json!({"v": 2}), None).await;
    clock.advance(Duration::from_secs(60 * 60 * 24 * 365 * 10));
    assert_eq!(cache.get::<Value>("forever").await, Some(json!({"v": 2})));
}

#[tokio::test(start_paused = true)]
async fn server_errors_retry_exactly_the_configured_number_of_times() {
    let transport = Arc::new(ScriptedTransport::always(Step::status(503)));
    let executor = ResilientExecutor::new(transport.clone());
    let config = RequestConfig::default()
        .retries(2)
        .retry_delay(Duration::from_millis(1_000));
    let start = Instant::now();

    let err = executor
        .execute_with(&HttpRequest::get("/listings"), &config)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ServerError);
    assert_eq!(transport.attempts(), 3);
    assert!(start.elapsed() >= Duration::from_millis(2_000));
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_attempted_once() {
    let transport = Arc::new(ScriptedTransport::always(Step::status(400)));
    let executor = ResilientExecutor::new(transport.clone());

    let err = executor
        .execute_with(
            &HttpRequest::post("/requests", json!({})),
            &RequestConfig::default().retries(5),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(transport.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn offline_calls_requiring_network_fail_without_attempts() {
    let transport = Arc::new(ScriptedTransport::always(Step::status(200)));
    let platform = Arc::new(ManualReachability::new(false));
    let executor = ResilientExecutor::new(transport.clone())
        .with_connectivity(ConnectivityMonitor::new(platform, None));

    let err = executor
        .execute_with(
            &HttpRequest::get("/dashboard"),
            &RequestConfig::default().require_network(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(transport.attempts(), 0);
}

#[test]
fn boundary_reset_returns_to_normal() {
    let (reporter, telemetry) = production_reporter();
    let mut boundary = RecoveryBoundary::new("property-details", reporter);

    let first = boundary.render(|| Err::<&str, _>(ErrorRecord::from_status(500, "boom")));
    assert!(matches!(first, Rendered::Fallback(_)));
    assert!(boundary.state().is_failed());

    boundary.reset();
    let second = boundary.render(|| Ok::<_, ErrorRecord>("details"));
    assert_eq!(second, Rendered::Children("details"));
    assert_eq!(boundary.state(), &BoundaryState::Normal);
    assert_eq!(telemetry.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_timeout_with_default_retry() {
    let transport = Arc::new(ScriptedTransport::always(Step::Hang));
    let executor = ResilientExecutor::new(transport.clone());
    let start = Instant::now();

    let err = executor.execute(&HttpRequest::get("/x")).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Timeout);
    assert_eq!(err.context["url"], "/x");
    assert_eq!(transport.attempts(), 2);
    // Two 30 s timeouts plus the 1 s pause between them.
    assert!(start.elapsed() >= Duration::from_millis(61_000));
}

#[tokio::test]
async fn scenario_cache_entry_expires_after_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("cache.json")).await.unwrap();
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let cache = PersistentCache::new(Arc::new(store), "realty_cache_").with_clock(clock.clone());

    cache.save("profile", &json!({"name": "A"}), Some(60)).await;
    assert!(cache.has("profile").await);

    clock.advance(Duration::from_secs(61 * 60));
    assert_eq!(cache.get::<Value>("profile").await, None);
    assert!(!cache.has("profile").await);
}

#[tokio::test(start_paused = true)]
async fn scenario_form_submission_validation_error() {
    let transport = Arc::new(ScriptedTransport::always(Step::json(
        400,
        json!({"message": "Bad input", "fieldErrors": {"email": ["invalid"]}}),
    )));
    let executor = ResilientExecutor::new(transport.clone());

    let err = executor
        .execute(&HttpRequest::post("/contact", json!({"email": "nope"})))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.message, "Bad input");
    assert_eq!(err.http_status, Some(400));
    assert_eq!(err.all_validation_messages(), vec!["invalid"]);
    assert_eq!(transport.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn write_failures_are_reported_once_with_write_tag() {
    let (reporter, telemetry) = production_reporter();
    let transport = Arc::new(ScriptedTransport::always(Step::status(502)));
    let executor = ResilientExecutor::new(transport.clone())
        .with_defaults(RequestConfig::default().retries(0));
    let queries = QueryExecutor::new(reporter, QueryPolicy::default());
    let request = HttpRequest::post("/favorites", json!({"listing": 9}));

    let err = queries
        .write("add-favorite", || executor.execute(&request))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ServerError);
    assert_eq!(transport.attempts(), 1);
    let envelopes = telemetry.envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].tags, vec!["write"]);
}
