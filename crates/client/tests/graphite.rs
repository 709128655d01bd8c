use std::time::{Duration, Instant};

use gracli_client::{GraphiteClient, HttpClient, HttpConfig};
use gracli_core::{Aggregator, ClientConfig, DataPoint, GracliError};
use serde_json::json;
use testkit::{
    HangupBackend, StubBackend, TrickleBackend, metric_with_null_data,
    metric_with_only_nulls_data, multi_metric_data, single_metric_data, unused_addr,
};

fn client_for(stub: &StubBackend) -> GraphiteClient {
    GraphiteClient::new(&ClientConfig::new(stub.url())).unwrap()
}

fn points(values: &[(f64, i64)]) -> Vec<DataPoint> {
    values
        .iter()
        .map(|&(v, ts)| DataPoint::new(Some(v), ts))
        .collect()
}

#[tokio::test]
async fn query_returns_trimmed_points() {
    let stub = StubBackend::json(&single_metric_data()).await;
    let client = client_for(&stub);

    let data = client.query("metric", 60).await.unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(
        data["foo"],
        points(&[(1.0, 1417629030), (2.0, 1417629040), (3.0, 1417629050)])
    );

    let narrow = client.query("metric", 10).await.unwrap();
    assert_eq!(narrow["foo"], points(&[(2.0, 1417629040), (3.0, 1417629050)]));
}

#[tokio::test]
async fn query_widens_window_to_minimum_range() {
    let stub = StubBackend::json(&single_metric_data()).await;
    let client = client_for(&stub);

    client.query("servers.*.load", 60).await.unwrap();
    client.query("servers.*.load", 3600).await.unwrap();

    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].params["target"], "servers.*.load");
    assert_eq!(requests[0].params["format"], "json");
    assert_eq!(requests[0].params["from"], "-600s");
    assert_eq!(requests[1].params["from"], "-3600s");
}

#[tokio::test]
async fn query_multi_keeps_response_order() {
    let stub = StubBackend::json(&multi_metric_data()).await;
    let client = client_for(&stub);

    let data = client.query("metric", 60).await.unwrap();
    let targets: Vec<_> = data.keys().cloned().collect();
    assert_eq!(targets, vec!["foo".to_string(), "bar".to_string()]);
}

#[tokio::test]
async fn aggregate_uses_requested_reducer() {
    let stub = StubBackend::json(&single_metric_data()).await;
    let client = client_for(&stub);

    let mean = client
        .aggregate("metric", 60, &Aggregator::default())
        .await
        .unwrap();
    assert_eq!(mean["foo"], Some(2.0));
    let max = client.aggregate("metric", 60, &Aggregator::Max).await.unwrap();
    assert_eq!(max["foo"], Some(3.0));
    let min = client.aggregate("metric", 60, &Aggregator::Min).await.unwrap();
    assert_eq!(min["foo"], Some(1.0));

    let count = |values: &[f64]| values.len() as f64;
    let counted = client.aggregate("metric", 60, &count).await.unwrap();
    assert_eq!(counted["foo"], Some(3.0));
}

#[tokio::test]
async fn aggregate_skips_nulls() {
    let stub = StubBackend::json(&metric_with_null_data()).await;
    let client = client_for(&stub);

    let data = client
        .aggregate("metric", 60, &Aggregator::Mean)
        .await
        .unwrap();
    assert_eq!(data["foo"], Some(1.5));
}

#[tokio::test]
async fn aggregate_only_nulls_is_none() {
    let stub = StubBackend::json(&metric_with_only_nulls_data()).await;
    let client = client_for(&stub);

    let data = client
        .aggregate("metric", 60, &Aggregator::Mean)
        .await
        .unwrap();
    assert_eq!(data["foo"], None);
}

#[tokio::test]
async fn aggregate_multi_returns_every_target() {
    let stub = StubBackend::json(&multi_metric_data()).await;
    let client = client_for(&stub);

    let data = client.aggregate("metric", 60, &Aggregator::Sum).await.unwrap();
    assert_eq!(data["foo"], Some(6.0));
    assert_eq!(data["bar"], Some(6.0));
}

#[tokio::test]
async fn server_error_is_bad_response() {
    let stub = StubBackend::serve(500, "internal error").await;
    let client = client_for(&stub);

    let err = client.query("metric", 60).await.unwrap_err();
    match &err {
        GracliError::BadResponse { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "internal error");
        }
        other => panic!("expected BadResponse, got {other:?}"),
    }
    assert!(err.to_string().contains("internal error"));
}

#[tokio::test]
async fn server_error_is_not_retried() {
    let stub = StubBackend::serve(503, "busy").await;
    let client = client_for(&stub);

    assert!(client.query("metric", 60).await.is_err());
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn malformed_json_is_parse_error() {
    let stub = StubBackend::serve(200, "<html>not json</html>").await;
    let client = client_for(&stub);

    assert!(matches!(
        client.query("metric", 60).await,
        Err(GracliError::Parse(_))
    ));
}

#[tokio::test]
async fn empty_selector_is_rejected_without_request() {
    let stub = StubBackend::json(&single_metric_data()).await;
    let client = client_for(&stub);

    assert!(matches!(
        client.query("  ", 60).await,
        Err(GracliError::InvalidArgument(_))
    ));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn metric_value_applies_prefix() {
    let stub = StubBackend::json(&single_metric_data()).await;
    let mut cfg = ClientConfig::new(stub.url());
    cfg.metric_prefix = Some("foo.".to_string());
    let client = GraphiteClient::new(&cfg).unwrap();

    let value = client
        .get_metric_value("bar", 60, &Aggregator::Mean)
        .await
        .unwrap();
    assert_eq!(value, 2.0);
    assert_eq!(stub.requests()[0].params["target"], "foo.bar");
}

#[tokio::test]
async fn metric_value_trims_and_skips_nulls() {
    let stub = StubBackend::json(&json!([{
        "target": "cpu",
        "datapoints": [[100.0, 1000], [524.94, 1030], [null, 1040], [581.92, 1050], [null, 1060]]
    }]))
    .await;
    let client = client_for(&stub);

    let value = client
        .get_metric_value("cpu", 20, &Aggregator::Mean)
        .await
        .unwrap();
    assert!((value - 553.43).abs() < 1e-9);
}

#[tokio::test]
async fn metric_value_rejects_multiple_series() {
    let stub = StubBackend::json(&multi_metric_data()).await;
    let client = client_for(&stub);

    let err = client
        .get_metric_value("metric", 60, &Aggregator::Mean)
        .await
        .unwrap_err();
    assert!(matches!(err, GracliError::InvalidDataFormat(ref m) if m.contains("multiple")));
}

#[tokio::test]
async fn metric_value_rejects_empty_response() {
    let stub = StubBackend::json(&json!([])).await;
    let client = client_for(&stub);

    let err = client
        .get_metric_value("metric", 60, &Aggregator::Mean)
        .await
        .unwrap_err();
    assert!(matches!(err, GracliError::InvalidDataFormat(ref m) if m.contains("empty data")));
}

#[tokio::test]
async fn metric_value_rejects_non_list() {
    let stub = StubBackend::json(&json!({"error": "nope"})).await;
    let client = client_for(&stub);

    let err = client
        .get_metric_value("metric", 60, &Aggregator::Mean)
        .await
        .unwrap_err();
    assert!(matches!(err, GracliError::InvalidDataFormat(ref m) if m.contains("expected a list")));
}

#[tokio::test]
async fn metric_value_only_nulls_is_empty_data() {
    let stub = StubBackend::json(&metric_with_only_nulls_data()).await;
    let client = client_for(&stub);

    let err = client
        .get_metric_value("metric", 60, &Aggregator::Mean)
        .await
        .unwrap_err();
    assert!(matches!(err, GracliError::EmptyData(_)));
    assert!(err.is_data_error());
}

#[tokio::test]
async fn configured_headers_are_sent() {
    let stub = StubBackend::json(&single_metric_data()).await;
    let mut cfg = ClientConfig::new(stub.url());
    cfg.headers = vec![("authorization".to_string(), "Bearer token".to_string())];
    let client = GraphiteClient::new(&cfg).unwrap();

    client.query("metric", 60).await.unwrap();
    assert_eq!(stub.requests()[0].headers["authorization"], "Bearer token");
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let mut cfg = ClientConfig::new(format!("http://{}/", unused_addr()));
    cfg.max_retries = 2;
    cfg.backoff_factor = 0.0;
    let client = GraphiteClient::new(&cfg).unwrap();

    let err = client.query("metric", 60).await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn connect_failures_are_retried_until_backend_is_up() {
    let addr = unused_addr();
    let stub =
        StubBackend::serve_later(addr, Duration::from_millis(150), &single_metric_data()).await;
    let mut cfg = ClientConfig::new(format!("http://{addr}/"));
    cfg.max_retries = 6;
    cfg.backoff_factor = 0.1;
    let client = GraphiteClient::new(&cfg).unwrap();

    let data = client.query("metric", 60).await.unwrap();
    assert_eq!(data["foo"].len(), 3);
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn post_render_sends_form_body() {
    let stub = StubBackend::json(&single_metric_data()).await;
    let mut cfg = ClientConfig::new(stub.url());
    cfg.post_render = true;
    let client = GraphiteClient::new(&cfg).unwrap();

    let data = client.query("servers.*.load", 10).await.unwrap();
    assert_eq!(data["foo"].len(), 2);

    let requests = stub.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].params["target"], "servers.*.load");
    assert_eq!(requests[0].params["format"], "json");
    assert_eq!(requests[0].params["from"], "-600s");
}

#[tokio::test]
async fn slow_body_within_read_timeout_completes() {
    let backend = TrickleBackend::serve(&single_metric_data(), 5, Duration::from_millis(400)).await;
    let mut cfg = ClientConfig::new(backend.url());
    cfg.connect_timeout = Duration::from_millis(500);
    cfg.read_timeout = Duration::from_millis(1000);
    cfg.max_retries = 0;
    let client = GraphiteClient::new(&cfg).unwrap();

    let started = Instant::now();
    let data = client.query("metric", 60).await.unwrap();
    assert!(started.elapsed() > cfg.connect_timeout + cfg.read_timeout);
    assert_eq!(data["foo"].len(), 3);
}

#[tokio::test]
async fn stalled_body_read_times_out() {
    let backend =
        TrickleBackend::serve(&single_metric_data(), 2, Duration::from_millis(1500)).await;
    let mut cfg = ClientConfig::new(backend.url());
    cfg.connect_timeout = Duration::from_millis(500);
    cfg.read_timeout = Duration::from_millis(1000);
    cfg.max_retries = 0;
    let client = GraphiteClient::new(&cfg).unwrap();

    let err = client.query("metric", 60).await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn get_is_retried_up_to_max_retries() {
    let backend = HangupBackend::serve().await;
    let mut cfg = ClientConfig::new(backend.url());
    cfg.max_retries = 2;
    cfg.backoff_factor = 0.0;
    let client = GraphiteClient::new(&cfg).unwrap();

    let err = client.query("metric", 60).await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err:?}");
    assert_eq!(backend.connections(), 3);
}

#[tokio::test]
async fn post_render_is_not_retried() {
    let backend = HangupBackend::serve().await;
    let mut cfg = ClientConfig::new(backend.url());
    cfg.max_retries = 2;
    cfg.backoff_factor = 0.0;
    cfg.post_render = true;
    let client = GraphiteClient::new(&cfg).unwrap();

    let err = client.query("metric", 60).await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err:?}");
    assert_eq!(backend.connections(), 1);
}

#[tokio::test]
async fn http_post_is_attempted_once() {
    let backend = HangupBackend::serve().await;
    let http = HttpClient::new(&HttpConfig {
        max_retries: 3,
        backoff_factor: 0.0,
        ..HttpConfig::default()
    })
    .unwrap();

    let url = format!("{}render", backend.url());
    let form = [("target", "metric".to_string())];
    assert!(http.post(&url, &[], &form).await.is_err());
    assert_eq!(backend.connections(), 1);

    assert!(http.get(&url, &[]).await.is_err());
    assert_eq!(backend.connections(), 5);
}
