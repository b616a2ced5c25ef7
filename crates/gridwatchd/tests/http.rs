//! HTTP surface tests.
//!
//! Serves the router against an in-memory control plane and checks what a
//! Prometheus server or a load balancer would see.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gridwatch_api::build_router;
use gridwatch_client::mock::{node_detail, node_stub};
use gridwatch_client::{MockControlPlane, MockState};
use gridwatch_collector::{CollectorConfig, Exporter};
use tower::ServiceExt;

fn router_for(state: MockState) -> axum::Router {
    let client = Arc::new(MockControlPlane::new("http://10.0.0.1:4646", state));
    let exporter = Exporter::new(client, CollectorConfig::default()).unwrap();
    build_router(Arc::new(exporter))
}

fn leader_state() -> MockState {
    let stub = node_stub("n1", "worker-1", "dc1", "ready");
    let mut state = MockState {
        leader: Some("10.0.0.1:4647".to_string()),
        peers: vec!["10.0.0.1:4647".to_string()],
        ..Default::default()
    };
    state.node_details.insert("n1".to_string(), node_detail(&stub));
    state.nodes.push(stub);
    state
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, String, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn metrics_reports_up_and_leader() {
    let (status, content_type, body) = get(router_for(leader_state()), "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/plain; version=0.0.4"));
    assert!(body.contains("# TYPE nomad_up gauge"));
    assert!(body.contains("nomad_up 1"));
    assert!(body.contains("nomad_leader 1"));
    assert!(body.contains("nomad_raft_peers 1"));
}

#[tokio::test]
async fn metrics_reports_down_when_leader_query_fails() {
    let (status, _, body) = get(router_for(MockState::default()), "/metrics").await;

    // The scrape itself succeeds; the failure shows up as a value.
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("nomad_up 0"));
    assert!(!body.contains("nomad_leader "));
}

#[tokio::test]
async fn healthz_ok_when_control_plane_answers() {
    let (status, _, body) = get(router_for(leader_state()), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"ok\""));
}

#[tokio::test]
async fn healthz_unavailable_when_leader_query_fails() {
    let (status, _, body) = get(router_for(MockState::default()), "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("unavailable"));
}

#[tokio::test]
async fn index_links_to_metrics() {
    let (status, _, body) = get(router_for(leader_state()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("/metrics"));
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let (status, _, _) = get(router_for(leader_state()), "/v1/nodes").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
