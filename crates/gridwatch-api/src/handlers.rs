//! HTTP handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use gridwatch_client::ControlPlane;
use gridwatch_metrics::{CONTENT_TYPE, render_prometheus};
use tracing::{debug, warn};

use crate::ApiState;

const INDEX: &str = r#"<html>
<head><title>gridwatch</title></head>
<body>
<h1>gridwatch</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX)
}

/// GET /metrics
pub async fn metrics<C>(State(state): State<ApiState<C>>) -> impl IntoResponse
where
    C: ControlPlane + ?Sized + 'static,
{
    let _guard = state.scrape_lock.lock().await;
    let families = state.exporter.collect().await;
    debug!(families = families.len(), "scrape finished");

    (
        StatusCode::OK,
        [("content-type", CONTENT_TYPE)],
        render_prometheus(&families),
    )
}

/// GET /healthz
pub async fn healthz<C>(State(state): State<ApiState<C>>) -> impl IntoResponse
where
    C: ControlPlane + ?Sized + 'static,
{
    match state.exporter.probe().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))),
        Err(e) => {
            warn!(error = %e, "health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable", "error": e.to_string() })),
            )
        }
    }
}
