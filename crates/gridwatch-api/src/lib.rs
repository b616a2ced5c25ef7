//! gridwatch-api: HTTP surface of the exporter.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Landing page linking to the metrics |
//! | GET | `/metrics` | One scrape, Prometheus exposition |
//! | GET | `/healthz` | Control-plane reachability |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use gridwatch_client::ControlPlane;
use gridwatch_collector::Exporter;
use tokio::sync::Mutex;

/// Shared state for the handlers.
pub struct ApiState<C: ?Sized> {
    pub exporter: Arc<Exporter<C>>,
    /// Held for the duration of a scrape so scrapes never overlap.
    pub scrape_lock: Arc<Mutex<()>>,
}

impl<C: ?Sized> Clone for ApiState<C> {
    fn clone(&self) -> Self {
        Self {
            exporter: Arc::clone(&self.exporter),
            scrape_lock: Arc::clone(&self.scrape_lock),
        }
    }
}

/// Build the exporter's router.
pub fn build_router<C>(exporter: Arc<Exporter<C>>) -> Router
where
    C: ControlPlane + ?Sized + 'static,
{
    let state = ApiState {
        exporter,
        scrape_lock: Arc::new(Mutex::new(())),
    };

    Router::new()
        .route("/", get(handlers::index))
        .route("/metrics", get(handlers::metrics::<C>))
        .route("/healthz", get(handlers::healthz::<C>))
        .with_state(state)
}
