//! HTTP surface of the fault harness: arming, status, clearing, immediate
//! emulation and the transaction hook a device simulator calls.

pub mod config;
pub mod error;
pub mod routes;
pub mod wire;

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use fault_harness::{DeviceLink, Harness, LoopbackLink};

pub use config::{Args, ServerConfig};
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub harness: Arc<Harness>,
    /// Where transaction responses are delivered.
    pub link: Arc<dyn DeviceLink>,
}

impl AppState {
    /// State whose transactions are answered in the HTTP reply itself.
    pub fn new(harness: Harness) -> Self {
        Self::with_link(harness, Arc::new(LoopbackLink))
    }

    pub fn with_link(harness: Harness, link: Arc<dyn DeviceLink>) -> Self {
        Self {
            harness: Arc::new(harness),
            link,
        }
    }
}

/// Routes served both at the root and under `/api`.
pub fn build_app(state: AppState) -> Router {
    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .into_inner();

    Router::new()
        .merge(routes::routes())
        .nest("/api", routes::routes())
        .with_state(state)
        .layer(layers)
}
