use std::sync::Arc;

use axum::{Router, routing::get};
use dockex_common::{DockexError, Result};
use tower_http::trace::TraceLayer;

use crate::{build_info::BuildInfo, exporter::Exporter, handlers};

pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";
pub const READY_PATH: &str = "/-/ready";

pub struct AppState {
    pub exporter: Arc<Exporter>,
    pub telemetry_path: String,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(exporter: Arc<Exporter>, telemetry_path: impl Into<String>) -> Result<Self> {
        let telemetry_path = telemetry_path.into();
        validate_telemetry_path(&telemetry_path)?;

        Ok(Self {
            exporter,
            telemetry_path,
            build: BuildInfo::current(),
        })
    }
}

fn validate_telemetry_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(DockexError::InvalidArgument(format!(
            "telemetry path {path:?} must start with '/'"
        )));
    }
    if path
        .split('/')
        .any(|segment| segment.starts_with([':', '*']) || segment.contains(['{', '}']))
    {
        return Err(DockexError::InvalidArgument(format!(
            "telemetry path {path:?} must not contain route parameters"
        )));
    }
    if path == "/" || path == READY_PATH {
        return Err(DockexError::InvalidArgument(format!(
            "telemetry path {path:?} collides with a built-in route"
        )));
    }
    Ok(())
}

pub fn exporter_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index::landing_page))
        .route(
            &state.telemetry_path,
            get(handlers::metrics::prometheus_metrics),
        )
        .route(READY_PATH, get(handlers::health::ready))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
