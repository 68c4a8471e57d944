//! Health check endpoint
//!
//! `/health` and `/healthz` are liveness probes: 200 while the process runs.

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::{json_response, FullBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// "development" or "production"
    pub mode: &'static str,
    /// "memory" or "mongodb"
    pub store: &'static str,
    pub timestamp: String,
}

pub fn health_check(state: &AppState) -> Response<FullBody> {
    let args = &state.args;
    let body = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        mode: if args.dev_mode { "development" } else { "production" },
        store: if args.in_memory_store { "memory" } else { "mongodb" },
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    json_response(StatusCode::OK, &body)
}
