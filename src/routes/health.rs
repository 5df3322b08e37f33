//! Health and version probes
//!
//! `/health` is a liveness probe: it always answers 200 and reports whether
//! the credential store answered a ping within the store deadline.

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::{json_response, FullBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    /// `online` or `degraded`
    pub status: &'static str,
    pub version: &'static str,
    pub mode: &'static str,
    pub store: StoreHealth,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct StoreHealth {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health
pub async fn health_check(state: &AppState) -> Response<FullBody> {
    let ping = state
        .ctx
        .bounded("ping", state.ctx.store().ping())
        .await;

    let store = StoreHealth {
        reachable: ping.is_ok(),
        error: ping.err().map(|e| e.to_string()),
    };

    let response = HealthResponse {
        healthy: true,
        status: if store.reachable { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        store,
        timestamp: state.ctx.clock().now().to_rfc3339(),
    };

    json_response(StatusCode::OK, &response)
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// GET /version
pub fn version_info() -> Response<FullBody> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "turnstile",
    };
    json_response(StatusCode::OK, &response)
}
