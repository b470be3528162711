use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub access_log: AccessLogInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessLogInfo {
    pub category: String,
    pub request_id_header: String,
    pub trust_forwarded_headers: bool,
}

/// Basic health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Detailed health check endpoint
///
/// Also reports how access logging is configured.
pub async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    debug!("Detailed health check requested");

    let logging = &state.config.logging;
    Json(DetailedHealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        access_log: AccessLogInfo {
            category: logging.category.clone(),
            request_id_header: logging.request_id_header.clone(),
            trust_forwarded_headers: logging.trust_forwarded_headers,
        },
    })
}
