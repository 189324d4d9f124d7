//! Health check endpoints.

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::Config;
use crate::models::BuildStatus;
use crate::services::{BuildService, ConnectionRegistry};

/// Health check response.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Build counts by status.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BuildCounts {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Server info response.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfoResponse {
    pub version: String,
    pub environment: String,
    pub builds: BuildCounts,
    pub websocket_connections: usize,
}

/// Health check endpoint.
///
/// Returns 200 if the service is running.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Server info endpoint.
///
/// Reports the server version, build counts and open push connections.
#[utoipa::path(
    get,
    path = "/api/v1/info",
    tag = "Health",
    responses(
        (status = 200, description = "Server info", body = ServerInfoResponse)
    )
)]
#[get("/info")]
pub async fn info(
    config: web::Data<Config>,
    service: web::Data<BuildService>,
    connections: web::Data<ConnectionRegistry>,
) -> HttpResponse {
    let counts = service.store().status_counts();
    let count = |status: BuildStatus| counts.get(&status).copied().unwrap_or(0);

    HttpResponse::Ok().json(ServerInfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: config.environment.to_string(),
        builds: BuildCounts {
            total: counts.values().sum(),
            pending: count(BuildStatus::Pending),
            running: count(BuildStatus::Running),
            completed: count(BuildStatus::Completed),
            failed: count(BuildStatus::Failed),
            cancelled: count(BuildStatus::Cancelled),
        },
        websocket_connections: connections.len(),
    })
}

/// Configure health routes.
pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(info);
}
