//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "KernelForge Server",
        version = "0.3.0",
        description = "Build service for custom Android kernels and TWRP recovery images, with live progress over WebSocket"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::info,
        // Build endpoints
        api::builds::submit_build,
        api::builds::list_builds,
        api::builds::get_build,
        api::builds::cancel_build,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::BuildCounts,
            api::health::ServerInfoResponse,
            // Builds
            models::BuildKind,
            models::BuildStatus,
            models::BuildConfig,
            models::SkipOptions,
            models::BuildJob,
            models::CancelBuildResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Builds", description = "Kernel and recovery build jobs")
    )
)]
pub struct ApiDoc;
