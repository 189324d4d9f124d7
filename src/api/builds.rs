//! Build API handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{BuildConfig, BuildStatus, CancelBuildResponse, ListBuildsQuery};
use crate::services::BuildService;

fn parse_build_id(raw: &str) -> AppResult<Uuid> {
    Ok(Uuid::parse_str(raw)?)
}

/// Submit a build.
///
/// Creates a pending build and starts its simulation in the background.
/// Progress is pushed over `/ws` and can be polled via `GET /builds/{id}`.
#[utoipa::path(
    post,
    path = "/api/v1/builds",
    tag = "Builds",
    request_body = BuildConfig,
    responses(
        (status = 201, description = "Build accepted", body = crate::models::BuildJob),
        (status = 400, description = "Missing device or malformed body", body = crate::error::ErrorResponse),
    )
)]
pub async fn submit_build(
    service: web::Data<BuildService>,
    body: web::Json<BuildConfig>,
) -> AppResult<HttpResponse> {
    let job = service.submit_build(body.into_inner())?;
    Ok(HttpResponse::Created().json(job))
}

/// List builds, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/builds",
    tag = "Builds",
    params(
        ("status" = Option<String>, Query, description = "Filter by status (pending, running, completed, failed, cancelled)")
    ),
    responses(
        (status = 200, description = "Builds", body = Vec<crate::models::BuildJob>),
        (status = 400, description = "Unknown status", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_builds(
    service: web::Data<BuildService>,
    query: web::Query<ListBuildsQuery>,
) -> AppResult<HttpResponse> {
    let builds = match query.status.as_deref() {
        Some(raw) => {
            let status = BuildStatus::parse(raw)
                .ok_or_else(|| AppError::InvalidInput(format!("Unknown status '{}'", raw)))?;
            service.list_builds_with_status(status)
        }
        None => service.list_builds(),
    };
    Ok(HttpResponse::Ok().json(builds))
}

/// Get a build by id.
#[utoipa::path(
    get,
    path = "/api/v1/builds/{id}",
    tag = "Builds",
    params(
        ("id" = Uuid, Path, description = "Build id")
    ),
    responses(
        (status = 200, description = "Build", body = crate::models::BuildJob),
        (status = 400, description = "Malformed id", body = crate::error::ErrorResponse),
        (status = 404, description = "Build not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_build(
    service: web::Data<BuildService>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = parse_build_id(&path.into_inner())?;
    let job = service.get_build(id)?;
    Ok(HttpResponse::Ok().json(job))
}

/// Cancel a build.
///
/// Cancellation is cooperative: a running build stops at its next phase
/// boundary. `cancelled` is false when the build is unknown or already finished.
#[utoipa::path(
    post,
    path = "/api/v1/builds/{id}/cancel",
    tag = "Builds",
    params(
        ("id" = Uuid, Path, description = "Build id")
    ),
    responses(
        (status = 200, description = "Cancellation result", body = CancelBuildResponse),
        (status = 400, description = "Malformed id", body = crate::error::ErrorResponse),
    )
)]
pub async fn cancel_build(
    service: web::Data<BuildService>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = parse_build_id(&path.into_inner())?;
    let cancelled = service.cancel_build(id);
    Ok(HttpResponse::Ok().json(CancelBuildResponse {
        build_job_id: id,
        cancelled,
    }))
}

/// Configure build routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::InvalidInput(err.to_string()).into()),
    )
    .service(
        web::resource("/builds")
            .route(web::get().to(list_builds))
            .route(web::post().to(submit_build)),
    )
    .service(web::resource("/builds/{id}").route(web::get().to(get_build)))
    .service(web::resource("/builds/{id}/cancel").route(web::post().to(cancel_build)));
}
