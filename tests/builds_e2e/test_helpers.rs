//! Shared test helpers for build E2E tests.

use std::time::Duration;

use std::net::SocketAddr;

use actix_web::dev::{ServerHandle, ServiceResponse};
use actix_web::{App, HttpServer, test, web};
use kernelforge_lib::api;
use kernelforge_lib::config::{Config, Environment};
use kernelforge_lib::models::BuildStatus;
use kernelforge_lib::services::{
    BuildService, ConnectionRegistry, EventBroadcaster, JobStore, Phase, PhaseCatalog, PhasePlan,
};
use serde_json::Value;

/// Build service whose builds finish without sleeping.
pub fn instant_service() -> BuildService {
    BuildService::new(
        JobStore::new(EventBroadcaster::new()),
        PhaseCatalog::uniform(PhasePlan::instant(["Setup", "Compile", "Package"])),
    )
}

/// Build service with the real phase catalog, scaled to zero.
pub fn catalog_service() -> BuildService {
    BuildService::new(
        JobStore::new(EventBroadcaster::new()),
        PhaseCatalog::with_time_scale(0.0),
    )
}

/// Build service whose first phase outlasts any test.
pub fn stalled_service() -> BuildService {
    BuildService::new(
        JobStore::new(EventBroadcaster::new()),
        PhaseCatalog::uniform(PhasePlan::new(vec![
            Phase::new("Setup", Duration::from_secs(300)),
            Phase::new("Compile", Duration::from_secs(300)),
        ])),
    )
}

fn test_config() -> Config {
    Config {
        environment: Environment::Development,
        host: "127.0.0.1".to_string(),
        port: 0,
        static_dir: None,
        phase_time_scale: 0.0,
        event_channel_capacity: 100,
        job_retention_hours: 0,
        retention_interval_secs: 300,
    }
}

/// Create a test app around the given service.
pub async fn create_test_app(
    service: BuildService,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(test_config()))
            .app_data(web::Data::new(service))
            .app_data(web::Data::new(ConnectionRegistry::new()))
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(api::configure_build_routes),
            ),
    )
    .await
}

/// Serve the WebSocket route on an ephemeral loopback port.
pub fn start_ws_server(
    service: BuildService,
    connections: ConnectionRegistry,
) -> std::io::Result<(SocketAddr, ServerHandle)> {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(service.clone()))
            .app_data(web::Data::new(connections.clone()))
            .configure(api::configure_websocket_routes)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))?;

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_rt::spawn(server);
    Ok((addr, handle))
}

/// POST a JSON body and return status plus parsed body.
pub async fn post_json<S>(app: &S, uri: &str, body: Value) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::post()
        .uri(uri)
        .set_json(body)
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// GET a URI and return status plus parsed body.
pub async fn get_json<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// Submit a build and return its id.
pub async fn submit<S>(app: &S, body: Value) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let (status, job) = post_json(app, "/api/v1/builds", body).await;
    assert_eq!(status, 201, "Submit failed: {}", job);
    job["id"].as_str().expect("build id").to_string()
}

/// Poll a build until it reaches a terminal status.
pub async fn wait_for_terminal<S>(app: &S, id: &str) -> Value
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    for _ in 0..200 {
        let (status, job) = get_json(app, &format!("/api/v1/builds/{}", id)).await;
        assert_eq!(status, 200);
        let terminal = job["status"]
            .as_str()
            .and_then(BuildStatus::parse)
            .is_some_and(|s| s.is_terminal());
        if terminal {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Build {} did not finish", id);
}
