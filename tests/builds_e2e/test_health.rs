//! E2E tests: health and info endpoints.

use serde_json::json;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_health() {
    let app = create_test_app(instant_service()).await;

    let (status, body) = get_json(&app, "/api/v1/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
}

#[actix_rt::test]
async fn test_info_counts_builds() {
    let app = create_test_app(stalled_service()).await;
    submit(&app, json!({ "device": "OnePlus 7" })).await;
    let cancelled = submit(&app, json!({ "device": "Pixel 6" })).await;
    post_json(&app, &format!("/api/v1/builds/{}/cancel", cancelled), json!({})).await;

    let (status, body) = get_json(&app, "/api/v1/info").await;
    assert_eq!(status, 200);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["environment"], "development");
    assert_eq!(body["builds"]["total"], 2);
    assert_eq!(body["builds"]["cancelled"], 1);
    assert_eq!(
        body["builds"]["pending"].as_u64().unwrap() + body["builds"]["running"].as_u64().unwrap(),
        1
    );
    assert_eq!(body["websocketConnections"], 0);
}
