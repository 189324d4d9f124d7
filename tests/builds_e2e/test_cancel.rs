//! E2E tests: cancelling builds.

use serde_json::json;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_cancel_immediately_after_submit() {
    let app = create_test_app(stalled_service()).await;
    let id = submit(&app, json!({ "device": "OnePlus 7" })).await;

    let (status, body) = post_json(&app, &format!("/api/v1/builds/{}/cancel", id), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["buildJobId"], id.as_str());
    assert_eq!(body["cancelled"], true);

    let (status, job) = get_json(&app, &format!("/api/v1/builds/{}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(job["status"], "cancelled");
    assert_eq!(job["progress"], 0);
    assert_eq!(job["currentStep"], "Build cancelled by user");
    assert!(job["completedAt"].is_string());
    assert!(job["outputFiles"].is_null() || job.get("outputFiles").is_none());
}

#[actix_rt::test]
async fn test_cancel_twice_reports_false() {
    let app = create_test_app(stalled_service()).await;
    let id = submit(&app, json!({ "device": "OnePlus 7" })).await;
    let uri = format!("/api/v1/builds/{}/cancel", id);

    let (_, first) = post_json(&app, &uri, json!({})).await;
    let (status, second) = post_json(&app, &uri, json!({})).await;
    assert_eq!(first["cancelled"], true);
    assert_eq!(status, 200);
    assert_eq!(second["cancelled"], false);
}

#[actix_rt::test]
async fn test_cancel_completed_build_reports_false() {
    let app = create_test_app(instant_service()).await;
    let id = submit(&app, json!({ "device": "OnePlus 7" })).await;
    wait_for_terminal(&app, &id).await;

    let (status, body) = post_json(&app, &format!("/api/v1/builds/{}/cancel", id), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["cancelled"], false);

    let (_, job) = get_json(&app, &format!("/api/v1/builds/{}", id)).await;
    assert_eq!(job["status"], "completed");
}

#[actix_rt::test]
async fn test_cancel_unknown_build_reports_false() {
    let app = create_test_app(instant_service()).await;
    let id = uuid::Uuid::now_v7();

    let (status, body) = post_json(&app, &format!("/api/v1/builds/{}/cancel", id), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["cancelled"], false);
}
