//! E2E tests: fetching and listing builds.

use serde_json::json;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_get_unknown_build_is_not_found() {
    let app = create_test_app(instant_service()).await;

    let (status, body) = get_json(&app, &format!("/api/v1/builds/{}", uuid::Uuid::now_v7())).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[actix_rt::test]
async fn test_get_malformed_id_is_bad_request() {
    let app = create_test_app(instant_service()).await;

    let (status, body) = get_json(&app, "/api/v1/builds/not-a-uuid").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[actix_rt::test]
async fn test_list_is_newest_first() {
    let app = create_test_app(stalled_service()).await;
    let first = submit(&app, json!({ "device": "OnePlus 7" })).await;
    let second = submit(&app, json!({ "device": "Pixel 6" })).await;
    let third = submit(&app, json!({ "device": "Galaxy S10" })).await;

    let (status, body) = get_json(&app, "/api/v1/builds").await;
    assert_eq!(status, 200);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|j| j["id"].as_str())
        .collect();
    assert_eq!(ids, vec![third.as_str(), second.as_str(), first.as_str()]);
}

#[actix_rt::test]
async fn test_list_filters_by_status() {
    let app = create_test_app(stalled_service()).await;
    let kept = submit(&app, json!({ "device": "OnePlus 7" })).await;
    let cancelled = submit(&app, json!({ "device": "Pixel 6" })).await;
    post_json(&app, &format!("/api/v1/builds/{}/cancel", cancelled), json!({})).await;

    let (status, body) = get_json(&app, "/api/v1/builds?status=cancelled").await;
    assert_eq!(status, 200);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|j| j["id"].as_str())
        .collect();
    assert_eq!(ids, vec![cancelled.as_str()]);
    assert!(!ids.contains(&kept.as_str()));

    let (status, body) = get_json(&app, "/api/v1/builds?status=exploded").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
}
