//! E2E tests: submitting builds.

use serde_json::json;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_recovery_build_completes_with_artifacts() {
    let app = create_test_app(instant_service()).await;

    let (status, job) = post_json(
        &app,
        "/api/v1/builds",
        json!({ "device": "OnePlus 7", "version": "3.7.0" }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(job["status"], "pending");
    assert_eq!(job["progress"], 0);
    assert_eq!(job["currentStep"], "Queued");

    let id = job["id"].as_str().unwrap().to_string();
    let done = wait_for_terminal(&app, &id).await;

    assert_eq!(done["status"], "completed");
    assert_eq!(done["progress"], 100);
    assert_eq!(done["currentStep"], "Build completed successfully");
    assert_eq!(
        done["outputFiles"],
        json!(["oneplus_7_twrp_3.7.0.img", "oneplus_7_twrp_3.7.0.zip"])
    );
    assert!(done["startedAt"].is_string());
    assert!(done["completedAt"].is_string());
    assert!(done.get("errorMessage").is_none() || done["errorMessage"].is_null());

    let logs: Vec<&str> = done["logs"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|l| l.as_str())
        .collect();
    assert!(logs.iter().any(|l| l.ends_with("Starting: Compile")));
    assert!(logs.iter().any(|l| l.ends_with("Build completed successfully!")));
}

#[actix_rt::test]
async fn test_kernel_build_uses_explicit_codename() {
    let app = create_test_app(instant_service()).await;

    let id = submit(
        &app,
        json!({ "device": "Pixel 6", "codename": "oriole", "buildType": "kernel" }),
    )
    .await;
    let done = wait_for_terminal(&app, &id).await;

    assert_eq!(done["kind"], "kernel");
    assert_eq!(
        done["outputFiles"],
        json!(["oriole_kernel_latest.img", "oriole_kernel_latest.zip"])
    );
}

#[actix_rt::test]
async fn test_kernel_skip_options_shorten_plan() {
    let app = create_test_app(catalog_service()).await;

    let id = submit(
        &app,
        json!({
            "device": "Pixel 6",
            "buildType": "kernel",
            "skipOptions": { "skipEnvSetup": true, "skipBuild": true, "cleanOutput": true }
        }),
    )
    .await;
    let done = wait_for_terminal(&app, &id).await;

    assert_eq!(done["status"], "completed");
    assert_eq!(done["config"]["skipOptions"]["skipBuild"], true);
    assert_eq!(done["config"]["skipOptions"]["skipClone"], false);

    let started: Vec<&str> = done["logs"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|l| l.as_str())
        .filter_map(|l| l.split_once("Starting: ").map(|(_, phase)| phase))
        .collect();
    assert_eq!(started.first(), Some(&"Cleaning previous output"));
    assert!(!started.contains(&"Compiling kernel"));
    assert_eq!(started.last(), Some(&"Packaging kernel image"));
    assert_eq!(started.len(), 5);
}

#[actix_rt::test]
async fn test_submit_without_device_is_rejected() {
    let service = instant_service();
    let app = create_test_app(service.clone()).await;

    let (status, body) = post_json(&app, "/api/v1/builds", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(service.list_builds().is_empty());

    let (status, _) = post_json(&app, "/api/v1/builds", json!({ "device": "   " })).await;
    assert_eq!(status, 400);
    assert!(service.list_builds().is_empty());
}

#[actix_rt::test]
async fn test_malformed_body_is_rejected() {
    let app = create_test_app(instant_service()).await;

    let (status, body) = post_json(
        &app,
        "/api/v1/builds",
        json!({ "device": "OnePlus 7", "buildType": "bootloader" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
}
