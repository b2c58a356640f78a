/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

mod common;

use axum::http::{Method, StatusCode};
use common::*;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const REQUEST: &str = r#"{"project_github_url":"https://example.com/repo.git","build_command":"make","build_out_dir":"."}"#;

async fn collect(router: &axum::Router) -> Uuid {
    let (status, body) = send_json(router, Method::POST, "/api/v1/collect", Some(REQUEST)).await;
    assert_eq!(status, StatusCode::OK);

    body["build_id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_collect_returns_build_id() {
    let (router, app) = create_app(StubStages::default());

    let build_id = collect(&router).await;

    let (status, body) = send_json(
        &router,
        Method::GET,
        &format!("/api/v1/build/{}", build_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Pending");

    wait_idle(&app).await;
}

#[tokio::test]
async fn test_collect_missing_field() {
    let (router, _) = create_app(StubStages::default());

    let (status, body) = send_json(
        &router,
        Method::POST,
        "/api/v1/collect",
        Some(r#"{"project_github_url":"https://example.com/repo.git","build_out_dir":"."}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "`build_command` must not be empty");
}

#[tokio::test]
async fn test_collect_rejects_local_sources_and_bad_json() {
    let (router, _) = create_app(StubStages::default());

    let (status, _) = send_json(
        &router,
        Method::POST,
        "/api/v1/collect",
        Some(r#"{"project_github_url":"file:///etc","build_command":"make","build_out_dir":"."}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        send_json(&router, Method::POST, "/api/v1/collect", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_unknown_build_is_not_found() {
    let (router, _) = create_app(StubStages::default());
    let unknown = Uuid::new_v4();

    for uri in [
        format!("/api/v1/build/{}", unknown),
        format!("/api/v1/build-events/{}", unknown),
        format!("/api/v1/build/{}/details", unknown),
        format!("/api/v1/build/{}/log", unknown),
    ] {
        let (status, body) = send_json(&router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["message"], "Build not found");
    }

    let (status, _) = send_json(
        &router,
        Method::POST,
        &format!("/api/v1/build/{}/cancel", unknown),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_build_id() {
    let (router, _) = create_app(StubStages::default());

    for uri in [
        "/api/v1/build/not-a-uuid",
        "/api/v1/build/not-a-uuid/details",
        "/api/v1/build-events/1234",
    ] {
        let (status, body) = send_json(&router, Method::GET, uri, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["error"], true);
        assert_eq!(body["message"], "Build not found");
    }

    let (status, body) =
        send_json(&router, Method::POST, "/api/v1/build/not-a-uuid/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Build not found");
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let (router, app) = create_app_with_ledger(Arc::new(FailingLedger), StubStages::default());

    let (status, body) = send_json(&router, Method::POST, "/api/v1/collect", Some(REQUEST)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Store error");
    assert_eq!(app.orchestrator.in_flight(), 0);

    let id = Uuid::new_v4();
    for (method, uri) in [
        (Method::GET, format!("/api/v1/build/{}", id)),
        (Method::GET, format!("/api/v1/build/{}/details", id)),
        (Method::GET, format!("/api/v1/build/{}/log", id)),
        (Method::GET, format!("/api/v1/build-events/{}", id)),
        (Method::POST, format!("/api/v1/build/{}/cancel", id)),
    ] {
        let (status, body) = send_json(&router, method, &uri, None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(body["message"], "Store error");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_build_events_after_pipeline() {
    let (router, app) = create_app(StubStages::default());

    let build_id = collect(&router).await;
    wait_idle(&app).await;

    let (status, body) = send_json(
        &router,
        Method::GET,
        &format!("/api/v1/build-events/{}", build_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = body.as_array().unwrap();
    let statuses: Vec<&str> = events.iter().map(|e| e["status"].as_str().unwrap()).collect();
    assert_eq!(
        statuses,
        vec!["Pending", "Cloning", "Building", "Publishing", "Deploying", "Running"]
    );
    assert!(events.iter().all(|e| e["build_id"] == build_id.to_string()));
    assert_eq!(events[5]["detail"], "127.0.0.1:49153");
    assert!(events[0]["detail"].is_null());
    assert!(events[0]["timestamp"].as_str().unwrap().ends_with('Z'));

    let (status, body) = send_json(
        &router,
        Method::GET,
        &format!("/api/v1/build/{}", build_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Running");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_build_details() {
    let (router, app) = create_app(StubStages::default());

    let build_id = collect(&router).await;
    wait_idle(&app).await;

    let (status, body) = send_json(
        &router,
        Method::GET,
        &format!("/api/v1/build/{}/details", build_id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], false);

    let build = &body["message"];
    assert_eq!(build["id"], build_id.to_string());
    assert_eq!(build["source_location"], "https://example.com/repo.git");
    assert_eq!(build["status"], "Running");
    assert_eq!(build["endpoint"], "127.0.0.1:49153");
    assert_eq!(build["log"], "compiling\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_build_log_of_finished_build() {
    let (router, app) = create_app(StubStages::default());

    let build_id = collect(&router).await;
    wait_idle(&app).await;

    let (status, bytes) = send(
        &router,
        Method::GET,
        &format!("/api/v1/build/{}/log", build_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let chunks: Vec<String> = String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(chunks, vec!["compiling\n".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_build() {
    let (router, app) = create_app(StubStages {
        build_delay: Some(Duration::from_secs(30)),
    });

    let build_id = collect(&router).await;
    let uri = format!("/api/v1/build/{}/cancel", build_id);

    let (status, body) = send_json(&router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);

    wait_idle(&app).await;

    let (_, body) = send_json(
        &router,
        Method::GET,
        &format!("/api/v1/build/{}", build_id),
        None,
    )
    .await;
    assert_eq!(body["status"], "Failed");

    let (_, events) = send_json(
        &router,
        Method::GET,
        &format!("/api/v1/build-events/{}", build_id),
        None,
    )
    .await;
    let last = events.as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["status"], "Failed");
    assert_eq!(last["detail"], "cancelled");

    let (status, body) = send_json(&router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
}
