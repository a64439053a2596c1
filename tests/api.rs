// tests/api.rs

//! End-to-end tests of the HTTP API, driven in-process through the router.

mod common;

use axum::http::StatusCode;
use common::{ScriptedFetcher, setup, setup_with};
use parcel::{EngineConfig, TokenAuthority};
use serde_json::json;

#[tokio::test]
async fn test_hello_and_version() {
    let server = setup();

    let (status, body) = server.get("/hello", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Hello World!" }));

    let (status, body) = server.get("/api/v1/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_package_lifecycle() {
    let server = setup();

    let (status, body) = server
        .post(
            "/api/v1/packages",
            None,
            Some(json!({ "name": "hello", "version": "2.10" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "id": 1, "name": "hello", "version": "2.10", "status": "created" })
    );

    // Registering does not start a download
    assert_eq!(server.state.engine.stats().scheduled, 0);

    let (status, body) = server.post("/api/v1/package/1/download", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "created" }));

    server.state.engine.wait_for_downloads().await;

    let (status, body) = server.get("/api/v1/package/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "downloaded");

    // Already downloaded: nothing new is scheduled
    let (_, body) = server.post("/api/v1/package/1/download", None, None).await;
    assert_eq!(body, json!({ "status": "downloaded" }));
    server.state.engine.wait_for_downloads().await;
    assert_eq!(server.fetcher.calls(), 1);

    let (status, body) = server.post("/api/v1/package/1/activate", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "activated" }));

    let (status, body) = server.post("/api/v1/package/1/activate", None, None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["status"], 412);

    let (_, body) = server.get("/api/v1/packages", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["status"], "activated");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let server = setup();
    let pkg = json!({ "name": "jq", "version": "1.7" });

    let (status, _) = server.post("/api/v1/packages", None, Some(pkg.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.post("/api/v1/packages", None, Some(pkg)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["title"], "Conflict");

    // The first registration is untouched
    let (_, body) = server.get("/api/v1/packages", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], 1);
    assert_eq!(body[0]["status"], "created");
}

#[tokio::test]
async fn test_missing_packages() {
    let server = setup();

    let (status, body) = server.get("/api/v1/package/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "package 7 not found");

    let (status, _) = server.post("/api/v1/package/7/download", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.post("/api/v1/package/7/activate", None, None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_activate_before_download_fails() {
    let server = setup();
    server
        .post(
            "/api/v1/packages",
            None,
            Some(json!({ "name": "hello", "version": "2.10" })),
        )
        .await;

    let (status, body) = server.post("/api/v1/package/1/activate", None, None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(
        body["detail"],
        "package 1 does not exist or is not in the downloaded state"
    );
}

#[tokio::test]
async fn test_failed_download_stays_created() {
    let fetcher = ScriptedFetcher::new();
    fetcher.set_failing(true);
    let server = setup_with(fetcher, EngineConfig::default());
    server
        .post(
            "/api/v1/packages",
            None,
            Some(json!({ "name": "hello", "version": "0.0" })),
        )
        .await;

    server.post("/api/v1/package/1/download", None, None).await;
    server.state.engine.wait_for_downloads().await;

    let (_, body) = server.get("/api/v1/package/1", None).await;
    assert_eq!(body["status"], "created");

    let (_, stats) = server.get("/api/v1/stats", None).await;
    assert_eq!(stats["failed"], 1);
    assert_eq!(stats["in_flight"], 0);

    // Retry once the fetch works
    server.fetcher.set_failing(false);
    server.post("/api/v1/package/1/download", None, None).await;
    server.state.engine.wait_for_downloads().await;
    let (_, body) = server.get("/api/v1/package/1", None).await;
    assert_eq!(body["status"], "downloaded");
}

#[tokio::test]
async fn test_first_token_closes_bootstrap_mode() {
    let server = setup();

    // Open while no token exists
    let (status, _) = server.get("/api/v1/packages", None).await;
    assert_eq!(status, StatusCode::OK);

    let (id, token) = server.issue_token(None).await;
    assert_eq!(id, 1);
    assert_eq!(token.len(), 64);

    let (status, body) = server.get("/api/v1/packages", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let (status, _) = server.get("/api/v1/packages", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get("/api/v1/packages", Some("abc123")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Public routes stay public
    let (status, _) = server.get("/hello", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_requires_token() {
    let server = setup();
    let (_, token) = server.issue_token(None).await;

    let (status, _) = server.get("/api/v1/hello", Some("abc123")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server.get("/api/v1/hello", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scheme_is_case_insensitive() {
    let server = setup();
    let (_, token) = server.issue_token(None).await;

    let request = axum::http::Request::builder()
        .uri("/api/v1/tokens")
        .header("Authorization", format!("token {token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(server.app.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = axum::http::Request::builder()
        .uri("/api/v1/tokens")
        .header("Authorization", format!("Bearer {token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(server.app.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoke_single_token() {
    let server = setup();
    let (_, first) = server.issue_token(None).await;
    let (second_id, second) = server.issue_token(Some(&first)).await;
    assert_eq!(second_id, 2);

    let (status, body) = server
        .delete(&format!("/api/v1/token/{second_id}"), Some(&first))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, _) = server.get("/api/v1/tokens", Some(&second)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = server.get("/api/v1/tokens", Some(&first)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Deleting again is not an error
    let (status, _) = server
        .delete(&format!("/api/v1/token/{second_id}"), Some(&first))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_tokens_revoked_by_cli_reopen_bootstrap() {
    let server = setup();
    let (id, token) = server.issue_token(None).await;

    let (status, _) = server.get("/api/v1/tokens", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // `parcel token revoke` runs in its own process with its own authority
    let cli = TokenAuthority::new(server.db.clone());
    cli.revoke_one(id).await.unwrap();

    let (status, body) = server.get("/api/v1/tokens", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    let (status, _) = server.get("/api/v1/packages", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_revoke_all_keeps_callers_token() {
    let server = setup();
    let (_, first) = server.issue_token(None).await;
    let (_, second) = server.issue_token(Some(&first)).await;
    let (_, third) = server.issue_token(Some(&first)).await;

    let (status, body) = server.delete("/api/v1/tokens/all", Some(&second)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = server.get("/api/v1/tokens", Some(&second)).await;
    assert_eq!(status, StatusCode::OK);
    let tokens = body.as_array().unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0]["token"], second.as_str());

    for revoked in [&first, &third] {
        let (status, _) = server.get("/api/v1/tokens", Some(revoked)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_revoking_last_token_reopens() {
    let server = setup();
    let (id, token) = server.issue_token(None).await;

    let (status, _) = server.delete(&format!("/api/v1/token/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get("/api/v1/packages", None).await;
    assert_eq!(status, StatusCode::OK);
}
