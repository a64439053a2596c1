// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use parcel::server::{AppState, SharedState, create_router};
use parcel::{Database, EngineConfig, Error, FetchReport, Fetcher, Result};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tower::ServiceExt;

/// Fetcher that counts calls, can be told to fail, and can be held until released
pub struct ScriptedFetcher {
    calls: AtomicUsize,
    fail: AtomicBool,
    gate: Semaphore,
}

impl ScriptedFetcher {
    /// Fetches complete immediately
    pub fn new() -> Arc<Self> {
        Self::with_permits(1 << 20)
    }

    /// Fetches block until [`ScriptedFetcher::release`] is called
    pub fn held() -> Arc<Self> {
        Self::with_permits(0)
    }

    fn with_permits(permits: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            gate: Semaphore::new(permits),
        })
    }

    pub fn release(&self) {
        self.gate.add_permits(1 << 20);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, name: &str, version: &str) -> Result<FetchReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| Error::Executor(e.to_string()))?;

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Executor(format!(
                "version {version} for {name} is not available"
            )));
        }
        Ok(FetchReport {
            store_path: Some(format!("/nix/store/test-{name}-{version}")),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A router over a fresh database. Keep the struct alive for the test's duration.
pub struct TestServer {
    _temp: TempDir,
    pub state: SharedState,
    pub db: Database,
    pub app: Router,
    pub fetcher: Arc<ScriptedFetcher>,
}

pub fn setup() -> TestServer {
    setup_with(ScriptedFetcher::new(), EngineConfig::default())
}

pub fn setup_with(fetcher: Arc<ScriptedFetcher>, config: EngineConfig) -> TestServer {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = Database::init(temp_dir.path().join("parcel.db")).unwrap();
    let state = Arc::new(AppState::new(db.clone(), fetcher.clone(), config));
    let app = create_router(state.clone());

    TestServer {
        _temp: temp_dir,
        state,
        db,
        app,
        fetcher,
    }
}

impl TestServer {
    /// Send a request and return the status and decoded JSON body (Null if empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Token {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, body).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    /// Issue a token over HTTP and return its value
    pub async fn issue_token(&self, auth: Option<&str>) -> (i64, String) {
        let (status, body) = self.post("/api/v1/tokens", auth, None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (
            body["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }
}
