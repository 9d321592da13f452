// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use noticeboard::config::Config;
use noticeboard::db::Database;
use noticeboard::models::{NewNotice, Notice, NoticeStatus, Priority, Role, User};
use noticeboard::routes::create_router;
use noticeboard::services::password;
use noticeboard::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password-1";
#[allow(dead_code)]
pub const EDITOR_USERNAME: &str = "editor";
#[allow(dead_code)]
pub const EDITOR_PASSWORD: &str = "editor-password-1";

/// Router plus its state, backed by an in-memory database and a private
/// upload directory that lives as long as the app.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub upload_dir: TempDir,
}

/// Response pieces most tests look at.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Create a test app with default test configuration.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Create a test app after adjusting the test configuration.
pub async fn create_test_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");

    let mut config = Config::test_default();
    config.upload_dir = upload_dir.path().to_string_lossy().into_owned();
    adjust(&mut config);

    let db = Database::in_memory()
        .await
        .expect("Failed to open in-memory database");
    let state = Arc::new(AppState::new(config, db).expect("Failed to build app state"));

    TestApp {
        router: create_router(state.clone()),
        state,
        upload_dir,
    }
}

impl TestApp {
    /// Send a request through the full router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Send a request and return the raw body bytes.
    #[allow(dead_code)]
    pub async fn fetch(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, bytes.to_vec())
    }

    #[allow(dead_code)]
    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request("GET", uri, token, None)).await
    }

    #[allow(dead_code)]
    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request("POST", uri, token, Some(body))).await
    }

    #[allow(dead_code)]
    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request("PUT", uri, token, Some(body))).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request("DELETE", uri, token, None)).await
    }

    /// Create a user directly in the database.
    pub async fn create_user(&self, username: &str, password: &str, role: Role) -> User {
        let hash = password::hash_password(password).unwrap();
        self.state
            .db
            .create_user(username, None, &hash, role)
            .await
            .unwrap()
    }

    /// Log in through the API and return the bearer token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/auth/login",
                None,
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Create the admin account and log in as it.
    #[allow(dead_code)]
    pub async fn admin_token(&self) -> String {
        self.create_user(ADMIN_USERNAME, ADMIN_PASSWORD, Role::Admin)
            .await;
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Create the editor account and log in as it.
    #[allow(dead_code)]
    pub async fn editor_token(&self) -> String {
        self.create_user(EDITOR_USERNAME, EDITOR_PASSWORD, Role::Editor)
            .await;
        self.login(EDITOR_USERNAME, EDITOR_PASSWORD).await
    }

    /// Insert a notice directly, bypassing the API.
    #[allow(dead_code)]
    pub async fn insert_notice(
        &self,
        title: &str,
        priority: Priority,
        status: NoticeStatus,
        publish_at: Option<DateTime<Utc>>,
    ) -> Notice {
        let slug = self.state.db.unique_slug(title).await.unwrap();
        self.state
            .db
            .insert_notice(&NewNotice {
                slug,
                title: title.to_string(),
                description: format!("Details about {}", title),
                priority,
                status,
                attachments: vec![],
                image_url: None,
                publish_at,
                created_by: None,
            })
            .await
            .unwrap()
    }

    /// Insert a published notice with the given publish time.
    #[allow(dead_code)]
    pub async fn publish(&self, title: &str, priority: Priority, at: DateTime<Utc>) -> Notice {
        self.insert_notice(title, priority, NoticeStatus::Published, Some(at))
            .await
    }
}

/// Build a request, optionally authenticated and with a JSON body.
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Whole-second timestamp `hours` away from now.
#[allow(dead_code)]
pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
    noticeboard::time_utils::now() + chrono::Duration::hours(hours)
}

/// Multipart body with a single `file` part.
#[allow(dead_code)]
pub fn multipart_upload(
    uri: &str,
    token: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    const BOUNDARY: &str = "noticeboard-test-boundary";

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
