// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard notice management tests.
//!
//! These tests drive create, read, update and delete through the API and
//! check what the stored notice looks like afterwards.

use axum::http::StatusCode;
use noticeboard::models::{NoticeStatus, Priority};
use serde_json::{json, Value};

mod common;

async fn create(app: &common::TestApp, token: &str, body: Value) -> common::TestResponse {
    app.post("/api/notices", Some(token), body).await
}

#[tokio::test]
async fn test_create_draft_and_fetch() {
    let app = common::create_test_app().await;
    let token = app.editor_token().await;

    let response = create(
        &app,
        &token,
        json!({
            "title": "Mid-Term Exam Schedule",
            "description": "Exams start on Monday.\nBring your ID card.",
            "priority": "high",
        }),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["message"], "Notice created");

    let notice = &response.body["data"];
    assert_eq!(notice["slug"], "mid-term-exam-schedule");
    assert_eq!(notice["status"], "draft");
    assert_eq!(notice["priority"], "high");
    assert!(notice["publish_at"].is_null());
    assert_eq!(notice["view_count"], 0);
    assert_eq!(
        notice["description"],
        "Exams start on Monday.\nBring your ID card."
    );

    let id = notice["id"].as_i64().unwrap();
    let response = app.get(&format!("/api/notices/{}", id), Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["title"], "Mid-Term Exam Schedule");

    // Drafts stay off the public board
    let response = app
        .get("/api/public/notices/mid-term-exam-schedule", None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_defaults_and_publish_now() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;

    let response = create(
        &app,
        &token,
        json!({
            "title": "Library closed",
            "description": "Closed for inventory.",
            "status": "published",
        }),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let notice = &response.body["data"];
    assert_eq!(notice["priority"], "medium");
    assert!(notice["publish_at"].is_string());

    let response = app.get("/api/public/notices/library-closed", None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_records_author() {
    let app = common::create_test_app().await;
    let token = app.editor_token().await;

    let response = create(
        &app,
        &token,
        json!({ "title": "Authored", "description": "By the editor." }),
    )
    .await;
    let id = response.body["data"]["id"].as_i64().unwrap();

    let stored = app.state.db.get_notice(id).await.unwrap().unwrap();
    let editor = app
        .state
        .db
        .get_user_by_username(common::EDITOR_USERNAME)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.created_by, Some(editor.id));
}

#[tokio::test]
async fn test_markup_is_escaped() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;

    let response = create(
        &app,
        &token,
        json!({
            "title": "<script>alert('x')</script> Fees",
            "description": "<img src=x onerror=alert(1)> & more",
        }),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let notice = &response.body["data"];
    assert_eq!(
        notice["title"],
        "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt; Fees"
    );
    assert_eq!(
        notice["description"],
        "&lt;img src=x onerror=alert(1)&gt; &amp; more"
    );
    // Slug comes from the raw title and carries no markup characters
    assert_eq!(notice["slug"], "script-alert-x-script-fees");
}

#[tokio::test]
async fn test_duplicate_titles_get_distinct_slugs() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;
    let body = json!({ "title": "Sports Day", "description": "On the field." });

    let first = create(&app, &token, body.clone()).await;
    let second = create(&app, &token, body.clone()).await;
    let third = create(&app, &token, body).await;

    assert_eq!(first.body["data"]["slug"], "sports-day");
    assert_eq!(second.body["data"]["slug"], "sports-day-2");
    assert_eq!(third.body["data"]["slug"], "sports-day-3");
}

#[tokio::test]
async fn test_concurrent_creates_with_same_title_all_succeed() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;
    let body = json!({ "title": "Exam schedule", "description": "Posted twice at once." });

    for _ in 0..3 {
        let (a, b) = tokio::join!(
            create(&app, &token, body.clone()),
            create(&app, &token, body.clone()),
        );
        assert_eq!(a.status, StatusCode::CREATED, "{}", a.body);
        assert_eq!(b.status, StatusCode::CREATED, "{}", b.body);
        assert_ne!(a.body["data"]["slug"], b.body["data"]["slug"]);
    }

    let response = app
        .get("/api/notices?per_page=100", Some(&token))
        .await;
    let mut slugs: Vec<String> = response.body["data"]["notices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["slug"].as_str().unwrap().to_string())
        .collect();
    slugs.sort();
    assert_eq!(
        slugs,
        [
            "exam-schedule",
            "exam-schedule-2",
            "exam-schedule-3",
            "exam-schedule-4",
            "exam-schedule-5",
            "exam-schedule-6",
        ]
    );
}

#[tokio::test]
async fn test_create_validation() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;

    let cases = [
        json!({ "title": "", "description": "x" }),
        json!({ "title": "x".repeat(201), "description": "x" }),
        json!({ "title": "Ok", "description": "" }),
        json!({ "title": "Ok", "description": "x".repeat(20001) }),
    ];
    for body in cases {
        let response = create(&app, &token, body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "validation_error");
    }

    // Passes length checks but is blank once cleaned
    let response = create(&app, &token, json!({ "title": "   ", "description": "x" })).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = create(
        &app,
        &token,
        json!({ "title": "Ok", "description": "x", "priority": "critical" }),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "bad_request");

    let response = create(
        &app,
        &token,
        json!({ "title": "Ok", "description": "x", "image_url": "javascript:alert(1)" }),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let attachments: Vec<Value> = (0..21)
        .map(|i| {
            json!({
                "url": format!("/uploads/{}.pdf", i),
                "name": "file.pdf",
                "mime_type": "application/pdf",
                "size": 1,
            })
        })
        .collect();
    let response = create(
        &app,
        &token,
        json!({ "title": "Ok", "description": "x", "attachments": attachments }),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_error");
}

#[tokio::test]
async fn test_update_fields_and_keep_slug() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;
    let notice = app
        .insert_notice("Bus timings", Priority::Low, NoticeStatus::Draft, None)
        .await;
    let uri = format!("/api/notices/{}", notice.id);

    let response = app
        .put(
            &uri,
            Some(&token),
            json!({
                "title": "Revised bus timings",
                "priority": "high",
                "image_url": "/uploads/abc123.png",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Notice updated");

    let data = &response.body["data"];
    assert_eq!(data["title"], "Revised bus timings");
    assert_eq!(data["priority"], "high");
    assert_eq!(data["slug"], "bus-timings");
    assert_eq!(data["image_url"], "/uploads/abc123.png");
    // Untouched fields survive
    assert_eq!(data["description"], "Details about Bus timings");

    // Explicit null clears; absent leaves alone
    let response = app
        .put(&uri, Some(&token), json!({ "image_url": null }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["data"]["image_url"].is_null());
    assert_eq!(response.body["data"]["title"], "Revised bus timings");
}

#[tokio::test]
async fn test_publishing_sets_publish_time() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;
    let notice = app
        .insert_notice("Holiday", Priority::Medium, NoticeStatus::Draft, None)
        .await;
    let uri = format!("/api/notices/{}", notice.id);

    let response = app
        .put(&uri, Some(&token), json!({ "status": "published" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "published");
    assert!(response.body["data"]["publish_at"].is_string());

    let response = app.get("/api/public/notices/holiday", None).await;
    assert_eq!(response.status, StatusCode::OK);

    // A scheduled time hides it again until then
    let later = noticeboard::time_utils::format_utc_rfc3339(common::hours_from_now(24));
    let response = app
        .put(&uri, Some(&token), json!({ "publish_at": later }))
        .await;
    assert_eq!(response.body["data"]["publish_at"], later);

    let response = app.get("/api/public/notices/holiday", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_validation_and_missing() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;
    let notice = app
        .insert_notice("Canteen menu", Priority::Low, NoticeStatus::Draft, None)
        .await;

    let response = app
        .put(
            &format!("/api/notices/{}", notice.id),
            Some(&token),
            json!({ "title": "" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .put("/api/notices/9999", Some(&token), json!({ "title": "x" }))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_and_unknown_ids() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;

    for uri in ["/api/notices/abc", "/api/notices/0", "/api/notices/-3"] {
        let response = app.get(uri, Some(&token)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(response.body["success"], false);
    }

    let response = app.get("/api/notices/424242", Some(&token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "not_found");

    let response = app.delete("/api/notices/424242", Some(&token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_notice() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;
    let notice = app
        .publish("Old notice", Priority::Low, common::hours_from_now(-5))
        .await;
    let uri = format!("/api/notices/{}", notice.id);

    let response = app.delete(&uri, Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["id"], notice.id);
    assert_eq!(response.body["data"]["removed_files"], 0);

    let response = app.get(&uri, Some(&token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get("/api/public/notices/old-notice", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_listing_includes_drafts_and_paginates() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;
    for i in 0..5 {
        app.insert_notice(
            &format!("Draft {}", i),
            Priority::Low,
            NoticeStatus::Draft,
            None,
        )
        .await;
    }
    for i in 0..3 {
        app.publish(
            &format!("Published {}", i),
            Priority::High,
            common::hours_from_now(-1),
        )
        .await;
    }

    let response = app
        .get("/api/notices?page=2&per_page=3", Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["notices"].as_array().unwrap().len(), 3);
    assert_eq!(data["pagination"]["total"], 8);
    assert_eq!(data["pagination"]["total_pages"], 3);
    assert_eq!(data["pagination"]["has_next"], true);
    assert_eq!(data["pagination"]["has_prev"], true);

    let response = app
        .get("/api/notices?status=draft&per_page=1000", Some(&token))
        .await;
    assert_eq!(response.body["data"]["pagination"]["total"], 5);
    assert_eq!(response.body["data"]["pagination"]["per_page"], 100);

    let response = app
        .get("/api/notices?priority=high&search=published", Some(&token))
        .await;
    assert_eq!(response.body["data"]["pagination"]["total"], 3);

    let response = app.get("/api/notices?page=0", Some(&token)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_search_is_literal() {
    let app = common::create_test_app().await;
    let token = app.admin_token().await;
    app.insert_notice("50% off uniforms", Priority::Low, NoticeStatus::Draft, None)
        .await;
    app.insert_notice("Fifty students", Priority::Low, NoticeStatus::Draft, None)
        .await;
    app.insert_notice("file_name rules", Priority::Low, NoticeStatus::Draft, None)
        .await;
    app.insert_notice("filename policy", Priority::Low, NoticeStatus::Draft, None)
        .await;

    let response = app
        .get("/api/notices/search?q=%25%20off", Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let results = response.body["data"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "50% off uniforms");

    // `_` matches only itself
    let response = app
        .get("/api/notices/search?q=file_", Some(&token))
        .await;
    let results = response.body["data"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "file_name rules");

    let response = app
        .get(
            "/api/notices/search?q=%27%3B%20DROP%20TABLE%20notices%3B%20--",
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["data"].as_array().unwrap().is_empty());

    // The table is still there
    let response = app.get("/api/notices", Some(&token)).await;
    assert_eq!(response.body["data"]["pagination"]["total"], 4);

    let response = app.get("/api/notices/search?q=%20x%20", Some(&token)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
