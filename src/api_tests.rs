use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;

use crate::app::build_app;
use crate::config::{AppConfig, JwtConfig};
use crate::state::AppState;

async fn test_app() -> (Router, SqlitePool) {
    // A single connection keeps every request on the same in-memory database.
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("migrations");
    let config = Arc::new(AppConfig {
        database_url: "sqlite::memory:".into(),
        jwt: JwtConfig {
            secret: "test-secret".into(),
            ttl_hours: 1,
        },
    });
    (build_app(AppState::from_parts(db.clone(), config)), db)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, email: &str, password: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": password, "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["token"].as_str().expect("token in response").to_string()
}

async fn create_blog(app: &Router, token: &str, title: &str, content: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/blogs",
        Some(token),
        Some(json!({ "title": title, "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create blog failed: {body}");
    body
}

#[tokio::test]
async fn register_then_login_yields_working_token() {
    let (app, _db) = test_app().await;

    register(&app, "a@x.com", "secret1", "A").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    // The login token resolves to the registered user.
    let blog = create_blog(&app, &token, "Hello", "World").await;
    assert_eq!(blog["author"]["email"], "a@x.com");
    assert_eq!(blog["author"]["name"], "A");
    assert_eq!(blog["author"]["role"], "user");
}

#[tokio::test]
async fn register_validation_failures() {
    let (app, _db) = test_app().await;

    let cases = [
        json!({ "email": "not-an-email", "password": "secret1", "name": "A" }),
        json!({ "email": "a@x.com", "password": "short", "name": "A" }),
        json!({ "email": "a@x.com", "password": "secret1", "name": "  " }),
    ];
    for payload in cases {
        let (status, body) = send(&app, "POST", "/auth/register", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "expected 400: {body}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn register_rejects_duplicate_email_case_insensitively() {
    let (app, _db) = test_app().await;

    register(&app, "a@x.com", "secret1", "A").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "  A@X.COM  ", "password": "secret2", "name": "Also A" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");
}

#[tokio::test]
async fn login_rejects_unknown_email_and_wrong_password() {
    let (app, _db) = test_app().await;

    register(&app, "a@x.com", "secret1", "A").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn blog_lifecycle_with_ownership() {
    let (app, _db) = test_app().await;

    let t1 = register(&app, "a@x.com", "secret1", "A").await;
    let t2 = register(&app, "b@x.com", "secret2", "B").await;

    let blog = create_blog(&app, &t1, "Hi", "World").await;
    let id = blog["id"].as_i64().unwrap();
    assert_eq!(blog["author"]["email"], "a@x.com");
    let created_at = blog["createdAt"].as_str().unwrap().to_string();

    // Another user may not update or delete it, and it stays unchanged.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/blogs/{id}"),
        Some(&t2),
        Some(json!({ "title": "Hijacked", "content": "Nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &format!("/blogs/{id}"), Some(&t2), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Reads are public.
    let (status, body) = send(&app, "GET", &format!("/blogs/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Hi");
    assert_eq!(body["content"], "World");

    // The owner may update; author and createdAt do not move.
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/blogs/{id}"),
        Some(&t1),
        Some(json!({ "title": "Hi again", "content": "Updated" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Hi again");
    assert_eq!(body["content"], "Updated");
    assert_eq!(body["author"]["email"], "a@x.com");
    assert_eq!(body["createdAt"], created_at.as_str());

    // The owner may delete; the record is gone afterwards.
    let (status, body) = send(&app, "DELETE", &format!("/blogs/{id}"), Some(&t1), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, "GET", &format!("/blogs/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mutations_require_a_valid_token() {
    let (app, _db) = test_app().await;

    let payload = json!({ "title": "T", "content": "C" });

    let (status, body) = send(&app, "POST", "/blogs", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please authenticate.");

    let (status, _) = send(&app, "POST", "/blogs", Some("garbage"), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "PUT", "/blogs/1", None, Some(payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "DELETE", "/blogs/1", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_deleted_user_is_rejected() {
    let (app, db) = test_app().await;

    let token = register(&app, "gone@x.com", "secret1", "Gone").await;

    sqlx::query("DELETE FROM users WHERE email = ?")
        .bind("gone@x.com")
        .execute(&db)
        .await
        .expect("delete user");

    let (status, body) = send(
        &app,
        "POST",
        "/blogs",
        Some(&token),
        Some(json!({ "title": "T", "content": "C" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please authenticate.");
}

#[tokio::test]
async fn create_blog_requires_title_and_content() {
    let (app, _db) = test_app().await;

    let token = register(&app, "a@x.com", "secret1", "A").await;

    let cases = [
        json!({ "title": "", "content": "C" }),
        json!({ "title": "T", "content": "   " }),
        json!({ "content": "C" }),
        json!({ "title": "T" }),
    ];
    for payload in cases {
        let (status, body) = send(&app, "POST", "/blogs", Some(&token), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "expected 400: {body}");
    }
}

#[tokio::test]
async fn update_and_delete_missing_blog_return_404() {
    let (app, _db) = test_app().await;

    let token = register(&app, "a@x.com", "secret1", "A").await;

    let (status, body) = send(
        &app,
        "PUT",
        "/blogs/999",
        Some(&token),
        Some(json!({ "title": "T", "content": "C" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Blog not found");

    let (status, _) = send(&app, "DELETE", "/blogs/999", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_paginates_newest_first() {
    let (app, _db) = test_app().await;

    let token = register(&app, "a@x.com", "secret1", "A").await;
    for i in 1..=15 {
        create_blog(&app, &token, &format!("Post {i}"), "Body").await;
    }

    let (status, body) = send(&app, "GET", "/blogs?page=2&size=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"].as_array().unwrap().len(), 5);
    assert_eq!(body["totalElements"], 15);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["size"], 10);
    assert_eq!(body["number"], 2);

    // Newest first on the first page.
    let (_, first_page) = send(&app, "GET", "/blogs?page=1&size=10", None, None).await;
    assert_eq!(first_page["content"].as_array().unwrap().len(), 10);
    assert_eq!(first_page["content"][0]["title"], "Post 15");

    // Defaults apply when no parameters are given.
    let (_, defaults) = send(&app, "GET", "/blogs", None, None).await;
    assert_eq!(defaults["size"], 10);
    assert_eq!(defaults["number"], 1);

    // A page past the data is empty, with totals intact.
    let (status, beyond) = send(&app, "GET", "/blogs?page=99&size=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(beyond["content"].as_array().unwrap().is_empty());
    assert_eq!(beyond["totalElements"], 15);

    // Repeated reads are stable under no intervening writes.
    let (_, again) = send(&app, "GET", "/blogs?page=2&size=10", None, None).await;
    assert_eq!(again, body);
}

#[tokio::test]
async fn listing_empty_database() {
    let (app, _db) = test_app().await;

    let (status, body) = send(&app, "GET", "/blogs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["content"].as_array().unwrap().is_empty());
    assert_eq!(body["totalElements"], 0);
    assert_eq!(body["totalPages"], 0);
}

#[tokio::test]
async fn responses_never_contain_password_hashes() {
    let (app, _db) = test_app().await;

    let token = register(&app, "a@x.com", "secret1", "A").await;
    let blog = create_blog(&app, &token, "Hi", "World").await;
    let id = blog["id"].as_i64().unwrap();

    for uri in ["/blogs".to_string(), format!("/blogs/{id}")] {
        let (_, body) = send(&app, "GET", &uri, None, None).await;
        let raw = body.to_string();
        assert!(!raw.contains("password"), "leaked hash in {uri}: {raw}");
    }
}
