mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use marketplace_backend::build_router;
use marketplace_backend::services::auth::create_access_token;
use serde_json::Value;
use tower::ServiceExt;

use crate::common::test_state;

/// Health probe answers with service metadata
#[tokio::test]
async fn test_health_endpoint() {
    let app = build_router(test_state());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json.get("version").is_some());
}

/// Protected endpoints reject anonymous callers before touching the DB
#[tokio::test]
async fn test_me_requires_authentication() {
    let app = build_router(test_state());

    let response = app
        .oneshot(Request::builder().uri("/auth/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_rejects_garbage_token() {
    let app = build_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::AUTHORIZATION, "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// A token minted with a different secret never authenticates
#[tokio::test]
async fn test_me_rejects_foreign_token() {
    let app = build_router(test_state());

    let token = create_access_token(1, "mallory", "regular", "other-secret", 30).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Unauthenticated order history degrades to an empty list, not an error
#[tokio::test]
async fn test_anonymous_order_history_is_empty() {
    let app = build_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/orders/my-orders")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["orders"].as_array().unwrap().len(), 0);
}

/// Upload links fail loudly when Cloudflare is not configured
#[tokio::test]
async fn test_upload_link_unconfigured() {
    let app = build_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/r2_link")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("Cloudflare"));
}

/// Google sign-in reports a configuration error rather than redirecting nowhere
#[tokio::test]
async fn test_google_login_unconfigured() {
    let app = build_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/google/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

/// Logout clears the session cookie even without a session
#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = build_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(set_cookie.contains("access_token="));
    assert!(set_cookie.contains("Max-Age=0"));
}

/// Registration validation runs before any database work
#[tokio::test]
async fn test_register_validates_payload() {
    let app = build_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"username":"bad name!","email":"a@b.com","password":"password123"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Listing creation rejects a malformed IMEI before auth-independent work
#[tokio::test]
async fn test_create_listing_requires_auth() {
    let app = build_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/iphone")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"imei":"356901450728885","battery":90}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Frontend pages are served from the static directory
#[tokio::test]
async fn test_index_page_served() {
    let app = build_router(test_state());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("<!DOCTYPE html>"));
}
