//! Frontend page routes
//!
//! Pages are static HTML shipped from `static/`; dynamic data reaches
//! them through the JSON API. `/health` is the liveness probe.

use axum::{routing::get, Json, Router};
use tower_http::services::{ServeDir, ServeFile};

use crate::AppState;

pub fn frontend_router() -> Router<AppState> {
    Router::new()
        .route_service("/", ServeFile::new("static/index.html"))
        .route_service("/product", ServeFile::new("static/product.html"))
        .route_service("/seller", ServeFile::new("static/seller.html"))
        .route_service("/profile", ServeFile::new("static/profile.html"))
        .route_service("/post-ad", ServeFile::new("static/post-ad.html"))
        .route_service("/chat", ServeFile::new("static/chat.html"))
        .nest_service("/static", ServeDir::new("static"))
        .route("/health", get(health))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
