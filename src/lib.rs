// src/lib.rs

use axum::{
    routing::{get, patch, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::AppConfig;
use services::chat_manager::ChatManager;
use services::cloudflare::CloudflareImagesService;
use services::google_oauth::GoogleOAuthService;
use services::imei::ImeiService;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub imei: ImeiService,
    pub cloudflare: CloudflareImagesService,
    pub google_oauth: GoogleOAuthService,
    pub chat_manager: Arc<ChatManager>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let imei = ImeiService::new(config.imei_api_key.clone(), config.imei_api_base.clone());
        let cloudflare = CloudflareImagesService::new(
            config.cf_api_token.clone(),
            config.cf_account_hash.clone(),
            config.cf_api_base.clone(),
            config.cf_image_delivery_url.clone(),
        );
        let google_oauth = GoogleOAuthService::new(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            config.google_redirect_uri.clone(),
        );

        Self {
            db,
            config: Arc::new(config),
            imei,
            cloudflare,
            google_oauth,
            chat_manager: Arc::new(ChatManager::new()),
        }
    }
}

pub mod config;

pub mod entities {
    pub mod prelude;
    pub mod chats;
    pub mod listing_views;
    pub mod listings;
    pub mod messages;
    pub mod orders;
    pub mod users;
}

pub mod services {
    pub mod auth;
    pub mod chat_manager;
    pub mod cloudflare;
    pub mod google_oauth;
    pub mod imei;
    pub mod seller_stats;
}

pub mod models;
pub mod handlers;

/// Full application router: auth, listings, orders, chat and frontend
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/token", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/users/{username}", get(handlers::auth::public_profile))
        .route("/auth/google/login", get(handlers::oauth::google_login))
        .route("/auth/google/callback", get(handlers::oauth::google_callback));

    let listing_routes = Router::new()
        .route("/api/v1/r2_link", get(handlers::listing::direct_upload_link))
        .route(
            "/api/v1/iphone",
            post(handlers::listing::create_listing).get(handlers::listing::get_listing),
        )
        .route(
            "/api/v1/iphone/{id}",
            patch(handlers::listing::update_listing).delete(handlers::listing::delete_listing),
        )
        .route("/api/v1/iphones", get(handlers::listing::list_listings))
        .route("/api/v1/my-posts", get(handlers::listing::my_posts));

    let order_routes = Router::new()
        .route("/api/v1/orders/create", post(handlers::order::create_order))
        .route("/api/v1/orders/pay", post(handlers::order::pay_order))
        .route("/api/v1/orders/ship", post(handlers::order::ship_order))
        .route("/api/v1/orders/deliver", post(handlers::order::deliver_order))
        .route("/api/v1/orders/confirm", post(handlers::order::confirm_order))
        .route("/api/v1/orders/refund", post(handlers::order::refund_order))
        .route("/api/v1/orders/my-orders", get(handlers::order::my_orders))
        .route("/api/v1/orders/my-sales", get(handlers::order::my_sales))
        .route("/api/v1/orders/details", get(handlers::order::order_details));

    let chat_routes = Router::new()
        .route("/api/chat/chats", post(handlers::chat::create_chat))
        .route("/api/chat/chats/find", get(handlers::chat::find_chat))
        .route("/api/chat/chats/my", get(handlers::chat::my_chats))
        .route(
            "/api/chat/chats/seller/{seller_id}/grouped",
            get(handlers::chat::seller_chats_grouped),
        )
        .route("/api/chat/chats/{id}/info", get(handlers::chat::chat_info))
        .route(
            "/api/chat/chats/{id}",
            get(handlers::chat::chat_with_messages).delete(handlers::chat::delete_chat),
        )
        .route(
            "/api/chat/chats/{id}/messages",
            get(handlers::chat::get_chat_messages).post(handlers::chat::post_message),
        )
        .route("/api/chat/chats/{id}/read", post(handlers::chat::mark_read))
        .route("/api/chat/ws/{chat_id}", get(handlers::chat_ws::chat_websocket));

    Router::new()
        .merge(auth_routes)
        .merge(listing_routes)
        .merge(order_routes)
        .merge(chat_routes)
        .merge(handlers::frontend::frontend_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
