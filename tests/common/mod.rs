use marketplace_backend::{config::AppConfig, AppState};
use sea_orm::DatabaseConnection;

/// Config with no external integrations; enough to exercise routes that
/// never reach the database or third-party APIs.
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgresql://unused".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        frontend_url: "http://localhost:8080".to_string(),
        secret_key: "integration-test-secret".to_string(),
        access_token_expire_minutes: 30,
        imei_api_key: None,
        imei_api_base: "http://api-client.imei.org/api".to_string(),
        cf_api_token: None,
        cf_account_hash: None,
        cf_api_base: "https://api.cloudflare.com/client/v4/accounts/unset/images/v2".to_string(),
        cf_image_delivery_url: "https://imagedelivery.net".to_string(),
        google_client_id: None,
        google_client_secret: None,
        google_redirect_uri: "http://localhost:8080/auth/google/callback".to_string(),
    }
}

/// App state over a disconnected database handle
pub fn test_state() -> AppState {
    AppState::new(DatabaseConnection::default(), test_config())
}
