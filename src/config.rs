//! Environment-backed application configuration
//!
//! Everything comes from the process environment (`.env` is loaded by main
//! before this runs). `SECRET_KEY` and `DATABASE_URL` are required; the
//! external integrations (IMEI lookup, Cloudflare Images, Google OAuth) are
//! optional and degrade with a warning when unset.

use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub frontend_url: String,

    /// HS256 signing key for session tokens
    pub secret_key: String,
    pub access_token_expire_minutes: i64,

    pub imei_api_key: Option<String>,
    pub imei_api_base: String,

    pub cf_api_token: Option<String>,
    pub cf_account_hash: Option<String>,
    pub cf_api_base: String,
    pub cf_image_delivery_url: String,

    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_uri: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
        let secret_key =
            env::var("SECRET_KEY").map_err(|_| "SECRET_KEY must be set".to_string())?;

        let host = env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("BACKEND_PORT").unwrap_or_else(|_| "8080".to_string());
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let access_token_expire_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let google_redirect_uri = env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| format!("{}/auth/google/callback", frontend_url));

        Ok(Self {
            database_url,
            bind_addr: format!("{}:{}", host, port),
            frontend_url,
            secret_key,
            access_token_expire_minutes,
            imei_api_key: env::var("IMEI_API_KEY").ok(),
            imei_api_base: env::var("IMEI_API_BASE")
                .unwrap_or_else(|_| "http://api-client.imei.org/api".to_string()),
            cf_api_token: env::var("CF_API_TOKEN").ok(),
            cf_account_hash: env::var("CF_ACCOUNT_HASH").ok(),
            cf_api_base: env::var("CF_BASE_URL").unwrap_or_else(|_| {
                "https://api.cloudflare.com/client/v4/accounts/unset/images/v2".to_string()
            }),
            cf_image_delivery_url: env::var("CF_IMAGE_DELIVERY_URL")
                .unwrap_or_else(|_| "https://imagedelivery.net".to_string()),
            google_client_id: env::var("GOOGLE_CLIENT_ID").ok(),
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET").ok(),
            google_redirect_uri,
        })
    }
}
