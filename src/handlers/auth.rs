//! Account registration, login, token refresh and profile endpoints
//!
//! Sessions are JWT cookies; login is rate limited per username to slow
//! down credential stuffing.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::AppendHeaders,
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::entities::{prelude::*, users};
use crate::models::user::{
    ErrorResponse, LoginRequest, PublicUser, RegisterRequest, SellerProfile, TokenResponse,
};
use crate::services::auth::{
    clear_session_cookie, create_access_token, hash_password, require_user, session_cookie,
    verify_password,
};
use crate::AppState;

use super::{bad_request, db_error, not_found};

const MAX_USERNAME_LENGTH: usize = 50;
const MAX_EMAIL_LENGTH: usize = 150;
const MIN_PASSWORD_LENGTH: usize = 8;

/// Max login attempts per username per minute
const LOGIN_ATTEMPTS_PER_MINUTE: usize = 10;

/// Per-username login attempt tracking
struct LoginRateLimiter {
    attempts: HashMap<String, Vec<Instant>>,
}

impl LoginRateLimiter {
    fn new() -> Self {
        Self {
            attempts: HashMap::new(),
        }
    }

    /// Record an attempt and report whether it is allowed
    fn check_and_record(&mut self, username: &str) -> bool {
        let now = Instant::now();
        let one_minute_ago = now - std::time::Duration::from_secs(60);

        let timestamps = self.attempts.entry(username.to_string()).or_default();
        timestamps.retain(|t| *t > one_minute_ago);

        if timestamps.len() >= LOGIN_ATTEMPTS_PER_MINUTE {
            return false;
        }

        timestamps.push(now);
        true
    }

    fn cleanup_stale(&mut self) {
        let one_minute_ago = Instant::now() - std::time::Duration::from_secs(60);
        self.attempts.retain(|_, timestamps| {
            timestamps.retain(|t| *t > one_minute_ago);
            !timestamps.is_empty()
        });
    }
}

lazy_static::lazy_static! {
    static ref LOGIN_RATE_LIMITER: Arc<Mutex<LoginRateLimiter>> =
        Arc::new(Mutex::new(LoginRateLimiter::new()));
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, Json<ErrorResponse>)> {
    validate_register_request(&payload)?;

    let existing_by_name = Users::find()
        .filter(users::Column::Username.eq(&payload.username))
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if existing_by_name.is_some() {
        return Err(bad_request("A user with this username already exists"));
    }

    let existing_by_email = Users::find()
        .filter(users::Column::Email.eq(&payload.email))
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if existing_by_email.is_some() {
        return Err(bad_request("A user with this email already exists"));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        warn!(error = %e, "Password hashing failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Registration failed".to_string(),
            }),
        )
    })?;

    let new_user = users::ActiveModel {
        username: Set(payload.username.clone()),
        email: Set(payload.email.clone()),
        hashed_password: Set(Some(hashed)),
        user_type: Set("regular".to_string()),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(db_error)?;

    info!(user_id = user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /auth/token
///
/// Issues a bearer token and sets it as the `access_token` cookie. Accepts
/// the username field holding either a username or an email.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<
    (AppendHeaders<[(header::HeaderName, String); 1]>, Json<TokenResponse>),
    (StatusCode, Json<ErrorResponse>),
> {
    {
        let mut limiter = LOGIN_RATE_LIMITER.lock().await;
        if !limiter.check_and_record(&payload.username) {
            warn!(username = %payload.username, "Login rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse {
                    error: "Too many login attempts, try again in a minute".to_string(),
                }),
            ));
        }
        limiter.cleanup_stale();
    }

    let user = if payload.username.contains('@') {
        Users::find()
            .filter(users::Column::Email.eq(&payload.username))
            .one(&state.db)
            .await
    } else {
        Users::find()
            .filter(users::Column::Username.eq(&payload.username))
            .one(&state.db)
            .await
    }
    .map_err(db_error)?;

    let invalid_credentials = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Incorrect username or password".to_string(),
            }),
        )
    };

    let user = user.ok_or_else(invalid_credentials)?;

    let hashed = user
        .hashed_password
        .as_deref()
        .ok_or_else(invalid_credentials)?;
    if !verify_password(&payload.password, hashed) {
        warn!(username = %payload.username, "Invalid password");
        return Err(invalid_credentials());
    }

    let token = issue_token(&state, &user)?;

    info!(user_id = user.id, username = %user.username, "User logged in");

    Ok((
        AppendHeaders([(header::SET_COOKIE, session_cookie(&token))]),
        Json(TokenResponse::bearer(token)),
    ))
}

/// POST /auth/refresh
///
/// Re-issues the session token for a caller whose current token is still
/// valid, pushing the expiry forward.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<
    (AppendHeaders<[(header::HeaderName, String); 1]>, Json<TokenResponse>),
    (StatusCode, Json<ErrorResponse>),
> {
    let current = require_user(&headers, &state.config.secret_key)?;

    let user = Users::find_by_id(current.user_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Account no longer exists".to_string(),
                }),
            )
        })?;

    let token = issue_token(&state, &user)?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, session_cookie(&token))]),
        Json(TokenResponse::bearer(token)),
    ))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PublicUser>, (StatusCode, Json<ErrorResponse>)> {
    let current = require_user(&headers, &state.config.secret_key)?;

    let user = Users::find_by_id(current.user_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("User not found"))?;

    Ok(Json(user.into()))
}

/// POST /auth/logout
pub async fn logout() -> (
    AppendHeaders<[(header::HeaderName, String); 1]>,
    Json<serde_json::Value>,
) {
    (
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Json(serde_json::json!({ "success": true })),
    )
}

/// GET /auth/users/{username} - public seller profile
pub async fn public_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<SellerProfile>, (StatusCode, Json<ErrorResponse>)> {
    let user = Users::find()
        .filter(users::Column::Username.eq(&username))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("User not found"))?;

    Ok(Json(user.into()))
}

fn issue_token(
    state: &AppState,
    user: &users::Model,
) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    create_access_token(
        user.id,
        &user.username,
        &user.user_type,
        &state.config.secret_key,
        state.config.access_token_expire_minutes,
    )
    .map_err(|e| {
        warn!(error = %e, "Token creation failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to create session token".to_string(),
            }),
        )
    })
}

fn validate_register_request(
    req: &RegisterRequest,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if req.username.is_empty() {
        return Err(bad_request("Username cannot be empty"));
    }
    if req.username.len() > MAX_USERNAME_LENGTH {
        return Err(bad_request(format!(
            "Username cannot exceed {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if !req
        .username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(bad_request(
            "Username may only contain letters, digits, '-' and '_'",
        ));
    }

    if req.email.is_empty() || !req.email.contains('@') || req.email.len() > MAX_EMAIL_LENGTH {
        return Err(bad_request("A valid email address is required"));
    }

    if req.password.len() < MIN_PASSWORD_LENGTH {
        return Err(bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_validate_empty_username() {
        let result = validate_register_request(&make_request("", "a@b.com", "password123"));
        assert!(result.is_err());
        let (status, _) = result.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validate_username_too_long() {
        let long = "a".repeat(MAX_USERNAME_LENGTH + 1);
        assert!(validate_register_request(&make_request(&long, "a@b.com", "password123")).is_err());
    }

    #[test]
    fn test_validate_username_bad_characters() {
        assert!(
            validate_register_request(&make_request("bad name!", "a@b.com", "password123"))
                .is_err()
        );
    }

    #[test]
    fn test_validate_bad_email() {
        assert!(validate_register_request(&make_request("alice", "nope", "password123")).is_err());
    }

    #[test]
    fn test_validate_short_password() {
        assert!(validate_register_request(&make_request("alice", "a@b.com", "short")).is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        assert!(validate_register_request(&make_request("alice", "a@b.com", "password123")).is_ok());
    }

    #[test]
    fn test_login_rate_limiter() {
        let mut limiter = LoginRateLimiter::new();
        for _ in 0..LOGIN_ATTEMPTS_PER_MINUTE {
            assert!(limiter.check_and_record("alice"));
        }
        assert!(!limiter.check_and_record("alice"));
        // Other usernames are unaffected
        assert!(limiter.check_and_record("bob"));
    }
}
