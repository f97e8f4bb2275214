//! Session tokens and password hashing
//!
//! HS256 JWTs carry the user id, username and account type; handlers accept
//! the token either from the `access_token` cookie (set by the login
//! endpoints) or from an `Authorization: Bearer` header.

use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::user::ErrorResponse;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub username: String,
    pub user_type: String,
    pub exp: i64,
}

/// Authenticated caller identity decoded from a request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i32,
    pub username: String,
    pub user_type: String,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            user_type: claims.user_type,
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    verify(password, hashed).unwrap_or(false)
}

pub fn create_access_token(
    user_id: i32,
    username: &str,
    user_type: &str,
    secret: &str,
    expire_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        user_id,
        username: username.to_string(),
        user_type: user_type.to_string(),
        exp: (Utc::now() + Duration::minutes(expire_minutes)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_access_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Pull the session token out of the cookie header or a bearer header
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        for pair in cookie_header.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            if parts.next() == Some(ACCESS_TOKEN_COOKIE) {
                if let Some(value) = parts.next() {
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// `Set-Cookie` value for a fresh session token
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        ACCESS_TOKEN_COOKIE, token
    )
}

/// `Set-Cookie` value that expires the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; Max-Age=0", ACCESS_TOKEN_COOKIE)
}

/// Decode the caller identity, or fail with 401
pub fn require_user(
    headers: &HeaderMap,
    secret: &str,
) -> Result<CurrentUser, (StatusCode, Json<ErrorResponse>)> {
    let token = extract_token(headers).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Not authenticated".to_string(),
            }),
        )
    })?;

    let claims = decode_access_token(&token, secret).map_err(|e| {
        tracing::warn!(error = %e, "Rejected session token");
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid or expired token".to_string(),
            }),
        )
    })?;

    Ok(claims.into())
}

/// Decode the caller identity when present; anonymous callers get None
pub fn optional_user(headers: &HeaderMap, secret: &str) -> Option<CurrentUser> {
    let token = extract_token(headers)?;
    decode_access_token(&token, secret).ok().map(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_password_hash_round_trip() {
        let hashed = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hashed));
        assert!(!verify_password("hunter3", &hashed));
    }

    #[test]
    fn test_token_round_trip() {
        let token = create_access_token(42, "alice", "regular", SECRET, 30).unwrap();
        let claims = decode_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.user_type, "regular");
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let token = create_access_token(42, "alice", "regular", SECRET, 30).unwrap();
        assert!(decode_access_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = create_access_token(42, "alice", "regular", SECRET, -5).unwrap();
        assert!(decode_access_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=abc.def.ghi"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_token_missing() {
        let headers = HeaderMap::new();
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn test_require_user_rejects_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer not-a-token"),
        );
        let result = require_user(&headers, SECRET);
        assert!(result.is_err());
        let (status, _) = result.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
