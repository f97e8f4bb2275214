//! Google OAuth sign-in endpoints
//!
//! `/auth/google/login` sends the browser to the consent screen;
//! `/auth/google/callback` exchanges the returned code, finds or creates
//! the account and sets the session cookie before bouncing back to the
//! frontend.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::entities::{prelude::*, users};
use crate::models::user::ErrorResponse;
use crate::services::auth::{create_access_token, session_cookie};
use crate::services::google_oauth::GoogleUserInfo;
use crate::AppState;

use super::db_error;

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/google/login
pub async fn google_login(
    State(state): State<AppState>,
) -> Result<Redirect, (StatusCode, Json<ErrorResponse>)> {
    let state_token = uuid::Uuid::new_v4().to_string();

    let url = state.google_oauth.authorize_url(&state_token).ok_or_else(|| {
        error!("Google OAuth requested but not configured");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Google sign-in is not configured".to_string(),
            }),
        )
    })?;

    Ok(Redirect::temporary(&url))
}

/// GET /auth/google/callback
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    if let Some(e) = query.error {
        warn!(error = %e, "Google OAuth denied");
        return Ok(Redirect::to(&state.config.frontend_url).into_response());
    }

    let code = query.code.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Missing authorization code".to_string(),
            }),
        )
    })?;

    let profile = state.google_oauth.fetch_user(&code).await.map_err(|e| {
        error!(error = %e, "Google code exchange failed");
        (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: "Google sign-in failed".to_string(),
            }),
        )
    })?;

    let user = find_or_create_user(&state, &profile).await?;

    let token = create_access_token(
        user.id,
        &user.username,
        &user.user_type,
        &state.config.secret_key,
        state.config.access_token_expire_minutes,
    )
    .map_err(|e| {
        error!(error = %e, "Token creation failed after OAuth");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to create session token".to_string(),
            }),
        )
    })?;

    info!(user_id = user.id, username = %user.username, "OAuth sign-in complete");

    let mut response = Redirect::to(&state.config.frontend_url).into_response();
    if let Ok(value) = session_cookie(&token).parse() {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}

/// Match by Google subject id first, then link by email, else create a
/// fresh account with a username derived from the email local part.
async fn find_or_create_user(
    state: &AppState,
    profile: &GoogleUserInfo,
) -> Result<users::Model, (StatusCode, Json<ErrorResponse>)> {
    if let Some(user) = Users::find()
        .filter(users::Column::GoogleId.eq(&profile.sub))
        .one(&state.db)
        .await
        .map_err(db_error)?
    {
        return Ok(user);
    }

    if let Some(user) = Users::find()
        .filter(users::Column::Email.eq(&profile.email))
        .one(&state.db)
        .await
        .map_err(db_error)?
    {
        // Existing local account; attach the Google identity
        let mut active = user.into_active_model();
        active.google_id = Set(Some(profile.sub.clone()));
        let user = active.update(&state.db).await.map_err(db_error)?;
        return Ok(user);
    }

    let username = pick_username(state, &profile.email).await?;

    let new_user = users::ActiveModel {
        username: Set(username),
        email: Set(profile.email.clone()),
        hashed_password: Set(None),
        name: Set(profile.given_name.clone()),
        surname: Set(profile.family_name.clone()),
        google_id: Set(Some(profile.sub.clone())),
        user_type: Set("regular".to_string()),
        ..Default::default()
    };

    new_user.insert(&state.db).await.map_err(db_error)
}

/// Derive a free username from the email local part, suffixing a counter
/// when taken.
async fn pick_username(
    state: &AppState,
    email: &str,
) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    let base = sanitize_username(email.split('@').next().unwrap_or("user"));

    for attempt in 0..100u32 {
        let candidate = if attempt == 0 {
            base.clone()
        } else {
            format!("{}{}", base, attempt)
        };

        let taken = Users::find()
            .filter(users::Column::Username.eq(&candidate))
            .one(&state.db)
            .await
            .map_err(db_error)?
            .is_some();

        if !taken {
            return Ok(candidate);
        }
    }

    // Extremely crowded namespace; fall back to a random suffix
    Ok(format!("{}-{}", base, &uuid::Uuid::new_v4().to_string()[..8]))
}

fn sanitize_username(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .take(40)
        .collect();
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_username_strips_symbols() {
        assert_eq!(sanitize_username("john.doe+spam"), "johndoespam");
        assert_eq!(sanitize_username("alice_b-c"), "alice_b-c");
    }

    #[test]
    fn test_sanitize_username_empty_falls_back() {
        assert_eq!(sanitize_username("...."), "user");
    }

    #[test]
    fn test_sanitize_username_truncates() {
        let long = "a".repeat(80);
        assert_eq!(sanitize_username(&long).len(), 40);
    }
}
