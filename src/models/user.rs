use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::users;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// User view returned to the account owner; never carries the password hash
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub phone: Option<String>,
    pub posts_count: i32,
    pub sells_count: i32,
    pub rating: Option<Decimal>,
    pub user_type: String,
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl From<users::Model> for PublicUser {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            surname: user.surname,
            phone: user.phone,
            posts_count: user.posts_count,
            sells_count: user.sells_count,
            rating: user.rating,
            user_type: user.user_type,
            created_at: user.created_at,
        }
    }
}

/// What anyone may see about a seller
#[derive(Debug, Clone, Serialize)]
pub struct SellerProfile {
    pub username: String,
    pub name: Option<String>,
    pub rating: Option<Decimal>,
    pub sells_count: i32,
    pub posts_count: i32,
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl From<users::Model> for SellerProfile {
    fn from(user: users::Model) -> Self {
        Self {
            username: user.username,
            name: user.name,
            rating: user.rating,
            sells_count: user.sells_count,
            posts_count: user.posts_count,
            created_at: user.created_at,
        }
    }
}
