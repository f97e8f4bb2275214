//! Google OAuth sign-in
//!
//! Standard authorization-code flow: build the consent URL, exchange the
//! returned code for an access token, then fetch the userinfo profile.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Clone)]
pub struct GoogleOAuthService {
    client: Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

/// Profile fields returned by the userinfo endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    /// Stable Google subject id
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

impl GoogleOAuthService {
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_uri: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Consent-screen URL the browser is redirected to
    pub fn authorize_url(&self, state: &str) -> Option<String> {
        let client_id = self.client_id.as_deref()?;
        Some(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}",
            AUTH_ENDPOINT,
            client_id,
            urlencode(&self.redirect_uri),
            state,
        ))
    }

    /// Exchange the authorization code for the user's profile
    pub async fn fetch_user(
        &self,
        code: &str,
    ) -> Result<GoogleUserInfo, Box<dyn std::error::Error + Send + Sync>> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or("Google OAuth not configured")?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or("Google OAuth not configured")?;

        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(format!("Google token exchange failed {}: {}", status, error_text).into());
        }

        let token: TokenExchangeResponse = response.json().await?;

        let response = self
            .client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(format!("Google userinfo failed {}: {}", status, error_text).into());
        }

        let info: GoogleUserInfo = response.json().await?;
        Ok(info)
    }
}

/// Percent-encode the characters that matter in a query component
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_contains_redirect() {
        let service = GoogleOAuthService::new(
            Some("client-id".to_string()),
            Some("secret".to_string()),
            "http://localhost:8080/auth/google/callback".to_string(),
        );
        let url = service.authorize_url("xyz").unwrap();
        assert!(url.starts_with(AUTH_ENDPOINT));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fgoogle%2Fcallback"));
    }

    #[test]
    fn test_unconfigured_has_no_authorize_url() {
        let service = GoogleOAuthService::new(None, None, "http://localhost".to_string());
        assert!(!service.is_configured());
        assert!(service.authorize_url("xyz").is_none());
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("a b/c"), "a%20b%2Fc");
        assert_eq!(urlencode("safe-._~"), "safe-._~");
    }
}
