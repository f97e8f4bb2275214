//! Cloudflare Images direct-upload broker
//!
//! The backend never proxies image bytes; it asks Cloudflare for a one-time
//! direct-upload URL and hands it to the client together with the account
//! hash so the client can assemble the public delivery URL after upload.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone)]
pub struct CloudflareImagesService {
    client: Client,
    api_token: Option<String>,
    account_hash: Option<String>,
    api_base: String,
    delivery_base: String,
}

/// One-time upload session returned by Cloudflare
#[derive(Debug, Clone)]
pub struct DirectUpload {
    pub upload_url: String,
    /// Session id; the final image id arrives in the upload response
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct DirectUploadEnvelope {
    result: DirectUploadResult,
    success: bool,
}

#[derive(Debug, Deserialize)]
struct DirectUploadResult {
    #[serde(rename = "uploadURL")]
    upload_url: String,
    id: String,
}

impl CloudflareImagesService {
    pub fn new(
        api_token: Option<String>,
        account_hash: Option<String>,
        api_base: String,
        delivery_base: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_token,
            account_hash,
            api_base,
            delivery_base,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_token.is_some() && self.account_hash.is_some()
    }

    pub fn account_hash(&self) -> Option<&str> {
        self.account_hash.as_deref()
    }

    /// Base URL clients prepend to `{image_id}/public` for delivery
    pub fn image_delivery_base(&self) -> Option<String> {
        self.account_hash
            .as_deref()
            .map(|hash| format!("{}/{}", self.delivery_base, hash))
    }

    /// Request a one-time direct-upload URL from Cloudflare
    pub async fn request_direct_upload(
        &self,
    ) -> Result<DirectUpload, Box<dyn std::error::Error + Send + Sync>> {
        let api_token = self
            .api_token
            .as_deref()
            .ok_or("Cloudflare API token not configured")?;

        let url = format!("{}/direct_upload", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_token)
            .header("content-type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(format!("Cloudflare API error {}: {}", status, error_text).into());
        }

        let envelope: DirectUploadEnvelope = response.json().await?;
        if !envelope.success {
            return Err("Cloudflare rejected the direct-upload request".into());
        }

        tracing::debug!(session_id = %envelope.result.id, "Issued direct-upload URL");

        Ok(DirectUpload {
            upload_url: envelope.result.upload_url,
            id: envelope.result.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(token: Option<&str>, hash: Option<&str>) -> CloudflareImagesService {
        CloudflareImagesService::new(
            token.map(|t| t.to_string()),
            hash.map(|h| h.to_string()),
            "https://api.cloudflare.com/client/v4/accounts/acc/images/v2".to_string(),
            "https://imagedelivery.net".to_string(),
        )
    }

    #[test]
    fn test_is_configured() {
        assert!(service(Some("tok"), Some("hash")).is_configured());
        assert!(!service(None, Some("hash")).is_configured());
        assert!(!service(Some("tok"), None).is_configured());
    }

    #[test]
    fn test_image_delivery_base() {
        assert_eq!(
            service(Some("tok"), Some("abc123")).image_delivery_base().as_deref(),
            Some("https://imagedelivery.net/abc123")
        );
        assert!(service(Some("tok"), None).image_delivery_base().is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_upload_errors() {
        let result = service(None, None).request_direct_upload().await;
        assert!(result.is_err());
    }
}
