//! IMEI lookup client
//!
//! Talks to the third-party IMEI API to pull device facts (model, memory,
//! color, activation and lock status) for a listing. Responses are cached
//! for an hour per IMEI since device facts do not change between retries
//! of the posting form.

use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Service id for the combined device-info check on the provider side
const DEVICE_INFO_SERVICE_ID: u32 = 3;

#[derive(Clone)]
pub struct ImeiService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    cache: Arc<Cache<String, DeviceInfo>>,
}

/// Device facts extracted from a lookup response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: Option<String>,
    pub memory: Option<String>,
    pub color: Option<String>,
    pub serial_number: Option<String>,
    pub activated: Option<bool>,
    pub icloud_lock: Option<bool>,
    pub fmi: Option<bool>,
    pub simlock: Option<bool>,
}

impl ImeiService {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(Duration::from_secs(3600))
            .build();

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url,
            cache: Arc::new(cache),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Look up a device by IMEI. Returns the parsed device facts or an
    /// error describing why the provider call failed.
    pub async fn check_imei(
        &self,
        imei: &str,
    ) -> Result<DeviceInfo, Box<dyn std::error::Error + Send + Sync>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or("IMEI API key not configured")?;

        if let Some(cached) = self.cache.get(imei).await {
            tracing::debug!(imei = %imei, "IMEI cache hit");
            return Ok(cached);
        }

        tracing::info!(imei = %imei, "Submitting IMEI to lookup service");

        let url = format!("{}/submit", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("apikey", api_key),
                ("service_id", &DEVICE_INFO_SERVICE_ID.to_string()),
                ("input", imei),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(format!("IMEI API error {}: {}", status, error_text).into());
        }

        let body: serde_json::Value = response.json().await?;

        if body.get("status").and_then(|s| s.as_i64()) != Some(1) {
            return Err(format!("IMEI lookup rejected: {}", body).into());
        }

        let service_data = body
            .get("response")
            .and_then(|r| r.get("services"))
            .and_then(|s| s.get(0))
            .ok_or("IMEI response carried no service data")?;

        let info = parse_service_data(service_data);

        self.cache.insert(imei.to_string(), info.clone()).await;

        Ok(info)
    }
}

fn parse_service_data(data: &serde_json::Value) -> DeviceInfo {
    let (model, memory, color) = data
        .get("Model")
        .and_then(|m| m.as_str())
        .map(parse_model_string)
        .unwrap_or((None, None, None));

    DeviceInfo {
        model,
        memory,
        color,
        serial_number: data
            .get("Serial Number")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        activated: data.get("Activated").and_then(|v| v.as_bool()),
        icloud_lock: data.get("iCloud").and_then(|v| v.as_bool()),
        fmi: data.get("FMI").and_then(|v| v.as_bool()),
        simlock: data.get("Simlock").and_then(|v| v.as_bool()),
    }
}

/// Split a provider model string like "IPHONE 12 PRO MAX 256GB GRAPHITE
/// [356901450728885]" into model, memory and color. Memory is the first
/// token ending in GB/TB; the model is everything before it and the color
/// everything after it up to the first bracketed annotation.
fn parse_model_string(raw: &str) -> (Option<String>, Option<String>, Option<String>) {
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    let memory_idx = tokens
        .iter()
        .position(|t| t.ends_with("GB") || t.ends_with("TB"));

    let Some(memory_idx) = memory_idx else {
        // No capacity token; treat the whole string (up to any bracket) as the model
        let model: Vec<&str> = tokens
            .iter()
            .take_while(|t| !t.starts_with('['))
            .copied()
            .collect();
        let model = if model.is_empty() {
            None
        } else {
            Some(model.join(" "))
        };
        return (model, None, None);
    };

    let model = if memory_idx == 0 {
        None
    } else {
        Some(tokens[..memory_idx].join(" "))
    };

    let memory = Some(tokens[memory_idx].to_string());

    let color_tokens: Vec<&str> = tokens[memory_idx + 1..]
        .iter()
        .take_while(|t| !t.starts_with('['))
        .copied()
        .collect();
    let color = if color_tokens.is_empty() {
        None
    } else {
        Some(color_tokens.join(" "))
    };

    (model, memory, color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_model_string_full() {
        let (model, memory, color) =
            parse_model_string("IPHONE 12 PRO MAX 256GB GRAPHITE [356901450728885]");
        assert_eq!(model.as_deref(), Some("IPHONE 12 PRO MAX"));
        assert_eq!(memory.as_deref(), Some("256GB"));
        assert_eq!(color.as_deref(), Some("GRAPHITE"));
    }

    #[test]
    fn test_parse_model_string_multi_word_color() {
        let (model, memory, color) = parse_model_string("IPHONE 14 128GB MIDNIGHT BLUE");
        assert_eq!(model.as_deref(), Some("IPHONE 14"));
        assert_eq!(memory.as_deref(), Some("128GB"));
        assert_eq!(color.as_deref(), Some("MIDNIGHT BLUE"));
    }

    #[test]
    fn test_parse_model_string_terabyte() {
        let (model, memory, color) = parse_model_string("IPHONE 15 PRO 1TB NATURAL TITANIUM");
        assert_eq!(model.as_deref(), Some("IPHONE 15 PRO"));
        assert_eq!(memory.as_deref(), Some("1TB"));
        assert_eq!(color.as_deref(), Some("NATURAL TITANIUM"));
    }

    #[test]
    fn test_parse_model_string_no_memory() {
        let (model, memory, color) = parse_model_string("IPHONE SE [x]");
        assert_eq!(model.as_deref(), Some("IPHONE SE"));
        assert!(memory.is_none());
        assert!(color.is_none());
    }

    #[test]
    fn test_parse_service_data() {
        let data = json!({
            "Model": "IPHONE 12 PRO MAX 256GB GRAPHITE [356901450728885]",
            "Activated": true,
            "FMI": false,
            "iCloud": false,
            "Simlock": false,
            "Serial Number": "DX3XK0YQG5K7",
        });
        let info = parse_service_data(&data);
        assert_eq!(info.model.as_deref(), Some("IPHONE 12 PRO MAX"));
        assert_eq!(info.memory.as_deref(), Some("256GB"));
        assert_eq!(info.color.as_deref(), Some("GRAPHITE"));
        assert_eq!(info.serial_number.as_deref(), Some("DX3XK0YQG5K7"));
        assert_eq!(info.activated, Some(true));
        assert_eq!(info.fmi, Some(false));
        assert_eq!(info.icloud_lock, Some(false));
        assert_eq!(info.simlock, Some(false));
    }

    #[test]
    fn test_parse_service_data_missing_fields() {
        let info = parse_service_data(&json!({}));
        assert!(info.model.is_none());
        assert!(info.serial_number.is_none());
        assert!(info.activated.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_service_errors() {
        let service = ImeiService::new(None, "http://localhost".to_string());
        assert!(!service.is_configured());
        assert!(service.check_imei("356901450728885").await.is_err());
    }
}
