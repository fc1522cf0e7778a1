use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::AccountClient;
use crate::config::AccountConfig;
use crate::error::{Result, RotaError};
use crate::models::ProxyRecord;

/// Account API client over HTTPS with bearer credentials
#[derive(Clone)]
pub struct HttpAccountClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpAccountClient {
    pub fn new(config: &AccountConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("rota-modem/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.request_timeout.max(1)),
        })
    }

    fn proxies_url(&self) -> String {
        format!("{}/proxies", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl AccountClient for HttpAccountClient {
    #[instrument(skip(self, credential))]
    async fn fetch_proxies(&self, credential: &str) -> Result<Vec<ProxyRecord>> {
        if credential.trim().is_empty() {
            return Err(RotaError::MissingCredential);
        }

        let response = self
            .client
            .get(self.proxies_url())
            .bearer_auth(credential.trim())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let proxies = parse_listing(status, &body)?;
        debug!(count = proxies.len(), "Fetched account proxy list");
        Ok(proxies)
    }
}

/// Interpret an account listing response.
///
/// The listing may be a bare array or sit under `data` / `proxies`.
/// Records that fail to deserialize are skipped with a warning.
pub(crate) fn parse_listing(status: StatusCode, body: &str) -> Result<Vec<ProxyRecord>> {
    let json: Option<Value> = serde_json::from_str(body).ok();
    let error_text = json.as_ref().and_then(error_message);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RotaError::AuthenticationInvalid(
            error_text.unwrap_or_else(|| non_empty_or(body, status)),
        ));
    }

    if !status.is_success() {
        return Err(RotaError::AccountApi(
            error_text.unwrap_or_else(|| non_empty_or(body, status)),
        ));
    }

    if let Some(text) = error_text {
        let lowered = text.to_lowercase();
        if lowered.contains("expired") || lowered.contains("unauthorized") || lowered.contains("token") {
            return Err(RotaError::AuthenticationInvalid(text));
        }
        return Err(RotaError::AccountApi(text));
    }

    let json = json.ok_or_else(|| {
        RotaError::AccountApi("account API returned a non-JSON body".to_string())
    })?;

    let items = match &json {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("data")
            .or_else(|| map.get("proxies"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                RotaError::AccountApi("account API response has no proxy list".to_string())
            })?,
        _ => {
            return Err(RotaError::AccountApi(
                "account API response has no proxy list".to_string(),
            ))
        }
    };

    Ok(items
        .iter()
        .filter_map(|item| match serde_json::from_value::<ProxyRecord>(item.clone()) {
            Ok(proxy) => Some(proxy),
            Err(e) => {
                warn!("Skipping malformed proxy record: {}", e);
                None
            }
        })
        .collect())
}

fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn non_empty_or(body: &str, status: StatusCode) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        body.to_string()
    }
}
