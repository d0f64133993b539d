//! API Credential Resolution
//!
//! The key is either injected up front (config file or environment) or
//! fetched once from a helper endpoint that hands it out at runtime. Only the
//! AI clients ask for it.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::llm::LlmError;

/// Body returned by the helper endpoint.
#[derive(Debug, Deserialize)]
struct CredentialResponse {
    #[serde(alias = "api_key", alias = "key")]
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

pub struct CredentialResolver {
    injected: Option<String>,
    endpoint: Option<String>,
    client: Client,
    resolved: OnceCell<String>,
}

impl CredentialResolver {
    pub fn new(injected: Option<String>, endpoint: Option<String>) -> Self {
        Self {
            injected: injected
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            resolved: OnceCell::new(),
        }
    }

    /// A resolver that only knows an injected key.
    pub fn injected(key: impl Into<String>) -> Self {
        Self::new(Some(key.into()), None)
    }

    pub fn has_source(&self) -> bool {
        self.injected.is_some() || self.endpoint.is_some()
    }

    /// Resolve the API key, contacting the helper endpoint at most once
    /// successfully.
    pub async fn api_key(&self) -> Result<String, LlmError> {
        if let Some(key) = &self.injected {
            return Ok(key.clone());
        }

        self.resolved
            .get_or_try_init(|| self.fetch_from_endpoint())
            .await
            .cloned()
    }

    async fn fetch_from_endpoint(&self) -> Result<String, LlmError> {
        let Some(endpoint) = &self.endpoint else {
            log::warn!("No API key injected and no credential endpoint configured");
            return Err(LlmError::MissingCredential);
        };

        let resp = self.client.get(endpoint).send().await.map_err(|e| {
            log::warn!("Credential endpoint unreachable: {}", e);
            LlmError::MissingCredential
        })?;

        if !resp.status().is_success() {
            log::warn!("Credential endpoint answered HTTP {}", resp.status());
            return Err(LlmError::MissingCredential);
        }

        let body: CredentialResponse = resp.json().await.map_err(|e| {
            log::warn!("Credential endpoint returned an unexpected body: {}", e);
            LlmError::MissingCredential
        })?;

        match body.api_key.map(|k| k.trim().to_string()) {
            Some(key) if !key.is_empty() => {
                log::info!("Resolved API key from credential endpoint");
                Ok(key)
            }
            _ => Err(LlmError::MissingCredential),
        }
    }
}
