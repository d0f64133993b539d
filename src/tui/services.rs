use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::core::credentials::CredentialResolver;
use crate::core::llm::{ImageGenerator, OpenAiClient, TextGenerator};

use super::events::AppEvent;

/// Centralized handle to the AI clients and app configuration.
///
/// Created once at startup. Clients are behind `Arc` so spawned requests can
/// hold their own handle while the UI keeps running.
pub struct Services {
    pub config: AppConfig,
    pub text: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl Services {
    /// Build the HTTP client from config.
    ///
    /// A missing credential is not fatal here; it surfaces on the first
    /// generation request.
    pub fn init(
        config: AppConfig,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let credentials = CredentialResolver::new(
            config.ai.api_key.clone(),
            config.ai.credential_endpoint.clone(),
        );
        if !credentials.has_source() {
            log::warn!("No API key or credential endpoint configured");
        }

        let client = Arc::new(OpenAiClient::new(&config.ai, credentials)?);
        log::info!(
            "AI client ready ({} / {})",
            client.text_model(),
            config.ai.image_model
        );

        Ok(Self::with_clients(config, client.clone(), client, event_tx))
    }

    /// Assemble services from existing clients.
    pub fn with_clients(
        config: AppConfig,
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            config,
            text,
            images,
            event_tx,
        }
    }
}
