//! OpenAI-compatible Client
//!
//! Text goes through the Responses endpoint (with optional file inputs and a
//! `file_search` tool over a vector store), portraits through the Images
//! endpoints. Any server speaking the same wire format works via `base_url`.

use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{BioRequest, ImageGenerator, ImageRequest, LlmError, Result, TextGenerator};
use crate::config::AiConfig;
use crate::core::credentials::CredentialResolver;

pub struct OpenAiClient {
    base_url: String,
    text_model: String,
    image_model: String,
    image_size: String,
    credentials: CredentialResolver,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: &AiConfig, credentials: CredentialResolver) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            image_size: config.image_size.clone(),
            credentials,
            client,
        })
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let api_key = self.credentials.api_key().await?;
        Ok(builder.bearer_auth(api_key))
    }

    fn build_text_body(&self, request: &BioRequest) -> serde_json::Value {
        let mut content = vec![serde_json::json!({
            "type": "input_text",
            "text": request.prompt,
        })];
        content.extend(request.reference_documents.iter().map(|id| {
            serde_json::json!({ "type": "input_file", "file_id": id })
        }));

        let mut body = serde_json::json!({
            "model": self.text_model,
            "input": [{ "role": "user", "content": content }],
        });

        if let Some(kb) = &request.knowledge_base {
            body["tools"] = serde_json::json!([{
                "type": "file_search",
                "vector_store_ids": [kb],
            }]);
        }

        body
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: &BioRequest) -> Result<String> {
        let body = self.build_text_body(request);
        let builder = self.client.post(self.url("responses")).json(&body);

        let start = std::time::Instant::now();
        let resp = self.authorized(builder).await?.send().await?;
        let resp = check_status(resp).await?;
        log::debug!(
            "Text generation answered in {} ms (model {})",
            start.elapsed().as_millis(),
            self.text_model
        );

        let json: serde_json::Value = decode_body(resp).await?;
        extract_output_text(&json).ok_or(LlmError::NoContent)
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>> {
        let builder = match &request.reference_image {
            None => self.client.post(self.url("images/generations")).json(&serde_json::json!({
                "model": self.image_model,
                "prompt": request.prompt,
                "size": self.image_size,
                "n": 1,
            })),
            Some(bytes) => {
                let image = Part::bytes(bytes.clone())
                    .file_name("reference.png")
                    .mime_str("image/png")
                    .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;
                let form = Form::new()
                    .text("model", self.image_model.clone())
                    .text("prompt", request.prompt.clone())
                    .text("size", self.image_size.clone())
                    .part("image", image);
                self.client.post(self.url("images/edits")).multipart(form)
            }
        };

        let resp = self.authorized(builder).await?.send().await?;
        let resp = check_status(resp).await?;
        let parsed: ImagesResponse = decode_body(resp).await?;

        let encoded = parsed
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or(LlmError::NoContent)?;

        BASE64_STANDARD.decode(encoded.trim()).map_err(|e| {
            log::warn!("Image payload was not valid base64: {}", e);
            LlmError::NoContent
        })
    }
}

// ============================================================================
// Wire Helpers
// ============================================================================

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    Err(LlmError::NetworkFailure {
        status: Some(status.as_u16()),
        message,
    })
}

/// Decode a successful response body. A malformed body is missing content,
/// not a transport failure, so it is never retried.
async fn decode_body<T: DeserializeOwned>(resp: Response) -> Result<T> {
    resp.json().await.map_err(|e| {
        log::warn!("AI service returned an undecodable body: {}", e);
        LlmError::NoContent
    })
}

/// Pull the assistant text out of a Responses payload.
///
/// Prefers the `output_text` convenience field, otherwise concatenates every
/// `output_text` part of every message item. Blank text counts as absent.
pub(crate) fn extract_output_text(json: &serde_json::Value) -> Option<String> {
    if let Some(text) = json["output_text"].as_str() {
        if !text.trim().is_empty() {
            return Some(text.to_string());
        }
    }

    let text: String = json["output"]
        .as_array()?
        .iter()
        .filter(|item| item["type"] == "message")
        .filter_map(|item| item["content"].as_array())
        .flatten()
        .filter(|part| part["type"] == "output_text")
        .filter_map(|part| part["text"].as_str())
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
