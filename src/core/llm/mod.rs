//! AI Client Module
//!
//! Interfaces to the external text and image generation services.
//!
//! # Module Structure
//!
//! - `TextGenerator` / `ImageGenerator`: the traits the orchestrator talks to
//! - `openai`: HTTP implementation against an OpenAI-compatible API

pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("No API key configured")]
    MissingCredential,

    #[error("Network failure{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    NetworkFailure { status: Option<u16>, message: String },

    #[error("The AI service returned no usable content")]
    NoContent,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl LlmError {
    /// Only transport and status failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::NetworkFailure { .. })
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::NetworkFailure {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

// ============================================================================
// Request Types
// ============================================================================

/// A bio generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BioRequest {
    pub prompt: String,
    /// Uploaded reference document ids (setting primers, house rules).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_documents: Vec<String>,
    /// Knowledge base (vector store) id searched by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<String>,
}

impl BioRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_reference_documents(mut self, ids: Vec<String>) -> Self {
        self.reference_documents = ids;
        self
    }

    pub fn with_knowledge_base(mut self, id: impl Into<String>) -> Self {
        self.knowledge_base = Some(id.into());
        self
    }

    /// The payload sent on a given attempt (0-based).
    ///
    /// Each retry sends less: the second attempt drops reference documents,
    /// later attempts also drop the knowledge base.
    pub fn narrowed(&self, attempt: u32) -> BioRequest {
        let mut request = self.clone();
        if attempt >= 1 {
            request.reference_documents.clear();
        }
        if attempt >= 2 {
            request.knowledge_base = None;
        }
        request
    }
}

/// A portrait generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    /// PNG/JPEG bytes to guide the generation (upload or current portrait).
    pub reference_image: Option<Vec<u8>>,
}

// ============================================================================
// Traits
// ============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for the prompt. Returns the raw text blob.
    async fn generate(&self, request: &BioRequest) -> Result<String>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image. Returns the encoded image bytes.
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>>;
}
