//! Generation Orchestrator
//!
//! Drives "capture -> request -> parse -> commit" for bio generation and
//! "request -> display" for portraits. Each operation is split so that the
//! network call never touches session state:
//!
//! 1. `begin_*` takes the operation's latch and snapshots what it needs
//! 2. `request_*` talks to the AI service (retrying bios with a narrower payload)
//! 3. `finish_*` releases the latch and commits the result, or nothing on error
//!
//! `generate_*` runs the three in sequence.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use super::fields::Field;
use super::form::{Portrait, Session};
use super::history::HistoryError;
use super::llm::{BioRequest, ImageGenerator, ImageRequest, LlmError, TextGenerator};
use super::parser::{self, ParseError};
use super::prompt;
use crate::config::AiConfig;

// ============================================================================
// Error Types
// ============================================================================

/// Operation kinds; each has its own in-flight latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Bio,
    Image,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Bio => f.write_str("bio"),
            Operation::Image => f.write_str("portrait"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("A {0} generation is already in progress")]
    Busy(Operation),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("The AI response did not contain any character fields")]
    NoContent,
}

impl GenerationError {
    /// Text for the status bar.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Busy(op) => format!("Still working on the {op}, please wait."),
            GenerationError::Llm(LlmError::MissingCredential) => {
                "No API key found. Set BIOFORGE_API_KEY or configure a credential endpoint.".to_string()
            }
            GenerationError::Llm(LlmError::NetworkFailure { .. }) => {
                format!("Could not reach the AI service: {self}")
            }
            GenerationError::Llm(LlmError::NoContent) | GenerationError::NoContent => {
                "The AI answered without usable content. Try again.".to_string()
            }
            GenerationError::Llm(LlmError::InvalidRequest(msg)) => format!("Request rejected: {msg}"),
            GenerationError::Parse(_) => {
                "The AI response could not be read. Try generating again.".to_string()
            }
            GenerationError::History(e) => format!("Internal error: {e}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;

// ============================================================================
// Retry Policy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Request bio text, retrying network failures with a narrower payload.
pub async fn request_bio(
    client: &dyn TextGenerator,
    request: &BioRequest,
    policy: RetryPolicy,
) -> std::result::Result<String, LlmError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let payload = request.narrowed(attempt);
        match client.generate(&payload).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                attempt += 1;
                let next = request.narrowed(attempt);
                log::warn!(
                    "Bio request failed ({}), attempt {}/{} with {} reference docs, knowledge base: {}",
                    e,
                    attempt + 1,
                    attempts,
                    next.reference_documents.len(),
                    next.knowledge_base.is_some(),
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                log::error!("Bio request failed after {} attempt(s): {}", attempt + 1, e);
                return Err(e);
            }
        }
    }
}

/// Request a portrait. Single attempt.
pub async fn request_image(
    client: &dyn ImageGenerator,
    request: &ImageRequest,
) -> std::result::Result<Vec<u8>, LlmError> {
    client.generate(request).await.map_err(|e| {
        log::error!("Portrait request failed: {}", e);
        e
    })
}

// ============================================================================
// Jobs
// ============================================================================

/// An in-flight bio generation.
#[derive(Debug, Clone)]
pub struct BioJob {
    /// Displayed value of every tracked field when the job started.
    pub originals: BTreeMap<Field, String>,
    pub request: BioRequest,
}

/// An in-flight portrait generation.
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub request: ImageRequest,
}

/// What the portrait request is guided by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    None,
    /// An image supplied by the user.
    Upload(Vec<u8>),
    /// Refine the portrait currently shown.
    Current,
}

impl ImageReference {
    /// Read an uploaded reference image from disk.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(ImageReference::Upload(std::fs::read(path)?))
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// In-flight flag for one operation kind.
#[derive(Debug, Default)]
struct Latch {
    held: bool,
}

impl Latch {
    fn acquire(&mut self) -> bool {
        !std::mem::replace(&mut self.held, true)
    }

    fn release(&mut self) {
        self.held = false;
    }
}

#[derive(Debug, Default)]
pub struct Orchestrator {
    bio_latch: Latch,
    image_latch: Latch,
    policy: RetryPolicy,
    reference_documents: Vec<String>,
    knowledge_base: Option<String>,
}

impl Orchestrator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            policy: RetryPolicy::from_config(config),
            reference_documents: config.reference_document_ids.clone(),
            knowledge_base: config.knowledge_base_id.clone(),
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

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn is_busy(&self, operation: Operation) -> bool {
        match operation {
            Operation::Bio => self.bio_latch.held,
            Operation::Image => self.image_latch.held,
        }
    }

    // ========================================================================
    // Bio
    // ========================================================================

    pub fn begin_bio(&mut self, session: &Session) -> Result<BioJob> {
        if !self.bio_latch.acquire() {
            return Err(GenerationError::Busy(Operation::Bio));
        }

        let originals = session.form.snapshot(session.history.fields());
        let mut request = BioRequest::new(prompt::bio_prompt(&session.form.sheet, &originals))
            .with_reference_documents(self.reference_documents.clone());
        if let Some(kb) = &self.knowledge_base {
            request = request.with_knowledge_base(kb.clone());
        }

        log::info!(
            "Starting bio generation for '{}' ({} fields)",
            session.form.sheet.display_name(),
            originals.len()
        );
        Ok(BioJob { originals, request })
    }

    /// Release the bio latch and, on success, commit every parsed field.
    ///
    /// Parsing happens before any field is touched, so a failure leaves form
    /// and history exactly as they were.
    pub fn finish_bio(
        &mut self,
        session: &mut Session,
        job: BioJob,
        result: std::result::Result<String, LlmError>,
    ) -> Result<Vec<Field>> {
        self.bio_latch.release();

        let raw = result?;
        let parsed = parser::parse_response(&raw)?;

        let updates: Vec<(Field, &str, String)> = parsed
            .into_iter()
            .filter_map(|(field, ai_value)| match job.originals.get(&field) {
                Some(original) => Some((field, original.as_str(), ai_value)),
                None => {
                    log::debug!("Skipping untracked field {} in AI response", field);
                    None
                }
            })
            .collect();

        if updates.is_empty() {
            log::warn!("AI response parsed but contained no tracked fields");
            return Err(GenerationError::NoContent);
        }

        let mut updated = Vec::with_capacity(updates.len());
        for (field, original, ai_value) in updates {
            session.commit_generation(field, original, &ai_value)?;
            updated.push(field);
        }

        log::info!("Bio generation updated {} field(s)", updated.len());
        Ok(updated)
    }

    pub async fn generate_bio(
        &mut self,
        session: &mut Session,
        client: &dyn TextGenerator,
    ) -> Result<Vec<Field>> {
        let job = self.begin_bio(session)?;
        let result = request_bio(client, &job.request, self.policy).await;
        self.finish_bio(session, job, result)
    }

    // ========================================================================
    // Image
    // ========================================================================

    pub fn begin_image(
        &mut self,
        session: &Session,
        reference: ImageReference,
    ) -> Result<ImageJob> {
        if !self.image_latch.acquire() {
            return Err(GenerationError::Busy(Operation::Image));
        }

        let reference_image = match reference {
            ImageReference::None => None,
            ImageReference::Upload(bytes) => Some(bytes),
            ImageReference::Current => session.form.portrait.as_ref().map(|p| p.bytes.clone()),
        };

        let request = ImageRequest {
            prompt: prompt::portrait_prompt(
                &session.form.sheet,
                session.form.value(Field::Appearance),
            ),
            reference_image,
        };

        log::info!(
            "Starting portrait generation (reference image: {})",
            request.reference_image.is_some()
        );
        Ok(ImageJob { request })
    }

    pub fn finish_image(
        &mut self,
        session: &mut Session,
        job: ImageJob,
        result: std::result::Result<Vec<u8>, LlmError>,
    ) -> Result<()> {
        self.image_latch.release();

        let bytes = result?;
        if bytes.is_empty() {
            return Err(LlmError::NoContent.into());
        }

        log::info!("Portrait updated ({} bytes)", bytes.len());
        session.form.portrait = Some(Portrait {
            bytes,
            prompt: job.request.prompt,
        });
        Ok(())
    }

    pub async fn generate_image(
        &mut self,
        session: &mut Session,
        client: &dyn ImageGenerator,
        reference: ImageReference,
    ) -> Result<()> {
        let job = self.begin_image(session, reference)?;
        let result = request_image(client, &job.request).await;
        self.finish_image(session, job, result)
    }
}
