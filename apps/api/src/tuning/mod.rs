//! Tuning — turns (résumé data URL, job description) into tuned résumé HTML.
//!
//! `ResumeTuner` is the seam between the session state machine and the model.
//! `GeminiTuner` is the production backend; tests drive sessions with doubles.
//! All model calls go through llm_client — no direct HTTP here.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::llm_client::{Attachment, ErrorKind, LlmClient, LlmError};

pub mod prompts;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Typed failure of a tuning call. Never shown verbatim to users.
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("job description is empty")]
    EmptyJobDescription,

    #[error("resume payload is empty")]
    EmptyResume,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl TuningError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            TuningError::Llm(e) => Some(e.kind()),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ResumeTuner: Send + Sync {
    /// Produces tuned résumé HTML from a base64 (optionally data-URL) PDF and a job description.
    async fn tune(&self, encoded_resume: &str, job_description: &str)
        -> Result<String, TuningError>;
}

/// Returns the raw base64 payload of a data URL.
/// Everything up to and including the first comma is dropped; input without a comma is
/// returned unchanged.
pub fn strip_data_url_prefix(encoded: &str) -> &str {
    match encoded.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => payload,
        _ => encoded,
    }
}

pub struct GeminiTuner {
    llm: LlmClient,
    system_instruction: String,
}

impl GeminiTuner {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            system_instruction: prompts::system_instruction(),
        }
    }
}

#[async_trait]
impl ResumeTuner for GeminiTuner {
    async fn tune(
        &self,
        encoded_resume: &str,
        job_description: &str,
    ) -> Result<String, TuningError> {
        if job_description.trim().is_empty() {
            return Err(TuningError::EmptyJobDescription);
        }
        let payload = strip_data_url_prefix(encoded_resume);
        if payload.is_empty() {
            return Err(TuningError::EmptyResume);
        }

        info!(
            "Tuning resume: payload={} b64 chars, jd={} chars, instruction={}",
            payload.len(),
            job_description.len(),
            prompts::SYSTEM_INSTRUCTION_VERSION
        );

        let attachment = Attachment {
            mime_type: PDF_MIME_TYPE,
            base64_data: payload,
        };
        let prompt = prompts::build_tuning_prompt(job_description);

        let html = self
            .llm
            .call_text(attachment, &prompt, &self.system_instruction)
            .await?;

        info!("Tuning produced {} chars of HTML", html.len());
        Ok(html)
    }
}
