/// LLM Client — the single point of entry for all Gemini API calls in ResuTune.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All model interactions MUST go through this module.
///
/// Model: gemini-3-flash-preview (hardcoded — do not make configurable to prevent drift)
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

/// The model used for all tuning calls.
/// Chosen for its PDF context window and latency; intentionally hardcoded.
pub const MODEL: &str = "gemini-3-flash-preview";
const HTTP_TIMEOUT_SECS: u64 = 120;

/// Coarse classification of a failed call, for logging and retry decisions.
/// Callers never show these to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    Auth,
    RateLimited,
    Backend,
    MalformedResponse,
    EmptyOutput,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Model returned empty output")]
    EmptyContent,
}

impl LlmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::MissingApiKey => ErrorKind::Configuration,
            LlmError::Http(_) => ErrorKind::Transport,
            LlmError::Api { status: 401 | 403, .. } => ErrorKind::Auth,
            LlmError::Api { status: 429, .. } => ErrorKind::RateLimited,
            LlmError::Api { .. } => ErrorKind::Backend,
            LlmError::Parse(_) => ErrorKind::MalformedResponse,
            LlmError::EmptyContent => ErrorKind::EmptyOutput,
        }
    }

    /// Transient failures are the only ones worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(e) => !e.is_decode(),
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (generateContent, v1beta)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

/// A binary attachment sent inline with the prompt.
#[derive(Debug, Clone, Copy)]
pub struct Attachment<'a> {
    pub mime_type: &'a str,
    /// Raw base64 payload, without any data-URL prefix.
    pub base64_data: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl LlmResponse {
    /// Concatenates the text parts of the first candidate.
    /// Returns `None` when the model produced no text at all.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single Gemini client used by the tuning service.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    max_retries: u32,
}

impl LlmClient {
    /// The key is injected here rather than read from the environment.
    /// `None` is accepted; it fails on the first call with `MissingApiKey`.
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        max_retries: u32,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, MODEL)
    }

    /// Makes a single logical call: one user turn made of `attachment` then `prompt`,
    /// with `system` as the system instruction.
    ///
    /// With `max_retries == 0` (the default) exactly one HTTP request is sent.
    /// Otherwise transient failures (429, 5xx, connection errors) are retried
    /// with exponential backoff.
    pub async fn call(
        &self,
        attachment: Attachment<'_>,
        prompt: &str,
        system: &str,
    ) -> Result<LlmResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let request_body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text { text: system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: attachment.mime_type,
                            data: attachment.base64_data,
                        },
                    },
                    Part::Text { text: prompt },
                ],
            }],
        };

        let mut attempt = 0;
        loop {
            match self.send_once(api_key, &request_body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    // Exponential backoff: 1s, 2s, 4s, ...
                    let delay = std::time::Duration::from_millis(1000 * (1u64 << (attempt - 1).min(6)));
                    warn!(
                        "Gemini call attempt {} failed ({}), retrying after {}ms...",
                        attempt,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        api_key: &str,
        request_body: &GenerateContentRequest<'_>,
    ) -> Result<LlmResponse, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let body = response.text().await?;
        let llm_response: LlmResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &llm_response.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }
        if let Some(reason) = llm_response
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
        {
            if reason != "STOP" {
                warn!("Gemini finished with reason {reason}");
            }
        }

        Ok(llm_response)
    }

    /// Convenience method that calls the model and returns its cleaned text output.
    pub async fn call_text(
        &self,
        attachment: Attachment<'_>,
        prompt: &str,
        system: &str,
    ) -> Result<String, LlmError> {
        let response = self.call(attachment, prompt, system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(strip_code_fences(&text).to_string())
    }
}

fn api_error(status: StatusCode, body: String) -> LlmError {
    let message = serde_json::from_str::<GeminiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Strips a ```html ... ``` or ``` ... ``` fence from model output.
/// Text without a leading fence is only trimmed, so the function is idempotent.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = if let Some(stripped) = text.strip_prefix("```html") {
        stripped
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
    } else {
        return text;
    };
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF: Attachment<'static> = Attachment {
        mime_type: "application/pdf",
        base64_data: "JVBERi0xLjQK",
    };

    fn ok_body(text: &str) -> String {
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 812, "candidatesTokenCount": 240 }
        })
        .to_string()
    }

    #[test]
    fn test_strip_code_fences_with_html_tag() {
        let input = "```html\n<h1>JANE DOE</h1>\n```";
        assert_eq!(strip_code_fences(input), "<h1>JANE DOE</h1>");
    }

    #[test]
    fn test_strip_code_fences_without_tag() {
        let input = "  ```\n<p>contact</p>\n```  ";
        assert_eq!(strip_code_fences(input), "<p>contact</p>");
    }

    #[test]
    fn test_strip_code_fences_no_fences() {
        let input = "\n<h2>Experience</h2>\n";
        assert_eq!(strip_code_fences(input), "<h2>Experience</h2>");
    }

    #[test]
    fn test_strip_code_fences_is_idempotent() {
        for input in [
            "<h1>JANE DOE</h1>",
            "```html\n<ul><li>Go</li></ul>\n```",
            "```\n<div>x</div>",
            "   plain text   ",
        ] {
            let once = strip_code_fences(input);
            assert_eq!(strip_code_fences(once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_request_serializes_in_gemini_shape() {
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text { text: "sys" }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "application/pdf",
                            data: "QUJD",
                        },
                    },
                    Part::Text { text: "jd" },
                ],
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(
            value["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "application/pdf"
        );
        assert_eq!(value["contents"][0]["parts"][0]["inlineData"]["data"], "QUJD");
        assert_eq!(value["contents"][0]["parts"][1]["text"], "jd");
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response: LlmResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "<h1>A</h1>" }, { "text": "<p>B</p>" }] } }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("<h1>A</h1><p>B</p>"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: LlmResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(LlmError::MissingApiKey.kind(), ErrorKind::Configuration);
        assert_eq!(
            LlmError::Api { status: 403, message: String::new() }.kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            LlmError::Api { status: 429, message: String::new() }.kind(),
            ErrorKind::RateLimited
        );
        assert!(LlmError::Api { status: 503, message: String::new() }.is_transient());
        assert!(!LlmError::Api { status: 400, message: String::new() }.is_transient());
        assert!(!LlmError::EmptyContent.is_transient());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_on_first_call() {
        let client = LlmClient::new(None, "http://127.0.0.1:9", 0).unwrap();
        let err = client.call(PDF, "jd", "sys").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_call_text_sends_key_and_strips_fences() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-3-flash-preview:generateContent",
            )
            .match_header("x-goog-api-key", "test-key")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(
                    r#""inlineData":\{"mimeType":"application/pdf","data":"JVBERi0xLjQK"\}"#
                        .to_string(),
                ),
                mockito::Matcher::Regex(r#"\{"text":"jd"\}"#.to_string()),
                mockito::Matcher::Regex(r#""systemInstruction":\{"parts""#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok_body("```html\n<h1>JANE DOE</h1>\n```"))
            .expect(1)
            .create_async()
            .await;

        let client = LlmClient::new(Some("test-key".into()), server.url(), 0).unwrap();
        let text = client.call_text(PDF, "jd", "sys").await.unwrap();

        assert_eq!(text, "<h1>JANE DOE</h1>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = LlmClient::new(Some("bad".into()), server.url(), 3).unwrap();
        let err = client.call(PDF, "jd", "sys").await.unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Non-transient errors are never retried, even when retries are enabled.
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .expect(1)
            .create_async()
            .await;

        let client = LlmClient::new(Some("k".into()), server.url(), 0).unwrap();
        let err = client.call(PDF, "jd", "sys").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Backend);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_candidate_is_empty_output() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[]},"finishReason":"SAFETY"}]}"#)
            .create_async()
            .await;

        let client = LlmClient::new(Some("k".into()), server.url(), 0).unwrap();
        let err = client.call_text(PDF, "jd", "sys").await.unwrap_err();

        assert!(matches!(err, LlmError::EmptyContent));
    }
}
