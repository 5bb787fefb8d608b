//! LLM client: the single point of entry for all Gemini API calls.
//!
//! No other module talks to the generative-language API directly. Handlers go
//! through `RetryingClient`, which layers the session cache, the rate limiter
//! and the backoff policy over a `TextGenerator`.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;
pub mod retry;
pub mod retrying;

pub use retry::{ProgressSink, RecordingProgress, RetryEvent};
pub use retrying::{Completion, RetryingClient};

const HTTP_TIMEOUT_SECS: u64 = 120;

// ────────────────────────────────────────────────────────────────────────────
// Failure taxonomy
// ────────────────────────────────────────────────────────────────────────────

/// Class of a single failed attempt. Drives the backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Server temporarily unavailable or overloaded (503 / UNAVAILABLE).
    Overload,
    /// Quota or request rate exceeded, signaled by the API (429 / RESOURCE_EXHAUSTED).
    RateLimited,
    Other,
}

/// One failed attempt against the API, already classified.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiFailure {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiFailure {
    pub fn new(status: Option<u16>, api_status: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: classify(status, api_status, &message),
            status,
            message,
        }
    }
}

/// Maps whatever the API surface gives us to a `FailureKind`.
///
/// Structured signals win: the HTTP status code first, then the API's own
/// status string. Message substrings are only consulted when neither is
/// conclusive (e.g. transport errors that never produced a response).
pub fn classify(status: Option<u16>, api_status: Option<&str>, message: &str) -> FailureKind {
    match status {
        Some(503) => return FailureKind::Overload,
        Some(429) => return FailureKind::RateLimited,
        _ => {}
    }

    match api_status {
        Some("UNAVAILABLE") => return FailureKind::Overload,
        Some("RESOURCE_EXHAUSTED") => return FailureKind::RateLimited,
        _ => {}
    }

    let lowered = message.to_lowercase();
    if lowered.contains("503") || lowered.contains("overloaded") || lowered.contains("unavailable")
    {
        FailureKind::Overload
    } else if lowered.contains("429") || lowered.contains("resource_exhausted") {
        FailureKind::RateLimited
    } else {
        FailureKind::Other
    }
}

/// Terminal outcome of a call sequence, after retries are spent.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Refused locally by the session rate limiter; the network was never touched.
    #[error("Please wait {remaining_wait_seconds:.1} more seconds before making another request")]
    Throttled { remaining_wait_seconds: f64 },

    #[error("Server still overloaded after {attempts} attempts: {source}")]
    Overloaded {
        attempts: u32,
        #[source]
        source: ApiFailure,
    },

    #[error("Rate limited by the API after {attempts} attempts: {source}")]
    RateLimited {
        attempts: u32,
        #[source]
        source: ApiFailure,
    },

    #[error("Error after {attempts} attempts: {source}")]
    Failed {
        attempts: u32,
        #[source]
        source: ApiFailure,
    },
}

impl LlmError {
    pub(crate) fn exhausted(attempts: u32, failure: ApiFailure) -> Self {
        match failure.kind {
            FailureKind::Overload => LlmError::Overloaded {
                attempts,
                source: failure,
            },
            FailureKind::RateLimited => LlmError::RateLimited {
                attempts,
                source: failure,
            },
            FailureKind::Other => LlmError::Failed {
                attempts,
                source: failure,
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outbound call seam
// ────────────────────────────────────────────────────────────────────────────

/// Generate text from a prompt: the one operation the external API offers.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ApiFailure>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
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
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
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
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

/// Gemini `generateContent` over HTTPS.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()?,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ApiFailure> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ApiFailure::new(e.status().map(|s| s.as_u16()), None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (api_status, message) = match serde_json::from_str::<GeminiErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.error.status, envelope.error.message),
                Err(_) => (None, body),
            };
            return Err(ApiFailure::new(
                Some(status.as_u16()),
                api_status.as_deref(),
                format!("{} {}", status.as_u16(), message),
            ));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ApiFailure::new(None, None, format!("invalid response body: {e}")))?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={:?}, candidate_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        parsed.text().ok_or_else(|| {
            let finish_reason = parsed
                .candidates
                .first()
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("none");
            ApiFailure::new(
                None,
                None,
                format!("response contained no text (finish reason: {finish_reason})"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_classify_by_status_code() {
        assert_eq!(classify(Some(503), None, ""), FailureKind::Overload);
        assert_eq!(classify(Some(429), None, ""), FailureKind::RateLimited);
        assert_eq!(classify(Some(400), None, "bad request"), FailureKind::Other);
    }

    #[test]
    fn test_classify_by_api_status_string() {
        assert_eq!(
            classify(Some(500), Some("UNAVAILABLE"), ""),
            FailureKind::Overload
        );
        assert_eq!(
            classify(None, Some("RESOURCE_EXHAUSTED"), ""),
            FailureKind::RateLimited
        );
    }

    #[test]
    fn test_classify_by_message_substring() {
        assert_eq!(
            classify(None, None, "The model is overloaded. Please try again later."),
            FailureKind::Overload
        );
        assert_eq!(
            classify(None, None, "Service Unavailable"),
            FailureKind::Overload
        );
        assert_eq!(classify(None, None, "got 503 from upstream"), FailureKind::Overload);
        assert_eq!(classify(None, None, "HTTP 429 Too Many Requests"), FailureKind::RateLimited);
        assert_eq!(classify(None, None, "connection reset"), FailureKind::Other);
    }

    #[test]
    fn test_status_code_beats_message() {
        // A 429 whose message happens to mention "unavailable" is still a rate limit.
        assert_eq!(
            classify(Some(429), None, "quota unavailable"),
            FailureKind::RateLimited
        );
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "1. What is "}, {"text": "ownership?"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5}
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("1. What is ownership?"));
        assert_eq!(parsed.candidates[0].finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text().is_none());
    }

    #[tokio::test]
    async fn test_gemini_client_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "hello"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new("test-key".to_string(), server.uri()).unwrap();
        let text = client.generate("gemini-2.5-flash", "hi").await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_gemini_client_classifies_overload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k".to_string(), server.uri()).unwrap();
        let err = client.generate("m", "hi").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Overload);
        assert_eq!(err.status, Some(503));
        assert!(err.message.contains("overloaded"));
    }

    #[tokio::test]
    async fn test_gemini_client_classifies_quota_exhaustion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k".to_string(), server.uri()).unwrap();
        let err = client.generate("m", "hi").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::RateLimited);
    }

    #[tokio::test]
    async fn test_gemini_client_unstructured_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k".to_string(), server.uri()).unwrap();
        let err = client.generate("m", "hi").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Other);
        assert_eq!(err.message, "400 bad request");
    }

    #[tokio::test]
    async fn test_gemini_client_empty_candidate_reports_finish_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k".to_string(), server.uri()).unwrap();
        let err = client.generate("m", "hi").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Other);
        assert_eq!(err.message, "response contained no text (finish reason: SAFETY)");
    }
}
