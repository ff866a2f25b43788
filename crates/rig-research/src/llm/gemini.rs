//! Gemini generateContent client
//!
//! Talks to the Generative Language REST API directly so that the
//! `groundingMetadata` returned for search-grounded replies is preserved.
//!
//! # Production Features
//!
//! - Structured output via `responseMimeType` + `responseSchema`
//! - Google Search grounding tool when requested
//! - HTTP timeout and retry with exponential backoff on transient errors
//! - Typed errors for auth failures, rate limits and server errors

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::grounding::GroundingMetadata;
use crate::llm::provider::{GenerateOptions, Generation, GenerationService};

/// Public endpoint of the Generative Language API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default timeout for generateContent requests
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Upper bound for a single backoff sleep
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Gemini REST client
///
/// # Example
/// ```ignore
/// let client = GeminiClient::from_env()?;
/// let reply = client
///     .generate("Who won the 2024 Euro?", &GenerateOptions::new("gemini-2.0-flash").with_search_tool())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: Client,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl GeminiClient {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }

    /// Create from the GEMINI_API_KEY environment variable, honoring
    /// GEMINI_API_BASE_URL when set
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            ProviderError::Backend("GEMINI_API_KEY environment variable not set".to_string())
        })?;
        let client = Self::new(api_key);
        Ok(match std::env::var("GEMINI_API_BASE_URL") {
            Ok(base_url) if !base_url.is_empty() => client.with_base_url(base_url),
            _ => client,
        })
    }

    /// Point the client at another host (proxies, mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set custom max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first backoff delay; later attempts double it
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    /// Execute HTTP request with retry and backoff
    async fn execute_with_retry(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ProviderError> {
        let mut last_error = ProviderError::Backend("No attempts made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.retry_base_delay, attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying Gemini request");
                tokio::time::sleep(delay).await;
            }

            match self.execute_single_request(model, request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    warn!(attempt, error = %e, "Gemini request failed, will retry");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Execute a single HTTP request
    async fn execute_single_request(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ProviderError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else if e.is_connect() {
                    ProviderError::Connection(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status.is_success() {
            return response
                .json::<GenerateContentResponse>()
                .await
                .map_err(|e| ProviderError::Parse(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 | 403 => Err(ProviderError::Unauthorized),
            429 => Err(ProviderError::RateLimited),
            400 => Err(ProviderError::BadRequest(error_text)),
            500..=599 => Err(ProviderError::Server(status.as_u16(), error_text)),
            _ => Err(ProviderError::Http(status.as_u16(), error_text)),
        }
    }
}

/// Exponential backoff for retry `attempt` (1-based), capped at [`MAX_RETRY_DELAY`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, ProviderError> {
        debug!(
            model = %options.model,
            temperature = options.temperature,
            schema = options.schema.map(|s| s.name()),
            search = options.search_tool,
            "Calling Gemini generateContent"
        );

        let request = GenerateContentRequest::from_options(prompt, options);
        let response = self.execute_with_retry(&options.model, &request).await?;
        response.into_generation()
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ==================== Wire types ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec>,
}

impl GenerateContentRequest {
    fn from_options(prompt: &str, options: &GenerateOptions) -> Self {
        let (response_mime_type, response_schema) = match options.schema {
            Some(schema) => (Some("application/json".to_string()), Some(schema.json_schema())),
            None => (None, None),
        };

        let tools = if options.search_tool {
            vec![ToolSpec {
                google_search: serde_json::json!({}),
            }]
        } else {
            Vec::new()
        };

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                response_mime_type,
                response_schema,
            },
            tools,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    google_search: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

impl GenerateContentResponse {
    /// Text of the first candidate (all text parts concatenated) plus its
    /// grounding metadata
    fn into_generation(self) -> Result<Generation, ProviderError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        Ok(Generation {
            text,
            grounding: candidate.grounding_metadata,
        })
    }
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-api-key")
            .with_base_url(server.uri())
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(0)
            .with_retry_base_delay(Duration::from_millis(10))
    }

    fn grounded_response() -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Paris is the capital of France." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://example.com/paris", "title": "example.com" } }
                    ],
                    "groundingSupports": [
                        {
                            "segment": { "startIndex": 0, "endIndex": 31 },
                            "groundingChunkIndices": [0]
                        }
                    ]
                }
            }]
        })
    }

    #[tokio::test]
    async fn test_http_grounded_generation() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("x-goog-api-key", "test-api-key"))
            .and(body_partial_json(serde_json::json!({ "tools": [{ "google_search": {} }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(grounded_response()))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let options = GenerateOptions::new("gemini-2.0-flash").with_search_tool();
        let generation = client.generate("capital of France", &options).await.unwrap();

        assert_eq!(generation.text, "Paris is the capital of France.");
        let grounding = generation.grounding.unwrap();
        assert_eq!(grounding.grounding_chunks[0].uri(), "https://example.com/paris");
        assert_eq!(grounding.grounding_supports[0].segment.end_index, 31);
    }

    #[tokio::test]
    async fn test_http_unauthorized_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("API key not valid"))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server)
            .generate("test", &GenerateOptions::new("gemini-2.0-flash"))
            .await;

        assert!(matches!(result, Err(ProviderError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_http_bad_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid schema"))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server)
            .generate("test", &GenerateOptions::new("gemini-2.0-flash"))
            .await;

        assert!(matches!(result, Err(ProviderError::BadRequest(ref m)) if m == "Invalid schema"));
    }

    #[tokio::test]
    async fn test_http_rate_limited_without_retries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("Quota exceeded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server)
            .generate("test", &GenerateOptions::new("gemini-2.0-flash"))
            .await;

        assert!(matches!(result, Err(ProviderError::RateLimited)));
    }

    #[tokio::test]
    async fn test_http_retry_on_server_error() {
        let mock_server = MockServer::start().await;

        // First two calls fail with 503, third succeeds
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service unavailable"))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(grounded_response()))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).with_max_retries(3);
        let generation = client
            .generate("test", &GenerateOptions::new("gemini-2.0-flash"))
            .await
            .unwrap();

        assert!(generation.text.starts_with("Paris"));
    }

    #[tokio::test]
    async fn test_http_server_error_exhausts_retries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal error"))
            .expect(3)
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server)
            .with_max_retries(2)
            .generate("test", &GenerateOptions::new("gemini-2.0-flash"))
            .await;

        assert!(matches!(result, Err(ProviderError::Server(500, _))));
    }

    #[tokio::test]
    async fn test_http_many_retries_do_not_overflow() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(41)
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server)
            .with_max_retries(40)
            .with_retry_base_delay(Duration::ZERO)
            .generate("test", &GenerateOptions::new("gemini-2.0-flash"))
            .await;

        assert!(matches!(result, Err(ProviderError::Server(503, _))));
    }

    #[tokio::test]
    async fn test_http_no_retry_on_bad_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server)
            .with_max_retries(3)
            .generate("test", &GenerateOptions::new("gemini-2.0-flash"))
            .await;

        assert!(matches!(result, Err(ProviderError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_http_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server)
            .generate("test", &GenerateOptions::new("gemini-2.0-flash"))
            .await;

        assert!(matches!(result, Err(ProviderError::Parse(_))));
    }
}
