//! Rig-backed generation service for local models
//!
//! Wraps Rig's Ollama client so the research workflow can run without a
//! Gemini key. An agent is built per call because the model and temperature
//! differ between workflow steps.
//!
//! # Limitations
//!
//! - No search grounding: replies never carry grounding metadata, so the
//!   research loop runs but produces no citations.
//! - Structured output is requested through the preamble and the reply is
//!   stripped of a surrounding ```json fence before it is handed back.

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::ollama;
use tracing::debug;

use crate::error::ProviderError;
use crate::llm::{GenerateOptions, Generation, GenerationService};

const PLAIN_PREAMBLE: &str = "You are a careful research assistant. Answer precisely.";

/// [`GenerationService`] over a Rig Ollama client.
pub struct RigOllamaService {
    client: ollama::Client,
}

impl RigOllamaService {
    pub fn new(client: ollama::Client) -> Self {
        Self { client }
    }

    /// Client from OLLAMA_API_BASE_URL, defaulting to http://localhost:11434
    pub fn from_env() -> Self {
        Self::new(ollama::Client::from_env())
    }
}

fn preamble_for(options: &GenerateOptions) -> String {
    match options.schema {
        Some(schema) => format!(
            "{PLAIN_PREAMBLE}\nRespond with a single JSON object and nothing else. \
             The object must match this schema:\n{}",
            schema.json_schema()
        ),
        None => PLAIN_PREAMBLE.to_string(),
    }
}

/// Remove a markdown code fence wrapped around a JSON reply.
pub(crate) fn strip_json_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[async_trait]
impl GenerationService for RigOllamaService {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, ProviderError> {
        debug!(model = %options.model, "Prompting Ollama through Rig");

        let agent = self
            .client
            .agent(options.model.as_str())
            .preamble(&preamble_for(options))
            .temperature(options.temperature)
            .build();

        let reply = agent
            .prompt(prompt)
            .await
            .map_err(|e| ProviderError::Backend(format!("Rig agent error: {}", e)))?;

        let text = if options.schema.is_some() {
            strip_json_fence(&reply).to_string()
        } else {
            reply
        };

        Ok(Generation::text(text))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
