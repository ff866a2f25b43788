//! Generation service trait definition
//!
//! The research nodes only ever need one operation from a model backend:
//! "generate text for this prompt", optionally constrained to a JSON schema
//! and optionally allowed to use web search. Keeping the trait this narrow
//! lets the HTTP client and the scripted test double be swapped freely.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::grounding::GroundingMetadata;

/// Structured reply shapes the research nodes request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSchema {
    /// `{"query": [{"query": .., "rationale": ..}]}`
    SearchQueryList,
    /// `{"is_sufficient": bool, "knowledge_gap": string, "follow_up_queries": [..]}`
    Reflection,
}

impl OutputSchema {
    pub fn name(&self) -> &'static str {
        match self {
            OutputSchema::SearchQueryList => "SearchQueryList",
            OutputSchema::Reflection => "Reflection",
        }
    }

    /// Response schema in the OpenAPI subset accepted by `generationConfig.responseSchema`.
    pub fn json_schema(&self) -> Value {
        match self {
            OutputSchema::SearchQueryList => json!({
                "type": "OBJECT",
                "properties": {
                    "query": {
                        "type": "ARRAY",
                        "description": "A list of search queries to be used for web research.",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "query": { "type": "STRING" },
                                "rationale": { "type": "STRING" }
                            },
                            "required": ["query", "rationale"]
                        }
                    }
                },
                "required": ["query"]
            }),
            OutputSchema::Reflection => json!({
                "type": "OBJECT",
                "properties": {
                    "is_sufficient": {
                        "type": "BOOLEAN",
                        "description": "Whether the provided summaries are sufficient to answer the user's question."
                    },
                    "knowledge_gap": {
                        "type": "STRING",
                        "description": "A description of what information is missing or needs clarification."
                    },
                    "follow_up_queries": {
                        "type": "ARRAY",
                        "description": "A list of follow-up queries to address the knowledge gap.",
                        "items": { "type": "STRING" }
                    }
                },
                "required": ["is_sufficient", "knowledge_gap", "follow_up_queries"]
            }),
        }
    }
}

/// Per-call generation options.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    /// Model name as understood by the backend
    pub model: String,
    pub temperature: f64,
    /// Constrain the reply to this JSON shape
    pub schema: Option<OutputSchema>,
    /// Allow the backend to ground the reply with web search
    pub search_tool: bool,
}

impl GenerateOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            schema: None,
            search_tool: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_schema(mut self, schema: OutputSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_search_tool(mut self) -> Self {
        self.search_tool = true;
        self
    }
}

/// A generation reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    /// Present only when the backend grounded the reply with search results
    pub grounding: Option<GroundingMetadata>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            grounding: None,
        }
    }

    pub fn grounded(text: impl Into<String>, grounding: GroundingMetadata) -> Self {
        Self {
            text: text.into(),
            grounding: Some(grounding),
        }
    }

    /// Grounding metadata, or an empty set when the reply was not grounded
    pub fn grounding_or_default(&self) -> GroundingMetadata {
        self.grounding.clone().unwrap_or_default()
    }
}

/// External text generation backend.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate a reply for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, ProviderError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
