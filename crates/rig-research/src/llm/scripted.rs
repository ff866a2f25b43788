//! Deterministic generation service for tests and offline runs
//!
//! Replies are served in the order they were queued; every request is
//! recorded so callers can assert on prompts, models and temperatures.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::grounding::GroundingMetadata;
use crate::llm::provider::{GenerateOptions, Generation, GenerationService};

/// A request seen by [`ScriptedService`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub prompt: String,
    pub options: GenerateOptions,
}

/// Generation service that replays queued replies.
#[derive(Debug, Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<Generation, ProviderError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text reply
    pub fn push_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(Generation::text(text)))
    }

    /// Queue a reply carrying grounding metadata
    pub fn push_grounded(self, text: impl Into<String>, grounding: GroundingMetadata) -> Self {
        self.push(Ok(Generation::grounded(text, grounding)))
    }

    /// Queue a failure
    pub fn push_error(self, error: ProviderError) -> Self {
        self.push(Err(error))
    }

    fn push(self, reply: Result<Generation, ProviderError>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
        self
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of queued replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|replies| replies.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                prompt: prompt.to_string(),
                options: options.clone(),
            });
        }

        let next = self
            .replies
            .lock()
            .map_err(|_| ProviderError::Backend("scripted replies lock poisoned".to_string()))?
            .pop_front();

        next.unwrap_or_else(|| {
            Err(ProviderError::Backend(
                "no scripted reply left".to_string(),
            ))
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
