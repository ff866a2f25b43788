//! # Agent Module
//!
//! Connects the command-line configuration to the library's research agent:
//! picks the generation backend, runs the research loop and renders the
//! cited answer.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use rig_research::{
    GeminiClient, GenerationService, OverallState, ResearchAgent, ResearchRequest,
    RigOllamaService, RunContext,
};

use crate::config::{Backend, Config};

// =============================================================================
// BACKEND CONSTRUCTION
// =============================================================================
/// Build the generation service selected by `config`.
pub fn build_service(config: &Config) -> Result<Arc<dyn GenerationService>> {
    match config.backend {
        Backend::Gemini => {
            let api_key = config
                .gemini_api_key
                .clone()
                .context("GEMINI_API_KEY is not set")?;
            let mut client = GeminiClient::new(api_key);
            if let Some(base_url) = &config.gemini_base_url {
                client = client.with_base_url(base_url);
            }
            Ok(Arc::new(client))
        }
        Backend::Ollama => {
            warn!("Ollama backend has no search grounding; answers will carry no citations");
            Ok(Arc::new(RigOllamaService::from_env()))
        }
    }
}

// =============================================================================
// RESEARCH RUNNER
// =============================================================================
/// Runs one research request end to end.
pub struct Researcher {
    agent: ResearchAgent,
}

impl Researcher {
    pub fn new(config: Config) -> Result<Self> {
        let service = build_service(&config)?;
        let agent = ResearchAgent::new(config.research, service)
            .context("Failed to build the research workflow")?;
        Ok(Self { agent })
    }

    /// Research `request` and return the final state.
    pub async fn research(&self, ctx: &RunContext, request: ResearchRequest) -> Result<OverallState> {
        match self.agent.invoke(ctx, request).await {
            Ok(state) => {
                info!(
                    loops = state.research_loop_count,
                    sources = state.sources_gathered.len(),
                    "Research completed"
                );
                Ok(state)
            }
            Err(failure) => {
                warn!(
                    loops = failure.state.research_loop_count,
                    results = failure.state.web_research_results.len(),
                    "Research aborted"
                );
                Err(anyhow::Error::new(failure.error).context("Research workflow failed"))
            }
        }
    }
}

// =============================================================================
// OUTPUT FORMATTING
// =============================================================================
/// Render the answer followed by a numbered source list.
pub fn format_report(state: &OverallState) -> String {
    let mut report = state.answer().unwrap_or("(no answer produced)").to_string();

    if !state.sources_gathered.is_empty() {
        report.push_str("\n\nSources:\n");
        for (i, source) in state.sources_gathered.iter().enumerate() {
            report.push_str(&format!("{}. {}\n", i + 1, source.value));
        }
    }

    report
}
