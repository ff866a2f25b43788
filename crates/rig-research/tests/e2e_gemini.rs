//! End-to-End Gemini Tests
//!
//! These tests call the real Gemini API.
//! Run with: `cargo test --test e2e_gemini -- --ignored`
//!
//! # Environment Variables Required
//!
//! - `GEMINI_API_KEY`: key for the Generative Language API
//!
//! # Warning
//!
//! These tests will consume API credits!

use std::sync::Arc;

use rig_research::{
    GeminiClient, GenerateOptions, GenerationService, ResearchAgent, ResearchConfig,
    ResearchRequest, RunContext,
};

fn client() -> GeminiClient {
    GeminiClient::from_env().expect("GEMINI_API_KEY must be set for e2e tests")
}

#[tokio::test]
#[ignore]
async fn test_grounded_generation_returns_metadata() {
    let options = GenerateOptions::new("gemini-2.0-flash").with_search_tool();
    let generation = client()
        .generate("Who is the current president of France?", &options)
        .await
        .unwrap();

    assert!(!generation.text.is_empty());
    let grounding = generation.grounding.expect("search-grounded reply");
    assert!(!grounding.grounding_chunks.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_single_loop_research() {
    let config = ResearchConfig::default()
        .with_initial_queries(1)
        .with_max_research_loops(1);
    let agent = ResearchAgent::new(config, Arc::new(client())).unwrap();

    let state = agent
        .invoke(
            &RunContext::new(),
            ResearchRequest::question("What is the capital of France?"),
        )
        .await
        .unwrap();

    assert!(state.answer().unwrap().contains("Paris"));
    assert_eq!(state.messages.len(), 1);
}
