//! Iterative research agent
//!
//! Generates search queries for a question, runs grounded web research for
//! each, reflects on whether the findings suffice, loops with follow-up
//! queries until they do (or the loop cap is hit), then writes a cited answer.
//!
//! # Usage
//!
//! ```ignore
//! use rig_research::llm::GeminiClient;
//! use rig_research::research::{ResearchAgent, ResearchConfig, ResearchRequest};
//! use rig_research::workflow::RunContext;
//!
//! let agent = ResearchAgent::new(ResearchConfig::from_env()?, Arc::new(GeminiClient::from_env()?))?;
//! let state = agent
//!     .invoke(&RunContext::new(), ResearchRequest::question("What is the capital of France?"))
//!     .await?;
//! println!("{}", state.answer().unwrap_or_default());
//! ```
//!
//! # Module Structure
//!
//! - `config` - Process-wide defaults
//! - `state` - Workflow state and structured reply types
//! - `prompts` - Prompt templates for each model-facing step
//! - `nodes` - Node behaviors and the evaluate-research router
//! - `workflow` - Graph wiring and the agent entry point

pub mod config;
pub mod nodes;
pub mod prompts;
pub mod state;
pub mod workflow;

pub use config::{ConfigError, ResearchConfig, DEFAULT_QUERY_GENERATOR_MODEL, DEFAULT_REASONING_MODEL};
pub use nodes::{evaluate_research, resolve_answer_citations, EvaluateResearch};
pub use prompts::ResearchPrompts;
pub use state::{OverallState, Query, Reflection, SearchQueryList, SourceSegment};
pub use workflow::{build_research_workflow, signal, ResearchAgent, ResearchNode, ResearchRequest};
