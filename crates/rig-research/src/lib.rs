//! rig-research: citation-grounded iterative research on a typed workflow graph
//!
//! - Workflow engine: generic graph of async node behaviors with static and
//!   router-driven conditional edges, an iteration cap and cancellation
//! - Grounding resolver: short references, citation records and marker
//!   insertion for search-grounded model output
//! - Research agent: generate queries, web research, reflect, loop, answer
//! - Generation services: Gemini REST client, Rig/Ollama adapter and a
//!   scripted test double behind one narrow trait
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rig_research::{GeminiClient, ResearchAgent, ResearchConfig, ResearchRequest, RunContext};
//!
//! let service = Arc::new(GeminiClient::from_env()?);
//! let agent = ResearchAgent::new(ResearchConfig::default(), service)?;
//!
//! let state = agent
//!     .invoke(&RunContext::new(), ResearchRequest::question("What is the capital of France?"))
//!     .await?;
//!
//! for source in &state.sources_gathered {
//!     println!("{}", source.value);
//! }
//! ```

pub mod compat;
pub mod error;
pub mod grounding;
pub mod llm;
pub mod research;
pub mod state;
pub mod workflow;

// Re-exports for convenience
pub use error::{ProviderError, WorkflowError};
pub use state::{research_topic, Message, Role};
pub use grounding::{
    build_citations, insert_markers, resolve_short_references, Citation, CitationSegment,
    GroundingChunk, GroundingMetadata, GroundingSupport,
};
pub use workflow::{
    Command, CompiledWorkflow, ExecutionFailure, Node, NodeResult, Router, RunContext, Target,
    WorkflowBuildError, WorkflowGraph,
};
pub use llm::{GeminiClient, GenerateOptions, Generation, GenerationService, OutputSchema, ScriptedService};
pub use compat::RigOllamaService;

// Research agent exports
pub use research::{
    OverallState, Query, ResearchAgent, ResearchConfig, ResearchNode, ResearchRequest,
    SourceSegment,
};
