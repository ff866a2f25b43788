//! Compatibility layer for Rig framework integration
//!
//! Bridges Rig's provider clients to the crate's [`GenerationService`]
//! trait so any model Rig can reach can drive the research workflow.
//!
//! ```rust,ignore
//! use rig_research::compat::RigOllamaService;
//!
//! let service = RigOllamaService::from_env();
//! let agent = ResearchAgent::new(config, Arc::new(service))?;
//! ```
//!
//! [`GenerationService`]: crate::llm::GenerationService

mod rig_ollama;

pub use rig_ollama::RigOllamaService;
