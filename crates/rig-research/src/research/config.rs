//! Research agent configuration
//!
//! An immutable value handed to [`ResearchAgent::new`](crate::research::ResearchAgent::new).
//! Per-run overrides travel in the request, never through this struct.

use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default model for query generation and web research
pub const DEFAULT_QUERY_GENERATOR_MODEL: &str = "gemini-2.0-flash";

/// Default model for reflection and the final answer
pub const DEFAULT_REASONING_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// Errors raised while loading or validating a [`ResearchConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidInteger { var: &'static str, value: String },

    #[error("{0} cannot be empty")]
    EmptyModel(&'static str),

    #[error("{0} must be at least 1")]
    ZeroLimit(&'static str),
}

/// Process-wide defaults for the research workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Model used to write search queries and run grounded web research
    pub query_generator_model: String,

    /// Model used for reflection and answer synthesis
    pub reasoning_model: String,

    /// How many queries the first round generates
    pub number_of_initial_queries: usize,

    /// Reflection rounds before the answer is forced
    pub max_research_loops: usize,

    /// Upper bound on node invocations per run
    pub max_iterations: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            query_generator_model: DEFAULT_QUERY_GENERATOR_MODEL.to_string(),
            reasoning_model: DEFAULT_REASONING_MODEL.to_string(),
            number_of_initial_queries: 3,
            max_research_loops: 2,
            max_iterations: 25,
        }
    }
}

impl ResearchConfig {
    /// Defaults overridden by QUERY_GENERATOR_MODEL, REASONING_MODEL,
    /// NUMBER_OF_INITIAL_QUERIES and MAX_RESEARCH_LOOPS.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(val) = present("QUERY_GENERATOR_MODEL") {
            config.query_generator_model = val;
        }
        if let Some(val) = present("REASONING_MODEL") {
            config.reasoning_model = val;
        }
        if let Some(val) = present("NUMBER_OF_INITIAL_QUERIES") {
            config.number_of_initial_queries = parse_count("NUMBER_OF_INITIAL_QUERIES", &val)?;
        }
        if let Some(val) = present("MAX_RESEARCH_LOOPS") {
            config.max_research_loops = parse_count("MAX_RESEARCH_LOOPS", &val)?;
        }

        Ok(config)
    }

    pub fn with_query_generator_model(mut self, model: impl Into<String>) -> Self {
        self.query_generator_model = model.into();
        self
    }

    pub fn with_reasoning_model(mut self, model: impl Into<String>) -> Self {
        self.reasoning_model = model.into();
        self
    }

    pub fn with_initial_queries(mut self, count: usize) -> Self {
        self.number_of_initial_queries = count;
        self
    }

    pub fn with_max_research_loops(mut self, loops: usize) -> Self {
        self.max_research_loops = loops;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Reject values the workflow cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_generator_model.trim().is_empty() {
            return Err(ConfigError::EmptyModel("QUERY_GENERATOR_MODEL"));
        }
        if self.reasoning_model.trim().is_empty() {
            return Err(ConfigError::EmptyModel("REASONING_MODEL"));
        }
        if self.number_of_initial_queries == 0 {
            return Err(ConfigError::ZeroLimit("NUMBER_OF_INITIAL_QUERIES"));
        }
        if self.max_research_loops == 0 {
            return Err(ConfigError::ZeroLimit("MAX_RESEARCH_LOOPS"));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroLimit("max_iterations"));
        }
        Ok(())
    }
}

fn parse_count(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidInteger {
            var,
            value: value.to_string(),
        })
}
