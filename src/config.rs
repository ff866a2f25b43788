//! # Configuration Module
//!
//! Loads the command-line front end's configuration from the environment
//! (and a `.env` file when present). The research defaults themselves live in
//! the library's [`ResearchConfig`]; this module adds the backend choice and
//! its credentials.

use anyhow::{Context, Result};
use clap::ValueEnum;
use rig_research::ResearchConfig;
use std::env;

// =============================================================================
// BACKEND SELECTION
// =============================================================================
/// Which generation service drives the research loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Gemini REST API with Google Search grounding (citations)
    Gemini,
    /// Local Ollama model through Rig (no grounding, no citations)
    Ollama,
}

impl std::str::FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Backend::Gemini),
            "ollama" => Ok(Backend::Ollama),
            other => anyhow::bail!("RESEARCH_BACKEND must be 'gemini' or 'ollama', got: {}", other),
        }
    }
}

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Front-end configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Generation backend
    pub backend: Backend,

    /// Gemini API key (required for the Gemini backend)
    pub gemini_api_key: Option<String>,

    /// Override for the Gemini endpoint host
    pub gemini_base_url: Option<String>,

    /// Research defaults handed to the agent
    pub research: ResearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Gemini,
            gemini_api_key: None,
            gemini_base_url: None,
            research: ResearchConfig::default(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        let mut config = Config {
            research: ResearchConfig::from_env().context("Invalid research configuration")?,
            ..Config::default()
        };

        if let Ok(val) = env::var("RESEARCH_BACKEND") {
            config.backend = val.parse()?;
        }

        config.gemini_api_key = env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty());
        config.gemini_base_url = env::var("GEMINI_API_BASE_URL").ok().filter(|v| !v.is_empty());

        Ok(config)
    }

    /// Validate the configuration before the agent starts.
    pub fn validate(&self) -> Result<()> {
        self.research
            .validate()
            .context("Invalid research configuration")?;

        if self.backend == Backend::Gemini && self.gemini_api_key.is_none() {
            anyhow::bail!("GEMINI_API_KEY must be set when using the gemini backend (or pass --backend ollama)");
        }

        Ok(())
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.backend, Backend::Gemini);
        assert_eq!(config.research.max_research_loops, 2);
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.gemini_api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = Config {
            backend: Backend::Ollama,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Gemini".parse::<Backend>().unwrap(), Backend::Gemini);
        assert_eq!(" ollama ".parse::<Backend>().unwrap(), Backend::Ollama);
        assert!("openai".parse::<Backend>().is_err());
    }
}
