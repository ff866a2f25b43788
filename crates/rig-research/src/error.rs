//! Error types shared across the crate
//!
//! `ProviderError` covers failures of the external generation service.
//! `WorkflowError` is what nodes, routers and the engine itself surface; a
//! provider failure becomes a node failure through `From`.

use thiserror::Error;

/// Failure reported by a generation service.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("HTTP error ({0}): {1}")]
    Http(u16, String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Response contained no candidates")]
    EmptyResponse,

    #[error("Backend error: {0}")]
    Backend(String),
}

impl ProviderError {
    /// Transient failures worth another attempt by a client that retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout
                | ProviderError::Connection(_)
                | ProviderError::RateLimited
                | ProviderError::Server(_, _)
        )
    }
}

/// Errors raised while building or executing a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Unknown node, missing entry point, or another wiring defect
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A router produced a signal that its edge map does not contain
    #[error("Routing error in '{node}': no target mapped for signal '{signal}'")]
    Routing { node: String, signal: String },

    /// The generation service call failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A structured reply did not match the requested schema
    #[error("Failed to deserialize {target}: {source}")]
    Deserialization {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The run context was cancelled while the node was running
    #[error("Workflow cancelled")]
    Cancelled,

    /// Any other failure raised by a node behavior
    #[error("Node failed: {0}")]
    Node(String),
}

impl WorkflowError {
    /// Create a routing error
    pub fn routing(node: impl ToString, signal: impl Into<String>) -> Self {
        Self::Routing {
            node: node.to_string(),
            signal: signal.into(),
        }
    }

    /// Create a deserialization error for the named target type
    pub fn deserialization(target: &'static str, source: serde_json::Error) -> Self {
        Self::Deserialization { target, source }
    }

    /// Configuration and routing defects are programming errors, never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Routing { .. })
    }
}
