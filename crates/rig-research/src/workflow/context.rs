//! Per-run execution context
//!
//! Carries the run identifier and the caller's cancellation token. The
//! engine itself never checks the token; behaviors and routers do, and
//! surface cancellation as an ordinary `WorkflowError::Cancelled`.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::WorkflowError;

/// Context handed to every node behavior and router of one `execute` call.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Unique identifier of this run, used in log fields
    pub run_id: String,
    cancellation_token: CancellationToken,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// Create a context with a fresh run id and its own cancellation token
    pub fn new() -> Self {
        Self::with_cancellation_token(CancellationToken::new())
    }

    /// Create a context sharing the caller's cancellation token
    pub fn with_cancellation_token(cancellation_token: CancellationToken) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            cancellation_token,
        }
    }

    /// Override the generated run id
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Fail fast when the run has already been cancelled
    pub fn ensure_active(&self) -> Result<(), WorkflowError> {
        if self.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        Ok(())
    }

    /// Drive `future` to completion unless the run is cancelled first.
    pub async fn run_until_cancelled<F>(&self, future: F) -> Result<F::Output, WorkflowError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => Err(WorkflowError::Cancelled),
            output = future => Ok(output),
        }
    }
}
