//! Research workflow graph and agent entry point
//!
//! ```text
//! generate_query ──▶ web_research ──▶ reflection
//!                         ▲               │ evaluate_research
//!                         │  web_research │
//!                         └───────────────┤
//!                                         │ finalize_answer
//!                                         ▼
//!                                  finalize_answer ──▶ END
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::WorkflowError;
use crate::llm::GenerationService;
use crate::research::config::ResearchConfig;
use crate::research::nodes::{
    EvaluateResearch, FinalizeAnswerNode, GenerateQueryNode, NodeDeps, ReflectionNode,
    WebResearchNode,
};
use crate::research::state::OverallState;
use crate::state::Message;
use crate::workflow::{
    CompiledWorkflow, ExecutionFailure, RunContext, Target, WorkflowBuildError, WorkflowGraph,
};

/// Transition signals emitted by the research nodes.
pub mod signal {
    pub const WEB_RESEARCH: &str = "web_research";
    pub const REFLECTION: &str = "reflection";
    pub const EVALUATE_RESEARCH: &str = "evaluate_research";
    pub const FINALIZE_ANSWER: &str = "finalize_answer";
}

/// Nodes of the research graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchNode {
    GenerateQuery,
    WebResearch,
    Reflection,
    FinalizeAnswer,
}

impl ResearchNode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchNode::GenerateQuery => "generate_query",
            ResearchNode::WebResearch => "web_research",
            ResearchNode::Reflection => "reflection",
            ResearchNode::FinalizeAnswer => "finalize_answer",
        }
    }
}

impl fmt::Display for ResearchNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire the research graph around a generation service.
pub fn build_research_workflow(
    service: Arc<dyn GenerationService>,
    config: Arc<ResearchConfig>,
) -> Result<CompiledWorkflow<ResearchNode, OverallState>, WorkflowBuildError> {
    let max_loops = config.max_research_loops;
    let deps = NodeDeps::new(service, config);

    WorkflowGraph::new()
        .name("research")
        .node(ResearchNode::GenerateQuery, GenerateQueryNode::new(deps.clone()))
        .node(ResearchNode::WebResearch, WebResearchNode::new(deps.clone()))
        .node(ResearchNode::Reflection, ReflectionNode::new(deps.clone()))
        .node(ResearchNode::FinalizeAnswer, FinalizeAnswerNode::new(deps))
        .entry(ResearchNode::GenerateQuery)
        .edge(ResearchNode::GenerateQuery, ResearchNode::WebResearch)
        .edge(ResearchNode::WebResearch, ResearchNode::Reflection)
        .conditional_edges(
            ResearchNode::Reflection,
            EvaluateResearch::new(max_loops),
            [
                (signal::WEB_RESEARCH, Target::Node(ResearchNode::WebResearch)),
                (signal::FINALIZE_ANSWER, Target::Node(ResearchNode::FinalizeAnswer)),
            ],
        )
        .finish(ResearchNode::FinalizeAnswer)
        .build()
}

/// One invocation of the research agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub reasoning_model: Option<String>,
    #[serde(default)]
    pub max_research_loops: Option<usize>,
    #[serde(default)]
    pub initial_search_query_count: Option<usize>,
    /// Node invocation cap; the configured default when unset
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

impl ResearchRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn question(question: impl Into<String>) -> Self {
        Self::new(vec![Message::human(question)])
    }

    pub fn with_reasoning_model(mut self, model: impl Into<String>) -> Self {
        self.reasoning_model = Some(model.into());
        self
    }

    pub fn with_max_research_loops(mut self, loops: usize) -> Self {
        self.max_research_loops = Some(loops);
        self
    }

    pub fn with_initial_queries(mut self, count: usize) -> Self {
        self.initial_search_query_count = Some(count);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Initial workflow state; unset overrides stay 0 / None so the nodes
    /// fall back to the configured defaults
    pub fn into_state(self) -> OverallState {
        OverallState {
            messages: self.messages,
            reasoning_model: self.reasoning_model.filter(|model| !model.is_empty()),
            max_research_loops: self.max_research_loops.unwrap_or(0),
            initial_search_query_count: self.initial_search_query_count.unwrap_or(0),
            ..Default::default()
        }
    }
}

/// Iterative research agent: the compiled research graph plus its defaults.
pub struct ResearchAgent {
    config: Arc<ResearchConfig>,
    service_name: String,
    workflow: CompiledWorkflow<ResearchNode, OverallState>,
}

impl fmt::Debug for ResearchAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchAgent")
            .field("config", &self.config)
            .field("service", &self.service_name)
            .finish_non_exhaustive()
    }
}

impl ResearchAgent {
    /// Validate `config` and compile the research graph.
    pub fn new(
        config: ResearchConfig,
        service: Arc<dyn GenerationService>,
    ) -> Result<Self, WorkflowError> {
        config
            .validate()
            .map_err(|e| WorkflowError::Configuration(e.to_string()))?;

        let config = Arc::new(config);
        let service_name = service.name().to_string();
        let workflow = build_research_workflow(service, config.clone())?;

        Ok(Self {
            config,
            service_name,
            workflow,
        })
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Run the research loop for `request`.
    ///
    /// On failure the returned state is the one as of the last successful
    /// step.
    pub async fn invoke(
        &self,
        ctx: &RunContext,
        request: ResearchRequest,
    ) -> Result<OverallState, ExecutionFailure<OverallState>> {
        let max_iterations = request.max_iterations.unwrap_or(self.config.max_iterations);

        info!(
            run_id = %ctx.run_id,
            service = %self.service_name,
            max_iterations,
            "Starting research"
        );

        let state = self
            .workflow
            .execute(ctx, request.into_state(), max_iterations)
            .await?;

        info!(
            run_id = %ctx.run_id,
            loops = state.research_loop_count,
            sources = state.sources_gathered.len(),
            "Research finished"
        );

        Ok(state)
    }
}
