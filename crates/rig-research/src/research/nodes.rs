//! Research node behaviors
//!
//! Each node owns a handle to the generation service and the immutable
//! configuration. Every service call is raced against the run's cancellation
//! token, so a cancelled run surfaces as `WorkflowError::Cancelled` from
//! whichever node was active.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::WorkflowError;
use crate::grounding::{build_citations, insert_markers, resolve_short_references};
use crate::llm::{GenerateOptions, Generation, GenerationService, OutputSchema};
use crate::research::config::ResearchConfig;
use crate::research::prompts::ResearchPrompts;
use crate::research::state::{OverallState, Query, Reflection, SearchQueryList, SourceSegment};
use crate::research::workflow::signal;
use crate::state::{research_topic, Message};
use crate::workflow::{Command, Node, NodeResult, Router, RunContext};

/// Separator between research summaries in the reflection prompt
const REFLECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Separator between research summaries in the answer prompt
const ANSWER_SEPARATOR: &str = "\n---\n\n";

const QUERY_TEMPERATURE: f64 = 1.0;
const REFLECTION_TEMPERATURE: f64 = 1.0;
const SEARCH_TEMPERATURE: f64 = 0.0;
const ANSWER_TEMPERATURE: f64 = 0.0;

/// Shared dependencies of the research nodes.
#[derive(Clone)]
pub(crate) struct NodeDeps {
    pub(crate) service: Arc<dyn GenerationService>,
    pub(crate) config: Arc<ResearchConfig>,
}

impl NodeDeps {
    pub(crate) fn new(service: Arc<dyn GenerationService>, config: Arc<ResearchConfig>) -> Self {
        Self { service, config }
    }

    async fn generate(
        &self,
        ctx: &RunContext,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, WorkflowError> {
        ctx.ensure_active()?;
        let generation = ctx
            .run_until_cancelled(self.service.generate(prompt, options))
            .await??;
        Ok(generation)
    }
}

/// Parse a structured reply, failing instead of defaulting missing fields.
fn parse_structured<T: DeserializeOwned>(
    text: &str,
    target: &'static str,
) -> Result<T, WorkflowError> {
    serde_json::from_str(text.trim()).map_err(|e| WorkflowError::deserialization(target, e))
}

// ==================== Generate query ====================

/// Writes the initial batch of search queries for the topic.
pub struct GenerateQueryNode {
    deps: NodeDeps,
}

impl GenerateQueryNode {
    pub(crate) fn new(deps: NodeDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Node<OverallState> for GenerateQueryNode {
    async fn run(&self, ctx: &RunContext, mut state: OverallState) -> NodeResult<OverallState> {
        let config = &self.deps.config;
        let count = state.effective_initial_queries(config.number_of_initial_queries);
        state.initial_search_query_count = count;

        let prompt = ResearchPrompts::query_writer(
            &research_topic(&state.messages),
            count,
            &ResearchPrompts::current_date(),
        );
        let options = GenerateOptions::new(&config.query_generator_model)
            .with_temperature(QUERY_TEMPERATURE)
            .with_schema(OutputSchema::SearchQueryList);

        let reply = self.deps.generate(ctx, &prompt, &options).await?;
        let list: SearchQueryList = parse_structured(&reply.text, "SearchQueryList")?;

        info!(run_id = %ctx.run_id, queries = list.query.len(), "Generated search queries");

        state.messages.push(Message::assistant(reply.text));
        state.search_queries = list.query;

        Ok(Command::new(state, signal::WEB_RESEARCH))
    }
}

// ==================== Web research ====================

/// Runs one grounded search per pending query and records cited sources.
pub struct WebResearchNode {
    deps: NodeDeps,
}

impl WebResearchNode {
    pub(crate) fn new(deps: NodeDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Node<OverallState> for WebResearchNode {
    async fn run(&self, ctx: &RunContext, mut state: OverallState) -> NodeResult<OverallState> {
        let model = &self.deps.config.query_generator_model;
        let date = ResearchPrompts::current_date();

        // ordinals keep counting across rounds so short references stay unique
        let first_ordinal = state.web_research_results.len();
        let pending = std::mem::take(&mut state.search_queries);

        let mut processed = Vec::with_capacity(pending.len());
        let mut results = Vec::with_capacity(pending.len());
        let mut sources = Vec::new();

        for (offset, query) in pending.into_iter().enumerate() {
            let ordinal = first_ordinal + offset;
            debug!(run_id = %ctx.run_id, ordinal, query = %query.text, "Running web research");

            let prompt = ResearchPrompts::web_searcher(&query.text, &date);
            let options = GenerateOptions::new(model)
                .with_temperature(SEARCH_TEMPERATURE)
                .with_search_tool();

            let reply = self.deps.generate(ctx, &prompt, &options).await?;
            let grounding = reply.grounding_or_default();

            let short_references = resolve_short_references(&grounding.grounding_chunks, ordinal);
            let citations = build_citations(
                &grounding.grounding_supports,
                &grounding.grounding_chunks,
                &short_references,
            );

            let link_id = ordinal.to_string();
            sources.extend(citations.iter().flat_map(|citation| {
                citation.segments.iter().map(|segment| SourceSegment {
                    value: segment.value.clone(),
                    short_url: segment.short_url.clone(),
                    link_id: link_id.clone(),
                })
            }));

            results.push(insert_markers(&reply.text, &citations));
            processed.push(query);
        }

        info!(
            run_id = %ctx.run_id,
            queries = processed.len(),
            sources = sources.len(),
            "Web research round complete"
        );

        state.sources_gathered.extend(sources);
        state.web_research_results.extend(results);
        state.search_queries = processed;

        Ok(Command::new(state, signal::REFLECTION))
    }
}

// ==================== Reflection ====================

/// Judges whether the research so far answers the topic.
pub struct ReflectionNode {
    deps: NodeDeps,
}

impl ReflectionNode {
    pub(crate) fn new(deps: NodeDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Node<OverallState> for ReflectionNode {
    async fn run(&self, ctx: &RunContext, mut state: OverallState) -> NodeResult<OverallState> {
        state.research_loop_count += 1;

        let model = state
            .reasoning_model_or(&self.deps.config.reasoning_model)
            .to_string();
        let prompt = ResearchPrompts::reflection(
            &research_topic(&state.messages),
            &ResearchPrompts::current_date(),
            &state.web_research_results.join(REFLECTION_SEPARATOR),
        );
        let options = GenerateOptions::new(model)
            .with_temperature(REFLECTION_TEMPERATURE)
            .with_schema(OutputSchema::Reflection);

        let reply = self.deps.generate(ctx, &prompt, &options).await?;
        let reflection: Reflection = parse_structured(&reply.text, "Reflection")?;

        info!(
            run_id = %ctx.run_id,
            loop_count = state.research_loop_count,
            sufficient = reflection.is_sufficient,
            follow_ups = reflection.follow_up_queries.len(),
            "Reflected on research"
        );

        state.is_sufficient = reflection.is_sufficient;
        state.knowledge_gap = reflection.knowledge_gap;
        state.follow_up_queries = reflection.follow_up_queries;
        state.number_of_ran_queries = state.search_queries.len();

        Ok(Command::new(state, signal::EVALUATE_RESEARCH))
    }
}

// ==================== Evaluate research ====================

/// Decide between another research round and the final answer.
///
/// Loops back with the follow-up queries as the new pending queries unless
/// the research is sufficient or the loop cap is reached.
pub fn evaluate_research(mut state: OverallState, default_max_loops: usize) -> Command<OverallState> {
    let max_loops = state.effective_max_loops(default_max_loops);

    if state.is_sufficient || state.research_loop_count >= max_loops {
        return Command::new(state, signal::FINALIZE_ANSWER);
    }

    state.search_queries = std::mem::take(&mut state.follow_up_queries)
        .into_iter()
        .map(Query::follow_up)
        .collect();

    Command::new(state, signal::WEB_RESEARCH)
}

/// Router on the reflection node's outgoing edge.
pub struct EvaluateResearch {
    default_max_loops: usize,
}

impl EvaluateResearch {
    pub fn new(default_max_loops: usize) -> Self {
        Self { default_max_loops }
    }
}

#[async_trait]
impl Router<OverallState> for EvaluateResearch {
    async fn route(&self, ctx: &RunContext, state: OverallState) -> NodeResult<OverallState> {
        let command = evaluate_research(state, self.default_max_loops);
        debug!(
            run_id = %ctx.run_id,
            signal = %command.signal,
            loop_count = command.state.research_loop_count,
            "Evaluated research"
        );
        Ok(command)
    }
}

// ==================== Finalize answer ====================

/// Swap short references in `answer` for canonical URLs.
///
/// Returns the rewritten text and the segments whose short reference was
/// cited, deduplicated by canonical URL in first-seen order. Longer short
/// references are replaced first so `.../0-1` never matches inside `.../0-10`.
pub fn resolve_answer_citations(answer: &str, sources: &[SourceSegment]) -> (String, Vec<SourceSegment>) {
    let mut by_length: Vec<usize> = (0..sources.len()).collect();
    by_length.sort_by(|&a, &b| sources[b].short_url.len().cmp(&sources[a].short_url.len()));

    let mut text = answer.to_string();
    let mut cited = vec![false; sources.len()];
    for index in by_length {
        let short_url = &sources[index].short_url;
        if short_url.is_empty() {
            continue;
        }
        if text.contains(short_url.as_str()) {
            text = text.replace(short_url.as_str(), &sources[index].value);
            cited[index] = true;
        }
    }

    // a short reference shared by several segments is replaced once; the
    // remaining segments with the same reference are cited as well
    let replaced: HashSet<&str> = sources
        .iter()
        .zip(&cited)
        .filter(|&(_, &was_cited)| was_cited)
        .map(|(source, _)| source.short_url.as_str())
        .collect();

    let mut seen = HashSet::new();
    let unique = sources
        .iter()
        .filter(|source| replaced.contains(source.short_url.as_str()))
        .filter(|source| seen.insert(source.value.clone()))
        .cloned()
        .collect();

    (text, unique)
}

/// Synthesizes the cited answer and ends the workflow.
pub struct FinalizeAnswerNode {
    deps: NodeDeps,
}

impl FinalizeAnswerNode {
    pub(crate) fn new(deps: NodeDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Node<OverallState> for FinalizeAnswerNode {
    async fn run(&self, ctx: &RunContext, mut state: OverallState) -> NodeResult<OverallState> {
        let model = state
            .reasoning_model_or(&self.deps.config.reasoning_model)
            .to_string();
        let prompt = ResearchPrompts::answer(
            &research_topic(&state.messages),
            &state.web_research_results.join(ANSWER_SEPARATOR),
            &ResearchPrompts::current_date(),
        );
        let options = GenerateOptions::new(model).with_temperature(ANSWER_TEMPERATURE);

        let reply = self.deps.generate(ctx, &prompt, &options).await?;
        let (answer, sources) = resolve_answer_citations(&reply.text, &state.sources_gathered);

        info!(run_id = %ctx.run_id, sources = sources.len(), "Finalized answer");

        state.messages = vec![Message::assistant(answer)];
        state.sources_gathered = sources;

        Ok(Command::end(state))
    }
}
