//! Research workflow state
//!
//! [`OverallState`] is the single value threaded through every node of the
//! research graph. Append-only collections (`web_research_results`,
//! `sources_gathered`) grow across loops and are only compacted by the
//! finalize step.

use serde::{Deserialize, Serialize};

use crate::state::Message;

/// A search query proposed by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// The query text sent to web research
    #[serde(rename = "query", alias = "Query")]
    pub text: String,

    /// Why the model proposed it; informational only
    #[serde(default, alias = "Rationale")]
    pub rationale: String,
}

impl Query {
    pub fn new(text: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rationale: rationale.into(),
        }
    }

    /// A follow-up query, which carries no rationale
    pub fn follow_up(text: impl Into<String>) -> Self {
        Self::new(text, "")
    }
}

/// A cited source found during web research.
///
/// Several segments may share a `value`; duplicates are collapsed when the
/// answer is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSegment {
    /// Canonical source URL
    pub value: String,
    /// Short reference embedded in research text in place of the URL
    pub short_url: String,
    /// Ordinal of the web research query that produced the citation
    pub link_id: String,
}

/// Structured reply of the query generation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQueryList {
    pub query: Vec<Query>,
}

/// Structured reply of the reflection step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub is_sufficient: bool,
    pub knowledge_gap: String,
    pub follow_up_queries: Vec<String>,
}

/// State of one research run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallState {
    /// Conversation history; a single assistant answer once finalized
    pub messages: Vec<Message>,

    /// Queries for the next (or just completed) web research round
    pub search_queries: Vec<Query>,

    /// Citation-annotated research text, one entry per executed query
    pub web_research_results: Vec<String>,

    /// Every cited source so far; deduplicated at finalize
    pub sources_gathered: Vec<SourceSegment>,

    /// Initial query count override; 0 uses the configured default
    pub initial_search_query_count: usize,

    /// Research loop override; 0 uses the configured default
    pub max_research_loops: usize,

    /// Completed reflection rounds
    pub research_loop_count: usize,

    /// Reasoning model override
    pub reasoning_model: Option<String>,

    pub is_sufficient: bool,
    pub knowledge_gap: String,
    pub follow_up_queries: Vec<String>,

    /// Queries executed in the round the last reflection looked at
    pub number_of_ran_queries: usize,
}

impl OverallState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// State for a single question
    pub fn from_question(question: impl Into<String>) -> Self {
        Self::new(vec![Message::human(question)])
    }

    /// Research loop cap after applying the override
    pub fn effective_max_loops(&self, default: usize) -> usize {
        if self.max_research_loops == 0 {
            default
        } else {
            self.max_research_loops
        }
    }

    /// Initial query count after applying the override
    pub fn effective_initial_queries(&self, default: usize) -> usize {
        if self.initial_search_query_count == 0 {
            default
        } else {
            self.initial_search_query_count
        }
    }

    /// Reasoning model after applying the override
    pub fn reasoning_model_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.reasoning_model.as_deref() {
            Some(model) if !model.is_empty() => model,
            _ => default,
        }
    }

    /// Content of the last assistant message
    pub fn answer(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.is_assistant())
            .map(|message| message.content.as_str())
    }
}
