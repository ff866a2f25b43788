//! WorkflowGraph builder DSL.
//!
//! Provides a fluent API for registering node behaviors, static and
//! conditional edges, and the entry point, then validates the wiring and
//! compiles the graph into a runnable [`CompiledWorkflow`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::error::WorkflowError;
use crate::workflow::compiled::CompiledWorkflow;
use crate::workflow::node::{Node, NodeId, Router, Target};

/// Errors that can occur while building a workflow graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowBuildError {
    #[error("workflow entry point not set")]
    NoEntryPoint,
    #[error("unknown node id: {0}")]
    UnknownNode(String),
    #[error("conditional edge from {0} has no targets")]
    EmptyConditionalMap(String),
}

impl From<WorkflowBuildError> for WorkflowError {
    fn from(err: WorkflowBuildError) -> Self {
        WorkflowError::Configuration(err.to_string())
    }
}

/// Outgoing transition of a node.
pub(crate) enum Edge<N, S> {
    Static(Target<N>),
    Conditional {
        router: Arc<dyn Router<S>>,
        targets: HashMap<String, Target<N>>,
    },
}

impl<N: fmt::Debug, S> fmt::Debug for Edge<N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Static(target) => f.debug_tuple("Static").field(target).finish(),
            Edge::Conditional { targets, .. } => f
                .debug_struct("Conditional")
                .field("targets", targets)
                .finish_non_exhaustive(),
        }
    }
}

/// Builder for constructing workflow graphs with fluent API.
///
/// Registering a second edge from the same node replaces the first.
pub struct WorkflowGraph<N, S> {
    name: String,
    nodes: HashMap<N, Arc<dyn Node<S>>>,
    edges: HashMap<N, Edge<N, S>>,
    entry_point: Option<N>,
}

impl<N: NodeId, S: Send + 'static> Default for WorkflowGraph<N, S> {
    fn default() -> Self {
        Self {
            name: String::new(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry_point: None,
        }
    }
}

impl<N: NodeId, S> fmt::Debug for WorkflowGraph<N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("entry_point", &self.entry_point)
            .finish()
    }
}

impl<N: NodeId, S: Send + 'static> WorkflowGraph<N, S> {
    /// Create a new workflow graph builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workflow name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register a node behavior.
    pub fn node(mut self, id: N, behavior: impl Node<S> + 'static) -> Self {
        self.nodes.insert(id, Arc::new(behavior));
        self
    }

    /// Set the entry point node.
    pub fn entry(mut self, id: N) -> Self {
        self.entry_point = Some(id);
        self
    }

    /// Add an unconditional edge. `to` may be [`Target::End`].
    pub fn edge(mut self, from: N, to: impl Into<Target<N>>) -> Self {
        self.edges.insert(from, Edge::Static(to.into()));
        self
    }

    /// Mark `id` as a finish point (edge to [`Target::End`]).
    pub fn finish(self, id: N) -> Self {
        self.edge(id, Target::End)
    }

    /// Add a conditional edge: after `from` runs, `router` picks a signal
    /// that is looked up in `targets`.
    pub fn conditional_edges<I, T>(mut self, from: N, router: impl Router<S> + 'static, targets: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, T)>,
        T: Into<Target<N>>,
    {
        let targets = targets
            .into_iter()
            .map(|(signal, target)| (signal.to_string(), target.into()))
            .collect();
        self.edges.insert(
            from,
            Edge::Conditional {
                router: Arc::new(router),
                targets,
            },
        );
        self
    }

    /// Validate and compile the workflow graph.
    pub fn build(self) -> Result<CompiledWorkflow<N, S>, WorkflowBuildError> {
        let entry_point = self.entry_point.ok_or(WorkflowBuildError::NoEntryPoint)?;

        let known = |id: &N| -> Result<(), WorkflowBuildError> {
            if self.nodes.contains_key(id) {
                Ok(())
            } else {
                Err(WorkflowBuildError::UnknownNode(id.to_string()))
            }
        };
        let known_target = |target: &Target<N>| match target {
            Target::Node(id) => known(id),
            Target::End => Ok(()),
        };

        known(&entry_point)?;

        for (from, edge) in &self.edges {
            known(from)?;
            match edge {
                Edge::Static(target) => known_target(target)?,
                Edge::Conditional { targets, .. } => {
                    if targets.is_empty() {
                        return Err(WorkflowBuildError::EmptyConditionalMap(from.to_string()));
                    }
                    for target in targets.values() {
                        known_target(target)?;
                    }
                }
            }
        }

        Ok(CompiledWorkflow::new(self.name, self.nodes, self.edges, entry_point))
    }
}
