//! Node behaviors, routers and the command they return
//!
//! A node behavior takes the state by value and hands it back inside a
//! [`Command`] together with a transition signal. A [`Router`] attached to a
//! node's conditional edge runs on the post-behavior state and its signal
//! selects the next node.

use std::fmt;
use std::hash::Hash;

use async_trait::async_trait;

use crate::error::WorkflowError;
use crate::workflow::context::RunContext;

/// Identifier of a node in a workflow graph.
///
/// Implemented for any small copyable key; workflows use a dedicated enum so
/// that a misspelled node is a compile error rather than a dangling edge.
pub trait NodeId: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<T> NodeId for T where T: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

/// Where execution goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target<N> {
    /// Run the given node
    Node(N),
    /// Stop successfully
    End,
}

impl<N> Target<N> {
    pub fn is_end(&self) -> bool {
        matches!(self, Target::End)
    }
}

impl<N> From<N> for Target<N> {
    fn from(node: N) -> Self {
        Target::Node(node)
    }
}

impl<N: fmt::Display> fmt::Display for Target<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(node) => node.fmt(f),
            Target::End => f.write_str(END_SIGNAL),
        }
    }
}

/// Signal emitted by a behavior that finishes the workflow.
pub const END_SIGNAL: &str = "__end__";

/// Result of a node behavior or router: the next state plus a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Command<S> {
    pub state: S,
    pub signal: String,
}

impl<S> Command<S> {
    pub fn new(state: S, signal: impl Into<String>) -> Self {
        Self {
            state,
            signal: signal.into(),
        }
    }

    /// Command that signals the end of the workflow
    pub fn end(state: S) -> Self {
        Self::new(state, END_SIGNAL)
    }
}

pub type NodeResult<S> = Result<Command<S>, WorkflowError>;

/// A workflow step.
#[async_trait]
pub trait Node<S>: Send + Sync {
    async fn run(&self, ctx: &RunContext, state: S) -> NodeResult<S>;
}

/// Routing strategy for a conditional edge.
///
/// The returned state replaces the post-behavior state when the signal maps
/// to a target, so a router may also prepare the state for the next node.
#[async_trait]
pub trait Router<S>: Send + Sync {
    async fn route(&self, ctx: &RunContext, state: S) -> NodeResult<S>;
}

/// Adapter turning a synchronous closure into a [`Node`].
pub struct FnNode<F>(pub F);

#[async_trait]
impl<S, F> Node<S> for FnNode<F>
where
    S: Send + 'static,
    F: Fn(S) -> NodeResult<S> + Send + Sync,
{
    async fn run(&self, _ctx: &RunContext, state: S) -> NodeResult<S> {
        (self.0)(state)
    }
}

/// Adapter turning a synchronous closure into a [`Router`].
pub struct FnRouter<F>(pub F);

#[async_trait]
impl<S, F> Router<S> for FnRouter<F>
where
    S: Send + 'static,
    F: Fn(S) -> NodeResult<S> + Send + Sync,
{
    async fn route(&self, _ctx: &RunContext, state: S) -> NodeResult<S> {
        (self.0)(state)
    }
}
