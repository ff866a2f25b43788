//! CompiledWorkflow: the execution loop
//!
//! Execution starts at the entry node and repeats:
//!
//! 1. stop successfully when the current target is [`Target::End`]
//! 2. run the node behavior (a failure aborts with the pre-call state)
//! 3. follow the node's outgoing edge; no edge means an implicit end, a
//!    conditional edge asks its router for a signal on the post-behavior state
//!
//! until the terminal marker is reached or `max_iterations` node invocations
//! have happened. Hitting the cap is not an error: the current state is
//! returned as-is and a warning is logged.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::WorkflowError;
use crate::workflow::context::RunContext;
use crate::workflow::graph::Edge;
use crate::workflow::node::{Node, NodeId, Target};

/// A failed execution: the error plus the state as of the last good step.
#[derive(Debug)]
pub struct ExecutionFailure<S> {
    pub state: S,
    pub error: WorkflowError,
}

impl<S> ExecutionFailure<S> {
    fn new(state: S, error: WorkflowError) -> Self {
        Self { state, error }
    }

    pub fn into_error(self) -> WorkflowError {
        self.error
    }
}

impl<S> fmt::Display for ExecutionFailure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "workflow execution failed: {}", self.error)
    }
}

impl<S: fmt::Debug> std::error::Error for ExecutionFailure<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// A validated workflow graph ready for execution.
///
/// Holds no per-run data; one compiled workflow can serve any number of
/// sequential or concurrent `execute` calls.
pub struct CompiledWorkflow<N, S> {
    name: String,
    nodes: HashMap<N, Arc<dyn Node<S>>>,
    edges: HashMap<N, Edge<N, S>>,
    entry_point: N,
}

impl<N: NodeId, S> fmt::Debug for CompiledWorkflow<N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledWorkflow")
            .field("name", &self.name)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("entry_point", &self.entry_point)
            .finish()
    }
}

impl<N: NodeId, S> CompiledWorkflow<N, S> {
    pub(crate) fn new(
        name: String,
        nodes: HashMap<N, Arc<dyn Node<S>>>,
        edges: HashMap<N, Edge<N, S>>,
        entry_point: N,
    ) -> Self {
        Self {
            name,
            nodes,
            edges,
            entry_point,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_point(&self) -> N {
        self.entry_point
    }

    /// Whether a behavior is registered for `id`
    pub fn contains(&self, id: N) -> bool {
        self.nodes.contains_key(&id)
    }
}

impl<N, S> CompiledWorkflow<N, S>
where
    N: NodeId,
    S: Clone + Send + 'static,
{
    /// Run the workflow from the entry point.
    ///
    /// Returns the final state, or the failure together with the state as of
    /// just before the failing behavior or router call.
    pub async fn execute(
        &self,
        ctx: &RunContext,
        initial_state: S,
        max_iterations: usize,
    ) -> Result<S, ExecutionFailure<S>> {
        let mut state = initial_state;
        let mut current = Target::Node(self.entry_point);

        info!(
            workflow = %self.name,
            run_id = %ctx.run_id,
            entry = %self.entry_point,
            max_iterations,
            "Starting workflow execution"
        );

        for iteration in 0..max_iterations {
            let node_id = match current {
                Target::End => break,
                Target::Node(id) => id,
            };

            let Some(node) = self.nodes.get(&node_id) else {
                let error = WorkflowError::Configuration(format!(
                    "node '{node_id}' not found in graph definition"
                ));
                return Err(ExecutionFailure::new(state, error));
            };

            debug!(run_id = %ctx.run_id, node = %node_id, iteration, "Executing node");

            let snapshot = state.clone();
            let command = match node.run(ctx, state).await {
                Ok(command) => command,
                Err(error) => {
                    warn!(run_id = %ctx.run_id, node = %node_id, error = %error, "Node failed");
                    return Err(ExecutionFailure::new(snapshot, error));
                }
            };
            state = command.state;

            debug!(run_id = %ctx.run_id, node = %node_id, signal = %command.signal, "Finished node");

            current = match self.edges.get(&node_id) {
                None => {
                    debug!(node = %node_id, "Node has no outgoing edges, ending path");
                    Target::End
                }
                Some(Edge::Static(target)) => *target,
                Some(Edge::Conditional { router, targets }) => {
                    let snapshot = state.clone();
                    let routed = match router.route(ctx, state).await {
                        Ok(routed) => routed,
                        Err(error) => {
                            warn!(run_id = %ctx.run_id, node = %node_id, error = %error, "Router failed");
                            return Err(ExecutionFailure::new(snapshot, error));
                        }
                    };

                    let Some(target) = targets.get(&routed.signal) else {
                        let error = WorkflowError::routing(node_id, routed.signal);
                        warn!(run_id = %ctx.run_id, error = %error, "Unmapped routing signal");
                        return Err(ExecutionFailure::new(snapshot, error));
                    };

                    debug!(node = %node_id, signal = %routed.signal, next = %target, "Router decided");
                    state = routed.state;
                    *target
                }
            };
        }

        if current.is_end() {
            info!(workflow = %self.name, run_id = %ctx.run_id, "Workflow reached END");
        } else {
            warn!(
                workflow = %self.name,
                run_id = %ctx.run_id,
                max_iterations,
                pending = %current,
                "Workflow reached max iterations without reaching END"
            );
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::graph::WorkflowGraph;
    use crate::workflow::node::{Command, FnNode, FnRouter, NodeResult, Router};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Step {
        First,
        Second,
        Loop,
        Decide,
    }

    impl fmt::Display for Step {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt::Debug::fmt(self, f)
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Trace {
        visited: Vec<&'static str>,
        counter: u32,
    }

    fn visit(name: &'static str) -> impl Fn(Trace) -> NodeResult<Trace> + Send + Sync {
        move |mut trace: Trace| {
            trace.visited.push(name);
            trace.counter += 1;
            Ok(Command::new(trace, name))
        }
    }

    fn counting(calls: Arc<AtomicUsize>) -> impl Fn(Trace) -> NodeResult<Trace> + Send + Sync {
        move |mut trace: Trace| {
            calls.fetch_add(1, Ordering::SeqCst);
            trace.counter += 1;
            Ok(Command::new(trace, "again"))
        }
    }

    #[tokio::test]
    async fn test_linear_workflow_reaches_end() {
        let workflow = WorkflowGraph::<Step, Trace>::new()
            .name("linear")
            .node(Step::First, FnNode(visit("first")))
            .node(Step::Second, FnNode(visit("second")))
            .entry(Step::First)
            .edge(Step::First, Step::Second)
            .finish(Step::Second)
            .build()
            .unwrap();

        let state = workflow
            .execute(&RunContext::new(), Trace::default(), 10)
            .await
            .unwrap();

        assert_eq!(state.visited, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_node_without_edges_ends_after_one_step() {
        let calls = Arc::new(AtomicUsize::new(0));
        let workflow = WorkflowGraph::<Step, Trace>::new()
            .node(Step::First, FnNode(counting(calls.clone())))
            .entry(Step::First)
            .build()
            .unwrap();

        let state = workflow
            .execute(&RunContext::new(), Trace::default(), 1_000)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.counter, 1);
    }

    #[tokio::test]
    async fn test_iteration_cap_bounds_invocations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let workflow = WorkflowGraph::<Step, Trace>::new()
            .node(Step::Loop, FnNode(counting(calls.clone())))
            .entry(Step::Loop)
            .edge(Step::Loop, Step::Loop)
            .build()
            .unwrap();

        for cap in [0, 1, 5, 17] {
            calls.store(0, Ordering::SeqCst);
            let state = workflow
                .execute(&RunContext::new(), Trace::default(), cap)
                .await
                .expect("hitting the cap is not an error");

            assert_eq!(calls.load(Ordering::SeqCst), cap);
            assert_eq!(state.counter as usize, cap);
        }
    }

    #[tokio::test]
    async fn test_node_failure_returns_pre_call_state() {
        let workflow = WorkflowGraph::<Step, Trace>::new()
            .node(Step::First, FnNode(visit("first")))
            .node(
                Step::Second,
                FnNode(|_trace: Trace| -> NodeResult<Trace> {
                    Err(WorkflowError::Node("boom".into()))
                }),
            )
            .entry(Step::First)
            .edge(Step::First, Step::Second)
            .build()
            .unwrap();

        let failure = workflow
            .execute(&RunContext::new(), Trace::default(), 10)
            .await
            .unwrap_err();

        assert!(matches!(failure.error, WorkflowError::Node(ref m) if m == "boom"));
        assert_eq!(failure.state.visited, vec!["first"]);
    }

    #[tokio::test]
    async fn test_conditional_routing() {
        let workflow = WorkflowGraph::<Step, Trace>::new()
            .node(Step::Decide, FnNode(visit("decide")))
            .node(Step::First, FnNode(visit("first")))
            .node(Step::Second, FnNode(visit("second")))
            .entry(Step::Decide)
            .conditional_edges(
                Step::Decide,
                FnRouter(|trace: Trace| -> NodeResult<Trace> {
                    let signal = if trace.counter > 1 { "done" } else { "more" };
                    Ok(Command::new(trace, signal))
                }),
                [("more", Target::Node(Step::First)), ("done", Target::End)],
            )
            .edge(Step::First, Step::Decide)
            .build()
            .unwrap();

        let state = workflow
            .execute(&RunContext::new(), Trace::default(), 10)
            .await
            .unwrap();

        assert_eq!(state.visited, vec!["decide", "first", "decide"]);
    }

    #[tokio::test]
    async fn test_router_state_replaces_post_behavior_state() {
        let workflow = WorkflowGraph::<Step, Trace>::new()
            .node(Step::Decide, FnNode(visit("decide")))
            .node(Step::First, FnNode(visit("first")))
            .entry(Step::Decide)
            .conditional_edges(
                Step::Decide,
                FnRouter(|mut trace: Trace| -> NodeResult<Trace> {
                    trace.visited.push("routed");
                    Ok(Command::new(trace, "go"))
                }),
                [("go", Step::First)],
            )
            .build()
            .unwrap();

        let state = workflow
            .execute(&RunContext::new(), Trace::default(), 10)
            .await
            .unwrap();

        assert_eq!(state.visited, vec!["decide", "routed", "first"]);
    }

    #[tokio::test]
    async fn test_unmapped_signal_is_routing_error() {
        let workflow = WorkflowGraph::<Step, Trace>::new()
            .node(Step::Decide, FnNode(visit("decide")))
            .node(Step::First, FnNode(visit("first")))
            .entry(Step::Decide)
            .conditional_edges(
                Step::Decide,
                FnRouter(|mut trace: Trace| -> NodeResult<Trace> {
                    trace.counter = 999;
                    Ok(Command::new(trace, "sideways"))
                }),
                [("go", Step::First)],
            )
            .build()
            .unwrap();

        let failure = workflow
            .execute(&RunContext::new(), Trace::default(), 10)
            .await
            .unwrap_err();

        match &failure.error {
            WorkflowError::Routing { node, signal } => {
                assert_eq!(node, "Decide");
                assert_eq!(signal, "sideways");
            }
            other => panic!("expected routing error, got {other:?}"),
        }
        // state as left by the behavior, untouched by the router
        assert_eq!(failure.state.visited, vec!["decide"]);
        assert_eq!(failure.state.counter, 1);
    }

    struct FailingRouter;

    #[async_trait]
    impl Router<Trace> for FailingRouter {
        async fn route(&self, ctx: &RunContext, state: Trace) -> NodeResult<Trace> {
            ctx.ensure_active()?;
            Ok(Command::new(state, "go"))
        }
    }

    #[tokio::test]
    async fn test_router_failure_aborts() {
        let workflow = WorkflowGraph::<Step, Trace>::new()
            .node(Step::Decide, FnNode(visit("decide")))
            .node(Step::First, FnNode(visit("first")))
            .entry(Step::Decide)
            .conditional_edges(Step::Decide, FailingRouter, [("go", Step::First)])
            .build()
            .unwrap();

        let ctx = RunContext::new();
        ctx.cancel();
        let failure = workflow
            .execute(&ctx, Trace::default(), 10)
            .await
            .unwrap_err();

        assert!(matches!(failure.error, WorkflowError::Cancelled));
        assert_eq!(failure.state.visited, vec!["decide"]);
    }

    static_assertions::assert_impl_all!(CompiledWorkflow<Step, Trace>: Send, Sync);

    #[test]
    fn test_execution_failure_display() {
        let failure = ExecutionFailure::new(0u8, WorkflowError::Cancelled);
        assert_eq!(failure.to_string(), "workflow execution failed: Workflow cancelled");
        assert!(matches!(failure.into_error(), WorkflowError::Cancelled));
    }
}
