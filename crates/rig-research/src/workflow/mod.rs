//! Generic workflow engine
//!
//! A small graph runtime: nodes are async behaviors over a single state value,
//! edges are either static or decided by a [`Router`] on a conditional edge.
//!
//! # Example
//!
//! ```rust,ignore
//! use rig_research::workflow::{Command, FnNode, RunContext, WorkflowGraph};
//!
//! let workflow = WorkflowGraph::new()
//!     .name("counter")
//!     .node(Step::Count, FnNode(|n: u32| Ok(Command::new(n + 1, "done"))))
//!     .entry(Step::Count)
//!     .finish(Step::Count)
//!     .build()?;
//!
//! let result = workflow.execute(&RunContext::new(), 0, 10).await;
//! ```

pub mod compiled;
pub mod context;
pub mod graph;
pub mod node;

pub use compiled::{CompiledWorkflow, ExecutionFailure};
pub use context::RunContext;
pub use graph::{WorkflowBuildError, WorkflowGraph};
pub use node::{Command, FnNode, FnRouter, Node, NodeId, NodeResult, Router, Target, END_SIGNAL};
