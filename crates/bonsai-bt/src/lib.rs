//! Tick-driven behaviour tree runtime built on `bonsai-core`.
//!
//! A [`TreeDefinition`] is an immutable template (nodes in preorder); [`BehaviourTree`] is a
//! running instance of it. Each [`update`](BehaviourTree::update) advances timers, delivers
//! conditional-abort evaluations queued by blackboard changes, and resumes traversal.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod condition;
pub mod debugger;
pub mod definition;
pub mod error;
pub mod iterator;
pub mod node;
mod nodes;
pub mod tree;

pub use action::{Action, FnAction, Params, TaskContext, TaskRegistry};
pub use condition::{ConditionSpec, Inequality};
pub use debugger::Debugger;
pub use definition::{
    AbortType, LogLevel, NodeBlueprint, NodeCategory, NodeDefinition, NodeSpec, TreeDefinition,
};
pub use error::{ReferenceError, ReferenceErrorKind, TreeError};
pub use iterator::BehaviourIterator;
pub use node::{IteratorId, Node, NodeId, ROOT_ITERATOR};
pub use tree::{BehaviourTree, TreeOptions};
