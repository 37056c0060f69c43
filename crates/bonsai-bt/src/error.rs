use thiserror::Error;

use crate::node::NodeId;

/// Malformed tree definition. Fatal to instantiation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("tree definition has no nodes")]
    Empty,
    #[error("node {node} lists child {child}, but the tree only has {len} nodes")]
    ChildOutOfRange { node: NodeId, child: NodeId, len: usize },
    #[error("cycle detected: node {node} links back to node {child}")]
    Cycle { node: NodeId, child: NodeId },
    #[error("node {node} has more than one parent")]
    MultipleParents { node: NodeId },
    #[error("node {node} is not reachable from the root")]
    Unreachable { node: NodeId },
    #[error("nodes are not in preorder: expected index {expected}, found {found}")]
    NotPreorder { expected: NodeId, found: NodeId },
    #[error("node {node} ({kind}) expects {expected} children, found {found}")]
    Arity {
        node: NodeId,
        kind: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("node {node} has invalid configuration: {reason}")]
    InvalidConfig { node: NodeId, reason: String },
    #[error("node {node} references unknown task `{name}`")]
    UnknownTask { node: NodeId, name: String },
    #[error("included tree at node {node} is invalid: {source}")]
    Include {
        node: NodeId,
        #[source]
        source: Box<TreeError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceErrorKind {
    OutOfRange,
    WrongKind { expected: &'static str },
    SelfLink,
}

/// Cross-node link that could not be resolved. The link is dropped, the tree keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("node {node} links to node {target}: {}", describe(.kind))]
pub struct ReferenceError {
    pub node: NodeId,
    pub target: NodeId,
    pub kind: ReferenceErrorKind,
}

fn describe(kind: &ReferenceErrorKind) -> String {
    match kind {
        ReferenceErrorKind::OutOfRange => "target is outside the tree".to_string(),
        ReferenceErrorKind::WrongKind { expected } => format!("target is not {expected}"),
        ReferenceErrorKind::SelfLink => "a node cannot link to itself".to_string(),
    }
}
