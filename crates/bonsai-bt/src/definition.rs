use std::collections::BTreeMap;

use bonsai_core::Value;
use serde::{Deserialize, Serialize};

use crate::condition::ConditionSpec;
use crate::error::TreeError;
use crate::node::NodeId;

/// Which branches a conditional abort may cut short when its condition flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortType {
    #[default]
    None,
    /// Re-enter this branch when the condition becomes true while a later sibling runs.
    LowerPriority,
    /// Abort this branch when the condition becomes false while it runs.
    #[serde(rename = "self")]
    SelfOnly,
    Both,
}

impl AbortType {
    pub fn aborts_self(self) -> bool {
        matches!(self, AbortType::SelfOnly | AbortType::Both)
    }

    pub fn aborts_lower_priority(self) -> bool {
        matches!(self, AbortType::LowerPriority | AbortType::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    Composite,
    Decorator,
    Task,
}

fn one() -> u32 {
    1
}

/// Per-node configuration, tagged by `type` in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeSpec {
    Sequence,
    Selector,
    RandomSequence,
    Parallel,
    ParallelSelector,
    UntilSuccess,
    UntilFailure,
    Success,
    Failure,
    Inverter,
    Repeater {
        /// `None` repeats forever.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u32>,
    },
    Interruptable,
    Guard {
        #[serde(default = "one")]
        max_active: u32,
        #[serde(default)]
        wait_until_available: bool,
        #[serde(default)]
        return_success_on_skip: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        linked: Vec<NodeId>,
    },
    ConditionalAbort {
        #[serde(default)]
        abort_type: AbortType,
        condition: ConditionSpec,
    },
    Cooldown {
        interval: f32,
        #[serde(default)]
        deviation: f32,
        #[serde(default)]
        abort_type: AbortType,
    },
    Condition {
        condition: ConditionSpec,
    },
    Wait {
        interval: f32,
        #[serde(default)]
        deviation: f32,
    },
    Idle,
    Include {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tree: Option<Box<TreeDefinition>>,
        #[serde(default)]
        isolate_blackboard: bool,
    },
    Interruptor {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        linked: Vec<NodeId>,
        #[serde(default)]
        return_success: bool,
    },
    Chance {
        probability: f32,
    },
    Log {
        message: String,
        #[serde(default)]
        level: LogLevel,
    },
    Action {
        /// Registry key; serialized as `task` so it does not clash with the node label.
        #[serde(rename = "task")]
        name: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        params: BTreeMap<String, Value>,
    },
}

impl NodeSpec {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeSpec::Sequence => "sequence",
            NodeSpec::Selector => "selector",
            NodeSpec::RandomSequence => "random_sequence",
            NodeSpec::Parallel => "parallel",
            NodeSpec::ParallelSelector => "parallel_selector",
            NodeSpec::UntilSuccess => "until_success",
            NodeSpec::UntilFailure => "until_failure",
            NodeSpec::Success => "success",
            NodeSpec::Failure => "failure",
            NodeSpec::Inverter => "inverter",
            NodeSpec::Repeater { .. } => "repeater",
            NodeSpec::Interruptable => "interruptable",
            NodeSpec::Guard { .. } => "guard",
            NodeSpec::ConditionalAbort { .. } => "conditional_abort",
            NodeSpec::Cooldown { .. } => "cooldown",
            NodeSpec::Condition { .. } => "condition",
            NodeSpec::Wait { .. } => "wait",
            NodeSpec::Idle => "idle",
            NodeSpec::Include { .. } => "include",
            NodeSpec::Interruptor { .. } => "interruptor",
            NodeSpec::Chance { .. } => "chance",
            NodeSpec::Log { .. } => "log",
            NodeSpec::Action { .. } => "action",
        }
    }

    pub fn category(&self) -> NodeCategory {
        match self {
            NodeSpec::Sequence
            | NodeSpec::Selector
            | NodeSpec::RandomSequence
            | NodeSpec::Parallel
            | NodeSpec::ParallelSelector => NodeCategory::Composite,
            NodeSpec::UntilSuccess
            | NodeSpec::UntilFailure
            | NodeSpec::Success
            | NodeSpec::Failure
            | NodeSpec::Inverter
            | NodeSpec::Repeater { .. }
            | NodeSpec::Interruptable
            | NodeSpec::Guard { .. }
            | NodeSpec::ConditionalAbort { .. }
            | NodeSpec::Cooldown { .. } => NodeCategory::Decorator,
            NodeSpec::Condition { .. }
            | NodeSpec::Wait { .. }
            | NodeSpec::Idle
            | NodeSpec::Include { .. }
            | NodeSpec::Interruptor { .. }
            | NodeSpec::Chance { .. }
            | NodeSpec::Log { .. }
            | NodeSpec::Action { .. } => NodeCategory::Task,
        }
    }

    /// Short human-readable configuration, if the kind has any.
    pub fn summary(&self) -> Option<String> {
        let text = match self {
            NodeSpec::Repeater { count: Some(n) } => format!("x{n}"),
            NodeSpec::Repeater { count: None } => "forever".to_string(),
            NodeSpec::Guard {
                max_active,
                wait_until_available,
                ..
            } => {
                let mode = if *wait_until_available { "wait" } else { "skip" };
                format!("max {max_active}, {mode}")
            }
            NodeSpec::ConditionalAbort {
                abort_type,
                condition,
            } => format!("{}, abort {abort_type:?}", condition.describe()),
            NodeSpec::Cooldown {
                interval,
                abort_type,
                ..
            } => format!("{interval}s, abort {abort_type:?}"),
            NodeSpec::Condition { condition } => condition.describe(),
            NodeSpec::Wait {
                interval,
                deviation,
            } if *deviation > 0.0 => format!("{interval}s ± {deviation}s"),
            NodeSpec::Wait { interval, .. } => format!("{interval}s"),
            NodeSpec::Include { tree: Some(tree), .. } => format!("includes \"{}\"", tree.name),
            NodeSpec::Include { tree: None, .. } => "no tree".to_string(),
            NodeSpec::Interruptor { linked, .. } => format!("interrupts {linked:?}"),
            NodeSpec::Chance { probability } => format!("p = {probability}"),
            NodeSpec::Log { message, .. } => format!("{message:?}"),
            NodeSpec::Action { name, .. } => name.clone(),
            _ => return None,
        };
        Some(text)
    }

    fn check_config(&self, node: NodeId) -> Result<(), TreeError> {
        let invalid = |reason: &str| TreeError::InvalidConfig {
            node,
            reason: reason.to_string(),
        };
        match self {
            NodeSpec::Repeater { count: Some(0) } => Err(invalid("repeat count must be at least 1")),
            NodeSpec::Guard { max_active: 0, .. } => {
                Err(invalid("guard capacity must be at least 1"))
            }
            NodeSpec::Wait {
                interval,
                deviation,
            }
            | NodeSpec::Cooldown {
                interval,
                deviation,
                ..
            } if !(interval.is_finite() && *interval >= 0.0 && deviation.is_finite()) => {
                Err(invalid("interval must be a non-negative number"))
            }
            NodeSpec::Chance { probability } if !(0.0..=1.0).contains(probability) => {
                Err(invalid("probability must be within [0, 1]"))
            }
            NodeSpec::Include {
                tree: Some(tree), ..
            } => tree.validate().map_err(|source| TreeError::Include {
                node,
                source: Box::new(source),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub spec: NodeSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
}

impl NodeDefinition {
    pub fn new(spec: NodeSpec) -> Self {
        Self {
            name: None,
            spec,
            children: Vec::new(),
        }
    }

    /// Name if one was given, otherwise the kind name.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.spec.kind_name())
    }
}

/// Immutable template a [`crate::BehaviourTree`] is instantiated from.
///
/// Nodes are stored in preorder: the root is index 0 and every subtree occupies a contiguous
/// index range starting at its root.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeDefinition {
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<NodeDefinition>,
    /// Entries written to the blackboard when the tree is instantiated.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blackboard: BTreeMap<String, Value>,
}

impl TreeDefinition {
    /// Flattens a nested blueprint into preorder.
    pub fn from_blueprint(name: impl Into<String>, root: NodeBlueprint) -> Self {
        let mut nodes = Vec::new();
        flatten(root, &mut nodes);
        Self {
            name: name.into(),
            nodes,
            blackboard: BTreeMap::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.blackboard.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the first node carrying `name`.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name.as_deref() == Some(name))
    }

    /// Names of every `action` node, in preorder, including those of included trees.
    pub fn action_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for node in &self.nodes {
            match &node.spec {
                NodeSpec::Action { name, .. } => names.push(name.clone()),
                NodeSpec::Include {
                    tree: Some(tree), ..
                } => names.extend(tree.action_names()),
                _ => {}
            }
        }
        names
    }

    /// Checks structure, arity and per-node configuration.
    ///
    /// Cross-node links are not checked here; they are resolved when the tree starts.
    pub fn validate(&self) -> Result<(), TreeError> {
        let len = self.nodes.len();
        if len == 0 {
            return Err(TreeError::Empty);
        }

        let mut parents = vec![0usize; len];
        for (node, def) in self.nodes.iter().enumerate() {
            for &child in &def.children {
                if child >= len {
                    return Err(TreeError::ChildOutOfRange { node, child, len });
                }
                if child == 0 || child == node {
                    return Err(TreeError::Cycle { node, child });
                }
                parents[child] += 1;
                if parents[child] > 1 {
                    return Err(TreeError::MultipleParents { node: child });
                }
            }
        }

        // Walk depth-first from the root; preorder means the walk visits 0, 1, 2, ...
        let mut visited = vec![false; len];
        let mut expected = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node, parent)) = stack.pop() {
            if visited[node] {
                return Err(TreeError::Cycle {
                    node: parent,
                    child: node,
                });
            }
            if node != expected {
                return Err(TreeError::NotPreorder {
                    expected,
                    found: node,
                });
            }
            visited[node] = true;
            expected += 1;
            for &child in self.nodes[node].children.iter().rev() {
                stack.push((child, node));
            }
        }
        if let Some(node) = visited.iter().position(|v| !v) {
            return Err(TreeError::Unreachable { node });
        }

        for (node, def) in self.nodes.iter().enumerate() {
            let found = def.children.len();
            let expected = match def.spec.category() {
                NodeCategory::Composite if found == 0 => Some("at least 1"),
                NodeCategory::Decorator if found != 1 => Some("exactly 1"),
                NodeCategory::Task if found != 0 => Some("no"),
                _ => None,
            };
            if let Some(expected) = expected {
                return Err(TreeError::Arity {
                    node,
                    kind: def.spec.kind_name(),
                    expected,
                    found,
                });
            }
            def.spec.check_config(node)?;
        }

        Ok(())
    }
}

fn flatten(blueprint: NodeBlueprint, out: &mut Vec<NodeDefinition>) -> NodeId {
    let index = out.len();
    out.push(NodeDefinition {
        name: blueprint.name,
        spec: blueprint.spec,
        children: Vec::new(),
    });
    let children: Vec<NodeId> = blueprint
        .children
        .into_iter()
        .map(|child| flatten(child, out))
        .collect();
    out[index].children = children;
    index
}

/// Nested description of a tree, flattened with [`TreeDefinition::from_blueprint`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBlueprint {
    pub name: Option<String>,
    pub spec: NodeSpec,
    pub children: Vec<NodeBlueprint>,
}

impl NodeBlueprint {
    pub fn new(spec: NodeSpec) -> Self {
        Self {
            name: None,
            spec,
            children: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_child(mut self, child: NodeBlueprint) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = NodeBlueprint>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn sequence(children: impl IntoIterator<Item = NodeBlueprint>) -> Self {
        Self::new(NodeSpec::Sequence).with_children(children)
    }

    pub fn selector(children: impl IntoIterator<Item = NodeBlueprint>) -> Self {
        Self::new(NodeSpec::Selector).with_children(children)
    }

    pub fn random_sequence(children: impl IntoIterator<Item = NodeBlueprint>) -> Self {
        Self::new(NodeSpec::RandomSequence).with_children(children)
    }

    pub fn parallel(children: impl IntoIterator<Item = NodeBlueprint>) -> Self {
        Self::new(NodeSpec::Parallel).with_children(children)
    }

    pub fn parallel_selector(children: impl IntoIterator<Item = NodeBlueprint>) -> Self {
        Self::new(NodeSpec::ParallelSelector).with_children(children)
    }

    pub fn decorate(spec: NodeSpec, child: NodeBlueprint) -> Self {
        Self::new(spec).with_child(child)
    }

    pub fn action(name: impl Into<String>) -> Self {
        Self::new(NodeSpec::Action {
            name: name.into(),
            params: BTreeMap::new(),
        })
    }

    pub fn wait(interval: f32) -> Self {
        Self::new(NodeSpec::Wait {
            interval,
            deviation: 0.0,
        })
    }
}
