use bonsai_core::{Observer, Status, Subscription, Timer, Value};
use std::collections::BTreeMap;

use crate::action::Action;
use crate::condition::ConditionSpec;
use crate::definition::{AbortType, LogLevel, NodeCategory, NodeSpec, TreeDefinition};
use crate::tree::BehaviourTree;

/// Preorder index of a node inside its tree.
pub type NodeId = usize;

/// Index of a traversal cursor inside its tree. The root iterator is always `0`.
pub type IteratorId = usize;

pub const ROOT_ITERATOR: IteratorId = 0;

/// Runtime node: structural links plus the kind-specific state.
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) child_order: usize,
    pub(crate) children: Vec<NodeId>,
    pub(crate) iterator: IteratorId,
    pub(crate) level: usize,
    pub(crate) subtree_end: NodeId,
    pub(crate) status: Status,
    pub(crate) entered: bool,
    pub(crate) last_run_tick: Option<u64>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name if one was given, otherwise the kind name.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.kind_name())
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.kind_name()
    }

    pub fn category(&self) -> NodeCategory {
        match self.kind {
            NodeKind::Composite(_) => NodeCategory::Composite,
            NodeKind::Decorator(_) | NodeKind::Abort(_) => NodeCategory::Decorator,
            NodeKind::Task(_) => NodeCategory::Task,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Position of this node among its parent's children.
    pub fn child_order(&self) -> usize {
        self.child_order
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn iterator(&self) -> IteratorId {
        self.iterator
    }

    /// Depth below the root, which is level 0.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Last preorder index inside this node's subtree.
    pub fn subtree_end(&self) -> NodeId {
        self.subtree_end
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Entered and not yet exited.
    pub fn is_active(&self) -> bool {
        self.entered
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, NodeKind::Composite(_))
    }

    /// Rebuilds the configuration this node was instantiated from.
    pub fn to_spec(&self) -> NodeSpec {
        self.kind.to_spec()
    }
}

pub(crate) enum NodeKind {
    Composite(Composite),
    Decorator(Decorator),
    Abort(ConditionalAbort),
    Task(Task),
}

impl NodeKind {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Composite(c) => match c.kind {
                CompositeKind::Sequence => "sequence",
                CompositeKind::Selector => "selector",
                CompositeKind::RandomSequence => "random_sequence",
                CompositeKind::Parallel => "parallel",
                CompositeKind::ParallelSelector => "parallel_selector",
            },
            NodeKind::Decorator(d) => match d {
                Decorator::UntilSuccess => "until_success",
                Decorator::UntilFailure => "until_failure",
                Decorator::Success => "success",
                Decorator::Failure => "failure",
                Decorator::Inverter => "inverter",
                Decorator::Repeater { .. } => "repeater",
                Decorator::Interruptable(_) => "interruptable",
                Decorator::Guard(_) => "guard",
            },
            NodeKind::Abort(a) => match a.condition {
                AbortCondition::Blackboard(_) => "conditional_abort",
                AbortCondition::Cooldown { .. } => "cooldown",
            },
            NodeKind::Task(t) => match t {
                Task::Condition(_) => "condition",
                Task::Wait { .. } => "wait",
                Task::Idle => "idle",
                Task::Include(_) => "include",
                Task::Interruptor { .. } => "interruptor",
                Task::Chance { .. } => "chance",
                Task::Log { .. } => "log",
                Task::Action(_) => "action",
            },
        }
    }

    pub(crate) fn to_spec(&self) -> NodeSpec {
        match self {
            NodeKind::Composite(c) => match c.kind {
                CompositeKind::Sequence => NodeSpec::Sequence,
                CompositeKind::Selector => NodeSpec::Selector,
                CompositeKind::RandomSequence => NodeSpec::RandomSequence,
                CompositeKind::Parallel => NodeSpec::Parallel,
                CompositeKind::ParallelSelector => NodeSpec::ParallelSelector,
            },
            NodeKind::Decorator(d) => match d {
                Decorator::UntilSuccess => NodeSpec::UntilSuccess,
                Decorator::UntilFailure => NodeSpec::UntilFailure,
                Decorator::Success => NodeSpec::Success,
                Decorator::Failure => NodeSpec::Failure,
                Decorator::Inverter => NodeSpec::Inverter,
                Decorator::Repeater { count, .. } => NodeSpec::Repeater { count: *count },
                Decorator::Interruptable(_) => NodeSpec::Interruptable,
                Decorator::Guard(g) => NodeSpec::Guard {
                    max_active: g.max_active,
                    wait_until_available: g.wait_until_available,
                    return_success_on_skip: g.return_success_on_skip,
                    linked: g.linked.clone(),
                },
            },
            NodeKind::Abort(a) => match &a.condition {
                AbortCondition::Blackboard(condition) => NodeSpec::ConditionalAbort {
                    abort_type: a.abort_type,
                    condition: condition.clone(),
                },
                AbortCondition::Cooldown { timer, .. } => NodeSpec::Cooldown {
                    interval: timer.interval,
                    deviation: timer.deviation,
                    abort_type: a.abort_type,
                },
            },
            NodeKind::Task(t) => match t {
                Task::Condition(condition) => NodeSpec::Condition {
                    condition: condition.clone(),
                },
                Task::Wait { timer } => NodeSpec::Wait {
                    interval: timer.interval,
                    deviation: timer.deviation,
                },
                Task::Idle => NodeSpec::Idle,
                Task::Include(include) => NodeSpec::Include {
                    tree: include.template.clone(),
                    isolate_blackboard: include.isolate_blackboard,
                },
                Task::Interruptor {
                    linked,
                    return_success,
                } => NodeSpec::Interruptor {
                    linked: linked.clone(),
                    return_success: *return_success,
                },
                Task::Chance { probability } => NodeSpec::Chance {
                    probability: *probability,
                },
                Task::Log { message, level } => NodeSpec::Log {
                    message: message.clone(),
                    level: *level,
                },
                Task::Action(action) => NodeSpec::Action {
                    name: action.name.clone(),
                    params: action.params.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompositeKind {
    Sequence,
    Selector,
    RandomSequence,
    Parallel,
    ParallelSelector,
}

pub(crate) struct Composite {
    pub(crate) kind: CompositeKind,
    /// Position in `order` of the child currently being visited.
    pub(crate) current: usize,
    /// Visitation order as child positions. Identity except for random sequences.
    pub(crate) order: Vec<usize>,
    /// One cursor per child for parallel composites.
    pub(crate) branches: Vec<IteratorId>,
    pub(crate) branch_status: Vec<Status>,
}

impl Composite {
    pub(crate) fn new(kind: CompositeKind, child_count: usize) -> Self {
        Self {
            kind,
            current: 0,
            order: (0..child_count).collect(),
            branches: Vec::new(),
            branch_status: vec![Status::Inactive; child_count],
        }
    }

    pub(crate) fn is_parallel(&self) -> bool {
        matches!(
            self.kind,
            CompositeKind::Parallel | CompositeKind::ParallelSelector
        )
    }

    /// Position in the visitation order of the child at `child_order`.
    pub(crate) fn position_of(&self, child_order: usize) -> Option<usize> {
        self.order.iter().position(|&c| c == child_order)
    }

    pub(crate) fn current_child(&self) -> Option<usize> {
        self.order.get(self.current).copied()
    }
}

pub(crate) enum Decorator {
    UntilSuccess,
    UntilFailure,
    Success,
    Failure,
    Inverter,
    Repeater { count: Option<u32>, iterations: u32 },
    Interruptable(InterruptableState),
    Guard(GuardState),
}

#[derive(Default)]
pub(crate) struct InterruptableState {
    pub(crate) running: bool,
    pub(crate) interrupted: bool,
    pub(crate) return_status: Status,
}

pub(crate) struct GuardState {
    pub(crate) max_active: u32,
    pub(crate) wait_until_available: bool,
    pub(crate) return_success_on_skip: bool,
    pub(crate) linked: Vec<NodeId>,
    pub(crate) child_ran: bool,
}

pub(crate) struct ConditionalAbort {
    pub(crate) abort_type: AbortType,
    pub(crate) condition: AbortCondition,
    pub(crate) observer: Option<Observer>,
    pub(crate) subscription: Option<Subscription>,
    pub(crate) observing: bool,
    pub(crate) child_entered: bool,
}

impl ConditionalAbort {
    pub(crate) fn new(abort_type: AbortType, condition: AbortCondition) -> Self {
        Self {
            abort_type,
            condition,
            observer: None,
            subscription: None,
            observing: false,
            child_entered: false,
        }
    }
}

pub(crate) enum AbortCondition {
    Blackboard(ConditionSpec),
    /// Holds while the timer is done; replays the child's last result while cooling down.
    Cooldown { timer: Timer, last_status: Status },
}

pub(crate) enum Task {
    Condition(ConditionSpec),
    Wait { timer: Timer },
    Idle,
    Include(IncludeState),
    Interruptor {
        linked: Vec<NodeId>,
        return_success: bool,
    },
    Chance { probability: f32 },
    Log { message: String, level: LogLevel },
    Action(ActionState),
}

pub(crate) struct IncludeState {
    pub(crate) template: Option<Box<TreeDefinition>>,
    pub(crate) isolate_blackboard: bool,
    pub(crate) tree: Option<Box<BehaviourTree>>,
}

pub(crate) struct ActionState {
    pub(crate) name: String,
    pub(crate) params: BTreeMap<String, Value>,
    pub(crate) action: Box<dyn Action>,
}
