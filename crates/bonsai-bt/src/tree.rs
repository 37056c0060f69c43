use std::collections::BTreeMap;
use std::fmt;

use bonsai_core::rng::derive_seed;
use bonsai_core::{Actor, Blackboard, SplitMix64, Status, Timer, Value};
use bonsai_tools::{TraceEvent, TraceKind, TraceSink};
use tracing::{debug, error, warn};

use crate::action::TaskRegistry;
use crate::debugger::Debugger;
use crate::definition::{NodeDefinition, NodeSpec, TreeDefinition};
use crate::error::{ReferenceError, ReferenceErrorKind, TreeError};
use crate::iterator::BehaviourIterator;
use crate::node::{
    AbortCondition, ActionState, Composite, CompositeKind, ConditionalAbort, Decorator,
    GuardState, IncludeState, InterruptableState, IteratorId, Node, NodeId, NodeKind, Task,
    ROOT_ITERATOR,
};
use crate::nodes::abort::PendingQueue;

/// How a tree instance is bound when it is instantiated.
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    pub seed: u64,
    pub actor: Option<Actor>,
    /// Share an existing blackboard instead of creating one owned by the tree.
    pub blackboard: Option<Blackboard>,
    pub registry: TaskRegistry,
}

impl TreeOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_blackboard(mut self, blackboard: Blackboard) -> Self {
        self.blackboard = Some(blackboard);
        self
    }

    pub fn with_registry(mut self, registry: TaskRegistry) -> Self {
        self.registry = registry;
        self
    }
}

/// A running instance of a [`TreeDefinition`].
///
/// Nodes live in a contiguous arena indexed by preorder position. The root iterator walks the
/// tree one tick per [`update`](Self::update); parallel composites own one extra iterator per
/// child branch.
pub struct BehaviourTree {
    pub(crate) name: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) iterators: Vec<BehaviourIterator>,
    pub(crate) blackboard: Blackboard,
    owns_blackboard: bool,
    initial_blackboard: BTreeMap<String, Value>,
    pub(crate) actor: Option<Actor>,
    seed: u64,
    pub(crate) rng: SplitMix64,
    pub(crate) registry: TaskRegistry,
    pub(crate) timers: Vec<NodeId>,
    pub(crate) pending: PendingQueue,
    pub(crate) flushing: bool,
    pub(crate) tick: u64,
    pub(crate) dt: f32,
    started: bool,
    last_status: Status,
    reference_errors: Vec<ReferenceError>,
    trace: Option<Box<dyn TraceSink>>,
    pub(crate) debugger: Debugger,
}

impl BehaviourTree {
    /// Instantiates `definition` with default options: seed 0, no actor, an owned blackboard and
    /// an empty task registry.
    pub fn new(definition: &TreeDefinition) -> Result<Self, TreeError> {
        Self::instantiate(definition, TreeOptions::default())
    }

    pub fn instantiate(
        definition: &TreeDefinition,
        options: TreeOptions,
    ) -> Result<Self, TreeError> {
        definition.validate()?;

        let TreeOptions {
            seed,
            actor,
            blackboard,
            registry,
        } = options;
        let owns_blackboard = blackboard.is_none();
        let blackboard = blackboard.unwrap_or_default();
        for (key, value) in &definition.blackboard {
            blackboard.set(key.clone(), value.clone());
        }

        let len = definition.nodes.len();
        let mut parents = vec![None; len];
        let mut orders = vec![0; len];
        for (id, def) in definition.nodes.iter().enumerate() {
            for (order, &child) in def.children.iter().enumerate() {
                parents[child] = Some(id);
                orders[child] = order;
            }
        }

        let mut levels = vec![0; len];
        for id in 1..len {
            if let Some(parent) = parents[id] {
                levels[id] = levels[parent] + 1;
            }
        }

        let mut subtree_ends: Vec<NodeId> = (0..len).collect();
        for id in (0..len).rev() {
            if let Some(&last) = definition.nodes[id].children.last() {
                subtree_ends[id] = subtree_ends[last];
            }
        }

        // Each parallel branch gets its own cursor; nested parallels overwrite their ranges
        // because they come later in preorder.
        let mut iterators = vec![BehaviourIterator::default()];
        let mut assigned = vec![ROOT_ITERATOR; len];
        let mut branches: Vec<Vec<IteratorId>> = vec![Vec::new(); len];
        for (id, def) in definition.nodes.iter().enumerate() {
            if matches!(def.spec, NodeSpec::Parallel | NodeSpec::ParallelSelector) {
                for &child in &def.children {
                    let branch = iterators.len();
                    iterators.push(BehaviourIterator::default());
                    for slot in &mut assigned[child..=subtree_ends[child]] {
                        *slot = branch;
                    }
                    branches[id].push(branch);
                }
            }
        }

        let mut nodes = Vec::with_capacity(len);
        for (id, def) in definition.nodes.iter().enumerate() {
            let mut kind = build_kind(id, def, seed, &actor, &blackboard, &registry)?;
            if let NodeKind::Composite(composite) = &mut kind {
                composite.branches = std::mem::take(&mut branches[id]);
            }
            nodes.push(Node {
                id,
                name: def.name.clone(),
                parent: parents[id],
                child_order: orders[id],
                children: def.children.clone(),
                iterator: assigned[id],
                level: levels[id],
                subtree_end: subtree_ends[id],
                status: Status::Inactive,
                entered: false,
                last_run_tick: None,
                kind,
            });
        }

        debug!(tree = %definition.name, nodes = len, iterators = iterators.len(), seed, "tree instantiated");

        Ok(Self {
            name: definition.name.clone(),
            nodes,
            iterators,
            blackboard,
            owns_blackboard,
            initial_blackboard: definition.blackboard.clone(),
            actor,
            seed,
            rng: SplitMix64::new(seed),
            registry,
            timers: Vec::new(),
            pending: PendingQueue::default(),
            flushing: false,
            tick: 0,
            dt: 0.0,
            started: false,
            last_status: Status::Inactive,
            reference_errors: Vec::new(),
            trace: None,
            debugger: Debugger::default(),
        })
    }

    /// Resolves cross-node links and calls `on_start` on every node in preorder.
    ///
    /// Starting twice is a no-op.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.resolve_references();
        for id in 0..self.nodes.len() {
            self.start_node(id);
        }
        self.started = true;
        debug!(tree = %self.name, "tree started");
    }

    /// Queues the root for entry. The first [`update`](Self::update) enters and runs it.
    pub fn begin_traversal(&mut self) {
        if !self.started {
            self.start();
        }
        if self.is_running() {
            warn!(tree = %self.name, "begin_traversal called while the tree is already running");
            return;
        }
        self.last_status = Status::Running;
        self.traverse(ROOT_ITERATOR, 0);
    }

    /// Advances timers, delivers pending abort evaluations, then resumes the root iterator.
    ///
    /// Returns `Running` while the root is active, then the root's terminal status. Updating a
    /// tree that is not running returns the last status without doing anything.
    pub fn update(&mut self, delta_seconds: f32) -> Status {
        let dt = if delta_seconds.is_finite() && delta_seconds >= 0.0 {
            delta_seconds
        } else {
            warn!(tree = %self.name, delta_seconds, "invalid tick delta clamped to zero");
            0.0
        };

        if !self.is_running() {
            return self.last_status;
        }
        if self.debugger.is_paused() {
            return Status::Running;
        }

        self.dt = dt;
        self.update_timers(dt);
        self.flush_evaluations();
        self.update_iterator(ROOT_ITERATOR);
        self.tick += 1;

        self.last_status = if self.is_running() {
            Status::Running
        } else {
            self.iterators[ROOT_ITERATOR].last_executed
        };
        self.last_status
    }

    /// Unwinds every active branch, calling `on_exit` leaf to root, without reaching a terminal
    /// status.
    pub fn interrupt(&mut self) {
        for it in 0..self.iterators.len() {
            if self.iterators[it].is_running() {
                self.interrupt_iterator(it);
            }
        }
        if self.last_status == Status::Running {
            self.last_status = Status::Inactive;
        }
        debug!(tree = %self.name, "tree interrupted");
    }

    /// Tears the instance down: interrupts, calls `on_end` on every node, drops observers and
    /// clears the blackboard if this tree owns it.
    pub fn end(&mut self) {
        if !self.started {
            return;
        }
        self.interrupt();
        for id in 0..self.nodes.len() {
            self.end_node(id);
        }
        self.timers.clear();
        self.pending.borrow_mut().clear();
        if self.owns_blackboard {
            self.blackboard.clear();
        }
        self.started = false;
        self.last_status = Status::Inactive;
        debug!(tree = %self.name, "tree ended");
    }

    /// Rebuilds the definition this instance was created from, with resolved links.
    pub fn to_definition(&self) -> TreeDefinition {
        TreeDefinition {
            name: self.name.clone(),
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeDefinition {
                    name: node.name.clone(),
                    spec: node.to_spec(),
                    children: node.children.clone(),
                })
                .collect(),
            blackboard: self.initial_blackboard.clone(),
        }
    }

    /// Fresh instance with the same structure, seed, actor and registry.
    ///
    /// A shared blackboard stays shared; an owned one is replaced by a new owned one.
    pub fn clone_instance(&self) -> Result<Self, TreeError> {
        let options = TreeOptions {
            seed: self.seed,
            actor: self.actor.clone(),
            blackboard: (!self.owns_blackboard).then(|| self.blackboard.clone()),
            registry: self.registry.clone(),
        };
        Self::instantiate(&self.to_definition(), options)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the first node carrying `name`.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name() == Some(name))
    }

    /// Number of levels; a lone root has height 1.
    pub fn height(&self) -> usize {
        self.nodes.iter().map(|n| n.level + 1).max().unwrap_or(0)
    }

    /// Whether `node` lies inside the subtree rooted at `root` (a node is under itself).
    pub fn is_under_subtree(&self, root: NodeId, node: NodeId) -> bool {
        self.nodes
            .get(root)
            .is_some_and(|r| (root..=r.subtree_end).contains(&node))
    }

    /// Whether `node` comes after the whole subtree of `than` in traversal order.
    pub fn is_lower_priority(&self, node: NodeId, than: NodeId) -> bool {
        node < self.nodes.len()
            && self
                .nodes
                .get(than)
                .is_some_and(|t| node > t.subtree_end)
    }

    pub fn iterator(&self, id: IteratorId) -> Option<&BehaviourIterator> {
        self.iterators.get(id)
    }

    pub fn iterator_count(&self) -> usize {
        self.iterators.len()
    }

    /// Open nodes of the root iterator, root first.
    pub fn active_path(&self) -> &[NodeId] {
        self.iterators[ROOT_ITERATOR].stack()
    }

    pub fn is_running(&self) -> bool {
        self.iterators[ROOT_ITERATOR].is_running()
    }

    pub fn is_initialized(&self) -> bool {
        self.started
    }

    pub fn last_status(&self) -> Status {
        self.last_status
    }

    /// Number of completed updates.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn owns_blackboard(&self) -> bool {
        self.owns_blackboard
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Links dropped when the tree started.
    pub fn reference_errors(&self) -> &[ReferenceError] {
        &self.reference_errors
    }

    /// Number of timers currently driven by `update`.
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// The tree instantiated by an `include` node, if any.
    pub fn included(&self, id: NodeId) -> Option<&BehaviourTree> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Task(Task::Include(include)) => include.tree.as_deref(),
            _ => None,
        }
    }

    /// One line per node, indented by depth.
    pub fn describe(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|node| {
                let mut line = format!(
                    "{:>3}: {}{}",
                    node.id,
                    "  ".repeat(node.level),
                    node.kind_name()
                );
                if let Some(name) = &node.name {
                    line.push_str(&format!(" \"{name}\""));
                }
                if let Some(summary) = node.to_spec().summary() {
                    line.push_str(&format!(" [{summary}]"));
                }
                line
            })
            .collect()
    }

    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = Some(sink);
    }

    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.trace.take()
    }

    pub(crate) fn emit(&mut self, node: NodeId, kind: TraceKind) {
        if let Some(sink) = self.trace.as_mut() {
            sink.emit(TraceEvent::new(self.tick, node, kind));
        }
    }

    pub(crate) fn guard_violation(&self, message: &str) {
        error!(tree = %self.name, "runtime guard violation: {message}");
        if cfg!(debug_assertions) {
            panic!("runtime guard violation: {message}");
        }
    }

    pub(crate) fn register_timer(&mut self, id: NodeId) {
        if !self.timers.contains(&id) {
            self.timers.push(id);
        }
    }

    pub(crate) fn unregister_timer(&mut self, id: NodeId) {
        self.timers.retain(|&t| t != id);
    }

    pub(crate) fn timer_mut(&mut self, id: NodeId) -> Option<&mut Timer> {
        match &mut self.nodes[id].kind {
            NodeKind::Task(Task::Wait { timer }) => Some(timer),
            NodeKind::Abort(ConditionalAbort {
                condition: AbortCondition::Cooldown { timer, .. },
                ..
            }) => Some(timer),
            _ => None,
        }
    }

    fn update_timers(&mut self, dt: f32) {
        let owners = self.timers.clone();
        for id in owners {
            // An earlier timeout in this pass may have torn this owner down.
            if !self.timers.contains(&id) {
                continue;
            }
            let fired = self.timer_mut(id).is_some_and(|timer| timer.update(dt));
            if fired {
                self.on_timeout(id);
            }
        }
    }

    fn resolve_references(&mut self) {
        self.reference_errors.clear();
        for id in 0..self.nodes.len() {
            let (links, wanted) = match &mut self.nodes[id].kind {
                NodeKind::Task(Task::Interruptor { linked, .. }) => {
                    (std::mem::take(linked), LinkTarget::Interruptable)
                }
                NodeKind::Decorator(Decorator::Guard(guard)) => {
                    (std::mem::take(&mut guard.linked), LinkTarget::Guard)
                }
                _ => continue,
            };

            let mut kept = Vec::with_capacity(links.len());
            for target in links {
                let kind = match self.nodes.get(target) {
                    None => Some(ReferenceErrorKind::OutOfRange),
                    Some(_) if target == id => Some(ReferenceErrorKind::SelfLink),
                    Some(node) if wanted.accepts(&node.kind) => None,
                    Some(_) => Some(ReferenceErrorKind::WrongKind {
                        expected: wanted.describe(),
                    }),
                };
                match kind {
                    None => kept.push(target),
                    Some(kind) => {
                        let err = ReferenceError {
                            node: id,
                            target,
                            kind,
                        };
                        warn!(tree = %self.name, "{err}; link dropped");
                        self.reference_errors.push(err);
                    }
                }
            }

            match &mut self.nodes[id].kind {
                NodeKind::Task(Task::Interruptor { linked, .. }) => *linked = kept,
                NodeKind::Decorator(Decorator::Guard(guard)) => guard.linked = kept,
                _ => {}
            }
        }
    }
}

#[derive(Clone, Copy)]
enum LinkTarget {
    Interruptable,
    Guard,
}

impl LinkTarget {
    fn accepts(self, kind: &NodeKind) -> bool {
        matches!(
            (self, kind),
            (
                LinkTarget::Interruptable,
                NodeKind::Decorator(Decorator::Interruptable(_))
            ) | (LinkTarget::Guard, NodeKind::Decorator(Decorator::Guard(_)))
        )
    }

    fn describe(self) -> &'static str {
        match self {
            LinkTarget::Interruptable => "an interruptable",
            LinkTarget::Guard => "a guard",
        }
    }
}

fn build_kind(
    id: NodeId,
    def: &NodeDefinition,
    seed: u64,
    actor: &Option<Actor>,
    blackboard: &Blackboard,
    registry: &TaskRegistry,
) -> Result<NodeKind, TreeError> {
    let child_count = def.children.len();
    let timer = |interval: f32, deviation: f32| {
        Timer::new(interval)
            .with_deviation(deviation)
            .with_seed(derive_seed(seed, id as u64))
    };
    let composite = |kind| NodeKind::Composite(Composite::new(kind, child_count));

    let kind = match &def.spec {
        NodeSpec::Sequence => composite(CompositeKind::Sequence),
        NodeSpec::Selector => composite(CompositeKind::Selector),
        NodeSpec::RandomSequence => composite(CompositeKind::RandomSequence),
        NodeSpec::Parallel => composite(CompositeKind::Parallel),
        NodeSpec::ParallelSelector => composite(CompositeKind::ParallelSelector),
        NodeSpec::UntilSuccess => NodeKind::Decorator(Decorator::UntilSuccess),
        NodeSpec::UntilFailure => NodeKind::Decorator(Decorator::UntilFailure),
        NodeSpec::Success => NodeKind::Decorator(Decorator::Success),
        NodeSpec::Failure => NodeKind::Decorator(Decorator::Failure),
        NodeSpec::Inverter => NodeKind::Decorator(Decorator::Inverter),
        NodeSpec::Repeater { count } => NodeKind::Decorator(Decorator::Repeater {
            count: *count,
            iterations: 0,
        }),
        NodeSpec::Interruptable => {
            NodeKind::Decorator(Decorator::Interruptable(InterruptableState::default()))
        }
        NodeSpec::Guard {
            max_active,
            wait_until_available,
            return_success_on_skip,
            linked,
        } => NodeKind::Decorator(Decorator::Guard(GuardState {
            max_active: *max_active,
            wait_until_available: *wait_until_available,
            return_success_on_skip: *return_success_on_skip,
            linked: linked.clone(),
            child_ran: false,
        })),
        NodeSpec::ConditionalAbort {
            abort_type,
            condition,
        } => NodeKind::Abort(ConditionalAbort::new(
            *abort_type,
            AbortCondition::Blackboard(condition.clone()),
        )),
        NodeSpec::Cooldown {
            interval,
            deviation,
            abort_type,
        } => NodeKind::Abort(ConditionalAbort::new(
            *abort_type,
            AbortCondition::Cooldown {
                timer: timer(*interval, *deviation),
                last_status: Status::Inactive,
            },
        )),
        NodeSpec::Condition { condition } => NodeKind::Task(Task::Condition(condition.clone())),
        NodeSpec::Wait {
            interval,
            deviation,
        } => NodeKind::Task(Task::Wait {
            timer: timer(*interval, *deviation),
        }),
        NodeSpec::Idle => NodeKind::Task(Task::Idle),
        NodeSpec::Include {
            tree,
            isolate_blackboard,
        } => {
            let instance = match tree {
                Some(template) => {
                    let options = TreeOptions {
                        seed: derive_seed(seed, id as u64),
                        actor: actor.clone(),
                        blackboard: (!isolate_blackboard).then(|| blackboard.clone()),
                        registry: registry.clone(),
                    };
                    let tree = BehaviourTree::instantiate(template, options).map_err(|source| {
                        TreeError::Include {
                            node: id,
                            source: Box::new(source),
                        }
                    })?;
                    Some(Box::new(tree))
                }
                None => None,
            };
            NodeKind::Task(Task::Include(IncludeState {
                template: tree.clone(),
                isolate_blackboard: *isolate_blackboard,
                tree: instance,
            }))
        }
        NodeSpec::Interruptor {
            linked,
            return_success,
        } => NodeKind::Task(Task::Interruptor {
            linked: linked.clone(),
            return_success: *return_success,
        }),
        NodeSpec::Chance { probability } => NodeKind::Task(Task::Chance {
            probability: *probability,
        }),
        NodeSpec::Log { message, level } => NodeKind::Task(Task::Log {
            message: message.clone(),
            level: *level,
        }),
        NodeSpec::Action { name, params } => {
            let action = registry
                .build(name, params)
                .ok_or_else(|| TreeError::UnknownTask {
                    node: id,
                    name: name.clone(),
                })?;
            NodeKind::Task(Task::Action(ActionState {
                name: name.clone(),
                params: params.clone(),
                action,
            }))
        }
    };

    Ok(kind)
}

impl fmt::Debug for BehaviourTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviourTree")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("tick", &self.tick)
            .field("running", &self.is_running())
            .field("last_status", &self.last_status)
            .finish_non_exhaustive()
    }
}
