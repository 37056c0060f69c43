//! Lifecycle dispatch for every node kind.
//!
//! Each submodule implements the hooks of one family on [`BehaviourTree`]; this module routes
//! the iterator's calls to them and keeps the shared bookkeeping (status, entry flag, trace).

pub(crate) mod abort;
pub(crate) mod composite;
pub(crate) mod decorator;
pub(crate) mod task;

use bonsai_core::Status;
use bonsai_tools::TraceKind;
use tracing::trace;

use crate::node::{NodeId, NodeKind};
use crate::tree::BehaviourTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Composite,
    Decorator,
    Abort,
    Task,
}

impl BehaviourTree {
    fn family(&self, id: NodeId) -> Family {
        match self.nodes[id].kind {
            NodeKind::Composite(_) => Family::Composite,
            NodeKind::Decorator(_) => Family::Decorator,
            NodeKind::Abort(_) => Family::Abort,
            NodeKind::Task(_) => Family::Task,
        }
    }

    pub(crate) fn start_node(&mut self, id: NodeId) {
        match self.family(id) {
            Family::Abort => self.abort_start(id),
            Family::Task => self.task_start(id),
            Family::Composite | Family::Decorator => {}
        }
    }

    pub(crate) fn end_node(&mut self, id: NodeId) {
        match self.family(id) {
            Family::Abort => self.abort_end(id),
            Family::Task => self.task_end(id),
            Family::Composite | Family::Decorator => {}
        }
        self.nodes[id].status = Status::Inactive;
        self.nodes[id].last_run_tick = None;
    }

    pub(crate) fn enter_node(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        node.entered = true;
        node.status = Status::Running;
        trace!(tree = %self.name, node = id, "enter");
        self.emit(id, TraceKind::Enter);

        match self.family(id) {
            Family::Composite => self.composite_enter(id),
            Family::Decorator => self.decorator_enter(id),
            Family::Abort => self.abort_enter(id),
            Family::Task => self.task_enter(id),
        }
    }

    pub(crate) fn run_node(&mut self, id: NodeId) -> Status {
        let tick = self.tick;
        if self.nodes[id].last_run_tick == Some(tick) {
            self.guard_violation(&format!("node {id} ran twice in tick {tick}"));
            return self.nodes[id].status;
        }
        self.nodes[id].last_run_tick = Some(tick);

        let status = match self.family(id) {
            Family::Composite => self.composite_run(id),
            Family::Decorator => self.decorator_run(id),
            Family::Abort => self.abort_run(id),
            Family::Task => self.task_run(id),
        };

        // A run may tear down its own node (an interruptor inside the branch it interrupts).
        if self.nodes[id].entered {
            self.nodes[id].status = status;
        }
        trace!(tree = %self.name, node = id, ?status, "run");
        self.emit(id, TraceKind::Run(status));
        status
    }

    pub(crate) fn exit_node(&mut self, id: NodeId, interrupted: bool) {
        match self.family(id) {
            Family::Composite => {
                self.composite_exit(id, interrupted);
                for child in self.nodes[id].children.clone() {
                    self.composite_parent_exit(child);
                }
            }
            Family::Decorator => self.decorator_exit(id),
            Family::Abort => self.abort_exit(id),
            Family::Task => self.task_exit(id),
        }

        let node = &mut self.nodes[id];
        node.entered = false;
        if interrupted {
            node.status = Status::Inactive;
            self.emit(id, TraceKind::Interrupt);
        } else {
            let status = node.status;
            self.emit(id, TraceKind::Exit(status));
        }
    }

    pub(crate) fn child_exit(&mut self, parent: NodeId, order: usize, status: Status) {
        match self.family(parent) {
            Family::Composite => self.composite_child_exit(parent, order, status),
            Family::Decorator => self.decorator_child_exit(parent),
            Family::Abort | Family::Task => {}
        }
    }

    /// The enclosing composite exited: stop lingering observers below it.
    pub(crate) fn composite_parent_exit(&mut self, id: NodeId) {
        match self.family(id) {
            Family::Abort => self.end_observing(id),
            Family::Decorator => {}
            Family::Composite | Family::Task => return,
        }
        if let Some(&child) = self.nodes[id].children.first() {
            self.composite_parent_exit(child);
        }
    }

    /// Decorators and aborts read their child's result from the iterator.
    pub(crate) fn last_child_exit(&self, id: NodeId) -> Status {
        self.iterators[self.nodes[id].iterator].last_child_exit
    }
}
