use std::collections::VecDeque;

use bonsai_core::Status;
use tracing::debug;

use crate::node::{IteratorId, NodeId, NodeKind};
use crate::tree::BehaviourTree;

/// One traversal cursor: the stack of open nodes from the branch root down to the active leaf.
///
/// Traversals are queued: a node pushed during a tick is entered at the start of the next
/// update of its iterator, right before it runs.
#[derive(Debug, Default)]
pub struct BehaviourIterator {
    pub(crate) stack: Vec<NodeId>,
    pub(crate) requested: VecDeque<NodeId>,
    pub(crate) last_child_exit: Status,
    pub(crate) last_executed: Status,
    pub(crate) interrupted: bool,
}

impl BehaviourIterator {
    pub fn stack(&self) -> &[NodeId] {
        &self.stack
    }

    pub fn is_running(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Status of the last child popped off this cursor, `Inactive` right after a traversal.
    pub fn last_child_exit(&self) -> Status {
        self.last_child_exit
    }

    pub fn last_executed(&self) -> Status {
        self.last_executed
    }

    /// Nodes pushed but not entered yet.
    pub fn pending_entries(&self) -> usize {
        self.requested.len()
    }
}

impl BehaviourTree {
    pub(crate) fn traverse(&mut self, it: IteratorId, node: NodeId) {
        debug_assert_eq!(self.nodes[node].iterator, it, "node traversed on a foreign iterator");
        let iterator = &mut self.iterators[it];
        iterator.stack.push(node);
        iterator.requested.push_back(node);
        iterator.last_child_exit = Status::Inactive;
    }

    fn enter_requested(&mut self, it: IteratorId) {
        loop {
            while let Some(node) = self.iterators[it].requested.pop_front() {
                self.enter_node(node);
            }
            self.flush_evaluations();
            if self.iterators[it].requested.is_empty() {
                break;
            }
        }
    }

    /// Runs the active leaf and propagates terminal statuses upward until a node stays
    /// running, the stack empties, or the cursor is interrupted.
    pub(crate) fn update_iterator(&mut self, it: IteratorId) {
        self.enter_requested(it);
        self.iterators[it].interrupted = false;

        loop {
            if self.debugger.is_paused() {
                break;
            }
            let Some(&node) = self.iterators[it].stack.last() else {
                break;
            };
            if self.debugger.should_pause(node) {
                debug!(tree = %self.name, node, "breakpoint hit");
                break;
            }

            let status = self.run_node(node);
            self.iterators[it].last_executed = status;
            self.flush_evaluations();

            if std::mem::take(&mut self.iterators[it].interrupted) {
                break;
            }
            if !status.is_terminal() {
                break;
            }
            if self.iterators[it].stack.last() != Some(&node) {
                self.guard_violation("traversal stack changed without an interruption");
                break;
            }

            self.pop_top(it, false);
            if let Some(parent) = self.nodes[node].parent {
                self.iterators[it].last_child_exit = status;
                let order = self.nodes[node].child_order;
                self.child_exit(parent, order, status);
            }
            if self.iterators[it].stack.is_empty() {
                break;
            }
        }
    }

    fn pop_top(&mut self, it: IteratorId, interrupted: bool) -> Option<NodeId> {
        let Some(node) = self.iterators[it].stack.pop() else {
            self.guard_violation("traversal stack underflow");
            return None;
        };
        self.iterators[it].requested.retain(|&n| n != node);
        if self.nodes[node].entered {
            self.exit_node(node, interrupted);
        }
        Some(node)
    }

    /// Unwinds `node`'s cursor from the leaf up to and including `node`.
    pub(crate) fn interrupt_subtree(&mut self, node: NodeId) {
        let it = self.nodes[node].iterator;
        if !self.iterators[it].stack.contains(&node) {
            return;
        }
        debug!(tree = %self.name, node, "interrupting subtree");
        while let Some(top) = self.pop_top(it, true) {
            if top == node {
                break;
            }
        }
        self.iterators[it].interrupted = true;
    }

    /// Unwinds every open node of a cursor.
    pub(crate) fn interrupt_iterator(&mut self, it: IteratorId) {
        while self.iterators[it].is_running() {
            self.pop_top(it, true);
        }
        self.iterators[it].requested.clear();
        self.iterators[it].interrupted = true;
    }

    /// Unwinds down to `parent`, rewinds it to the child at `branch` and traverses that child
    /// again.
    pub(crate) fn abort_branch(&mut self, parent: NodeId, branch: usize) {
        let Some(&child) = self.nodes[parent].children.get(branch) else {
            return;
        };
        let it = self.nodes[child].iterator;

        if self.nodes[parent].iterator == it {
            if !self.iterators[it].stack.contains(&parent) {
                return;
            }
            while let Some(&top) = self.iterators[it].stack.last() {
                if top == parent {
                    break;
                }
                self.pop_top(it, true);
            }
        } else {
            // The branch root sits directly under a parallel composite.
            self.interrupt_iterator(it);
        }

        if let NodeKind::Composite(composite) = &mut self.nodes[parent].kind {
            if let Some(position) = composite.position_of(branch) {
                composite.current = position;
            }
            if composite.is_parallel() {
                composite.branch_status[branch] = Status::Running;
            }
        }

        debug!(tree = %self.name, parent, branch, "branch aborted");
        self.traverse(it, child);
        self.iterators[it].interrupted = true;
    }
}
