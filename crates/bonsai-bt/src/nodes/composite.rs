use bonsai_core::{DeterministicRng, Status};
use tracing::debug;

use crate::node::{Composite, CompositeKind, NodeId, NodeKind};
use crate::tree::BehaviourTree;

impl BehaviourTree {
    fn composite(&self, id: NodeId) -> &Composite {
        match &self.nodes[id].kind {
            NodeKind::Composite(composite) => composite,
            _ => unreachable!("node {id} is not a composite"),
        }
    }

    fn composite_mut(&mut self, id: NodeId) -> &mut Composite {
        match &mut self.nodes[id].kind {
            NodeKind::Composite(composite) => composite,
            _ => unreachable!("node {id} is not a composite"),
        }
    }

    pub(crate) fn composite_enter(&mut self, id: NodeId) {
        let kind = self.composite(id).kind;
        match kind {
            CompositeKind::Sequence | CompositeKind::Selector => {
                self.composite_mut(id).current = 0;
                self.traverse_current(id);
            }
            CompositeKind::RandomSequence => {
                let BehaviourTree { nodes, rng, .. } = self;
                if let NodeKind::Composite(composite) = &mut nodes[id].kind {
                    composite.current = 0;
                    for (position, slot) in composite.order.iter_mut().enumerate() {
                        *slot = position;
                    }
                    rng.shuffle(&mut composite.order);
                }
                self.traverse_current(id);
            }
            CompositeKind::Parallel | CompositeKind::ParallelSelector => {
                let branches = self.composite(id).branches.clone();
                for (order, branch) in branches.into_iter().enumerate() {
                    // Branches left running by an earlier failure are stale now.
                    if self.iterators[branch].is_running() {
                        self.interrupt_iterator(branch);
                    }
                    self.composite_mut(id).branch_status[order] = Status::Running;
                    let child = self.nodes[id].children[order];
                    self.traverse(branch, child);
                }
            }
        }
    }

    fn traverse_current(&mut self, id: NodeId) {
        if let Some(order) = self.composite(id).current_child() {
            let child = self.nodes[id].children[order];
            let it = self.nodes[id].iterator;
            self.traverse(it, child);
        }
    }

    pub(crate) fn composite_run(&mut self, id: NodeId) -> Status {
        match self.composite(id).kind {
            CompositeKind::Sequence | CompositeKind::RandomSequence => {
                self.ordered_run(id, Status::Failure)
            }
            CompositeKind::Selector => self.ordered_run(id, Status::Success),
            CompositeKind::Parallel | CompositeKind::ParallelSelector => self.parallel_run(id),
        }
    }

    /// Sequence-like dispatch: `stop_on` short-circuits upward, exhausting the children yields
    /// its opposite.
    fn ordered_run(&mut self, id: NodeId, stop_on: Status) -> Status {
        if self.last_child_exit(id) == stop_on {
            return stop_on;
        }
        if self.composite(id).current_child().is_none() {
            return stop_on.invert();
        }
        self.traverse_current(id);
        Status::Running
    }

    fn parallel_run(&mut self, id: NodeId) -> Status {
        let kind = self.composite(id).kind;
        let branches = self.composite(id).branches.clone();

        for (order, branch) in branches.into_iter().enumerate() {
            if self.composite(id).branch_status[order] != Status::Running {
                continue;
            }
            self.update_iterator(branch);

            // An abort or interruption raised inside the branch may have torn this node down.
            if !self.nodes[id].entered || self.debugger.is_paused() {
                return Status::Running;
            }

            let status = self.composite(id).branch_status[order];
            match (kind, status) {
                (CompositeKind::Parallel, Status::Failure) => {
                    debug!(tree = %self.name, node = id, branch = order, "parallel branch failed");
                    return Status::Failure;
                }
                (CompositeKind::ParallelSelector, Status::Success) => {
                    self.stop_branches(id);
                    return Status::Success;
                }
                _ => {}
            }
        }

        let statuses = &self.composite(id).branch_status;
        match kind {
            CompositeKind::Parallel if statuses.iter().all(|s| *s == Status::Success) => {
                Status::Success
            }
            CompositeKind::ParallelSelector if statuses.iter().all(|s| *s == Status::Failure) => {
                Status::Failure
            }
            _ => Status::Running,
        }
    }

    fn stop_branches(&mut self, id: NodeId) {
        let branches = self.composite(id).branches.clone();
        for branch in branches {
            if self.iterators[branch].is_running() {
                self.interrupt_iterator(branch);
            }
        }
    }

    pub(crate) fn composite_exit(&mut self, id: NodeId, interrupted: bool) {
        // A failed parallel leaves its other branches running; only teardown stops them.
        if interrupted && self.composite(id).is_parallel() {
            self.stop_branches(id);
        }
    }

    pub(crate) fn composite_child_exit(&mut self, id: NodeId, order: usize, status: Status) {
        let composite = self.composite_mut(id);
        if composite.is_parallel() {
            composite.branch_status[order] = status;
        } else {
            composite.current += 1;
        }
    }
}
