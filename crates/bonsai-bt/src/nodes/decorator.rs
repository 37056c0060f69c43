use bonsai_core::Status;
use tracing::debug;

use crate::node::{Decorator, NodeId, NodeKind};
use crate::tree::BehaviourTree;

enum Next {
    Return(Status),
    /// Traverse the child again and keep running.
    Retraverse,
}

impl BehaviourTree {
    fn decorator_mut(&mut self, id: NodeId) -> &mut Decorator {
        match &mut self.nodes[id].kind {
            NodeKind::Decorator(decorator) => decorator,
            _ => unreachable!("node {id} is not a decorator"),
        }
    }

    fn traverse_child(&mut self, id: NodeId) {
        let child = self.nodes[id].children[0];
        let it = self.nodes[id].iterator;
        self.traverse(it, child);
    }

    pub(crate) fn decorator_enter(&mut self, id: NodeId) {
        match self.decorator_mut(id) {
            // Guards decide in `run` whether the child may start.
            Decorator::Guard(guard) => {
                guard.child_ran = false;
                return;
            }
            Decorator::Interruptable(state) => {
                state.interrupted = false;
                state.running = true;
            }
            Decorator::Repeater { iterations, .. } => *iterations = 0,
            _ => {}
        }
        self.traverse_child(id);
    }

    pub(crate) fn decorator_run(&mut self, id: NodeId) -> Status {
        let last = self.last_child_exit(id);
        let next = match self.decorator_mut(id) {
            Decorator::UntilSuccess if last == Status::Success => Next::Return(Status::Success),
            Decorator::UntilFailure if last == Status::Failure => Next::Return(Status::Success),
            Decorator::UntilSuccess | Decorator::UntilFailure => Next::Retraverse,
            Decorator::Success => Next::Return(Status::Success),
            Decorator::Failure => Next::Return(Status::Failure),
            Decorator::Inverter => Next::Return(last.invert()),
            Decorator::Repeater { count, iterations } => match count {
                Some(count) if *iterations >= *count => Next::Return(last),
                _ => Next::Retraverse,
            },
            Decorator::Interruptable(state) if state.interrupted => {
                Next::Return(state.return_status)
            }
            Decorator::Interruptable(_) => Next::Return(last),
            Decorator::Guard(guard) if guard.child_ran => Next::Return(last),
            Decorator::Guard(_) => return self.guard_run(id),
        };

        match next {
            Next::Return(status) => status,
            Next::Retraverse => {
                self.traverse_child(id);
                Status::Running
            }
        }
    }

    fn guard_run(&mut self, id: NodeId) -> Status {
        let active = self.guard_active_count(id);
        let Decorator::Guard(guard) = self.decorator_mut(id) else {
            return Status::Failure;
        };

        if active >= guard.max_active as usize {
            if guard.wait_until_available {
                return Status::Running;
            }
            return Status::from_bool(guard.return_success_on_skip);
        }

        guard.child_ran = true;
        self.traverse_child(id);
        Status::Running
    }

    /// Guards of the group (this one plus its links) currently running their child.
    fn guard_active_count(&self, id: NodeId) -> usize {
        let NodeKind::Decorator(Decorator::Guard(guard)) = &self.nodes[id].kind else {
            return 0;
        };
        std::iter::once(id)
            .chain(guard.linked.iter().copied())
            .filter(|&g| {
                matches!(
                    &self.nodes[g].kind,
                    NodeKind::Decorator(Decorator::Guard(other)) if other.child_ran
                )
            })
            .count()
    }

    pub(crate) fn decorator_exit(&mut self, id: NodeId) {
        match self.decorator_mut(id) {
            Decorator::Guard(guard) => guard.child_ran = false,
            Decorator::Interruptable(state) => state.running = false,
            _ => {}
        }
    }

    pub(crate) fn decorator_child_exit(&mut self, id: NodeId) {
        match self.decorator_mut(id) {
            Decorator::Repeater { iterations, .. } => *iterations += 1,
            Decorator::Interruptable(state) => state.running = false,
            _ => {}
        }
    }

    /// Ends a running interruptable's child; the interruptable then reports `status`.
    pub(crate) fn perform_interruption(&mut self, id: NodeId, status: Status) {
        let NodeKind::Decorator(Decorator::Interruptable(state)) = &mut self.nodes[id].kind else {
            return;
        };
        if !state.running {
            return;
        }
        state.running = false;
        state.interrupted = true;
        state.return_status = status;

        debug!(tree = %self.name, node = id, ?status, "interruptable interrupted");
        let child = self.nodes[id].children[0];
        self.interrupt_subtree(child);
    }
}
