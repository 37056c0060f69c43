use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use bonsai_core::{KeyEvent, Status};
use bonsai_tools::TraceKind;
use tracing::debug;

use crate::node::{AbortCondition, ConditionalAbort, NodeId, NodeKind};
use crate::tree::BehaviourTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EvaluationSource {
    Blackboard,
    Timer,
}

/// A conditional abort asked to re-check its condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingEvaluation {
    pub(crate) node: NodeId,
    pub(crate) source: EvaluationSource,
}

/// Filled by blackboard observers and timer timeouts, drained by the tree between runs.
pub(crate) type PendingQueue = Rc<RefCell<VecDeque<PendingEvaluation>>>;

fn push_unique(queue: &PendingQueue, evaluation: PendingEvaluation) {
    let mut queue = queue.borrow_mut();
    if !queue.contains(&evaluation) {
        queue.push_back(evaluation);
    }
}

impl BehaviourTree {
    fn abort(&self, id: NodeId) -> &ConditionalAbort {
        match &self.nodes[id].kind {
            NodeKind::Abort(abort) => abort,
            _ => unreachable!("node {id} is not a conditional abort"),
        }
    }

    fn abort_mut(&mut self, id: NodeId) -> &mut ConditionalAbort {
        match &mut self.nodes[id].kind {
            NodeKind::Abort(abort) => abort,
            _ => unreachable!("node {id} is not a conditional abort"),
        }
    }

    /// Prepares the blackboard callback; it only queues work, evaluation happens on flush.
    pub(crate) fn abort_start(&mut self, id: NodeId) {
        let queue = Rc::clone(&self.pending);
        let abort = self.abort_mut(id);
        if let AbortCondition::Blackboard(condition) = &abort.condition {
            let keys = condition.keys();
            abort.observer = Some(Rc::new(move |event: &KeyEvent| {
                if keys.iter().any(|key| *key == event.key) {
                    push_unique(
                        &queue,
                        PendingEvaluation {
                            node: id,
                            source: EvaluationSource::Blackboard,
                        },
                    );
                }
            }));
        }
    }

    pub(crate) fn abort_end(&mut self, id: NodeId) {
        self.end_observing(id);
        self.unregister_timer(id);
        self.abort_mut(id).observer = None;
    }

    fn abort_condition(&self, id: NodeId) -> bool {
        match &self.abort(id).condition {
            AbortCondition::Blackboard(condition) => condition.evaluate(&self.blackboard),
            AbortCondition::Cooldown { timer, .. } => timer.is_done(),
        }
    }

    pub(crate) fn abort_enter(&mut self, id: NodeId) {
        let holds = self.abort_condition(id);
        let observe = self.abort(id).abort_type.aborts_self()
            || self.abort(id).abort_type.aborts_lower_priority();
        if observe {
            self.begin_observing(id);
        }

        self.abort_mut(id).child_entered = holds;
        if holds {
            let child = self.nodes[id].children[0];
            let it = self.nodes[id].iterator;
            self.traverse(it, child);
        }
    }

    pub(crate) fn abort_run(&mut self, id: NodeId) -> Status {
        let last = self.last_child_exit(id);
        let abort = self.abort_mut(id);
        let entered = abort.child_entered;
        match &mut abort.condition {
            AbortCondition::Blackboard(_) if entered && last.is_terminal() => last,
            AbortCondition::Blackboard(_) => Status::Failure,
            AbortCondition::Cooldown { last_status, .. } => {
                if entered && last.is_terminal() {
                    *last_status = last;
                }
                if last_status.is_terminal() {
                    *last_status
                } else {
                    Status::Failure
                }
            }
        }
    }

    pub(crate) fn abort_exit(&mut self, id: NodeId) {
        let abort = self.abort_mut(id);
        let keep_observing = abort.abort_type.aborts_lower_priority();
        let entered = std::mem::take(&mut abort.child_entered);

        let mut start_cooldown = false;
        if let AbortCondition::Cooldown { timer, .. } = &mut abort.condition {
            if entered && timer.is_done() {
                timer.start();
                start_cooldown = true;
            }
        }

        if start_cooldown {
            self.register_timer(id);
        }
        if !keep_observing {
            self.end_observing(id);
        }
    }

    pub(crate) fn begin_observing(&mut self, id: NodeId) {
        let BehaviourTree {
            nodes, blackboard, ..
        } = self;
        let NodeKind::Abort(abort) = &mut nodes[id].kind else {
            return;
        };
        if abort.observing {
            return;
        }
        abort.observing = true;
        if let Some(observer) = &abort.observer {
            abort.subscription = Some(blackboard.observe(Rc::clone(observer)));
        }
    }

    pub(crate) fn end_observing(&mut self, id: NodeId) {
        let NodeKind::Abort(abort) = &mut self.nodes[id].kind else {
            return;
        };
        abort.observing = false;
        abort.subscription = None;
    }

    pub(crate) fn on_timeout(&mut self, id: NodeId) {
        self.unregister_timer(id);
        if matches!(self.nodes[id].kind, NodeKind::Abort(_)) {
            push_unique(
                &self.pending,
                PendingEvaluation {
                    node: id,
                    source: EvaluationSource::Timer,
                },
            );
        }
    }

    /// Delivers queued evaluations. Re-entrant calls return immediately; the outer call drains
    /// whatever they would have seen.
    pub(crate) fn flush_evaluations(&mut self) {
        if self.flushing {
            return;
        }
        self.flushing = true;
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(evaluation) = next else {
                break;
            };
            self.evaluate_abort(evaluation);
        }
        self.flushing = false;
    }

    fn evaluate_abort(&mut self, evaluation: PendingEvaluation) {
        let id = evaluation.node;
        let abort = self.abort(id);
        if !abort.observing {
            return;
        }
        let abort_type = abort.abort_type;
        let holds = self.abort_condition(id);
        let active = self.nodes[id].entered;

        if active && !holds && abort_type.aborts_self() {
            debug!(tree = %self.name, node = id, source = ?evaluation.source, "self abort");
            self.emit(id, TraceKind::Abort);
            match self.nodes[id].parent {
                Some(parent) => {
                    let order = self.nodes[id].child_order;
                    self.abort_branch(parent, order);
                }
                None => {
                    let it = self.nodes[id].iterator;
                    self.interrupt_iterator(it);
                    self.traverse(it, id);
                }
            }
        } else if !active && holds && abort_type.aborts_lower_priority() {
            self.abort_lower_priority(id, evaluation.source);
        }
    }

    /// Restarts traversal at this abort's branch if its composite has moved past it.
    fn abort_lower_priority(&mut self, id: NodeId, source: EvaluationSource) {
        let mut branch = id;
        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            if self.nodes[p].is_composite() {
                break;
            }
            branch = p;
            parent = self.nodes[p].parent;
        }
        let Some(composite_id) = parent else {
            return;
        };
        if !self.nodes[composite_id].entered {
            return;
        }

        let order = self.nodes[branch].child_order;
        let NodeKind::Composite(composite) = &self.nodes[composite_id].kind else {
            return;
        };
        // Parallel branches all run already; there is nothing of lower priority to cut.
        if composite.is_parallel() {
            return;
        }
        let Some(position) = composite.position_of(order) else {
            return;
        };
        if composite.current <= position {
            return;
        }

        debug!(tree = %self.name, node = id, composite = composite_id, source = ?source, "lower priority abort");
        self.emit(id, TraceKind::Abort);
        self.abort_branch(composite_id, order);
    }
}
