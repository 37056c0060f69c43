use bonsai_core::{DeterministicRng, Status, TickContext};
use tracing::{debug, error, info, trace, warn};

use crate::action::{Action, TaskContext};
use crate::definition::LogLevel;
use crate::node::{NodeId, NodeKind, Task};
use crate::tree::BehaviourTree;

impl BehaviourTree {
    fn task_mut(&mut self, id: NodeId) -> &mut Task {
        match &mut self.nodes[id].kind {
            NodeKind::Task(task) => task,
            _ => unreachable!("node {id} is not a task"),
        }
    }

    /// Calls `f` on a custom action with a context borrowed from the tree.
    fn with_action<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn Action, &mut TaskContext<'_>) -> R,
    ) -> Option<R> {
        let tick = TickContext::new(self.tick, self.dt);
        let BehaviourTree {
            nodes,
            blackboard,
            actor,
            rng,
            ..
        } = self;
        let NodeKind::Task(Task::Action(state)) = &mut nodes[id].kind else {
            return None;
        };
        let mut ctx = TaskContext {
            node: id,
            tick,
            blackboard,
            actor: actor.as_ref(),
            rng,
        };
        Some(f(state.action.as_mut(), &mut ctx))
    }

    pub(crate) fn task_start(&mut self, id: NodeId) {
        match self.task_mut(id) {
            Task::Include(include) => {
                if let Some(tree) = include.tree.as_mut() {
                    tree.start();
                }
            }
            Task::Action(_) => {
                self.with_action(id, |action, ctx| action.on_start(ctx));
            }
            _ => {}
        }
    }

    pub(crate) fn task_end(&mut self, id: NodeId) {
        match self.task_mut(id) {
            Task::Include(include) => {
                if let Some(tree) = include.tree.as_mut() {
                    tree.end();
                }
            }
            Task::Wait { timer } => {
                timer.stop();
                self.unregister_timer(id);
            }
            Task::Action(_) => {
                self.with_action(id, |action, ctx| action.on_end(ctx));
            }
            _ => {}
        }
    }

    pub(crate) fn task_enter(&mut self, id: NodeId) {
        match self.task_mut(id) {
            Task::Wait { timer } => {
                timer.start();
                self.register_timer(id);
            }
            Task::Include(include) => match include.tree.as_mut() {
                Some(tree) => tree.begin_traversal(),
                None => debug!(tree = %self.name, node = id, "include has no tree"),
            },
            Task::Action(_) => {
                self.with_action(id, |action, ctx| action.on_enter(ctx));
            }
            _ => {}
        }
    }

    pub(crate) fn task_run(&mut self, id: NodeId) -> Status {
        let dt = self.dt;
        match self.task_mut(id) {
            Task::Condition(condition) => {
                let condition = condition.clone();
                Status::from_bool(condition.evaluate(&self.blackboard))
            }
            Task::Wait { timer } if timer.is_done() => Status::Success,
            Task::Wait { .. } | Task::Idle => Status::Running,
            Task::Include(include) => match include.tree.as_mut() {
                None => Status::Failure,
                Some(tree) => match tree.update(dt) {
                    Status::Inactive => Status::Failure,
                    status => status,
                },
            },
            Task::Interruptor {
                linked,
                return_success,
            } => {
                let status = Status::from_bool(*return_success);
                for target in linked.clone() {
                    self.perform_interruption(target, status);
                }
                Status::Success
            }
            Task::Chance { probability } => {
                let probability = *probability;
                Status::from_bool(self.rng.next_f32_unit() < probability)
            }
            Task::Log { message, level } => {
                match level {
                    LogLevel::Trace => trace!(target: "bonsai::log", node = id, "{message}"),
                    LogLevel::Debug => debug!(target: "bonsai::log", node = id, "{message}"),
                    LogLevel::Info => info!(target: "bonsai::log", node = id, "{message}"),
                    LogLevel::Warn => warn!(target: "bonsai::log", node = id, "{message}"),
                    LogLevel::Error => error!(target: "bonsai::log", node = id, "{message}"),
                }
                Status::Success
            }
            Task::Action(_) => self
                .with_action(id, |action, ctx| action.run(ctx))
                .unwrap_or(Status::Failure),
        }
    }

    pub(crate) fn task_exit(&mut self, id: NodeId) {
        match self.task_mut(id) {
            Task::Wait { timer } => {
                timer.stop();
                self.unregister_timer(id);
            }
            Task::Include(include) => {
                if let Some(tree) = include.tree.as_mut() {
                    if tree.is_running() {
                        tree.interrupt();
                    }
                }
            }
            Task::Action(_) => {
                self.with_action(id, |action, ctx| action.on_exit(ctx));
            }
            _ => {}
        }
    }
}
