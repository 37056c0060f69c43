use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use bonsai_core::{Actor, Blackboard, SplitMix64, Status, TickContext, Value};

use crate::node::NodeId;

/// Configuration values attached to an `action` node in the tree definition.
pub type Params = BTreeMap<String, Value>;

/// Everything a custom task can see while one of its hooks runs.
pub struct TaskContext<'a> {
    pub node: NodeId,
    pub tick: TickContext,
    pub blackboard: &'a Blackboard,
    pub actor: Option<&'a Actor>,
    pub rng: &'a mut SplitMix64,
}

/// Host-defined leaf task.
///
/// Hooks mirror the node lifecycle: `on_start` once when the tree starts, `on_enter` on every
/// descent, `run` once per tick while active, `on_exit` after a terminal `run` or when the task
/// is interrupted, and `on_end` at teardown.
pub trait Action: 'static {
    fn on_start(&mut self, _ctx: &mut TaskContext<'_>) {}

    fn on_enter(&mut self, _ctx: &mut TaskContext<'_>) {}

    fn run(&mut self, ctx: &mut TaskContext<'_>) -> Status;

    fn on_exit(&mut self, _ctx: &mut TaskContext<'_>) {}

    fn on_end(&mut self, _ctx: &mut TaskContext<'_>) {}
}

/// Adapts a closure into an [`Action`] that only implements `run`.
pub struct FnAction<F>(pub F);

impl<F> Action for FnAction<F>
where
    F: FnMut(&mut TaskContext<'_>) -> Status + 'static,
{
    fn run(&mut self, ctx: &mut TaskContext<'_>) -> Status {
        (self.0)(ctx)
    }
}

type Factory = Rc<dyn Fn(&Params) -> Box<dyn Action>>;

/// Name → factory table used to build `action` nodes.
///
/// Cheap to clone; clones share factories, so included sub-trees and cloned instances resolve
/// the same names.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    factories: BTreeMap<String, Factory>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Params) -> Box<dyn Action> + 'static,
    {
        self.factories.insert(name.into(), Rc::new(factory));
        self
    }

    /// Registers a stateless task built from a cloneable closure.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, run: F) -> &mut Self
    where
        F: FnMut(&mut TaskContext<'_>) -> Status + Clone + 'static,
    {
        self.register(name, move |_| Box::new(FnAction(run.clone())))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(&self, name: &str, params: &Params) -> Option<Box<dyn Action>> {
        self.factories.get(name).map(|factory| factory(params))
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
