//! Headless tick loop used by `bonsai run`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use bonsai_bt::{Action, BehaviourTree, TaskContext, TaskRegistry, TreeDefinition, TreeOptions};
use bonsai_core::{Status, Value};
use bonsai_tools::{SharedTraceLog, TraceEvent};
use tracing::{debug, info};

use crate::config::{RunnerConfig, StubStatus, StubTask};

/// Outcome of a headless run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub tree: String,
    pub ticks: u64,
    /// Last status returned by `update`; `Running` if the tick budget ran out.
    pub status: Status,
    /// Number of times the root reached a terminal status.
    pub completions: u32,
    pub trace: Vec<TraceEvent>,
    pub blackboard: BTreeMap<String, Value>,
}

impl RunReport {
    pub fn finished(&self) -> bool {
        self.status.is_terminal()
    }
}

struct Stub {
    config: StubTask,
    elapsed: u32,
}

impl Action for Stub {
    fn on_enter(&mut self, _ctx: &mut TaskContext<'_>) {
        self.elapsed = 0;
    }

    fn run(&mut self, ctx: &mut TaskContext<'_>) -> Status {
        if self.config.status == StubStatus::Running {
            return Status::Running;
        }
        self.elapsed += 1;
        if self.elapsed < self.config.ticks {
            return Status::Running;
        }
        for (key, value) in &self.config.set {
            ctx.blackboard.set(key.clone(), value.clone());
        }
        Status::from_bool(self.config.status == StubStatus::Success)
    }
}

/// Registers a configurable stand-in for every action the definition names, so any tree can
/// run without host code.
pub fn stub_registry(definition: &TreeDefinition, config: &RunnerConfig) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    for name in definition.action_names() {
        if registry.contains(&name) {
            continue;
        }
        let task = config.task(&name);
        registry.register(name, move |_| {
            Box::new(Stub {
                config: task.clone(),
                elapsed: 0,
            })
        });
    }
    registry
}

pub fn instantiate(definition: &TreeDefinition, config: &RunnerConfig) -> Result<BehaviourTree> {
    let options = TreeOptions::default()
        .with_seed(config.seed)
        .with_registry(stub_registry(definition, config));
    BehaviourTree::instantiate(definition, options)
        .with_context(|| format!("Failed to instantiate tree \"{}\"", definition.name))
}

/// Ticks `definition` with stub tasks until it finishes or the tick budget runs out.
pub fn run(definition: &TreeDefinition, config: &RunnerConfig) -> Result<RunReport> {
    let mut tree = instantiate(definition, config)?;
    for (key, value) in &config.blackboard {
        tree.blackboard().set(key.clone(), value.clone());
    }

    let log = SharedTraceLog::default();
    tree.set_trace_sink(Box::new(log.clone()));
    tree.begin_traversal();

    let mut status = Status::Running;
    let mut completions = 0;
    while tree.tick_count() < config.max_ticks {
        status = tree.update(config.delta_seconds);
        if status == Status::Inactive {
            break;
        }
        if !status.is_terminal() {
            continue;
        }

        completions += 1;
        debug!(tree = %definition.name, tick = tree.tick_count(), ?status, "root finished");
        if !config.restart_on_completion {
            break;
        }
        tree.begin_traversal();
    }

    info!(
        tree = %definition.name,
        ticks = tree.tick_count(),
        ?status,
        completions,
        "run finished"
    );

    let report = RunReport {
        tree: definition.name.clone(),
        ticks: tree.tick_count(),
        status,
        completions,
        trace: log.borrow().events.clone(),
        blackboard: tree.blackboard().snapshot(),
    };
    tree.end();
    Ok(report)
}
