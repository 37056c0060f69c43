//! Runner configuration, loaded from `.bonsai/config.yaml`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use bonsai_core::Value;
use serde::{Deserialize, Serialize};

/// How `bonsai run` drives a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Seconds passed to every update
    #[serde(default = "default_delta_seconds")]
    pub delta_seconds: f32,

    /// Stop after this many updates even if the tree is still running
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    pub seed: u64,

    /// Begin a new traversal whenever the root finishes, until `max_ticks`
    pub restart_on_completion: bool,

    /// Entries written over the definition's own blackboard before the first update
    pub blackboard: BTreeMap<String, Value>,

    /// Print every traversal step
    pub trace: bool,

    /// Behaviour of the stand-in tasks for `action` nodes, by action name
    pub tasks: BTreeMap<String, StubTask>,
}

/// Stand-in for a host task: runs for `ticks` updates, then reports `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubTask {
    pub ticks: u32,
    pub status: StubStatus,
    /// Blackboard writes applied when the task finishes
    pub set: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StubStatus {
    #[default]
    Success,
    Failure,
    /// Never finishes
    Running,
}

fn default_delta_seconds() -> f32 {
    0.1
}

fn default_max_ticks() -> u64 {
    100
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            delta_seconds: default_delta_seconds(),
            max_ticks: default_max_ticks(),
            seed: 0,
            restart_on_completion: false,
            blackboard: BTreeMap::new(),
            trace: false,
            tasks: BTreeMap::new(),
        }
    }
}

impl Default for StubTask {
    fn default() -> Self {
        Self {
            ticks: 1,
            status: StubStatus::Success,
            set: BTreeMap::new(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load from project root (looks for .bonsai/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".bonsai/config.yaml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn task(&self, name: &str) -> StubTask {
        self.tasks.get(name).cloned().unwrap_or_default()
    }
}
