use std::collections::BTreeSet;

use bonsai_core::Status;
use tracing::debug;

use crate::node::NodeId;
use crate::tree::BehaviourTree;

/// Breakpoints on preorder indices.
///
/// When traversal is about to run a node with a breakpoint, the update stops and the tree stays
/// paused until [`BehaviourTree::resume`] or [`BehaviourTree::step`].
#[derive(Debug, Clone, Default)]
pub struct Debugger {
    breakpoints: BTreeSet<NodeId>,
    paused_at: Option<NodeId>,
    released: Option<NodeId>,
}

impl Debugger {
    pub fn breakpoints(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.breakpoints.iter().copied()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn paused_at(&self) -> Option<NodeId> {
        self.paused_at
    }

    pub(crate) fn should_pause(&mut self, node: NodeId) -> bool {
        if self.released == Some(node) {
            self.released = None;
            return false;
        }
        if self.breakpoints.contains(&node) {
            self.paused_at = Some(node);
            return true;
        }
        false
    }

    fn release(&mut self) {
        self.released = self.paused_at.take();
    }
}

impl BehaviourTree {
    pub fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    /// Returns `false` if `node` is outside the tree.
    pub fn set_breakpoint(&mut self, node: NodeId) -> bool {
        if node >= self.nodes.len() {
            return false;
        }
        self.debugger.breakpoints.insert(node);
        true
    }

    pub fn clear_breakpoint(&mut self, node: NodeId) {
        self.debugger.breakpoints.remove(&node);
    }

    pub fn clear_breakpoints(&mut self) {
        self.debugger.breakpoints.clear();
        self.debugger.release();
    }

    pub fn is_paused(&self) -> bool {
        self.debugger.is_paused()
    }

    /// Lets the paused node run on the next update.
    pub fn resume(&mut self) {
        if let Some(node) = self.debugger.paused_at {
            debug!(tree = %self.name, node, "resumed");
        }
        self.debugger.release();
    }

    /// Resumes and performs exactly one update.
    pub fn step(&mut self, delta_seconds: f32) -> Status {
        self.resume();
        self.update(delta_seconds)
    }
}
