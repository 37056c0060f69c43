use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bonsai_core::Status;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TraceKind {
    Enter,
    Run(Status),
    Exit(Status),
    /// The node's branch was cut short by a conditional abort.
    Abort,
    /// The node was unwound by an interruption.
    Interrupt,
}

/// A single traversal step of one node.
///
/// Dumb data so it can be recorded during a run and rendered later.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub node: usize,
    pub kind: TraceKind,
}

impl TraceEvent {
    pub fn new(tick: u64, node: usize, kind: TraceKind) -> Self {
        Self { tick, node, kind }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TraceKind::Enter => write!(f, "[{}] enter #{}", self.tick, self.node),
            TraceKind::Run(status) => write!(f, "[{}] run #{} -> {status:?}", self.tick, self.node),
            TraceKind::Exit(status) => write!(f, "[{}] exit #{} ({status:?})", self.tick, self.node),
            TraceKind::Abort => write!(f, "[{}] abort #{}", self.tick, self.node),
            TraceKind::Interrupt => write!(f, "[{}] interrupt #{}", self.tick, self.node),
        }
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn count(&self, node: usize, kind: TraceKind) -> usize {
        self.events
            .iter()
            .filter(|e| e.node == node && e.kind == kind)
            .count()
    }

    pub fn enters(&self, node: usize) -> usize {
        self.count(node, TraceKind::Enter)
    }

    /// Number of `run` calls on `node`, whatever they returned.
    pub fn runs(&self, node: usize) -> usize {
        self.events
            .iter()
            .filter(|e| e.node == node && matches!(e.kind, TraceKind::Run(_)))
            .count()
    }

    /// Nodes in the order they were entered.
    pub fn entered_order(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter(|e| e.kind == TraceKind::Enter)
            .map(|e| e.node)
            .collect()
    }

    /// Statuses `node` exited with, oldest first.
    pub fn exits(&self, node: usize) -> Vec<Status> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Exit(status) if e.node == node => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn for_tick(&self, tick: u64) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter().filter(move |e| e.tick == tick)
    }
}

impl TraceSink for TraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// Trace log that stays readable by the caller while a tree writes into it.
pub type SharedTraceLog = Rc<RefCell<TraceLog>>;

impl TraceSink for SharedTraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.borrow_mut().push(event);
    }
}
