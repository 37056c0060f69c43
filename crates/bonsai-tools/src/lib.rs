//! Tooling primitives for the Bonsai behaviour tree runtime.
//!
//! Trace events are plain data recorded while a tree ticks; tests and the CLI render them.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{
    NullTraceSink, SharedTraceLog, TraceEvent, TraceKind, TraceLog, TraceSink, VecTraceSink,
};
