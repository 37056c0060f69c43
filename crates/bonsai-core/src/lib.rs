//! Deterministic, engine-agnostic primitives for the Bonsai behaviour tree runtime.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod actor;
pub mod blackboard;
pub mod rng;
pub mod status;
pub mod tick;
pub mod timer;
pub mod value;

pub use actor::Actor;
pub use blackboard::{
    Blackboard, BlackboardError, KeyEvent, KeyEventKind, Observer, ObserverId, Subscription,
};
pub use rng::{DeterministicRng, SplitMix64};
pub use status::Status;
pub use tick::TickContext;
pub use timer::Timer;
pub use value::{FromValue, Value};
