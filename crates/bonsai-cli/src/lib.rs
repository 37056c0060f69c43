//! Library side of the `bonsai` runner: configuration, definition loading and the headless
//! tick loop.

pub mod config;
pub mod loader;
pub mod runner;

pub use config::{RunnerConfig, StubStatus, StubTask};
pub use loader::load_definition;
pub use runner::{run, stub_registry, RunReport};
