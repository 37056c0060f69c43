/// Per-tick timing information handed to tasks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickContext {
    /// Number of completed `update` calls before this one.
    pub tick: u64,
    pub dt_seconds: f32,
}

impl TickContext {
    pub fn new(tick: u64, dt_seconds: f32) -> Self {
        Self { tick, dt_seconds }
    }
}
