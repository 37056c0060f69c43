#![cfg(feature = "serde")]

use bonsai_core::Status;
use bonsai_tools::{TraceEvent, TraceKind, TraceLog};

#[test]
fn trace_log_json_roundtrip() {
    let log = TraceLog {
        events: vec![
            TraceEvent::new(1, 0, TraceKind::Enter),
            TraceEvent::new(1, 3, TraceKind::Exit(Status::Success)),
            TraceEvent::new(2, 5, TraceKind::Abort),
        ],
    };

    let json = serde_json::to_string(&log).expect("serialize");
    let roundtrip: TraceLog = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(roundtrip, log);
}
