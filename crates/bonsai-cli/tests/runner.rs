use std::path::Path;

use bonsai_cli::{load_definition, run, RunnerConfig, StubStatus, StubTask};
use bonsai_core::{Status, Value};
use bonsai_tools::TraceKind;

const GUARD: &str = r#"
blackboard:
  alert: false
nodes:
  - type: selector
    children: [1, 3]
  - type: conditional_abort
    abort_type: lower_priority
    condition: { kind: is_set, key: alerted }
    children: [2]
  - type: action
    name: escape
    task: flee
  - type: sequence
    name: patrol
    children: [4, 5]
  - type: action
    task: walk
  - type: action
    task: raise_alarm
"#;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn yaml_file_name_becomes_the_tree_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "guard.yaml", GUARD);
    let definition = load_definition(&path).unwrap();
    assert_eq!(definition.name, "guard");
    assert_eq!(definition.len(), 6);
    assert_eq!(definition.nodes[2].name.as_deref(), Some("escape"));
    assert_eq!(
        definition.action_names(),
        vec!["flee".to_string(), "walk".to_string(), "raise_alarm".to_string()]
    );
}

#[test]
fn json_definitions_are_detected_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = load_definition(&write(dir.path(), "guard.yaml", GUARD)).unwrap();
    let json = serde_json::to_string(&yaml).unwrap();

    let from_json = load_definition(&write(dir.path(), "guard.json", &json)).unwrap();
    assert_eq!(from_json, yaml);
}

#[test]
fn unreadable_definitions_carry_context() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_definition(&dir.path().join("missing.yaml")).unwrap_err();
    assert!(format!("{err}").contains("missing.yaml"));

    let bad = write(dir.path(), "bad.json", "{ not json");
    let err = load_definition(&bad).unwrap_err();
    assert!(format!("{err}").contains("Failed to parse JSON"));
}

#[test]
fn stub_tasks_drive_the_tree_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let definition = load_definition(&write(dir.path(), "guard.yaml", GUARD)).unwrap();

    let mut config = RunnerConfig::default();
    config.tasks.insert(
        "raise_alarm".into(),
        StubTask {
            ticks: 1,
            status: StubStatus::Success,
            set: [("alerted".to_string(), Value::Bool(true))].into(),
        },
    );
    config.tasks.insert(
        "walk".into(),
        StubTask {
            ticks: 3,
            ..StubTask::default()
        },
    );

    let report = run(&definition, &config).unwrap();
    assert!(report.finished());
    assert_eq!(report.status, Status::Success);
    assert_eq!(report.completions, 1);
    assert_eq!(report.blackboard.get("alerted"), Some(&Value::Bool(true)));
    // Raising the alarm flips the abort before the patrol sequence sees the result.
    let has = |node: usize, kind: TraceKind| {
        report
            .trace
            .iter()
            .any(|e| e.node == node && e.kind == kind)
    };
    assert!(has(5, TraceKind::Interrupt));
    assert!(has(1, TraceKind::Abort));
    assert!(has(2, TraceKind::Exit(Status::Success)));
}

#[test]
fn tick_budget_stops_a_tree_that_never_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let definition = load_definition(&write(dir.path(), "guard.yaml", GUARD)).unwrap();

    let mut config = RunnerConfig {
        max_ticks: 25,
        ..RunnerConfig::default()
    };
    config.tasks.insert(
        "walk".into(),
        StubTask {
            status: StubStatus::Running,
            ..StubTask::default()
        },
    );

    let report = run(&definition, &config).unwrap();
    assert!(!report.finished());
    assert_eq!(report.ticks, 25);
    assert_eq!(report.completions, 0);
}

#[test]
fn configured_blackboard_can_trigger_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let definition = load_definition(&write(dir.path(), "guard.yaml", GUARD)).unwrap();

    let mut config = RunnerConfig::default();
    config
        .blackboard
        .insert("alerted".into(), Value::Bool(true));

    let report = run(&definition, &config).unwrap();
    assert_eq!(report.status, Status::Success);
    assert_eq!(report.ticks, 1);
    assert!(!report.trace.iter().any(|e| e.node == 3));
}

#[test]
fn restarting_counts_completions() {
    let dir = tempfile::tempdir().unwrap();
    let definition = load_definition(&write(dir.path(), "guard.yaml", GUARD)).unwrap();

    let config = RunnerConfig {
        max_ticks: 30,
        restart_on_completion: true,
        ..RunnerConfig::default()
    };
    let report = run(&definition, &config).unwrap();
    assert_eq!(report.ticks, 30);
    assert!(report.completions >= 5);
}
