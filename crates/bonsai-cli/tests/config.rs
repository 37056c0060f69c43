use bonsai_cli::{RunnerConfig, StubStatus};
use bonsai_core::Value;

#[test]
fn missing_project_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunnerConfig::load_from_project(dir.path()).unwrap();
    assert_eq!(config, RunnerConfig::default());
    assert_eq!(config.max_ticks, 100);
    assert!((config.delta_seconds - 0.1).abs() < f32::EPSILON);
}

#[test]
fn project_config_is_read_from_dot_bonsai() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".bonsai")).unwrap();
    std::fs::write(
        dir.path().join(".bonsai/config.yaml"),
        r#"
max_ticks: 12
seed: 7
blackboard:
  hp: 3
tasks:
  attack:
    ticks: 2
    status: failure
    set:
      attacked: true
"#,
    )
    .unwrap();

    let config = RunnerConfig::load_from_project(dir.path()).unwrap();
    assert_eq!(config.max_ticks, 12);
    assert_eq!(config.seed, 7);
    assert!((config.delta_seconds - 0.1).abs() < f32::EPSILON);
    assert_eq!(config.blackboard.get("hp"), Some(&Value::Int(3)));

    let attack = config.task("attack");
    assert_eq!(attack.ticks, 2);
    assert_eq!(attack.status, StubStatus::Failure);
    assert_eq!(attack.set.get("attacked"), Some(&Value::Bool(true)));

    let other = config.task("flee");
    assert_eq!(other.ticks, 1);
    assert_eq!(other.status, StubStatus::Success);
}

#[test]
fn malformed_config_reports_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runner.yaml");
    std::fs::write(&path, "max_ticks: [not, a, number]").unwrap();

    let err = RunnerConfig::load(&path).unwrap_err();
    assert!(format!("{err}").contains("runner.yaml"));
}
