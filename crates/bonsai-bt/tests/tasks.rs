use std::cell::RefCell;
use std::rc::Rc;

use bonsai_bt::{
    Action, BehaviourTree, ConditionSpec, Inequality, NodeBlueprint, NodeSpec, Params,
    TaskContext, TaskRegistry, TreeDefinition, TreeOptions,
};
use bonsai_core::{Actor, Status, Value};

type Journal = Rc<RefCell<Vec<String>>>;

/// Records every hook it receives, then succeeds after `ticks` runs.
struct Scripted {
    label: String,
    ticks: i64,
    journal: Journal,
}

impl Scripted {
    fn note(&self, hook: &str) {
        self.journal.borrow_mut().push(format!("{}:{hook}", self.label));
    }
}

impl Action for Scripted {
    fn on_start(&mut self, _ctx: &mut TaskContext<'_>) {
        self.note("start");
    }

    fn on_enter(&mut self, _ctx: &mut TaskContext<'_>) {
        self.note("enter");
    }

    fn run(&mut self, ctx: &mut TaskContext<'_>) -> Status {
        self.note("run");
        if let Some(name) = ctx.actor.and_then(|a| a.downcast_ref::<String>()) {
            ctx.blackboard.set("actor", name.as_str());
        }
        self.ticks -= 1;
        if self.ticks > 0 {
            Status::Running
        } else {
            Status::Success
        }
    }

    fn on_exit(&mut self, _ctx: &mut TaskContext<'_>) {
        self.note("exit");
    }

    fn on_end(&mut self, _ctx: &mut TaskContext<'_>) {
        self.note("end");
    }
}

fn registry(journal: &Journal) -> TaskRegistry {
    let journal = Rc::clone(journal);
    let mut registry = TaskRegistry::new();
    registry.register("scripted", move |params: &Params| {
        Box::new(Scripted {
            label: params
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string(),
            ticks: params.get("ticks").and_then(Value::as_i64).unwrap_or(1),
            journal: Rc::clone(&journal),
        })
    });
    registry
}

fn scripted(label: &str, ticks: i64) -> NodeBlueprint {
    let mut params = Params::new();
    params.insert("label".into(), label.into());
    params.insert("ticks".into(), ticks.into());
    NodeBlueprint::new(NodeSpec::Action {
        name: "scripted".into(),
        params,
    })
}

#[test]
fn action_hooks_follow_the_node_lifecycle() {
    let journal = Journal::default();
    let definition = TreeDefinition::from_blueprint(
        "hooks",
        NodeBlueprint::sequence([scripted("a", 2), scripted("b", 1)]),
    );
    let options = TreeOptions::default()
        .with_actor(Actor::new("guard".to_string()))
        .with_registry(registry(&journal));
    let mut tree = BehaviourTree::instantiate(&definition, options).expect("instantiates");

    tree.start();
    tree.begin_traversal();
    while tree.update(0.1) == Status::Running {}
    tree.end();

    assert_eq!(
        *journal.borrow(),
        vec![
            "a:start", "b:start", "a:enter", "a:run", "a:run", "a:exit", "b:enter", "b:run",
            "b:exit", "a:end", "b:end",
        ]
    );
}

#[test]
fn actions_see_the_bound_actor() {
    let journal = Journal::default();
    let definition = TreeDefinition::from_blueprint("actor", scripted("a", 1));
    let options = TreeOptions::default()
        .with_actor(Actor::new("guard".to_string()))
        .with_registry(registry(&journal));
    let mut tree = BehaviourTree::instantiate(&definition, options).expect("instantiates");
    tree.begin_traversal();
    assert_eq!(tree.update(0.1), Status::Success);
    assert_eq!(tree.blackboard().get("actor"), Ok(Value::from("guard")));
}

#[test]
fn condition_leaf_reads_the_blackboard() {
    let definition = TreeDefinition::from_blueprint(
        "condition",
        NodeBlueprint::new(NodeSpec::Condition {
            condition: ConditionSpec::CompareValue {
                key: "hp".into(),
                value: Value::Int(10),
                inequality: Inequality::GreaterEqual,
            },
        }),
    )
    .with_entry("hp", 12i64);
    let mut tree = BehaviourTree::new(&definition).expect("instantiates");
    tree.begin_traversal();
    assert_eq!(tree.update(0.1), Status::Success);

    tree.blackboard().set("hp", 4i64);
    tree.begin_traversal();
    assert_eq!(tree.update(0.1), Status::Failure);

    tree.blackboard().remove("hp");
    tree.begin_traversal();
    assert_eq!(tree.update(0.1), Status::Failure);
}

#[test]
fn chance_follows_its_probability() {
    let definition = TreeDefinition::from_blueprint(
        "chance",
        NodeBlueprint::new(NodeSpec::Chance { probability: 0.25 }),
    );
    let mut tree =
        BehaviourTree::instantiate(&definition, TreeOptions::default().with_seed(99))
            .expect("instantiates");

    let mut successes = 0;
    for _ in 0..1000 {
        tree.begin_traversal();
        if tree.update(0.1) == Status::Success {
            successes += 1;
        }
    }
    assert!((180..=320).contains(&successes), "{successes} successes");
}

#[test]
fn chance_extremes_are_certain() {
    for (probability, expected) in [(0.0, Status::Failure), (1.0, Status::Success)] {
        let definition = TreeDefinition::from_blueprint(
            "extreme",
            NodeBlueprint::new(NodeSpec::Chance { probability }),
        );
        let mut tree = BehaviourTree::new(&definition).expect("instantiates");
        for _ in 0..50 {
            tree.begin_traversal();
            assert_eq!(tree.update(0.1), expected);
        }
    }
}

#[test]
fn log_task_always_succeeds() {
    let definition = TreeDefinition::from_blueprint(
        "log",
        NodeBlueprint::new(NodeSpec::Log {
            message: "hello".into(),
            level: Default::default(),
        }),
    );
    let mut tree = BehaviourTree::new(&definition).expect("instantiates");
    tree.begin_traversal();
    assert_eq!(tree.update(0.1), Status::Success);
}

#[test]
fn idle_runs_until_interrupted() {
    let definition =
        TreeDefinition::from_blueprint("idle", NodeBlueprint::new(NodeSpec::Idle));
    let mut tree = BehaviourTree::new(&definition).expect("instantiates");
    tree.begin_traversal();
    for _ in 0..10 {
        assert_eq!(tree.update(0.1), Status::Running);
    }
    tree.interrupt();
    assert!(!tree.is_running());
}
