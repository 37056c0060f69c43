use std::collections::BTreeMap;

use bonsai_bt::{BehaviourTree, NodeBlueprint, TaskRegistry, TreeDefinition, TreeOptions};
use bonsai_core::Status;
use bonsai_tools::{SharedTraceLog, TraceKind};

fn registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry
        .register_fn("succeed", |_| Status::Success)
        .register_fn("fail", |_| Status::Failure)
        .register_fn("running", |_| Status::Running);
    registry
}

fn start(root: NodeBlueprint, seed: u64) -> (BehaviourTree, SharedTraceLog) {
    let definition = TreeDefinition::from_blueprint("composites", root);
    let options = TreeOptions::default()
        .with_seed(seed)
        .with_registry(registry());
    let mut tree = BehaviourTree::instantiate(&definition, options).expect("valid tree");
    let log = SharedTraceLog::default();
    tree.set_trace_sink(Box::new(log.clone()));
    tree.start();
    tree.begin_traversal();
    (tree, log)
}

fn run_to_completion(tree: &mut BehaviourTree, max_ticks: usize) -> Status {
    for _ in 0..max_ticks {
        let status = tree.update(0.1);
        if status != Status::Running {
            return status;
        }
    }
    panic!("tree still running after {max_ticks} ticks");
}

fn act(name: &str) -> NodeBlueprint {
    NodeBlueprint::action(name)
}

#[test]
fn sequence_stops_at_first_failure() {
    let (mut tree, log) = start(
        NodeBlueprint::sequence([act("succeed"), act("succeed"), act("fail"), act("succeed")]),
        0,
    );

    let statuses: Vec<Status> = (0..3).map(|_| tree.update(0.1)).collect();
    assert_eq!(
        statuses,
        vec![Status::Running, Status::Running, Status::Failure]
    );

    let log = log.borrow();
    assert_eq!(log.exits(1), vec![Status::Success]);
    assert_eq!(log.exits(2), vec![Status::Success]);
    assert_eq!(log.exits(3), vec![Status::Failure]);
    assert_eq!(log.enters(4), 0);
    assert_eq!(log.exits(0), vec![Status::Failure]);
    drop(log);

    assert!(!tree.is_running());
    assert_eq!(tree.last_status(), Status::Failure);
    assert_eq!(tree.node(3).map(|n| n.status()), Some(Status::Failure));
    assert_eq!(tree.node(4).map(|n| n.status()), Some(Status::Inactive));

    // Finished trees stay put until traversal begins again.
    assert_eq!(tree.update(0.1), Status::Failure);
    assert_eq!(tree.tick_count(), 3);
}

#[test]
fn sequence_succeeds_when_children_run_out() {
    let (mut tree, _log) = start(NodeBlueprint::sequence([act("succeed"), act("succeed")]), 0);
    assert_eq!(run_to_completion(&mut tree, 10), Status::Success);
    assert_eq!(tree.tick_count(), 2);
}

#[test]
fn selector_stops_at_first_success() {
    let (mut tree, log) = start(
        NodeBlueprint::selector([act("fail"), act("succeed"), act("succeed")]),
        0,
    );
    assert_eq!(run_to_completion(&mut tree, 10), Status::Success);
    assert_eq!(tree.tick_count(), 2);
    assert_eq!(log.borrow().enters(3), 0);
}

#[test]
fn selector_fails_when_every_child_fails() {
    let (mut tree, _log) = start(NodeBlueprint::selector([act("fail"), act("fail")]), 0);
    assert_eq!(run_to_completion(&mut tree, 10), Status::Failure);
}

#[test]
fn nested_composites_resume_parent_in_the_same_tick() {
    // sequence(selector(fail, succeed), succeed)
    let (mut tree, log) = start(
        NodeBlueprint::sequence([
            NodeBlueprint::selector([act("fail"), act("succeed")]),
            act("succeed"),
        ]),
        0,
    );
    assert_eq!(run_to_completion(&mut tree, 10), Status::Success);
    assert_eq!(tree.tick_count(), 3);

    let log = log.borrow();
    assert_eq!(log.entered_order(), vec![0, 1, 2, 3, 4]);
    for node in 0..5 {
        assert!(log.runs(node) >= 1, "node {node} never ran");
    }
    // The selector resolves in the tick its second child succeeds.
    let second_tick: Vec<_> = log
        .for_tick(1)
        .filter(|e| matches!(e.kind, TraceKind::Exit(_)))
        .map(|e| e.node)
        .collect();
    assert_eq!(second_tick, vec![3, 1]);
}

#[test]
fn restarting_traversal_enters_children_again() {
    let (mut tree, log) = start(NodeBlueprint::sequence([act("succeed")]), 0);
    assert_eq!(run_to_completion(&mut tree, 5), Status::Success);

    tree.begin_traversal();
    assert_eq!(tree.last_status(), Status::Running);
    assert_eq!(run_to_completion(&mut tree, 5), Status::Success);
    assert_eq!(log.borrow().enters(1), 2);
}

fn leaf_order(log: &SharedTraceLog, from: usize) -> Vec<usize> {
    log.borrow().events[from..]
        .iter()
        .filter(|e| e.kind == TraceKind::Enter && e.node != 0)
        .map(|e| e.node)
        .collect()
}

#[test]
fn random_sequence_visits_every_child_once_per_entry() {
    let (mut tree, log) = start(
        NodeBlueprint::random_sequence((0..4).map(|_| act("succeed"))),
        7,
    );

    let mut first_counts = BTreeMap::new();
    let mut orders = std::collections::BTreeSet::new();
    for _ in 0..400 {
        let from = log.borrow().events.len();
        assert_eq!(run_to_completion(&mut tree, 10), Status::Success);

        let mut order = leaf_order(&log, from);
        assert_eq!(order.len(), 4);
        *first_counts.entry(order[0]).or_insert(0usize) += 1;
        orders.insert(order.clone());

        order.sort_unstable();
        assert_eq!(order, vec![1, 2, 3, 4]);
        tree.begin_traversal();
    }

    assert!(orders.len() > 12, "only {} distinct orders", orders.len());
    for node in 1..=4 {
        let count = first_counts.get(&node).copied().unwrap_or(0);
        assert!(
            (60..=140).contains(&count),
            "child {node} came first {count} times out of 400"
        );
    }
}

#[test]
fn random_sequence_order_is_reproducible_from_the_seed() {
    let orders = |seed| {
        let (mut tree, log) = start(
            NodeBlueprint::random_sequence((0..5).map(|_| act("succeed"))),
            seed,
        );
        run_to_completion(&mut tree, 10);
        leaf_order(&log, 0)
    };
    assert_eq!(orders(42), orders(42));
}

#[test]
fn random_sequence_fails_fast() {
    let (mut tree, log) = start(
        NodeBlueprint::random_sequence([act("fail"), act("fail"), act("fail")]),
        3,
    );
    assert_eq!(run_to_completion(&mut tree, 10), Status::Failure);
    assert_eq!(leaf_order(&log, 0).len(), 1);
}
