use bonsai_bt::{
    AbortType, BehaviourTree, ConditionSpec, NodeBlueprint, NodeSpec, TaskRegistry,
    TreeDefinition, TreeOptions,
};
use bonsai_core::Status;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register_fn("succeed", |_| Status::Success);
    registry
}

fn bench_sequence_tick(c: &mut Criterion) {
    let leaves = (0..32).map(|_| NodeBlueprint::action("succeed"));
    let definition = TreeDefinition::from_blueprint(
        "bench",
        NodeBlueprint::decorate(
            NodeSpec::Repeater { count: None },
            NodeBlueprint::sequence(leaves),
        ),
    );
    let mut tree = BehaviourTree::instantiate(&definition, TreeOptions::default().with_registry(registry()))
        .expect("valid tree");
    tree.begin_traversal();

    c.bench_function("bonsai-bt/tick(sequence=32)", |b| {
        b.iter(|| {
            black_box(tree.update(black_box(0.1)));
        })
    });
}

fn bench_abort_churn(c: &mut Criterion) {
    let definition = TreeDefinition::from_blueprint(
        "abort-bench",
        NodeBlueprint::selector([
            NodeBlueprint::decorate(
                NodeSpec::ConditionalAbort {
                    abort_type: AbortType::Both,
                    condition: ConditionSpec::IsSet {
                        key: "target".into(),
                    },
                },
                NodeBlueprint::new(NodeSpec::Idle),
            ),
            NodeBlueprint::new(NodeSpec::Idle),
        ]),
    );
    let mut tree = BehaviourTree::new(&definition).expect("valid tree");
    tree.begin_traversal();
    tree.update(0.1);

    let mut flag = false;
    c.bench_function("bonsai-bt/tick(abort_toggle)", |b| {
        b.iter(|| {
            flag = !flag;
            if flag {
                tree.blackboard().set("target", 1i64);
            } else {
                tree.blackboard().unset("target");
            }
            black_box(tree.update(0.1));
        })
    });
}

criterion_group!(benches, bench_sequence_tick, bench_abort_churn);
criterion_main!(benches);
