use bonsai_bt::{
    BehaviourTree, NodeDefinition, NodeSpec, ReferenceErrorKind, TreeDefinition, TreeError,
};

fn node(spec: NodeSpec, children: Vec<usize>) -> NodeDefinition {
    NodeDefinition {
        name: None,
        spec,
        children,
    }
}

fn tree(nodes: Vec<NodeDefinition>) -> TreeDefinition {
    TreeDefinition {
        name: "broken".into(),
        nodes,
        ..TreeDefinition::default()
    }
}

#[test]
fn empty_tree_is_rejected() {
    assert_eq!(TreeDefinition::default().validate(), Err(TreeError::Empty));
    assert!(BehaviourTree::new(&TreeDefinition::default()).is_err());
}

#[test]
fn child_index_out_of_range() {
    let def = tree(vec![node(NodeSpec::Sequence, vec![5])]);
    assert_eq!(
        def.validate(),
        Err(TreeError::ChildOutOfRange {
            node: 0,
            child: 5,
            len: 1
        })
    );
}

#[test]
fn link_back_to_the_root_is_a_cycle() {
    let def = tree(vec![
        node(NodeSpec::Sequence, vec![1]),
        node(NodeSpec::Sequence, vec![0]),
    ]);
    assert_eq!(def.validate(), Err(TreeError::Cycle { node: 1, child: 0 }));
}

#[test]
fn shared_child_has_multiple_parents() {
    let def = tree(vec![
        node(NodeSpec::Sequence, vec![1, 2]),
        node(NodeSpec::Inverter, vec![2]),
        node(NodeSpec::Idle, vec![]),
    ]);
    assert_eq!(def.validate(), Err(TreeError::MultipleParents { node: 2 }));
}

#[test]
fn orphan_node_is_unreachable() {
    let def = tree(vec![node(NodeSpec::Idle, vec![]), node(NodeSpec::Idle, vec![])]);
    assert_eq!(def.validate(), Err(TreeError::Unreachable { node: 1 }));
}

#[test]
fn arity_is_checked_per_category() {
    let decorator = tree(vec![node(NodeSpec::Inverter, vec![])]);
    assert_eq!(
        decorator.validate(),
        Err(TreeError::Arity {
            node: 0,
            kind: "inverter",
            expected: "exactly 1",
            found: 0
        })
    );

    let task = tree(vec![
        node(NodeSpec::Idle, vec![1]),
        node(NodeSpec::Idle, vec![]),
    ]);
    assert!(matches!(
        task.validate(),
        Err(TreeError::Arity { kind: "idle", .. })
    ));
}

#[test]
fn invalid_configuration_is_reported() {
    let def = tree(vec![node(NodeSpec::Chance { probability: 1.5 }, vec![])]);
    assert!(matches!(
        def.validate(),
        Err(TreeError::InvalidConfig { node: 0, .. })
    ));

    let def = tree(vec![node(NodeSpec::Repeater { count: Some(0) }, vec![1]), node(NodeSpec::Idle, vec![])]);
    assert!(matches!(def.validate(), Err(TreeError::InvalidConfig { .. })));
}

#[test]
fn unknown_task_names_fail_instantiation() {
    let def = tree(vec![node(
        NodeSpec::Action {
            name: "teleport".into(),
            params: Default::default(),
        },
        vec![],
    )]);
    let err = BehaviourTree::new(&def).expect_err("no task registered");
    assert_eq!(
        err,
        TreeError::UnknownTask {
            node: 0,
            name: "teleport".into()
        }
    );
    assert_eq!(err.to_string(), "node 0 references unknown task `teleport`");
}

#[test]
fn bad_links_are_dropped_when_the_tree_starts() {
    // sequence(interruptor -> [0, 9, 1], idle)
    let def = tree(vec![
        node(NodeSpec::Sequence, vec![1, 2]),
        node(
            NodeSpec::Interruptor {
                linked: vec![0, 9, 1],
                return_success: false,
            },
            vec![],
        ),
        node(NodeSpec::Idle, vec![]),
    ]);
    let mut tree = BehaviourTree::new(&def).expect("links are not structural");
    assert!(tree.reference_errors().is_empty());

    tree.start();
    let kinds: Vec<_> = tree.reference_errors().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ReferenceErrorKind::WrongKind {
                expected: "an interruptable"
            },
            ReferenceErrorKind::OutOfRange,
            ReferenceErrorKind::SelfLink,
        ]
    );
    assert!(matches!(
        tree.to_definition().nodes[1].spec,
        NodeSpec::Interruptor { ref linked, .. } if linked.is_empty()
    ));
}

#[test]
fn guard_links_must_point_at_guards() {
    let def = tree(vec![
        node(NodeSpec::Sequence, vec![1, 3]),
        node(
            NodeSpec::Guard {
                max_active: 1,
                wait_until_available: false,
                return_success_on_skip: false,
                linked: vec![3],
            },
            vec![2],
        ),
        node(NodeSpec::Idle, vec![]),
        node(NodeSpec::Idle, vec![]),
    ]);
    let mut tree = BehaviourTree::new(&def).expect("valid structure");
    tree.start();
    assert_eq!(tree.reference_errors().len(), 1);
    assert_eq!(tree.reference_errors()[0].target, 3);
    assert_eq!(
        tree.reference_errors()[0].to_string(),
        "node 1 links to node 3: target is not a guard"
    );
}
