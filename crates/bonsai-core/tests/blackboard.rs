use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bonsai_core::{Blackboard, BlackboardError, KeyEvent, KeyEventKind, ObserverId, Value};

fn recording(bb: &Blackboard) -> Rc<RefCell<Vec<KeyEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    bb.add_observer(move |event| sink.borrow_mut().push(event.clone()));
    events
}

#[test]
fn set_get_remove_roundtrip() {
    let bb = Blackboard::new();
    assert!(!bb.contains("hp"));

    bb.set("hp", 10i64);
    bb.set("name", "orc");

    assert_eq!(bb.get("hp"), Ok(Value::Int(10)));
    assert_eq!(bb.get_as::<String>("name").as_deref(), Ok("orc"));
    assert_eq!(bb.remove("hp"), Some(Value::Int(10)));
    assert_eq!(bb.get("hp"), Err(BlackboardError::MissingKey("hp".into())));
}

#[test]
fn typed_read_reports_mismatch() {
    let bb = Blackboard::new();
    bb.set("flag", true);
    assert_eq!(
        bb.get_as::<i64>("flag"),
        Err(BlackboardError::TypeMismatch {
            key: "flag".into(),
            expected: "int",
            found: "bool",
        })
    );
}

#[test]
fn presence_and_nullity_are_distinct() {
    let bb = Blackboard::new();
    bb.set_unset("target");
    assert!(bb.contains("target"));
    assert!(!bb.is_set("target"));
    assert!(bb.is_unset("target"));

    bb.set("target", 4i64);
    assert!(bb.is_set("target"));

    bb.unset("target");
    assert!(bb.contains("target"));
    assert!(bb.is_unset("target"));

    assert!(!bb.is_set("missing"));
    assert!(!bb.is_unset("missing"));
}

#[test]
fn events_describe_add_change_and_remove() {
    let bb = Blackboard::new();
    let events = recording(&bb);

    bb.set("k", 1i64);
    bb.set("k", 1i64);
    bb.set("k", 2i64);
    bb.remove("k");
    bb.remove("k");

    let events = events.borrow();
    let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![KeyEventKind::Add, KeyEventKind::Change, KeyEventKind::Remove]
    );
    assert_eq!(events[1].previous, Some(Value::Int(1)));
    assert_eq!(events[1].current, Some(Value::Int(2)));
    assert_eq!(events[2].current, None);
}

#[test]
fn observers_may_write_during_dispatch() {
    let bb = Blackboard::new();
    let handle = bb.clone();
    bb.add_observer(move |event| {
        if event.key == "a" {
            handle.set("b", true);
        }
    });
    let events = recording(&bb);

    bb.set("a", 1i64);

    assert_eq!(bb.get("b"), Ok(Value::Bool(true)));
    let keys: Vec<_> = events.borrow().iter().map(|e| e.key.clone()).collect();
    assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
}

#[test]
fn observer_removed_mid_dispatch_still_sees_snapshot() {
    let bb = Blackboard::new();
    let calls = Rc::new(RefCell::new(0));
    let victim: Rc<Cell<Option<ObserverId>>> = Rc::new(Cell::new(None));

    let handle = bb.clone();
    let target = victim.clone();
    bb.add_observer(move |_| {
        if let Some(id) = target.get() {
            handle.remove_observer(id);
        }
    });

    let counter = calls.clone();
    victim.set(Some(bb.add_observer(move |_| *counter.borrow_mut() += 1)));

    bb.set("x", 1i64);
    bb.set("x", 2i64);

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(bb.observer_count(), 1);
}

#[test]
fn subscription_unregisters_on_drop() {
    let bb = Blackboard::new();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();

    let subscription = bb.observe(Rc::new(move |_: &KeyEvent| *counter.borrow_mut() += 1));
    bb.set("x", 1i64);
    assert_eq!(bb.observer_count(), 1);

    drop(subscription);
    bb.set("x", 2i64);

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(bb.observer_count(), 0);
}

#[test]
fn subscription_outliving_board_is_harmless() {
    let bb = Blackboard::new();
    let subscription = bb.observe(Rc::new(|_: &KeyEvent| {}));
    drop(bb);
    drop(subscription);
}

#[test]
fn clones_share_storage_and_clear_keeps_observers() {
    let bb = Blackboard::new();
    let other = bb.clone();
    let _events = recording(&bb);

    other.set("shared", "yes");
    assert!(bb.same_as(&other));
    assert_eq!(bb.keys(), vec!["shared".to_string()]);

    bb.clear();
    assert!(other.is_empty());
    assert_eq!(other.observer_count(), 1);
    assert!(!bb.same_as(&Blackboard::new()));
}
