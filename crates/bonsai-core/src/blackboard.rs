use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::trace;

use crate::value::{FromValue, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlackboardError {
    #[error("blackboard key `{0}` is missing")]
    MissingKey(String),
    #[error("blackboard key `{key}` holds a {found} value, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEventKind {
    Add,
    Remove,
    Change,
}

/// Notification delivered to every observer after a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub key: String,
    /// `None` when the key did not exist before the mutation.
    pub previous: Option<Value>,
    /// `None` when the key no longer exists after the mutation.
    pub current: Option<Value>,
}

pub type Observer = Rc<dyn Fn(&KeyEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
struct Inner {
    memory: BTreeMap<String, Value>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

/// Shared key/value store with change notification.
///
/// `Blackboard` is a cheap handle: clones share the same storage and observer list. All
/// access is single-threaded. Observers are invoked after the internal borrow is released,
/// over a snapshot of the observer list, so a callback may freely read, write, add or remove
/// observers on the same blackboard.
#[derive(Clone, Default)]
pub struct Blackboard {
    inner: Rc<RefCell<Inner>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether both handles share the same storage.
    pub fn same_as(&self, other: &Blackboard) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Removes every key. Observers are kept and not notified.
    pub fn clear(&self) {
        self.inner.borrow_mut().memory.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().memory.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().memory.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.inner.borrow().memory.clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.borrow().memory.contains_key(key)
    }

    /// Key exists and holds a non-null value.
    pub fn is_set(&self, key: &str) -> bool {
        self.inner
            .borrow()
            .memory
            .get(key)
            .is_some_and(|v| !v.is_null())
    }

    /// Key exists and holds `Null`.
    pub fn is_unset(&self, key: &str) -> bool {
        self.inner
            .borrow()
            .memory
            .get(key)
            .is_some_and(Value::is_null)
    }

    pub fn get(&self, key: &str) -> Result<Value, BlackboardError> {
        self.inner
            .borrow()
            .memory
            .get(key)
            .cloned()
            .ok_or_else(|| BlackboardError::MissingKey(key.to_string()))
    }

    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<T, BlackboardError> {
        let inner = self.inner.borrow();
        let value = inner
            .memory
            .get(key)
            .ok_or_else(|| BlackboardError::MissingKey(key.to_string()))?;
        T::from_value(value).ok_or_else(|| BlackboardError::TypeMismatch {
            key: key.to_string(),
            expected: T::TYPE_NAME,
            found: value.type_name(),
        })
    }

    /// Sets `key` to `value`. Emits `Add` for a new key, `Change` when the stored value differs,
    /// and nothing when the value is equal to the stored one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        let event = {
            let mut inner = self.inner.borrow_mut();
            match inner.memory.get_mut(&key) {
                None => {
                    inner.memory.insert(key.clone(), value.clone());
                    KeyEvent {
                        kind: KeyEventKind::Add,
                        key,
                        previous: None,
                        current: Some(value),
                    }
                }
                Some(slot) if *slot == value => return,
                Some(slot) => {
                    let previous = std::mem::replace(slot, value.clone());
                    KeyEvent {
                        kind: KeyEventKind::Change,
                        key,
                        previous: Some(previous),
                        current: Some(value),
                    }
                }
            }
        };

        self.notify(&event);
    }

    /// Adds `key` holding `Null` if it is not present yet.
    pub fn set_unset(&self, key: impl Into<String>) {
        let key = key.into();
        if !self.contains(&key) {
            self.set(key, Value::Null);
        }
    }

    /// Resets an existing key to `Null`. Missing keys are left alone.
    pub fn unset(&self, key: &str) {
        if self.contains(key) {
            self.set(key, Value::Null);
        }
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let previous = self.inner.borrow_mut().memory.remove(key)?;
        self.notify(&KeyEvent {
            kind: KeyEventKind::Remove,
            key: key.to_string(),
            previous: Some(previous.clone()),
            current: None,
        });
        Some(previous)
    }

    pub fn add_observer(&self, observer: impl Fn(&KeyEvent) + 'static) -> ObserverId {
        self.add_shared_observer(Rc::new(observer))
    }

    pub fn add_shared_observer(&self, observer: Observer) -> ObserverId {
        let mut inner = self.inner.borrow_mut();
        let id = ObserverId(inner.next_observer);
        inner.next_observer += 1;
        inner.observers.push((id, observer));
        id
    }

    /// Returns `false` when `id` was not registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.observers.len();
        inner.observers.retain(|(existing, _)| *existing != id);
        inner.observers.len() != before
    }

    /// Registers `observer` for as long as the returned guard lives.
    pub fn observe(&self, observer: Observer) -> Subscription {
        let id = self.add_shared_observer(observer);
        Subscription {
            board: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    fn notify(&self, event: &KeyEvent) {
        let observers: Vec<Observer> = self
            .inner
            .borrow()
            .observers
            .iter()
            .map(|(_, o)| Rc::clone(o))
            .collect();

        trace!(key = %event.key, kind = ?event.kind, observers = observers.len(), "blackboard event");
        for observer in observers {
            observer(event);
        }
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Blackboard")
            .field("memory", &inner.memory)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

/// Observer registration that is removed when dropped.
#[must_use = "dropping a subscription unregisters its observer"]
pub struct Subscription {
    board: Weak<RefCell<Inner>>,
    id: ObserverId,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.board.upgrade() {
            inner
                .borrow_mut()
                .observers
                .retain(|(existing, _)| *existing != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
