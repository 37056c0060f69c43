use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Opaque context bound to a tree instance at instantiation.
///
/// The runtime never looks inside; leaf tasks downcast it to whatever the host bound.
/// Cloning is cheap and shares the same underlying value, which is how included sub-trees
/// are bound to the actor of the tree that includes them.
#[derive(Clone)]
pub struct Actor {
    inner: Rc<dyn Any>,
}

impl Actor {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            inner: Rc::new(value),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Whether both handles point at the same bound value.
    pub fn same_as(&self, other: &Actor) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor").finish_non_exhaustive()
    }
}
