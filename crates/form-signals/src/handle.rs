//! Typed handles onto graph nodes.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use crate::{NodeId, runtime::Inner};

/// A writable reactive value.
///
/// Reads inside a memo or effect register a dependency. Writes are equality-gated:
/// setting an equal value notifies nobody.
pub struct Signal<T> {
    /// Owning runtime.
    rt: Weak<Inner>,
    /// Graph node.
    id: NodeId,
    /// Current value.
    value: Rc<RefCell<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            rt: self.rt.clone(),
            id: self.id,
            value: self.value.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &*self.value.borrow())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Assemble a handle.
    pub(crate) fn from_parts(rt: Weak<Inner>, id: NodeId, value: T) -> Self {
        Self {
            rt,
            id,
            value: Rc::new(RefCell::new(value)),
        }
    }

    /// Graph identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Read and track.
    pub fn get(&self) -> T {
        self.track();
        self.value.borrow().clone()
    }

    /// Read without tracking.
    pub fn get_untracked(&self) -> T {
        self.value.borrow().clone()
    }

    /// Borrow the value and track.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.value.borrow())
    }

    /// Borrow the value without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replace the value; returns false (and notifies nobody) if it was equal.
    pub fn set(&self, value: T) -> bool {
        if *self.value.borrow() == value {
            return false;
        }
        *self.value.borrow_mut() = value;
        if let Some(rt) = self.rt.upgrade() {
            rt.notify(self.id);
        }
        true
    }

    /// Modify a copy of the value with `f` and store it if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.value.borrow().clone();
        f(&mut next);
        self.set(next)
    }

    /// Remove the node; the handle keeps its last value but stops notifying.
    pub fn dispose(&self) {
        if let Some(rt) = self.rt.upgrade() {
            rt.dispose(self.id);
        }
    }

    /// Register a dependency of the current observer on this signal.
    fn track(&self) {
        if let Some(rt) = self.rt.upgrade() {
            rt.track(self.id);
        }
    }
}

/// A cached value derived from other reactive values.
///
/// Recomputes lazily on read once a source changed, and only dirties its own
/// subscribers when the recomputed value differs.
pub struct Memo<T> {
    /// Owning runtime.
    rt: Weak<Inner>,
    /// Graph node.
    id: NodeId,
    /// Cached value.
    value: Rc<RefCell<T>>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            rt: self.rt.clone(),
            id: self.id,
            value: self.value.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.id)
            .field("value", &*self.value.borrow())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Memo<T> {
    /// Assemble a handle.
    pub(crate) fn from_parts(rt: Weak<Inner>, id: NodeId, value: Rc<RefCell<T>>) -> Self {
        Self { rt, id, value }
    }

    /// Graph identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Read (recomputing if stale) and track.
    pub fn get(&self) -> T {
        self.refresh(true);
        self.value.borrow().clone()
    }

    /// Read (recomputing if stale) without tracking.
    pub fn get_untracked(&self) -> T {
        self.refresh(false);
        self.value.borrow().clone()
    }

    /// Borrow the fresh value and track.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.refresh(true);
        f(&self.value.borrow())
    }

    /// Remove the node; the handle keeps its last value.
    pub fn dispose(&self) {
        if let Some(rt) = self.rt.upgrade() {
            rt.dispose(self.id);
        }
    }

    /// Bring the cached value up to date, then (optionally) track it.
    ///
    /// Updating first keeps a recompute from dirtying the reader that triggered it.
    fn refresh(&self, track: bool) {
        if let Some(rt) = self.rt.upgrade() {
            rt.update_if_necessary(self.id);
            if track {
                rt.track(self.id);
            }
        }
    }
}

/// A side effect that reruns when anything it read changes.
///
/// Dropping the handle does not stop the effect; call [`Effect::dispose`].
#[derive(Clone)]
pub struct Effect {
    /// Owning runtime.
    rt: Weak<Inner>,
    /// Graph node.
    id: NodeId,
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Effect").field(&self.id).finish()
    }
}

impl Effect {
    /// Assemble a handle.
    pub(crate) fn from_parts(rt: Weak<Inner>, id: NodeId) -> Self {
        Self { rt, id }
    }

    /// Graph identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Stop the effect permanently.
    pub fn dispose(&self) {
        if let Some(rt) = self.rt.upgrade() {
            rt.dispose(self.id);
        }
    }
}
