//! Two-way value cells and live handles into the form value.

use std::{fmt, rc::Rc};

use form_condition::{set_at, value_at};
use form_signals::{Memo, Runtime, Signal};
use serde_json::Value;
use tracing::{debug, trace};

use crate::FieldPath;

/// Two-way reactive view of one field's value.
///
/// Reads project the root form value at the field's path, falling back to the form
/// defaults. Writes funnel back into the root value and are dropped when equal to the
/// current value, so a cell bound to an input cannot feed back into itself.
#[derive(Clone)]
pub struct FieldValue {
    /// Where the value lives.
    path: FieldPath,
    /// Root form value.
    root: Signal<Value>,
    /// Projected value.
    cell: Memo<Value>,
    /// Owned by a derivation; user writes are refused.
    derived: bool,
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValue")
            .field("path", &self.path)
            .field("value", &self.cell.get_untracked())
            .field("derived", &self.derived)
            .finish()
    }
}

impl FieldValue {
    /// Create a cell over `root` at `path`.
    pub(crate) fn new(
        rt: &Runtime,
        root: &Signal<Value>,
        defaults: Rc<Value>,
        path: FieldPath,
        derived: bool,
    ) -> Self {
        let (r, p) = (root.clone(), path.clone());
        let cell = rt.memo(move || {
            let at = p.resolve();
            r.with(|v| value_at(v, &at).cloned())
                .or_else(|| value_at(&defaults, &at).cloned())
                .unwrap_or(Value::Null)
        });
        Self {
            path,
            root: root.clone(),
            cell,
            derived,
        }
    }

    /// Field path.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// True when a derivation owns this value.
    pub fn is_derived(&self) -> bool {
        self.derived
    }

    /// Current value, tracked.
    pub fn get(&self) -> Value {
        self.cell.get()
    }

    /// Current value without tracking.
    pub fn get_untracked(&self) -> Value {
        self.cell.get_untracked()
    }

    /// Write `value` into the root form value.
    ///
    /// Returns false when the value was unchanged, the field is derived, or the path
    /// cannot be written.
    pub fn set(&self, value: Value) -> bool {
        let at = self.path.resolve_untracked();
        if self.derived {
            debug!(path = %at, "write to derived field ignored");
            return false;
        }
        if self.cell.get_untracked() == value {
            trace!(path = %at, "unchanged value not written");
            return false;
        }
        let mut ok = true;
        self.root.update(|r| ok = set_at(r, &at, value));
        if !ok {
            debug!(path = %at, "value path could not be written");
        }
        ok
    }

    /// Stop the projection; the root value is untouched.
    pub(crate) fn dispose(&self) {
        self.cell.dispose();
    }
}

/// Live handle on the node of the form value that a field owns.
///
/// Bindings carry one only when the field's key exists in the form value at build
/// time.
#[derive(Clone)]
pub struct FieldHandle {
    /// Where the node lives.
    path: FieldPath,
    /// Root form value.
    root: Signal<Value>,
}

impl fmt::Debug for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldHandle").field(&self.path).finish()
    }
}

impl FieldHandle {
    /// Handle on `path`, or `None` when nothing lives there.
    pub(crate) fn locate(root: &Signal<Value>, path: &FieldPath) -> Option<Self> {
        let at = path.resolve_untracked();
        root.with_untracked(|v| value_at(v, &at).is_some())
            .then(|| Self {
                path: path.clone(),
                root: root.clone(),
            })
    }

    /// Path of the node.
    pub fn path(&self) -> String {
        self.path.resolve_untracked()
    }

    /// Current node value, tracked; `None` once the node was removed.
    pub fn value(&self) -> Option<Value> {
        let at = self.path.resolve();
        self.root.with(|v| value_at(v, &at).cloned())
    }

    /// True while the node still exists.
    pub fn exists(&self) -> bool {
        let at = self.path.resolve_untracked();
        self.root.with_untracked(|v| value_at(v, &at).is_some())
    }
}
