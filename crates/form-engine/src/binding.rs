//! Renderer-facing bindings.

use std::{collections::BTreeMap, fmt, rc::Rc};

use form_config::FieldKind;
use form_events::{EventBus, FormEvent};
use form_signals::{Memo, Signal};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{ArrayFieldController, FieldHandle, FieldPath, FieldValue, ValidationError};

/// A property that is either fixed or recomputed reactively.
#[derive(Clone, Debug)]
pub enum Binding<T> {
    /// Never changes.
    Static(T),
    /// Recomputed when its inputs change.
    Reactive(Memo<T>),
}

impl<T: Clone + PartialEq + 'static> Binding<T> {
    /// Current value, tracked when reactive.
    pub fn get(&self) -> T {
        match self {
            Self::Static(v) => v.clone(),
            Self::Reactive(m) => m.get(),
        }
    }

    /// Current value without tracking.
    pub fn get_untracked(&self) -> T {
        match self {
            Self::Static(v) => v.clone(),
            Self::Reactive(m) => m.get_untracked(),
        }
    }

    /// True when backed by a memo.
    pub fn is_reactive(&self) -> bool {
        matches!(self, Self::Reactive(_))
    }

    /// Release the memo, if any.
    pub(crate) fn dispose(&self) {
        if let Self::Reactive(m) = self {
            m.dispose();
        }
    }
}

/// Event wiring of a button field.
#[derive(Clone)]
pub struct ButtonBinding {
    /// Button kind.
    kind: FieldKind,
    /// Field key, used as event type for custom buttons without `event`.
    key: String,
    /// Custom event type.
    event: Option<String>,
    /// Resolved target array path.
    array_key: Option<String>,
    /// Explicit index from the definition.
    index: Option<usize>,
    /// Position of the item the button lives in.
    position: Option<Signal<usize>>,
    /// Raw event arguments.
    args: Vec<Value>,
    /// The button's own disabled rules, before page or validity gating.
    own_disabled: Binding<bool>,
    /// Root value, for `$formValue`.
    root: Signal<Value>,
    /// Where presses go.
    bus: EventBus,
}

impl fmt::Debug for ButtonBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonBinding")
            .field("kind", &self.kind)
            .field("array_key", &self.array_key)
            .field("event", &self.event())
            .finish()
    }
}

/// Inputs for [`ButtonBinding::new`].
pub(crate) struct ButtonParts {
    /// Button kind.
    pub kind: FieldKind,
    /// Field key.
    pub key: String,
    /// Custom event type.
    pub event: Option<String>,
    /// Resolved target array.
    pub array_key: Option<String>,
    /// Explicit index.
    pub index: Option<usize>,
    /// Owning item position.
    pub position: Option<Signal<usize>>,
    /// Raw arguments.
    pub args: Vec<Value>,
    /// Disabled rules before gating.
    pub own_disabled: Binding<bool>,
}

impl ButtonBinding {
    /// Assemble a binding.
    pub(crate) fn new(parts: ButtonParts, root: Signal<Value>, bus: EventBus) -> Self {
        Self {
            kind: parts.kind,
            key: parts.key,
            event: parts.event,
            array_key: parts.array_key,
            index: parts.index,
            position: parts.position,
            args: parts.args,
            own_disabled: parts.own_disabled,
            root,
            bus,
        }
    }

    /// Button kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Target array, for array buttons that could be resolved.
    pub fn array_key(&self) -> Option<&str> {
        self.array_key.as_deref()
    }

    /// Position of the owning item, untracked.
    fn own_index(&self) -> Option<usize> {
        self.position.as_ref().map(Signal::get_untracked)
    }

    /// Event arguments with `$index`, `$arrayKey` and `$formValue` substituted.
    pub fn resolved_args(&self) -> Vec<Value> {
        self.args
            .iter()
            .map(|arg| match arg.as_str() {
                Some("$index") => self.own_index().map_or(Value::Null, Value::from),
                Some("$arrayKey") => self.array_key.clone().map_or(Value::Null, Value::String),
                Some("$formValue") => self.root.get_untracked(),
                _ => arg.clone(),
            })
            .collect()
    }

    /// The event a press would dispatch now, or `None` for a misconfigured array
    /// button.
    ///
    /// Inside an item, add inserts after the item, insert and remove act on the
    /// item itself; an explicit `index` wins either way.
    pub fn event(&self) -> Option<FormEvent> {
        let target = || self.array_key.clone();
        let here = self.index.or_else(|| self.own_index());
        Some(match self.kind {
            FieldKind::Submit => FormEvent::Submit,
            FieldKind::Next => FormEvent::NextPage,
            FieldKind::Previous => FormEvent::PreviousPage,
            FieldKind::AddArrayItem => FormEvent::AddArrayItem {
                array_key: target()?,
                index: self.index.or_else(|| self.own_index().map(|i| i + 1)),
            },
            FieldKind::PrependArrayItem => FormEvent::PrependArrayItem {
                array_key: target()?,
            },
            FieldKind::InsertArrayItem => FormEvent::InsertArrayItem {
                array_key: target()?,
                index: here.unwrap_or(0),
            },
            FieldKind::RemoveArrayItem => FormEvent::RemoveArrayItem {
                array_key: target()?,
                index: here,
            },
            FieldKind::PopArrayItem => FormEvent::PopArrayItem {
                array_key: target()?,
            },
            FieldKind::ShiftArrayItem => FormEvent::ShiftArrayItem {
                array_key: target()?,
            },
            _ => FormEvent::Custom {
                event_type: self.event.clone().unwrap_or_else(|| self.key.clone()),
                args: self.resolved_args(),
            },
        })
    }

    /// Release the ungated disabled memo.
    pub(crate) fn dispose(&self) {
        self.own_disabled.dispose();
    }

    /// Dispatch the button's event on the form bus.
    pub fn press(&self) -> Option<FormEvent> {
        let Some(event) = self.event() else {
            warn!(key = %self.key, kind = %self.kind, "button has no array to act on");
            return None;
        };
        debug!(key = %self.key, event = event.event_type(), "button pressed");
        self.bus.dispatch(event.clone());
        Some(event)
    }
}

/// Everything a renderer needs for one field.
#[derive(Clone, Debug)]
pub struct FieldBindings {
    /// Field key.
    pub key: String,
    /// Where the field's value lives; rows and pages share their parent's path.
    pub path: FieldPath,
    /// Field type.
    pub kind: FieldKind,
    /// Renderer component identifier.
    pub component: String,
    /// Two-way value for value-bearing fields.
    pub value: Option<FieldValue>,
    /// Display label.
    pub label: Option<String>,
    /// Class names.
    pub class_name: Option<String>,
    /// Tab order.
    pub tab_index: Option<i32>,
    /// Renderer-specific configuration.
    pub props: Map<String, Value>,
    /// Disabled flag.
    pub disabled: Binding<bool>,
    /// Required flag.
    pub required: Binding<bool>,
    /// Read-only flag.
    pub readonly: Binding<bool>,
    /// Hidden flag.
    pub hidden: Binding<bool>,
    /// Field messages over form defaults.
    pub validation_messages: BTreeMap<String, String>,
    /// Failing validators for value-bearing and array fields.
    pub errors: Option<Memo<Vec<ValidationError>>>,
    /// Live handle on the field's node; omitted when the node does not exist.
    pub field: Option<FieldHandle>,
    /// Bindings of container children.
    pub children: Vec<FieldBindings>,
    /// Event wiring of buttons.
    pub button: Option<ButtonBinding>,
    /// Item controller of array fields.
    pub array: Option<Rc<ArrayFieldController>>,
}

impl FieldBindings {
    /// Current value, or `None` for fields without one.
    pub fn current_value(&self) -> Option<Value> {
        self.value.as_ref().map(FieldValue::get_untracked)
    }

    /// Current validation errors, untracked.
    pub fn current_errors(&self) -> Vec<ValidationError> {
        self.errors
            .as_ref()
            .map(Memo::get_untracked)
            .unwrap_or_default()
    }

    /// Visit this binding and every descendant, array items included, depth first.
    pub fn walk(&self, f: &mut dyn FnMut(&Self)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
        if let Some(array) = &self.array {
            for item in array.all_item_bindings() {
                for b in &item {
                    b.walk(f);
                }
            }
        }
    }

    /// First descendant (or self) bound at `path`; rows and pages are skipped since
    /// they share their parent's path.
    pub fn find(&self, path: &str) -> Option<Self> {
        let mut found = None;
        self.walk(&mut |b| {
            if found.is_none()
                && !matches!(b.kind, FieldKind::Row | FieldKind::Page)
                && b.path.resolve_untracked() == path
            {
                found = Some(b.clone());
            }
        });
        found
    }

    /// Release every memo owned by this subtree. Cached value cells and the form
    /// value are kept.
    pub(crate) fn dispose(&self) {
        for flag in [&self.disabled, &self.required, &self.readonly, &self.hidden] {
            flag.dispose();
        }
        if let Some(errors) = &self.errors {
            errors.dispose();
        }
        if let Some(button) = &self.button {
            button.dispose();
        }
        if let Some(value) = self.value.as_ref().filter(|v| !v.path().is_static()) {
            value.dispose();
        }
        for child in &self.children {
            child.dispose();
        }
    }
}
