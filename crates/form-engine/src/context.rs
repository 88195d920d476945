//! What a mapper needs to bind one field.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    fmt,
    rc::{Rc, Weak},
};

use form_condition::{ConditionEvaluator, CustomFunctions};
use form_events::EventBus;
use form_pages::PageOrchestratorState;
use form_signals::{Memo, Runtime, Signal};
use serde_json::Value;

use crate::{ArrayFieldController, FieldPath, FieldRegistry, FieldValue, ItemId};

/// Array controllers by full array path.
pub(crate) type ArrayMap = BTreeMap<String, Rc<ArrayFieldController>>;

/// The array item a field was built for.
#[derive(Clone, Debug)]
pub struct ArrayScope {
    /// Full path of the owning array.
    pub array_path: String,
    /// Stable identity of the item.
    pub item: ItemId,
    /// Current position of the item.
    pub position: Signal<usize>,
}

/// Shared handles every binding is built from.
///
/// Cloning is cheap; clones share the same root value, caches and collaborators.
/// Fields inside an array item get a clone carrying that item's [`ArrayScope`].
#[derive(Clone)]
pub struct FieldSignalContext {
    /// Reactive runtime.
    rt: Runtime,
    /// The single mutable source of truth.
    root: Signal<Value>,
    /// Configured defaults, used where the root value has no entry.
    defaults: Rc<Value>,
    /// Built-in messages overlaid by the form's defaults.
    messages: Rc<BTreeMap<String, String>>,
    /// Condition evaluation.
    evaluator: Rc<ConditionEvaluator>,
    /// Host functions.
    functions: Rc<CustomFunctions>,
    /// Form bus.
    bus: EventBus,
    /// Component identifiers.
    registry: Rc<FieldRegistry>,
    /// Item being built, if any.
    scope: Option<ArrayScope>,
    /// One value cell per static path.
    cells: Rc<RefCell<BTreeMap<String, FieldValue>>>,
    /// Static paths owned by derivations.
    derived: Rc<BTreeSet<String>>,
    /// Array controllers, owned by the engine.
    arrays: Weak<RefCell<ArrayMap>>,
    /// Page state, for paged forms.
    page_state: Option<Memo<PageOrchestratorState>>,
    /// Whole-form validity.
    form_valid: Option<Memo<bool>>,
}

impl fmt::Debug for FieldSignalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSignalContext")
            .field("scope", &self.scope)
            .field("cells", &self.cells.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Everything [`FieldSignalContext::new`] takes.
pub(crate) struct ContextParts {
    /// Reactive runtime.
    pub rt: Runtime,
    /// Root value signal.
    pub root: Signal<Value>,
    /// Default tree.
    pub defaults: Value,
    /// Merged form messages.
    pub messages: BTreeMap<String, String>,
    /// Host functions.
    pub functions: CustomFunctions,
    /// Form bus.
    pub bus: EventBus,
    /// Component identifiers.
    pub registry: FieldRegistry,
    /// Derivation targets.
    pub derived: BTreeSet<String>,
    /// Engine-owned controller map.
    pub arrays: Weak<RefCell<ArrayMap>>,
    /// Page state, for paged forms.
    pub page_state: Option<Memo<PageOrchestratorState>>,
}

impl FieldSignalContext {
    /// Root context with no array scope.
    pub(crate) fn new(parts: ContextParts) -> Self {
        Self {
            rt: parts.rt,
            root: parts.root,
            defaults: Rc::new(parts.defaults),
            messages: Rc::new(parts.messages),
            evaluator: Rc::new(ConditionEvaluator::new()),
            functions: Rc::new(parts.functions),
            bus: parts.bus,
            registry: Rc::new(parts.registry),
            scope: None,
            cells: Rc::default(),
            derived: Rc::new(parts.derived),
            arrays: parts.arrays,
            page_state: parts.page_state,
            form_valid: None,
        }
    }

    /// Attach the whole-form validity memo.
    pub(crate) fn set_form_valid(&mut self, memo: Memo<bool>) {
        self.form_valid = Some(memo);
    }

    /// A clone scoped to one array item.
    pub(crate) fn in_item(&self, scope: ArrayScope) -> Self {
        Self {
            scope: Some(scope),
            ..self.clone()
        }
    }

    /// Reactive runtime.
    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    /// The root form value signal.
    pub fn root(&self) -> &Signal<Value> {
        &self.root
    }

    /// Configured defaults.
    pub fn defaults(&self) -> &Value {
        &self.defaults
    }

    /// Form-level validation messages (built-ins overlaid by form defaults).
    pub fn default_messages(&self) -> &BTreeMap<String, String> {
        &self.messages
    }

    /// Condition evaluator.
    pub fn evaluator(&self) -> &ConditionEvaluator {
        &self.evaluator
    }

    /// Host functions.
    pub fn custom_functions(&self) -> &CustomFunctions {
        &self.functions
    }

    /// Form bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Component identifiers.
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Array item being built, if any.
    pub fn array_scope(&self) -> Option<&ArrayScope> {
        self.scope.as_ref()
    }

    /// Page state of a paged form.
    pub fn page_state(&self) -> Option<&Memo<PageOrchestratorState>> {
        self.page_state.as_ref()
    }

    /// Whole-form validity.
    pub fn form_valid(&self) -> Option<&Memo<bool>> {
        self.form_valid.as_ref()
    }

    /// Shared handles for closures that outlive this context.
    pub(crate) fn shared(&self) -> (Rc<ConditionEvaluator>, Rc<CustomFunctions>, Rc<BTreeMap<String, String>>) {
        (
            self.evaluator.clone(),
            self.functions.clone(),
            self.messages.clone(),
        )
    }

    /// Value cell for `path`, created once per static path.
    ///
    /// Paths below array items move with their item, so those cells belong to the
    /// item's bindings and are not cached.
    pub fn value_cell(&self, path: &FieldPath) -> FieldValue {
        if !path.is_static() {
            return FieldValue::new(&self.rt, &self.root, self.defaults.clone(), path.clone(), false);
        }
        let at = path.resolve_untracked();
        if let Some(cell) = self.cells.borrow().get(&at) {
            return cell.clone();
        }
        let cell = FieldValue::new(
            &self.rt,
            &self.root,
            self.defaults.clone(),
            path.clone(),
            self.derived.contains(&at),
        );
        self.cells.borrow_mut().insert(at, cell.clone());
        cell
    }

    /// Number of cached value cells.
    pub fn cached_cells(&self) -> usize {
        self.cells.borrow().len()
    }

    /// Controller for `key`, given as a full path or as the array's bare key when
    /// that is unambiguous.
    pub fn array(&self, key: &str) -> Option<Rc<ArrayFieldController>> {
        let arrays = self.arrays.upgrade()?;
        find_array(&arrays.borrow(), key)
    }
}

/// Controller at full path `key`, or the only controller whose field key is `key`.
pub(crate) fn find_array(map: &ArrayMap, key: &str) -> Option<Rc<ArrayFieldController>> {
    if let Some(c) = map.get(key) {
        return Some(c.clone());
    }
    let mut by_key = map.values().filter(|c| c.key() == key);
    match (by_key.next(), by_key.next()) {
        (Some(c), None) => Some(c.clone()),
        _ => None,
    }
}
