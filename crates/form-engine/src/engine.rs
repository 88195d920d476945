use std::{cell::RefCell, collections::BTreeMap, rc::Rc, slice};

use form_condition::{path::child_path, set_at};
use form_config::{
    ContainerField, Error as ConfigError, FieldDefinition, FormConfig, default_value_tree,
};
use form_events::{EventBus, FormEvent, Listener, types};
use form_pages::{PageOrchestrator, PageOrchestratorState};
use form_signals::{Effect, Memo, Runtime};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    ArrayFieldController, Error, FieldBindings, FieldError, FieldPath, FieldSignalContext,
    FormOptions, MountState, Result,
    context::{ArrayMap, ContextParts, find_array},
    derivation, mapper,
    mount::PageSlots,
    validation::{Env, tree_errors},
};

/// Where the engine's root bindings live.
enum Layout {
    /// Single-page form: every root field is bound once.
    Flat(Vec<FieldBindings>),
    /// Paged form: pages mount and unmount around the current one.
    Paged {
        /// Navigation state.
        pages: PageOrchestrator,
        /// Page mounts.
        slots: RefCell<PageSlots>,
    },
}

/// A running form: reactive value, bindings, derivations, arrays and pages.
///
/// Everything settles synchronously: when a write or [`FormEngine::dispatch`]
/// returns, derived values, conditions and item lists are consistent with it.
pub struct FormEngine {
    /// Reactive graph.
    rt: Runtime,
    /// Source configuration.
    config: Rc<FormConfig>,
    /// Root binding context.
    ctx: FieldSignalContext,
    /// Array controllers by path.
    arrays: Rc<RefCell<ArrayMap>>,
    /// Root bindings.
    layout: Layout,
    /// Derivation effect, while there are derivations.
    derivations: Option<Effect>,
    /// Whole-form validity.
    form_valid: Memo<bool>,
    /// Routes array commands from the bus to their controllers.
    _commands: Listener,
    /// Static validation findings.
    warnings: Vec<String>,
}

/// Merge `over` into `base`: objects merge recursively, anything else replaces.
fn overlay(base: &mut Value, over: Value) {
    match (base, over) {
        (Value::Object(b), Value::Object(o)) => {
            for (k, v) in o {
                match b.get_mut(&k) {
                    Some(slot) => overlay(slot, v),
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

/// Static paths of arrays outside item templates.
fn array_fields(fields: &[FieldDefinition], parent: &str, out: &mut Vec<(String, FieldDefinition)>) {
    for f in fields {
        let path = if matches!(f, FieldDefinition::Row(_) | FieldDefinition::Page(_)) {
            parent.to_string()
        } else {
            child_path(parent, f.key())
        };
        if f.kind().is_container() {
            array_fields(f.children(), &path, out);
        } else if f.as_array().is_some() {
            out.push((path, f.clone()));
        }
    }
}

/// Memo that is true while no visible field in `config` fails validation.
fn validity_memo(rt: &Runtime, config: &Rc<FormConfig>, ctx: &FieldSignalContext) -> Memo<bool> {
    let (evaluator, functions, messages) = ctx.shared();
    let (config, root) = (config.clone(), ctx.root().clone());
    rt.memo(move || {
        root.with(|v| {
            let mut errs = Vec::new();
            tree_errors(
                &config.fields,
                "",
                Env {
                    evaluator: &evaluator,
                    functions: &functions,
                    messages: &messages,
                    form_value: v,
                },
                &mut errs,
            );
            errs.is_empty()
        })
    })
}

/// Register a controller for every array outside item templates.
fn bind_arrays(fields: &[FieldDefinition], ctx: &FieldSignalContext, arrays: &RefCell<ArrayMap>) {
    let mut found = Vec::new();
    array_fields(fields, "", &mut found);
    for (path, field) in found {
        if let FieldDefinition::Array(a) = field {
            let c = Rc::new(ArrayFieldController::new(Rc::new(a), path.clone(), ctx.clone()));
            c.follow();
            arrays.borrow_mut().insert(path, c);
        }
    }
}

/// Apply array commands from `bus` to the controllers in `arrays` as they are
/// dispatched.
fn route_array_commands(bus: &EventBus, arrays: &Rc<RefCell<ArrayMap>>) -> Listener {
    let arrays = Rc::downgrade(arrays);
    bus.on(types::ARRAY_COMMANDS, move |event| {
        let Some(key) = event.array_key() else {
            return;
        };
        let target = arrays.upgrade().and_then(|map| {
            let map = map.borrow();
            find_array(&map, key)
        });
        let result = match target {
            Some(array) => array.apply(event),
            None => Err(Error::UnknownArray(key.to_string())),
        };
        if let Err(e) = result {
            warn!(event = event.event_type(), error = %e, "array command refused");
        }
    })
}

impl FormEngine {
    /// Build an engine for `config`.
    ///
    /// Configuration mistakes are logged and kept in [`Self::config_warnings`];
    /// with [`FormOptions::strict`] they fail instead.
    pub fn new(config: FormConfig, options: FormOptions) -> Result<Self> {
        let warnings = config.validate();
        if !warnings.is_empty() {
            if options.strict {
                return Err(ConfigError::Validation {
                    path: None,
                    messages: warnings,
                }
                .into());
            }
            for w in &warnings {
                warn!(problem = %w, "form configuration");
            }
        }

        let rt = Runtime::new();
        if let Some(n) = options.max_settle_runs {
            rt.set_max_effect_runs(n);
        }
        let defaults = default_value_tree(&config.fields);
        let mut initial = defaults.clone();
        if let Some(v) = options.initial_value {
            overlay(&mut initial, v);
        }
        let root = rt.signal(initial);
        let bus = options.bus.unwrap_or_default();
        let plan = derivation::order(derivation::collect(&config.fields));

        let pages = config.is_paged().then(|| {
            let count = config.pages().count();
            let start = config.initial_page_index.unwrap_or(0);
            PageOrchestrator::new(&rt, count, start, bus.clone())
        });

        let arrays: Rc<RefCell<ArrayMap>> = Rc::default();
        let mut ctx = FieldSignalContext::new(ContextParts {
            rt: rt.clone(),
            root: root.clone(),
            defaults,
            messages: config.merged_default_messages(),
            functions: options.custom_functions,
            bus: bus.clone(),
            registry: options.registry,
            derived: derivation::derived_paths(&plan),
            arrays: Rc::downgrade(&arrays),
            page_state: pages.as_ref().map(|p| p.state_memo().clone()),
        });

        let config = Rc::new(config);
        let form_valid = validity_memo(&rt, &config, &ctx);
        ctx.set_form_valid(form_valid.clone());

        bind_arrays(&config.fields, &ctx, &arrays);

        let (evaluator, functions, _) = ctx.shared();
        let derivations = derivation::install(&rt, &root, plan, evaluator, functions);
        let commands = route_array_commands(&bus, &arrays);

        let layout = match pages {
            Some(pages) => {
                let slots = PageSlots::new(pages.state().total_pages, options.page_mounting);
                Layout::Paged {
                    pages,
                    slots: RefCell::new(slots),
                }
            }
            None => Layout::Flat(
                config
                    .fields
                    .iter()
                    .map(|f| mapper::build(f, &FieldPath::root(), &ctx))
                    .collect(),
            ),
        };

        let engine = Self {
            rt,
            config,
            ctx,
            arrays,
            layout,
            derivations,
            form_valid,
            _commands: commands,
            warnings,
        };
        engine.sync_mounts();
        info!(
            fields = engine.config.fields.len(),
            arrays = engine.arrays.borrow().len(),
            paged = engine.pages().is_some(),
            "form engine ready"
        );
        Ok(engine)
    }

    /// Reactive runtime.
    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    /// Root binding context.
    pub fn context(&self) -> &FieldSignalContext {
        &self.ctx
    }

    /// Form bus.
    pub fn bus(&self) -> &EventBus {
        self.ctx.bus()
    }

    /// The configuration this engine was built from.
    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Static validation findings from construction.
    pub fn config_warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Current form value.
    pub fn value(&self) -> Value {
        self.ctx.root().get_untracked()
    }

    /// Write `value` at `path`.
    pub fn set_value(&self, path: &str, value: Value) -> Result<()> {
        let mut ok = true;
        self.ctx.root().update(|root| ok = set_at(root, path, value));
        if !ok {
            return Err(Error::InvalidPath(path.to_string()));
        }
        Ok(())
    }

    /// Replace the whole form value.
    pub fn set_form_value(&self, value: Value) {
        self.ctx.root().set(value);
    }

    /// Bindings of the root fields, or of the mounted pages of a paged form.
    pub fn bindings(&self) -> Vec<FieldBindings> {
        self.sync_mounts();
        match &self.layout {
            Layout::Flat(b) => b.clone(),
            Layout::Paged { slots, .. } => slots.borrow().mounted(),
        }
    }

    /// Mounted binding for the field at `path`.
    pub fn binding(&self, path: &str) -> Option<FieldBindings> {
        self.bindings().iter().find_map(|b| b.find(path))
    }

    /// Controller of the array at `key` (full path, or bare key when unambiguous).
    pub fn array(&self, key: &str) -> Option<Rc<ArrayFieldController>> {
        self.ctx.array(key)
    }

    /// Dispatch `event` on the bus.
    ///
    /// Page and array commands are applied before this returns. Returns how many
    /// subscribers received the event.
    pub fn dispatch(&self, event: FormEvent) -> usize {
        let delivered = self.bus().dispatch(event);
        self.sync_mounts();
        delivered
    }

    /// Press the button bound at `path`.
    pub fn press(&self, path: &str) -> Option<FormEvent> {
        let event = self.binding(path)?.button?.press();
        self.sync_mounts();
        event
    }

    /// Page orchestrator of a paged form.
    pub fn pages(&self) -> Option<&PageOrchestrator> {
        match &self.layout {
            Layout::Paged { pages, .. } => Some(pages),
            Layout::Flat(_) => None,
        }
    }

    /// Current page state of a paged form.
    pub fn page_state(&self) -> Option<PageOrchestratorState> {
        self.pages().map(PageOrchestrator::state)
    }

    /// Orchestrator, or [`Error::NotPaged`].
    fn paged(&self) -> Result<&PageOrchestrator> {
        self.pages().ok_or(Error::NotPaged)
    }

    /// Go to the next page.
    pub fn navigate_next(&self) -> Result<()> {
        self.paged()?.navigate_to_next_page()?;
        self.sync_mounts();
        Ok(())
    }

    /// Go to the previous page.
    pub fn navigate_previous(&self) -> Result<()> {
        self.paged()?.navigate_to_previous_page()?;
        self.sync_mounts();
        Ok(())
    }

    /// Go to page `index`.
    pub fn navigate_to(&self, index: usize) -> Result<()> {
        self.paged()?.navigate_to_page(index)?;
        self.sync_mounts();
        Ok(())
    }

    /// Mount state of every page; empty for single-page forms.
    pub fn page_mount_states(&self) -> Vec<MountState> {
        self.sync_mounts();
        match &self.layout {
            Layout::Paged { slots, .. } => slots.borrow().states(),
            Layout::Flat(_) => Vec::new(),
        }
    }

    /// Mount every deferred page; returns how many were mounted.
    pub fn run_idle(&self) -> usize {
        self.sync_mounts();
        match &self.layout {
            Layout::Paged { slots, .. } => slots.borrow_mut().run_idle(&|i| self.build_page(i)),
            Layout::Flat(_) => 0,
        }
    }

    /// Drop pending deferred mounts; returns how many were dropped.
    pub fn cancel_idle(&self) -> usize {
        match &self.layout {
            Layout::Paged { slots, .. } => slots.borrow_mut().cancel_idle(),
            Layout::Flat(_) => 0,
        }
    }

    /// True when no visible field fails validation.
    pub fn is_valid(&self) -> bool {
        self.form_valid.get_untracked()
    }

    /// Reactive whole-form validity.
    pub fn validity(&self) -> &Memo<bool> {
        &self.form_valid
    }

    /// Every failing validator on a visible field.
    pub fn validation_errors(&self) -> Vec<FieldError> {
        self.errors_under(&self.config.fields)
    }

    /// Failing validators on page `index`.
    pub fn page_errors(&self, index: usize) -> Vec<FieldError> {
        self.config
            .pages()
            .nth(index)
            .map(|p| self.errors_under(slice::from_ref(p)))
            .unwrap_or_default()
    }

    /// True when page `index` has no failing validators.
    pub fn is_page_valid(&self, index: usize) -> bool {
        self.page_errors(index).is_empty()
    }

    /// Validate and, when valid, emit `submit` and return the form value.
    pub fn submit(&self) -> Result<Value> {
        let errors = self.validation_errors();
        if !errors.is_empty() {
            debug!(errors = errors.len(), "submit refused");
            return Err(Error::Invalid(errors));
        }
        self.dispatch(FormEvent::Submit);
        Ok(self.value())
    }

    /// Stop derivations and release every binding. The form value stays readable.
    pub fn dispose(&self) {
        if let Some(fx) = &self.derivations {
            fx.dispose();
        }
        for b in self.bindings() {
            b.dispose();
        }
        for a in self.arrays.borrow().values() {
            a.dispose();
        }
        self.form_valid.dispose();
    }

    /// Errors of the fields in `fields`, placed at the root.
    fn errors_under(&self, fields: &[FieldDefinition]) -> Vec<FieldError> {
        let (evaluator, functions, messages) = self.ctx.shared();
        let mut out = Vec::new();
        self.ctx.root().with_untracked(|v| {
            tree_errors(
                fields,
                "",
                Env {
                    evaluator: &evaluator,
                    functions: &functions,
                    messages: &messages,
                    form_value: v,
                },
                &mut out,
            );
        });
        out
    }

    /// Bindings for page `index`.
    fn build_page(&self, index: usize) -> FieldBindings {
        let page = self.config.pages().nth(index);
        match page {
            Some(p) => mapper::build(p, &FieldPath::root(), &self.ctx),
            None => empty_page(index, &self.ctx),
        }
    }

    /// Lay out page mounts for the current page.
    fn sync_mounts(&self) {
        if let Layout::Paged { pages, slots } = &self.layout {
            let current = pages.state().current_page_index;
            slots.borrow_mut().reconcile(current, &|i| self.build_page(i));
        }
    }

    /// Controllers by path.
    pub fn arrays(&self) -> BTreeMap<String, Rc<ArrayFieldController>> {
        self.arrays.borrow().clone()
    }
}

/// Empty page bindings for a slot with no page definition.
fn empty_page(index: usize, ctx: &FieldSignalContext) -> FieldBindings {
    warn!(page = index, "no page definition for slot");
    mapper::build(
        &FieldDefinition::Page(ContainerField::default()),
        &FieldPath::root(),
        ctx,
    )
}
