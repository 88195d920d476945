//! Turning field definitions into [`FieldBindings`].

use std::rc::Rc;

use form_condition::{ConditionEvaluator, EvaluationContext};
use form_config::{ArrayTemplate, ConditionExpression, FieldBase, FieldDefinition, FieldKind, LogicKind};
use form_signals::Memo;
use tracing::{trace, warn};

use crate::{
    Binding, ButtonBinding, FieldBindings, FieldHandle, FieldPath, FieldSignalContext, Mapper,
    ValidationError,
    binding::ButtonParts,
    validation::{Env, field_errors, merge_messages},
};

/// Bindings for `field` placed under `parent`.
pub(crate) fn build(field: &FieldDefinition, parent: &FieldPath, ctx: &FieldSignalContext) -> FieldBindings {
    let path = match field.kind() {
        FieldKind::Row | FieldKind::Page => parent.clone(),
        _ => parent.child(field.key()),
    };
    build_at(field, path, ctx)
}

/// Bindings for one array item rooted at `item`.
///
/// A single value template binds the item itself; a single container template is
/// transparent, so its children sit directly in the item object.
pub(crate) fn build_item(
    template: &ArrayTemplate,
    item: &FieldPath,
    ctx: &FieldSignalContext,
) -> Vec<FieldBindings> {
    match template {
        ArrayTemplate::Single(field) => vec![build_at(field, item.clone(), ctx)],
        ArrayTemplate::Multiple(fields) => fields.iter().map(|f| build(f, item, ctx)).collect(),
    }
}

/// Bindings for `field` living at `path`.
fn build_at(field: &FieldDefinition, path: FieldPath, ctx: &FieldSignalContext) -> FieldBindings {
    let kind = field.kind();
    let mut b = common(field, path, ctx);
    match ctx.registry().mapper(kind) {
        Mapper::Value => map_value(field, &mut b, ctx),
        Mapper::Container => map_container(field, &mut b, ctx),
        Mapper::Array => map_array(field, &mut b, ctx),
        Mapper::Button => map_button(field, &mut b, ctx),
        Mapper::Text => {}
    }
    trace!(key = field.key(), kind = %kind, path = %b.path, "field bound");
    b
}

/// Attributes shared by every mapper.
fn common(field: &FieldDefinition, path: FieldPath, ctx: &FieldSignalContext) -> FieldBindings {
    let base = field.base();
    let kind = field.kind();
    FieldBindings {
        key: base.key.clone(),
        kind,
        component: ctx.registry().component(kind).to_string(),
        value: None,
        label: base.label.clone(),
        class_name: base.class_name.clone(),
        tab_index: base.tab_index,
        props: base.props.clone(),
        disabled: logic_binding(base, LogicKind::Disabled, base.disabled, &path, ctx),
        required: logic_binding(base, LogicKind::Required, base.required, &path, ctx),
        readonly: logic_binding(base, LogicKind::Readonly, base.readonly, &path, ctx),
        hidden: logic_binding(base, LogicKind::Hidden, base.hidden, &path, ctx),
        validation_messages: merge_messages(ctx.default_messages(), &base.validation_messages),
        errors: None,
        field: None,
        children: Vec::new(),
        button: None,
        array: None,
        path,
    }
}

/// A flag that is statically on, statically off, or driven by the field's rules
/// of `kind` (any rule holding turns it on).
fn logic_binding(
    base: &FieldBase,
    kind: LogicKind,
    flag: bool,
    path: &FieldPath,
    ctx: &FieldSignalContext,
) -> Binding<bool> {
    if flag {
        return Binding::Static(true);
    }
    let rules: Vec<ConditionExpression> = base
        .logic
        .iter()
        .filter(|r| r.kind() == kind)
        .map(|r| r.condition().clone())
        .collect();
    if rules.is_empty() {
        return Binding::Static(false);
    }
    let (evaluator, functions, _) = ctx.shared();
    let (root, path) = (ctx.root().clone(), path.clone());
    Binding::Reactive(ctx.runtime().memo(move || {
        let at = path.resolve();
        root.with(|v| {
            let ectx = EvaluationContext::new(v, &functions).for_field(&at);
            any_holds(&rules, &evaluator, &ectx)
        })
    }))
}

/// OR over `rules`.
fn any_holds(
    rules: &[ConditionExpression],
    evaluator: &ConditionEvaluator,
    ctx: &EvaluationContext<'_>,
) -> bool {
    rules.iter().any(|r| evaluator.evaluate(r, ctx))
}

/// Memo of the field's failing validators.
fn errors_memo(base: &FieldBase, path: &FieldPath, ctx: &FieldSignalContext) -> Memo<Vec<ValidationError>> {
    let (evaluator, functions, messages) = ctx.shared();
    let (root, path) = (ctx.root().clone(), path.clone());
    let base = Rc::new(base.clone());
    ctx.runtime().memo(move || {
        let at = path.resolve();
        root.with(|v| {
            field_errors(
                &base,
                &at,
                Env {
                    evaluator: &evaluator,
                    functions: &functions,
                    messages: &messages,
                    form_value: v,
                },
            )
        })
    })
}

/// Handle on the field's node, logging when the node is missing.
fn locate(b: &FieldBindings, ctx: &FieldSignalContext) -> Option<FieldHandle> {
    let handle = FieldHandle::locate(ctx.root(), &b.path);
    if handle.is_none() {
        warn!(key = %b.key, path = %b.path, "field not found in form value; field handle omitted");
    }
    handle
}

/// Leaves: a cached two-way cell, a field handle and validation.
fn map_value(field: &FieldDefinition, b: &mut FieldBindings, ctx: &FieldSignalContext) {
    b.value = Some(ctx.value_cell(&b.path));
    b.field = locate(b, ctx);
    b.errors = Some(errors_memo(field.base(), &b.path, ctx));
}

/// Rows and pages pass the form through; groups own an object node.
fn map_container(field: &FieldDefinition, b: &mut FieldBindings, ctx: &FieldSignalContext) {
    if field.kind() == FieldKind::Group {
        b.field = locate(b, ctx);
    }
    b.children = field
        .children()
        .iter()
        .map(|child| build(child, &b.path, ctx))
        .collect();
}

/// Arrays: the controller registered for this path, or a plain value cell for
/// arrays nested inside items.
fn map_array(field: &FieldDefinition, b: &mut FieldBindings, ctx: &FieldSignalContext) {
    b.field = locate(b, ctx);
    b.errors = Some(errors_memo(field.base(), &b.path, ctx));
    if b.path.is_static() {
        b.array = ctx.array(&b.path.resolve_untracked());
    }
    if b.array.is_none() {
        warn!(key = %b.key, path = %b.path, "array has no item controller; bound by value only");
        b.value = Some(ctx.value_cell(&b.path));
    }
}

/// Buttons: resolve the target array and wire presses to the bus.
fn map_button(field: &FieldDefinition, b: &mut FieldBindings, ctx: &FieldSignalContext) {
    let Some(def) = field.as_button() else {
        return;
    };
    let kind = field.kind();
    let scope = ctx.array_scope();
    let array_key = match (&def.array_key, scope) {
        (Some(key), _) => {
            let resolved = ctx.array(key).map(|c| c.path().to_string());
            if resolved.is_none() {
                warn!(key = %b.key, array = %key, "button references unknown array");
            }
            resolved
        }
        (None, Some(s)) => Some(s.array_path.clone()),
        (None, None) => {
            if kind.array_action().is_some() {
                warn!(
                    key = %b.key,
                    kind = %kind,
                    "array button outside any array has no arrayKey; it will do nothing"
                );
            }
            None
        }
    };
    let own = b.disabled.clone();
    b.disabled = gated_disabled(kind, &own, ctx);
    b.button = Some(ButtonBinding::new(
        ButtonParts {
            kind,
            key: b.key.clone(),
            event: def.event.clone(),
            array_key,
            index: def.index,
            position: scope.map(|s| s.position.clone()),
            args: def.event_args.clone(),
            own_disabled: own,
        },
        ctx.root().clone(),
        ctx.bus().clone(),
    ));
}

/// Submit buttons are disabled while the form is invalid; next and previous while
/// they cannot move.
fn gated_disabled(kind: FieldKind, base: &Binding<bool>, ctx: &FieldSignalContext) -> Binding<bool> {
    if matches!(base, Binding::Static(true)) {
        return base.clone();
    }
    let base = base.clone();
    match kind {
        FieldKind::Submit => {
            let Some(valid) = ctx.form_valid().cloned() else {
                return base;
            };
            Binding::Reactive(ctx.runtime().memo(move || base.get() || !valid.get()))
        }
        FieldKind::Next | FieldKind::Previous => {
            let Some(state) = ctx.page_state().cloned() else {
                return base;
            };
            let next = kind == FieldKind::Next;
            Binding::Reactive(ctx.runtime().memo(move || {
                let s = state.get();
                let at_edge = if next { s.is_last_page } else { s.is_first_page };
                base.get() || s.navigation_disabled || at_edge
            }))
        }
        _ => base,
    }
}
