//! Field validation: built-in validators, message resolution, and whole-tree checks.

use std::collections::BTreeMap;

use form_condition::{ConditionEvaluator, CustomFunctions, EvaluationContext, path::child_path, value_at};
use form_config::{ArrayTemplate, FieldBase, FieldDefinition, LogicKind, ValidatorSpec};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Loose email shape: something, `@`, something, `.`, something.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Message used when no message is configured for a failing validator.
const FALLBACK_MESSAGE: &str = "Value is invalid";

/// One failing validator on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Message key of the validator (`required`, `minLength`, custom error key...).
    pub kind: String,
    /// Resolved, interpolated message.
    pub message: String,
}

/// A [`ValidationError`] located in the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path of the field.
    pub path: String,
    /// Key of the field.
    pub key: String,
    /// What failed.
    #[serde(flatten)]
    pub error: ValidationError,
}

/// Everything validation reads.
#[derive(Clone, Copy)]
pub(crate) struct Env<'a> {
    /// Condition and pattern evaluation.
    pub evaluator: &'a ConditionEvaluator,
    /// Host predicates.
    pub functions: &'a CustomFunctions,
    /// Built-in messages overlaid by form-level defaults.
    pub messages: &'a BTreeMap<String, String>,
    /// Current form value.
    pub form_value: &'a Value,
}

impl Env<'_> {
    /// Evaluation context for the field at `path`.
    fn context<'b>(&'b self, path: &'b str) -> EvaluationContext<'b> {
        EvaluationContext::new(self.form_value, self.functions).for_field(path)
    }
}

/// True when any `kind` rule on `base` holds in `ctx`.
pub(crate) fn rule_holds(
    base: &FieldBase,
    kind: LogicKind,
    evaluator: &ConditionEvaluator,
    ctx: &EvaluationContext<'_>,
) -> bool {
    base.logic
        .iter()
        .filter(|r| r.kind() == kind)
        .any(|r| evaluator.evaluate(r.condition(), ctx))
}

/// Field messages layered over form messages; the field wins.
pub(crate) fn merge_messages(
    form: &BTreeMap<String, String>,
    field: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut out = form.clone();
    out.extend(field.iter().map(|(k, v)| (k.clone(), v.clone())));
    out
}

/// Null, empty string, empty list, and unchecked boxes count as no value.
pub(crate) fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// Numbers, or strings that parse as numbers.
fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Character count of strings, item count of lists.
fn length(v: &Value) -> Option<usize> {
    match v {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}

/// Render a bound without a trailing `.0`.
fn fmt_bound(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Message for a failing `spec`, with its bound substituted.
fn message_for(spec: &ValidatorSpec, messages: &BTreeMap<String, String>) -> String {
    let template = messages
        .get(spec.message_key())
        .or_else(|| messages.get("invalid"))
        .map_or(FALLBACK_MESSAGE, String::as_str);
    match spec {
        ValidatorSpec::Min { value } => template.replace("{min}", &fmt_bound(*value)),
        ValidatorSpec::Max { value } => template.replace("{max}", &fmt_bound(*value)),
        ValidatorSpec::MinLength { value } => template.replace("{minLength}", &value.to_string()),
        ValidatorSpec::MaxLength { value } => template.replace("{maxLength}", &value.to_string()),
        ValidatorSpec::Pattern { value } => template.replace("{pattern}", value),
        _ => template.to_string(),
    }
}

/// Run `specs` against the field value in `ctx`.
///
/// `required` replaces any `Required` entry in `specs`, since rules can switch it on.
/// Every other validator passes on an empty value. A validator that cannot run
/// (bad pattern, unknown custom function) is logged and passes.
pub(crate) fn check(
    specs: &[ValidatorSpec],
    required: bool,
    evaluator: &ConditionEvaluator,
    ctx: &EvaluationContext<'_>,
    messages: &BTreeMap<String, String>,
) -> Vec<ValidationError> {
    let value = ctx.field_value;
    let fail = |spec: &ValidatorSpec| ValidationError {
        kind: spec.message_key().to_string(),
        message: message_for(spec, messages),
    };
    if is_empty(value) {
        return if required {
            vec![fail(&ValidatorSpec::Required)]
        } else {
            Vec::new()
        };
    }
    let mut out = Vec::new();
    for spec in specs {
        let ok = match spec {
            ValidatorSpec::Required => true,
            ValidatorSpec::Email => value
                .as_str()
                .is_none_or(|s| evaluator.is_match(EMAIL_PATTERN, s).unwrap_or(true)),
            ValidatorSpec::Min { value: min } => numeric(value).is_none_or(|n| n >= *min),
            ValidatorSpec::Max { value: max } => numeric(value).is_none_or(|n| n <= *max),
            ValidatorSpec::MinLength { value: min } => length(value).is_none_or(|n| n >= *min),
            ValidatorSpec::MaxLength { value: max } => length(value).is_none_or(|n| n <= *max),
            ValidatorSpec::Pattern { value: pattern } => match value.as_str() {
                Some(s) => evaluator.is_match(pattern, s).unwrap_or_else(|e| {
                    warn!(path = ctx.field_path, error = %e, "pattern validator skipped");
                    true
                }),
                None => true,
            },
            ValidatorSpec::Custom { name, .. } => {
                ctx.custom_functions.call(name, ctx).unwrap_or_else(|e| {
                    warn!(path = ctx.field_path, error = %e, "custom validator skipped");
                    true
                })
            }
        };
        if !ok {
            out.push(fail(spec));
        }
    }
    out
}

/// Errors of one field at `path`; hidden fields are never invalid.
pub(crate) fn field_errors(base: &FieldBase, path: &str, env: Env<'_>) -> Vec<ValidationError> {
    let ctx = env.context(path);
    if base.hidden || rule_holds(base, LogicKind::Hidden, env.evaluator, &ctx) {
        return Vec::new();
    }
    let specs = base.effective_validators();
    let required = specs.contains(&ValidatorSpec::Required)
        || rule_holds(base, LogicKind::Required, env.evaluator, &ctx);
    let messages = merge_messages(env.messages, &base.validation_messages);
    check(
        &specs,
        required,
        env.evaluator,
        &ctx,
        &messages,
    )
}

/// Collect the errors of every visible field under `fields`.
///
/// Hidden containers hide their whole subtree. Array items are validated against
/// the template for every item currently in the form value.
pub(crate) fn tree_errors(
    fields: &[FieldDefinition],
    parent: &str,
    env: Env<'_>,
    out: &mut Vec<FieldError>,
) {
    for field in fields {
        let kind = field.kind();
        let path = if matches!(field, FieldDefinition::Row(_) | FieldDefinition::Page(_)) {
            parent.to_string()
        } else {
            child_path(parent, field.key())
        };
        let base = field.base();
        let ctx = env.context(&path);
        if base.hidden || rule_holds(base, LogicKind::Hidden, env.evaluator, &ctx) {
            continue;
        }
        if kind.is_container() {
            tree_errors(field.children(), &path, env, out);
        } else if let Some(array) = field.as_array() {
            push_errors(base, &path, env, out);
            let len = value_at(env.form_value, &path)
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            for i in 0..len {
                let item = format!("{}.{}", path, i);
                item_errors(&array.template, &item, env, out);
            }
        } else if kind.is_value() {
            push_errors(base, &path, env, out);
        }
    }
}

/// Errors of one array item built from `template`.
fn item_errors(template: &ArrayTemplate, item: &str, env: Env<'_>, out: &mut Vec<FieldError>) {
    match template {
        ArrayTemplate::Single(field) if field.kind().is_value() => {
            push_errors(field.base(), item, env, out);
        }
        ArrayTemplate::Single(field) => tree_errors(field.children(), item, env, out),
        ArrayTemplate::Multiple(fields) => tree_errors(fields, item, env, out),
    }
}

/// Locate the errors of one field and append them.
fn push_errors(base: &FieldBase, path: &str, env: Env<'_>, out: &mut Vec<FieldError>) {
    out.extend(field_errors(base, path, env).into_iter().map(|error| FieldError {
        path: path.to_string(),
        key: base.key.clone(),
        error,
    }));
}

#[cfg(test)]
mod tests {
    use form_config::builtin_validation_messages;
    use serde_json::json;

    use super::*;

    /// Validate `fields` over `value` with built-in messages.
    fn errors_for(fields: Value, value: &Value, functions: &CustomFunctions) -> Vec<FieldError> {
        let fields: Vec<FieldDefinition> = serde_json::from_value(fields).unwrap();
        let evaluator = ConditionEvaluator::new();
        let messages = builtin_validation_messages();
        let env = Env {
            evaluator: &evaluator,
            functions,
            messages: &messages,
            form_value: value,
        };
        let mut out = Vec::new();
        tree_errors(&fields, "", env, &mut out);
        out
    }

    #[test]
    fn shorthands_report_interpolated_messages() {
        let fields = json!([
            { "type": "input", "key": "name", "required": true },
            { "type": "input", "key": "email", "email": true },
            { "type": "slider", "key": "age", "min": 18, "max": 99 },
            { "type": "input", "key": "code", "minLength": 4,
              "validationMessages": { "minLength": "Code needs {minLength} characters" } }
        ]);
        let value = json!({ "name": "", "email": "nope", "age": 12, "code": "ab" });
        let errs = errors_for(fields, &value, &CustomFunctions::new());
        let got: Vec<(&str, &str)> = errs
            .iter()
            .map(|e| (e.path.as_str(), e.error.message.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("name", "This field is required"),
                ("email", "Enter a valid email address"),
                ("age", "Value must be at least 18"),
                ("code", "Code needs 4 characters"),
            ]
        );
    }

    #[test]
    fn hidden_fields_and_subtrees_are_never_invalid() {
        let fields = json!([
            { "type": "input", "key": "company", "required": true, "logic": [
                { "type": "hidden", "condition": {
                    "type": "fieldValue", "fieldPath": "kind", "operator": "notEquals", "value": "business" } }
            ]},
            { "type": "group", "key": "extra", "hidden": true, "fields": [
                { "type": "input", "key": "x", "required": true }
            ]}
        ]);
        let personal = json!({ "kind": "personal", "company": null, "extra": { "x": null } });
        assert!(errors_for(fields.clone(), &personal, &CustomFunctions::new()).is_empty());
        let business = json!({ "kind": "business", "company": null, "extra": { "x": null } });
        let errs = errors_for(fields, &business, &CustomFunctions::new());
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].key, "company");
    }

    #[test]
    fn required_rules_and_array_items() {
        let fields = json!([
            { "type": "checkbox", "key": "ship" },
            { "type": "input", "key": "address", "logic": [
                { "type": "required", "condition": {
                    "type": "fieldValue", "fieldPath": "ship", "operator": "equals", "value": true } }
            ]},
            { "type": "array", "key": "contacts", "fields": [
                { "type": "input", "key": "name", "required": true }
            ]}
        ]);
        let value = json!({
            "ship": true, "address": "",
            "contacts": [ { "name": "Ada" }, { "name": "" } ]
        });
        let errs = errors_for(fields, &value, &CustomFunctions::new());
        let paths: Vec<&str> = errs.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["address", "contacts.1.name"]);
    }

    #[test]
    fn custom_validators_use_error_keys_and_unknown_ones_pass() {
        let fields = json!([
            { "type": "input", "key": "user", "validators": [
                { "type": "custom", "name": "notAdmin", "errorKey": "reserved" },
                { "type": "custom", "name": "missing" }
            ], "validationMessages": { "reserved": "That name is reserved" } }
        ]);
        let fns = CustomFunctions::new().with("notAdmin", |ctx| ctx.field_value != "admin");
        let errs = errors_for(fields, &json!({ "user": "admin" }), &fns);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].error.kind, "reserved");
        assert_eq!(errs[0].error.message, "That name is reserved");
    }
}
