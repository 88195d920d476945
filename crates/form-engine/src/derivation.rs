//! Derived field values.
//!
//! Every derivation rule in the form becomes one step of a single plan. The plan is
//! ordered so a derivation runs after every derivation whose target it reads, and
//! one effect re-runs the whole plan whenever the form value changes, writing the
//! results back in a single equality-gated update.

use std::{collections::BTreeSet, rc::Rc};

use form_condition::{ConditionEvaluator, CustomFunctions, EvaluationContext, path::child_path, set_at, value_at};
use form_config::{ArrayTemplate, ConditionExpression, FieldDefinition, LogicRule, expression_fields};
use form_signals::{Effect, Runtime, Signal};
use serde_json::Value;
use tracing::{trace, warn};

/// Where a derivation writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    /// One field outside any array.
    Field(String),
    /// The same field of every item of an array; `rest` is relative to the item.
    Items {
        /// Array path.
        array: String,
        /// Path inside the item; empty for scalar items.
        rest: String,
    },
}

impl Target {
    /// Coarse path used for ordering: the field, or the whole array.
    fn writes(&self) -> &str {
        match self {
            Self::Field(p) => p,
            Self::Items { array, .. } => array,
        }
    }

    /// Concrete paths in `value`.
    fn paths(&self, value: &Value) -> Vec<String> {
        match self {
            Self::Field(p) => vec![p.clone()],
            Self::Items { array, rest } => {
                let len = value_at(value, array)
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                (0..len)
                    .map(|i| child_path(&format!("{}.{}", array, i), rest))
                    .map(|p| p.trim_end_matches('.').to_string())
                    .collect()
            }
        }
    }
}

/// One derivation rule, located.
#[derive(Debug, Clone)]
pub(crate) struct Derivation {
    /// Written field(s).
    pub target: Target,
    /// Value expression.
    pub expression: String,
    /// Gate.
    pub condition: ConditionExpression,
    /// Paths the expression and gate read.
    deps: BTreeSet<String>,
}

/// Every derivation rule under `fields`, in declaration order.
pub(crate) fn collect(fields: &[FieldDefinition]) -> Vec<Derivation> {
    let mut out = Vec::new();
    walk(fields, "", None, &mut out);
    out
}

/// Collect from `fields` placed at `parent`; `array` is set inside item templates,
/// where `parent` is relative to the item.
fn walk(fields: &[FieldDefinition], parent: &str, array: Option<&str>, out: &mut Vec<Derivation>) {
    for field in fields {
        let path = if matches!(field, FieldDefinition::Row(_) | FieldDefinition::Page(_)) {
            parent.to_string()
        } else {
            child_path(parent, field.key())
        };
        push_rules(field, &path, array, out);
        if field.kind().is_container() {
            walk(field.children(), &path, array, out);
        } else if let Some(a) = field.as_array() {
            if array.is_some() {
                continue;
            }
            match &a.template {
                ArrayTemplate::Single(item) if !item.kind().is_container() => {
                    push_rules(item, "", Some(&path), out);
                }
                ArrayTemplate::Single(item) => walk(item.children(), "", Some(&path), out),
                ArrayTemplate::Multiple(items) => walk(items, "", Some(&path), out),
            }
        }
    }
}

/// Record the derivation rules of `field` at `path`.
fn push_rules(field: &FieldDefinition, path: &str, array: Option<&str>, out: &mut Vec<Derivation>) {
    for rule in &field.base().logic {
        let LogicRule::Derivation {
            expression,
            condition,
            ..
        } = rule
        else {
            continue;
        };
        let mut deps = expression_fields(expression);
        deps.extend(condition.referenced_fields().unwrap_or_default());
        let target = match array {
            Some(a) => Target::Items {
                array: a.to_string(),
                rest: path.to_string(),
            },
            None => Target::Field(path.to_string()),
        };
        out.push(Derivation {
            target,
            expression: expression.clone(),
            condition: condition.clone(),
            deps,
        });
    }
}

/// Paths of derived fields outside arrays.
pub(crate) fn derived_paths(plan: &[Derivation]) -> BTreeSet<String> {
    plan.iter()
        .filter_map(|d| match &d.target {
            Target::Field(p) => Some(p.clone()),
            Target::Items { .. } => None,
        })
        .collect()
}

/// True when reading `dep` can observe a write to `written`.
fn overlaps(dep: &str, written: &str) -> bool {
    dep == written
        || dep.strip_prefix(written).is_some_and(|r| r.starts_with('.'))
        || written.strip_prefix(dep).is_some_and(|r| r.starts_with('.'))
}

/// Order derivations so each runs after those it reads.
///
/// Ties keep declaration order. Derivations caught in a cycle are logged and run
/// after the rest, in declaration order.
pub(crate) fn order(derivations: Vec<Derivation>) -> Vec<Derivation> {
    let n = derivations.len();
    let mut indegree = vec![0usize; n];
    let mut edges = vec![Vec::new(); n];
    for (a, da) in derivations.iter().enumerate() {
        for (b, db) in derivations.iter().enumerate() {
            if a != b && db.deps.iter().any(|d| overlaps(d, da.target.writes())) {
                edges[a].push(b);
                indegree[b] += 1;
            }
        }
    }
    let mut ready: BTreeSet<usize> = (0..n).filter(|i| indegree[*i] == 0).collect();
    let mut sorted = Vec::with_capacity(n);
    while let Some(i) = ready.pop_first() {
        sorted.push(i);
        for &j in &edges[i] {
            indegree[j] -= 1;
            if indegree[j] == 0 {
                ready.insert(j);
            }
        }
    }
    if sorted.len() < n {
        let stuck: Vec<usize> = (0..n).filter(|i| !sorted.contains(i)).collect();
        let targets: Vec<&str> = stuck.iter().map(|i| derivations[*i].target.writes()).collect();
        warn!(?targets, "derivation cycle; these run in declaration order");
        sorted.extend(stuck);
    }
    let mut slots: Vec<Option<Derivation>> = derivations.into_iter().map(Some).collect();
    sorted
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect()
}

/// Run the plan over `value`; later steps see earlier results.
pub(crate) fn apply(
    plan: &[Derivation],
    value: &Value,
    evaluator: &ConditionEvaluator,
    functions: &CustomFunctions,
) -> Value {
    let mut next = value.clone();
    for step in plan {
        for path in step.target.paths(&next) {
            let result = {
                let ctx = EvaluationContext::new(&next, functions).for_field(&path);
                if !evaluator.evaluate(&step.condition, &ctx) {
                    continue;
                }
                evaluator.evaluate_value(&step.expression, &ctx)
            };
            match result {
                Ok(v) if value_at(&next, &path) != Some(&v) => {
                    trace!(path = %path, "derived value updated");
                    set_at(&mut next, &path, v);
                }
                Ok(_) => {}
                Err(e) => warn!(path = %path, error = %e, "derivation failed; value left unchanged"),
            }
        }
    }
    next
}

/// Keep the derived fields of `root` up to date.
///
/// Returns `None` when there is nothing to derive.
pub(crate) fn install(
    rt: &Runtime,
    root: &Signal<Value>,
    plan: Vec<Derivation>,
    evaluator: Rc<ConditionEvaluator>,
    functions: Rc<CustomFunctions>,
) -> Option<Effect> {
    if plan.is_empty() {
        return None;
    }
    let root = root.clone();
    Some(rt.effect(move || {
        let current = root.get();
        let next = apply(&plan, &current, &evaluator, &functions);
        if next != current {
            root.set(next);
        }
    }))
}
